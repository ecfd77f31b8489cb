pub mod auth;
pub mod handlers;
pub mod models;
pub mod routes;

pub use routes::create_api_router;
