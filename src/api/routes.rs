use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::api::auth::{check, login, logout, require_auth};
use crate::api::handlers::*;
use crate::server::ServerState;

/// API 라우터 생성 (`/api` 아래에 중첩된다)
pub fn create_api_router(state: ServerState) -> Router<ServerState> {
    // 세션 게이트를 통과해야 하는 경로
    let protected = Router::new()
        .route("/commissions", get(list_commissions).post(create_commission))
        .route("/commissions/export", get(export_commissions))
        .route("/commissions/:id", put(update_commission).delete(delete_commission))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        // 인증 API
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/auth/check", get(check))
        .merge(protected)
        .fallback(api_not_found)
}
