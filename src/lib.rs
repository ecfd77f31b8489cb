//! 커미션 기록 관리 서버
//!
//! 운영자 한 명이 인보이스별 판매 커미션을 기록하고 지급 상태를 추적하며
//! CSV로 내보내는 HTTP JSON API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod server;
pub mod session;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use server::{build_app, start_server, ServerState};
