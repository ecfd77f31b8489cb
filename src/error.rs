//! API 오류 타입
//!
//! 모든 오류 응답 본문은 `{"error": "<메시지>"}` 형태이며, 메시지는
//! 포르투갈어 사용자 문구를 쓴다. 내부 오류의 상세 내용은 로그에만 남긴다.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{error, warn};
use thiserror::Error;

use crate::api::models::ErrorResponse;
use crate::db::StoreError;

pub const MSG_UNAUTHORIZED: &str = "Não autorizado";
pub const MSG_INVALID_CREDENTIALS: &str = "Credenciais inválidas";
pub const MSG_NOT_FOUND: &str = "Comissão não encontrada";
pub const MSG_NO_FIELDS: &str = "Nenhum campo para atualizar";
pub const MSG_VALUE_REQUIRED: &str = "Valor NF é obrigatório";
pub const MSG_INVALID_BODY: &str = "Corpo da requisição inválido";
pub const MSG_INVALID_ID: &str = "ID inválido";
pub const MSG_ROUTE_NOT_FOUND: &str = "Rota não encontrada";
pub const MSG_INTERNAL: &str = "Erro interno do servidor";

/// 애플리케이션 오류
#[derive(Debug, Error)]
pub enum AppError {
    /// 세션 없음 또는 만료 (401)
    #[error("unauthorized")]
    Unauthorized,

    /// 로그인 실패 (401)
    #[error("invalid credentials")]
    InvalidCredentials,

    /// 입력 검증 실패 (400)
    #[error("validation failed: {0}")]
    Validation(String),

    /// 대상 없음 (404)
    #[error("not found: {0}")]
    NotFound(String),

    /// 내부 오류 (500). `public`만 응답에 담긴다.
    #[error("internal error: {detail}")]
    Internal { public: &'static str, detail: String },
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// 저장소 오류를 작업별 메시지와 함께 변환
    pub fn from_store(err: StoreError, public: &'static str) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound(MSG_NOT_FOUND.to_string()),
            StoreError::Validation(detail) => AppError::Validation(detail),
            other => AppError::Internal {
                public,
                detail: other.to_string(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("잘못된 JSON 본문: {}", rejection.body_text());
        AppError::Validation(MSG_INVALID_BODY.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Unauthorized => MSG_UNAUTHORIZED.to_string(),
            AppError::InvalidCredentials => MSG_INVALID_CREDENTIALS.to_string(),
            AppError::Validation(msg) | AppError::NotFound(msg) => msg,
            AppError::Internal { public, detail } => {
                error!("내부 오류: {}", detail);
                public.to_string()
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
