//! 세션 게이트
//!
//! 세션 토큰은 HttpOnly 쿠키로 주고받는다. 브라우저가 아닌 클라이언트를
//! 위해 `Authorization: Bearer <token>` 헤더도 허용한다.

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use log::{debug, info, warn};

use crate::api::models::{AuthCheckResponse, LoginRequest, LoginResponse, SuccessResponse, UserInfo};
use crate::error::{AppError, AppResult};
use crate::server::ServerState;

pub const SESSION_COOKIE: &str = "comissao_sid";

/// 인증된 요청의 사용자 (미들웨어가 요청 확장에 넣는다)
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// 요청 헤더에서 세션 토큰 추출
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

/// 세션 쿠키 헤더 값 생성
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// 세션 쿠키 삭제용 헤더 값
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

fn set_cookie(response: &mut Response, cookie: String) -> AppResult<()> {
    let value = HeaderValue::from_str(&cookie).map_err(|e| AppError::Internal {
        public: crate::error::MSG_INTERNAL,
        detail: format!("invalid cookie header: {}", e),
    })?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}

/// 인증 미들웨어 - 유효한 세션이 없으면 401
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = match session_token(req.headers()) {
        Some(token) => token,
        None => {
            warn!("세션 없는 요청 거부: {} {}", req.method(), req.uri());
            return Err(AppError::Unauthorized);
        }
    };

    match state.sessions.get(&token).await {
        Some(session) => {
            req.extensions_mut().insert(CurrentUser {
                username: session.username,
            });
            Ok(next.run(req).await)
        }
        None => {
            warn!("유효하지 않거나 만료된 세션: {} {}", req.method(), req.uri());
            Err(AppError::Unauthorized)
        }
    }
}

/// 로그인 핸들러
pub async fn login(
    State(state): State<ServerState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(payload) = payload?;

    if !state.credential.verify(&payload.username, &payload.password) {
        warn!("로그인 실패: {}", payload.username);
        return Err(AppError::InvalidCredentials);
    }

    let purged = state.sessions.purge_expired().await;
    if purged > 0 {
        debug!("만료 세션 정리: {}개", purged);
    }

    let username = state.credential.username.clone();
    let token = state.sessions.create(&username).await;
    info!("로그인 성공: {}", username);

    let mut response = Json(LoginResponse {
        success: true,
        user: UserInfo { username },
    })
    .into_response();
    set_cookie(
        &mut response,
        session_cookie(&token, state.sessions.ttl().num_seconds(), state.cookie_secure),
    )?;

    Ok(response)
}

/// 로그아웃 핸들러. 세션이 없어도 성공으로 응답한다.
pub async fn logout(State(state): State<ServerState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = session_token(&headers) {
        if state.sessions.destroy(&token).await {
            info!("로그아웃");
        }
    }

    let mut response = Json(SuccessResponse { success: true }).into_response();
    set_cookie(&mut response, clear_session_cookie(state.cookie_secure))?;
    Ok(response)
}

/// 인증 상태 확인 핸들러
pub async fn check(State(state): State<ServerState>, headers: HeaderMap) -> Json<AuthCheckResponse> {
    let session = match session_token(&headers) {
        Some(token) => state.sessions.get(&token).await,
        None => None,
    };

    Json(AuthCheckResponse {
        authenticated: session.is_some(),
        user: session.map(|s| UserInfo { username: s.username }),
    })
}
