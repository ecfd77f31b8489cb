use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use chrono::FixedOffset;
use log::{info, warn};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api::create_api_router;
use crate::config::AppConfig;
use crate::db::{self, CommissionRepository};
use crate::session::{OperatorCredential, SessionStore};

/// 서버 상태
#[derive(Clone)]
pub struct ServerState {
    pub repository: CommissionRepository,
    pub sessions: SessionStore,
    pub credential: OperatorCredential,
    pub cookie_secure: bool,
    pub export_offset: FixedOffset,
}

impl ServerState {
    pub fn new(repository: CommissionRepository, config: &AppConfig) -> Self {
        Self {
            repository,
            sessions: SessionStore::new(config.session_ttl),
            credential: config.credential.clone(),
            cookie_secure: config.cookie_secure,
            export_offset: config.export_offset,
        }
    }
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::permissive();
    };

    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        Err(e) => {
            warn!("CORS_ORIGIN 값이 올바르지 않아 무시합니다: {}", e);
            CorsLayer::permissive()
        }
    }
}

/// 전체 라우터 구성
///
/// `/api` 아래는 JSON API, 나머지 경로는 정적 파일을 제공하고 없는 파일은
/// `index.html`로 응답한다 (SPA).
pub fn build_app(state: ServerState, config: &AppConfig) -> Router {
    let index = config.static_dir.join("index.html");
    let static_files = ServeDir::new(&config.static_dir).fallback(ServeFile::new(index));

    Router::new()
        .nest("/api", create_api_router(state.clone()))
        .fallback_service(static_files)
        .layer(cors_layer(config.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("종료 신호 대기 실패: {}", e);
        return;
    }
    info!("🛑 종료 신호 수신");
}

/// 서버 시작
pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    info!("커미션 서버 시작 중...");

    let pool = db::init_database(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("데이터베이스 연결 실패: {}", config.database_url))?;
    let state = ServerState::new(CommissionRepository::new(pool), &config);
    let app = build_app(state, &config);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("포트 바인드 실패: {}", config.port))?;

    info!("서버가 성공적으로 시작되었습니다!");
    info!("REST API: http://localhost:{}/api", config.port);
    info!("정적 파일: {}", config.static_dir.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("REST 서버 오류")?;

    info!("✅ 서버 종료 완료");

    Ok(())
}
