use log::info;

use comissao::{start_server, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일이 있으면 환경 변수로 로드
    dotenv::dotenv().ok();

    // 로깅 초기화
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    info!(
        "설정 로드 완료: port={} database={} session_ttl={}h",
        config.port,
        config.database_url,
        config.session_ttl.num_hours()
    );

    start_server(config).await
}
