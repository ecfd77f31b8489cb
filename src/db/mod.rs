pub mod models;
pub mod repository;

use log::info;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Error as SqlxError;
use thiserror::Error;

pub use models::{Commission, CommissionPatch, NewCommission, StatusFilter};
pub use repository::CommissionRepository;

/// 저장소 오류
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("commission {0} not found")]
    NotFound(i64),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] SqlxError),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

/// SQLite 데이터베이스 초기화 및 연결
pub async fn init_database(database_url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    info!("🗄️  SQLite 데이터베이스 초기화 중...");

    // 연결 풀 생성
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    // 테이블 생성
    create_tables(&pool).await?;

    info!("✅ 데이터베이스 초기화 완료");

    Ok(pool)
}

/// 필요한 테이블 생성
pub async fn create_tables(pool: &SqlitePool) -> Result<(), SqlxError> {
    // AUTOINCREMENT: 삭제된 id는 재사용하지 않음
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS commissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nf_number TEXT,
            order_number_nectar TEXT,
            order_number_embrascol TEXT,
            value_nf TEXT NOT NULL,
            factor TEXT NOT NULL DEFAULT '0.0250',
            commission_value TEXT NOT NULL,
            is_paid INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_commissions_created ON commissions(created_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_commissions_paid ON commissions(is_paid)")
        .execute(pool)
        .await?;

    info!("📋 테이블 생성 완료");

    Ok(())
}
