use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Duration, FixedOffset, Offset, Utc};
use thiserror::Error;

use crate::session::OperatorCredential;

/// 설정 오류
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// 서버 설정
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub credential: OperatorCredential,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
    pub static_dir: PathBuf,
    pub cors_origin: Option<String>,
    pub export_offset: FixedOffset,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            database_url: "sqlite://comissoes.db?mode=rwc".to_string(),
            max_connections: 5,
            credential: OperatorCredential::new("admin", "admin123"),
            session_ttl: Duration::hours(24),
            cookie_secure: false,
            static_dir: PathBuf::from("dist"),
            cors_origin: None,
            export_offset: Utc.fix(),
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid { name, value: raw })
}

fn parse_bool(name: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value: raw }),
    }
}

impl AppConfig {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 임의의 조회 함수로 설정 로드. 없는 값은 기본값을 쓴다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("PORT") {
            config.port = parse_var("PORT", raw)?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(raw) = lookup("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = parse_var("DATABASE_MAX_CONNECTIONS", raw)?;
        }
        if let Some(username) = lookup("ADMIN_USERNAME") {
            config.credential.username = username;
        }
        if let Some(password) = lookup("ADMIN_PASSWORD") {
            config.credential.password = password;
        }
        if let Some(raw) = lookup("SESSION_TTL_HOURS") {
            let hours: u32 = parse_var("SESSION_TTL_HOURS", raw)?;
            config.session_ttl = Duration::hours(i64::from(hours));
        }

        config.cookie_secure = matches!(lookup("APP_ENV").as_deref(), Some("production"));
        if let Some(raw) = lookup("COOKIE_SECURE") {
            config.cookie_secure = parse_bool("COOKIE_SECURE", raw)?;
        }

        if let Some(dir) = lookup("STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        config.cors_origin = lookup("CORS_ORIGIN").filter(|origin| !origin.trim().is_empty());

        if let Some(raw) = lookup("EXPORT_UTC_OFFSET_MINUTES") {
            let minutes: i32 = parse_var("EXPORT_UTC_OFFSET_MINUTES", raw.clone())?;
            config.export_offset = minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .ok_or(ConfigError::Invalid {
                    name: "EXPORT_UTC_OFFSET_MINUTES",
                    value: raw,
                })?;
        }

        Ok(config)
    }
}
