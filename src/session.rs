//! 운영자 세션 관리
//!
//! 단일 운영자 계정을 검증하고, 불투명 토큰을 키로 하는 세션을
//! 메모리에 보관한다. 세션은 생성 시점부터 고정된 수명 뒤에 만료된다.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 운영자 자격 증명 (설정에서 주입)
#[derive(Debug, Clone)]
pub struct OperatorCredential {
    pub username: String,
    pub password: String,
}

impl OperatorCredential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

/// 세션 정보
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// 세션 저장소
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 새 세션 발급 후 토큰 반환
    pub async fn create(&self, username: &str) -> String {
        let now = Utc::now();
        let token = Uuid::new_v4().simple().to_string();
        let session = Session {
            username: username.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
        };

        self.sessions.write().await.insert(token.clone(), session);

        token
    }

    /// 유효한 세션 조회. 만료된 세션은 제거하고 None을 돌려준다.
    pub async fn get(&self, token: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                None => return None,
                Some(session) if !session.is_expired_at(now) => return Some(session.clone()),
                Some(_) => {}
            }
        }

        debug!("만료된 세션 제거");
        self.sessions.write().await.remove(token);
        None
    }

    /// 세션 파기
    pub async fn destroy(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// 만료된 세션 일괄 정리
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        before - sessions.len()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
