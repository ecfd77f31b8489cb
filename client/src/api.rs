use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::view::Commission;

/// 클라이언트 오류
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP 오류: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: UserInfo,
}

/// 신규 커미션 입력 폼
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommissionForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nf_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number_nectar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number_embrascol: Option<String>,
    pub value_nf: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor: Option<Decimal>,
}

/// 행 편집 스냅샷
///
/// 편집 가능한 필드 전체를 보낸다. 커미션 금액은 서버가 다시 계산한다.
pub fn edit_snapshot(commission: &Commission) -> Map<String, Value> {
    let mut snapshot = Map::new();
    snapshot.insert("nf_number".into(), json!(commission.nf_number));
    snapshot.insert("order_number_nectar".into(), json!(commission.order_number_nectar));
    snapshot.insert("order_number_embrascol".into(), json!(commission.order_number_embrascol));
    snapshot.insert("value_nf".into(), json!(commission.value_nf));
    snapshot.insert("factor".into(), json!(commission.factor));
    snapshot
}

/// 지급 상태 토글 본문 (`is_paid`만 보낸다)
pub fn toggle_body(commission: &Commission) -> Value {
    json!({ "is_paid": !commission.is_paid })
}

/// 커미션 API 클라이언트
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("erro").to_string(),
        };
        Err(ClientError::Api { status, message })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserInfo, ClientError> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let body: LoginResponse = Self::check(response).await?.json().await?;
        Ok(body.user)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.http.post(self.url("/logout")).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// 전체 목록 조회 (필터는 클라이언트에서 적용)
    pub async fn list(&self) -> Result<Vec<Commission>, ClientError> {
        let response = self.http.get(self.url("/commissions")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create(&self, form: &CommissionForm) -> Result<Commission, ClientError> {
        let response = self
            .http
            .post(self.url("/commissions"))
            .json(form)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn update(&self, id: i64, body: &Value) -> Result<Commission, ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/commissions/{}", id)))
            .json(body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/commissions/{}", id)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// CSV 원문 바이트 (BOM 포함)
    pub async fn export(&self) -> Result<Vec<u8>, ClientError> {
        let response = self.http.get(self.url("/commissions/export")).send().await?;
        Ok(Self::check(response).await?.bytes().await?.to_vec())
    }
}
