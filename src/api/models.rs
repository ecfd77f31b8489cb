use log::debug;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::models::{DEFAULT_FACTOR, MAX_FACTOR, MAX_VALUE_NF};
use crate::db::{CommissionPatch, NewCommission};
use crate::error::{AppError, MSG_INVALID_BODY, MSG_NO_FIELDS, MSG_VALUE_REQUIRED};

const MSG_INVALID_VALUE: &str = "Valor NF inválido";
const MSG_INVALID_FACTOR: &str = "Fator inválido";
const MSG_INVALID_STATUS: &str = "Status de pagamento inválido";
const MSG_VALUE_OUT_OF_RANGE: &str = "Valor NF deve ser menor que 100000000";
const MSG_FACTOR_OUT_OF_RANGE: &str = "Fator deve estar entre -10 e 10";

/// 로그인 요청
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// 로그인 사용자 정보
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub username: String,
}

/// 로그인 응답
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserInfo,
}

/// 단순 성공 응답
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// 인증 상태 응답
#[derive(Debug, Serialize)]
pub struct AuthCheckResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

/// 목록 조회 쿼리
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

/// API 오류 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// JSON 숫자 또는 숫자 문자열을 Decimal로 해석
///
/// 소수점으로 쉼표 하나를 허용한다 ("10,5"). 천 단위 구분자는 받지 않는다.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.contains('.') {
                trimmed.to_string()
            } else {
                trimmed.replacen(',', ".", 1)
            }
        }
        _ => return None,
    };

    if raw.is_empty() {
        return None;
    }

    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

/// 인보이스 금액 범위 검사 (0 이상, 상한 미만)
fn check_value_nf(value_nf: Decimal) -> Result<Decimal, AppError> {
    if value_nf < Decimal::ZERO {
        return Err(AppError::validation(MSG_INVALID_VALUE));
    }
    if value_nf >= MAX_VALUE_NF {
        return Err(AppError::validation(MSG_VALUE_OUT_OF_RANGE));
    }
    Ok(value_nf)
}

/// 계수 범위 검사 (절댓값 상한 미만)
fn check_factor(factor: Decimal) -> Result<Decimal, AppError> {
    if factor.abs() >= MAX_FACTOR {
        return Err(AppError::validation(MSG_FACTOR_OUT_OF_RANGE));
    }
    Ok(factor)
}

/// 선택 텍스트 필드 해석. 빈 문자열은 NULL로 본다.
fn parse_text(field: &str, value: &Value) -> Result<Option<String>, AppError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(AppError::validation(format!("Campo inválido: {}", field))),
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, AppError> {
    body.as_object()
        .ok_or_else(|| AppError::validation(MSG_INVALID_BODY))
}

/// 생성 요청 본문 해석
///
/// `value_nf`는 필수이며 0 이상, 1억 미만이어야 한다. `factor`는 없거나
/// 해석할 수 없으면 기본값을 쓰고, 절댓값이 10 미만이어야 한다.
pub fn parse_new_commission(body: &Value) -> Result<NewCommission, AppError> {
    let fields = as_object(body)?;

    let value_nf = match fields.get("value_nf") {
        None | Some(Value::Null) => return Err(AppError::validation(MSG_VALUE_REQUIRED)),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(AppError::validation(MSG_VALUE_REQUIRED))
        }
        Some(raw) => parse_decimal(raw).ok_or_else(|| AppError::validation(MSG_INVALID_VALUE))?,
    };
    let value_nf = check_value_nf(value_nf)?;

    let factor = fields
        .get("factor")
        .and_then(parse_decimal)
        .unwrap_or(DEFAULT_FACTOR);
    let factor = check_factor(factor)?;

    let text = |name: &str| -> Result<Option<String>, AppError> {
        fields
            .get(name)
            .map(|v| parse_text(name, v))
            .transpose()
            .map(Option::flatten)
    };

    let mut input = NewCommission::new(value_nf).with_factor(factor);
    input.nf_number = text("nf_number")?;
    input.order_number_nectar = text("order_number_nectar")?;
    input.order_number_embrascol = text("order_number_embrascol")?;
    Ok(input)
}

/// 부분 수정 본문 해석
///
/// `id`, `created_at`, `updated_at`, `commission_value`와 알 수 없는 키는
/// 무시한다. 인식된 필드가 하나도 없으면 저장소에 닿기 전에 거절한다.
pub fn parse_patch(body: &Value) -> Result<CommissionPatch, AppError> {
    let fields = as_object(body)?;
    let mut patch = CommissionPatch::default();

    for (key, value) in fields {
        match key.as_str() {
            "nf_number" => patch.nf_number = Some(parse_text(key, value)?),
            "order_number_nectar" => patch.order_number_nectar = Some(parse_text(key, value)?),
            "order_number_embrascol" => {
                patch.order_number_embrascol = Some(parse_text(key, value)?)
            }
            "value_nf" => {
                let value_nf =
                    parse_decimal(value).ok_or_else(|| AppError::validation(MSG_INVALID_VALUE))?;
                patch.value_nf = Some(check_value_nf(value_nf)?);
            }
            "factor" => {
                let factor =
                    parse_decimal(value).ok_or_else(|| AppError::validation(MSG_INVALID_FACTOR))?;
                patch.factor = Some(check_factor(factor)?);
            }
            "is_paid" => match value {
                Value::Bool(is_paid) => patch.is_paid = Some(*is_paid),
                _ => return Err(AppError::validation(MSG_INVALID_STATUS)),
            },
            ignored => debug!("수정 요청의 필드 무시: {}", ignored),
        }
    }

    if patch.is_empty() {
        return Err(AppError::validation(MSG_NO_FIELDS));
    }

    Ok(patch)
}
