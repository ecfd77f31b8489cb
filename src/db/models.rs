use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::StoreError;

/// 인보이스 금액 소수 자릿수
pub const VALUE_SCALE: u32 = 2;
/// 커미션 계수 소수 자릿수
pub const FACTOR_SCALE: u32 = 4;

/// 계수가 없을 때 쓰는 기본값 (2.5%)
pub const DEFAULT_FACTOR: Decimal = Decimal::from_parts(25, 0, 0, false, 3);

/// 인보이스 금액 상한 (이 값 미만만 허용, 정수부 8자리)
pub const MAX_VALUE_NF: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);
/// 계수 절댓값 상한 (이 값 미만만 허용, 정수부 1자리)
pub const MAX_FACTOR: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// 커미션 금액 계산
///
/// 삽입/수정 경로 모두 이 함수만 사용한다. 결과는 소수 둘째 자리에서
/// 반올림(0.5는 0에서 먼 쪽)된다.
pub fn compute_commission_value(value_nf: Decimal, factor: Decimal) -> Result<Decimal, StoreError> {
    let product = value_nf.checked_mul(factor).ok_or_else(|| {
        StoreError::Validation(format!("Comissão fora do limite: {} x {}", value_nf, factor))
    })?;
    let mut value = product.round_dp_with_strategy(VALUE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(VALUE_SCALE);
    Ok(value)
}

/// 인보이스 금액 검증 후 정규화
pub fn validate_value_nf(value_nf: Decimal) -> Result<Decimal, StoreError> {
    if value_nf < Decimal::ZERO {
        return Err(StoreError::Validation(format!(
            "Valor NF não pode ser negativo: {}",
            value_nf
        )));
    }
    // 반올림 뒤 값으로 비교 (99999999.995 → 100000000.00)
    let value = normalize_value(value_nf);
    if value >= MAX_VALUE_NF {
        return Err(StoreError::Validation(format!(
            "Valor NF deve ser menor que {}: {}",
            MAX_VALUE_NF, value_nf
        )));
    }
    Ok(value)
}

/// 계수 검증 후 정규화
pub fn validate_factor(factor: Decimal) -> Result<Decimal, StoreError> {
    let factor_normalized = normalize_factor(factor);
    if factor_normalized.abs() >= MAX_FACTOR {
        return Err(StoreError::Validation(format!(
            "Fator deve estar entre -{} e {} (exclusivo): {}",
            MAX_FACTOR, MAX_FACTOR, factor
        )));
    }
    Ok(factor_normalized)
}

/// 금액 정규화 (소수 둘째 자리)
pub fn normalize_value(value: Decimal) -> Decimal {
    let mut value = value.round_dp_with_strategy(VALUE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(VALUE_SCALE);
    value
}

/// 계수 정규화 (소수 넷째 자리)
pub fn normalize_factor(factor: Decimal) -> Decimal {
    let mut factor =
        factor.round_dp_with_strategy(FACTOR_SCALE, RoundingStrategy::MidpointAwayFromZero);
    factor.rescale(FACTOR_SCALE);
    factor
}

/// 커미션 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    pub id: i64,
    pub nf_number: Option<String>,
    pub order_number_nectar: Option<String>,
    pub order_number_embrascol: Option<String>,
    pub value_nf: Decimal,
    pub factor: Decimal,
    pub commission_value: Decimal,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 커미션 DB 행
///
/// SQLite에는 DECIMAL 타입이 없어 금액은 TEXT로 저장한다.
#[derive(Debug, Clone, FromRow)]
pub struct CommissionRow {
    pub id: i64,
    pub nf_number: Option<String>,
    pub order_number_nectar: Option<String>,
    pub order_number_embrascol: Option<String>,
    pub value_nf: String,
    pub factor: String,
    pub commission_value: String,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn parse_stored(id: i64, column: &str, raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(raw)
        .map_err(|e| StoreError::Corrupt(format!("commission {} {}='{}': {}", id, column, raw, e)))
}

impl TryFrom<CommissionRow> for Commission {
    type Error = StoreError;

    fn try_from(row: CommissionRow) -> Result<Self, Self::Error> {
        let value_nf = parse_stored(row.id, "value_nf", &row.value_nf)?;
        let factor = parse_stored(row.id, "factor", &row.factor)?;
        let commission_value = parse_stored(row.id, "commission_value", &row.commission_value)?;

        Ok(Commission {
            id: row.id,
            nf_number: row.nf_number,
            order_number_nectar: row.order_number_nectar,
            order_number_embrascol: row.order_number_embrascol,
            value_nf,
            factor,
            commission_value,
            is_paid: row.is_paid,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// 신규 커미션 입력
#[derive(Debug, Clone, PartialEq)]
pub struct NewCommission {
    pub nf_number: Option<String>,
    pub order_number_nectar: Option<String>,
    pub order_number_embrascol: Option<String>,
    pub value_nf: Decimal,
    pub factor: Decimal,
}

impl NewCommission {
    pub fn new(value_nf: Decimal) -> Self {
        Self {
            nf_number: None,
            order_number_nectar: None,
            order_number_embrascol: None,
            value_nf,
            factor: DEFAULT_FACTOR,
        }
    }

    pub fn with_factor(mut self, factor: Decimal) -> Self {
        self.factor = factor;
        self
    }
}

/// 부분 수정 입력
///
/// 텍스트 필드는 `Some(None)`이면 NULL로 지운다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommissionPatch {
    pub nf_number: Option<Option<String>>,
    pub order_number_nectar: Option<Option<String>>,
    pub order_number_embrascol: Option<Option<String>>,
    pub value_nf: Option<Decimal>,
    pub factor: Option<Decimal>,
    pub is_paid: Option<bool>,
}

impl CommissionPatch {
    pub fn is_empty(&self) -> bool {
        self.nf_number.is_none()
            && self.order_number_nectar.is_none()
            && self.order_number_embrascol.is_none()
            && self.value_nf.is_none()
            && self.factor.is_none()
            && self.is_paid.is_none()
    }

    /// 기존 기록에 적용하고 커미션 금액을 다시 계산한다
    ///
    /// 검증에 실패하면 기록은 바뀌지 않는다.
    pub fn apply(&self, commission: &mut Commission) -> Result<(), StoreError> {
        let value_nf = match self.value_nf {
            Some(value_nf) => validate_value_nf(value_nf)?,
            None => commission.value_nf,
        };
        let factor = match self.factor {
            Some(factor) => validate_factor(factor)?,
            None => commission.factor,
        };
        let commission_value = compute_commission_value(value_nf, factor)?;

        if let Some(nf_number) = &self.nf_number {
            commission.nf_number = nf_number.clone();
        }
        if let Some(nectar) = &self.order_number_nectar {
            commission.order_number_nectar = nectar.clone();
        }
        if let Some(embrascol) = &self.order_number_embrascol {
            commission.order_number_embrascol = embrascol.clone();
        }
        if let Some(is_paid) = self.is_paid {
            commission.is_paid = is_paid;
        }
        commission.value_nf = value_nf;
        commission.factor = factor;
        commission.commission_value = commission_value;
        Ok(())
    }
}

/// 지급 상태 필터
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Paid,
    Pending,
}

impl StatusFilter {
    /// `status` 쿼리 값 해석. 알 수 없는 값은 필터 없음으로 본다.
    pub fn from_query(status: Option<&str>) -> Self {
        match status {
            Some("paid") => StatusFilter::Paid,
            Some("pending") => StatusFilter::Pending,
            _ => StatusFilter::All,
        }
    }

    pub fn is_paid(&self) -> Option<bool> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Paid => Some(true),
            StatusFilter::Pending => Some(false),
        }
    }
}
