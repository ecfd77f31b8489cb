//! 화면 표시용 계산
//!
//! 필터와 요약은 이미 받아 온 전체 목록에서 클라이언트가 계산한다.
//! 커미션 미리보기는 참고용이며, 실제 값은 항상 서버가 돌려준 값을 쓴다.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// 서버가 돌려주는 커미션 기록
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

/// 목록 필터
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Filter {
    #[default]
    All,
    Pending,
    Paid,
}

impl Filter {
    pub fn matches(&self, commission: &Commission) -> bool {
        match self {
            Filter::All => true,
            Filter::Pending => !commission.is_paid,
            Filter::Paid => commission.is_paid,
        }
    }

    pub fn apply<'a>(&self, commissions: &'a [Commission]) -> Vec<&'a Commission> {
        commissions.iter().filter(|c| self.matches(c)).collect()
    }
}

/// 요약 통계
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub pending: usize,
    pub paid: usize,
    pub total_value: Decimal,
    pub pending_value: Decimal,
    pub paid_value: Decimal,
}

impl Summary {
    pub fn from_commissions(commissions: &[Commission]) -> Self {
        commissions.iter().fold(Summary::default(), |mut acc, c| {
            acc.total += 1;
            acc.total_value += c.commission_value;
            if c.is_paid {
                acc.paid += 1;
                acc.paid_value += c.commission_value;
            } else {
                acc.pending += 1;
                acc.pending_value += c.commission_value;
            }
            acc
        })
    }

    /// 건당 평균 커미션. 목록이 비어 있으면 0.
    pub fn average(&self) -> Decimal {
        if self.total == 0 {
            return Decimal::ZERO;
        }
        (self.total_value / Decimal::from(self.total))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// 제출 전 커미션 미리보기. 곱이 표현 범위를 넘으면 None.
pub fn preview_commission(value_nf: Decimal, factor: Decimal) -> Option<Decimal> {
    value_nf
        .checked_mul(factor)
        .map(|v| v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// pt-BR 통화 표기 ("R$ 1.234,56")
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}R$ {},{}", if negative { "-" } else { "" }, grouped, frac_part)
}

/// 계수를 백분율로 표기 ("2.50%")
pub fn format_factor(factor: Decimal) -> String {
    format!("{:.2}%", factor * Decimal::ONE_HUNDRED)
}

fn status_label(is_paid: bool) -> &'static str {
    if is_paid {
        "Pago"
    } else {
        "Pendente"
    }
}

/// 목록 표 렌더링
pub fn render_table(commissions: &[&Commission]) -> String {
    let mut out = format!(
        "{:>5}  {:<12} {:<14} {:<16} {:>16} {:>8} {:>14}  {:<9} {:<10}\n",
        "ID", "Nº NF", "Pedido Nectar", "Pedido Embrascol", "Valor NF", "Fator", "Comissão", "Status", "Data"
    );

    for c in commissions {
        out.push_str(&format!(
            "{:>5}  {:<12} {:<14} {:<16} {:>16} {:>8} {:>14}  {:<9} {:<10}\n",
            c.id,
            c.nf_number.as_deref().unwrap_or("-"),
            c.order_number_nectar.as_deref().unwrap_or("-"),
            c.order_number_embrascol.as_deref().unwrap_or("-"),
            format_brl(c.value_nf),
            format_factor(c.factor),
            format_brl(c.commission_value),
            status_label(c.is_paid),
            c.created_at.format("%d/%m/%Y"),
        ));
    }

    out
}

/// 요약 렌더링
pub fn render_summary(summary: &Summary) -> String {
    format!(
        "Total: {} ({})\nPendentes: {} ({})\nPagas: {} ({})\nMédia por comissão: {}",
        summary.total,
        format_brl(summary.total_value),
        summary.pending,
        format_brl(summary.pending_value),
        summary.paid,
        format_brl(summary.paid_value),
        format_brl(summary.average()),
    )
}
