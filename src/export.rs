//! 커미션 CSV 내보내기
//!
//! 지역 스프레드시트 호환을 위해 세미콜론 구분자, 현지화된 상태/날짜
//! 표기, UTF-8 BOM을 사용한다.

use chrono::FixedOffset;

use crate::db::models::{normalize_factor, normalize_value};
use crate::db::Commission;

/// 스프레드시트가 UTF-8을 인식하도록 붙이는 BOM
pub const BOM: char = '\u{FEFF}';

pub const DELIMITER: char = ';';

pub const HEADER: [&str; 9] = [
    "ID",
    "Nº NF",
    "Pedido Nectar",
    "Pedido Embrascol",
    "Valor NF",
    "Fator",
    "Comissão",
    "Status",
    "Criado em",
];

pub const PAID_LABEL: &str = "Pago";
pub const PENDING_LABEL: &str = "Pendente";

pub const EXPORT_FILENAME: &str = "comissoes.csv";

fn escape_field(field: &str) -> String {
    if field.contains([DELIMITER, '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_row<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        out.push_str(&escape_field(field.as_ref()));
    }
}

/// 기록 한 건을 CSV 필드로 변환
pub fn record_fields(commission: &Commission, offset: &FixedOffset) -> [String; 9] {
    [
        commission.id.to_string(),
        commission.nf_number.clone().unwrap_or_default(),
        commission.order_number_nectar.clone().unwrap_or_default(),
        commission.order_number_embrascol.clone().unwrap_or_default(),
        normalize_value(commission.value_nf).to_string(),
        normalize_factor(commission.factor).to_string(),
        normalize_value(commission.commission_value).to_string(),
        if commission.is_paid { PAID_LABEL } else { PENDING_LABEL }.to_string(),
        commission
            .created_at
            .with_timezone(offset)
            .format("%d/%m/%Y")
            .to_string(),
    ]
}

/// CSV 본문 생성 (BOM + 헤더 + 행)
pub fn to_csv(commissions: &[Commission], offset: &FixedOffset) -> String {
    let mut out = String::new();
    out.push(BOM);
    push_row(&mut out, HEADER);

    for commission in commissions {
        out.push('\n');
        push_row(&mut out, record_fields(commission, offset));
    }

    out
}
