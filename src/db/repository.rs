use chrono::Utc;
use log::{debug, warn};
use sqlx::sqlite::{SqliteConnection, SqlitePool};

use super::models::{
    compute_commission_value, validate_factor, validate_value_nf, Commission, CommissionPatch,
    CommissionRow, NewCommission, StatusFilter,
};
use super::StoreError;

const SELECT_COLUMNS: &str = "SELECT id, nf_number, order_number_nectar, order_number_embrascol,
        value_nf, factor, commission_value, is_paid, created_at, updated_at
     FROM commissions";

/// 커미션 저장소
#[derive(Clone)]
pub struct CommissionRepository {
    pool: SqlitePool,
}

impl CommissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 커미션 생성
    ///
    /// id, 타임스탬프, 커미션 금액은 저장소가 정한다.
    pub async fn create(&self, input: &NewCommission) -> Result<Commission, StoreError> {
        let value_nf = validate_value_nf(input.value_nf)?;
        let factor = validate_factor(input.factor)?;
        let commission_value = compute_commission_value(value_nf, factor)?;
        let now = Utc::now();

        let row = sqlx::query_as::<_, CommissionRow>(
            "INSERT INTO commissions
             (nf_number, order_number_nectar, order_number_embrascol, value_nf, factor,
              commission_value, is_paid, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
             RETURNING id, nf_number, order_number_nectar, order_number_embrascol,
                 value_nf, factor, commission_value, is_paid, created_at, updated_at"
        )
        .bind(&input.nf_number)
        .bind(&input.order_number_nectar)
        .bind(&input.order_number_embrascol)
        .bind(value_nf.to_string())
        .bind(factor.to_string())
        .bind(commission_value.to_string())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        debug!("커미션 생성: id={} commission_value={}", row.id, row.commission_value);

        Commission::try_from(row)
    }

    /// 커미션 목록 조회 (최신순)
    pub async fn list(&self, filter: StatusFilter) -> Result<Vec<Commission>, StoreError> {
        let rows = match filter.is_paid() {
            Some(is_paid) => {
                sqlx::query_as::<_, CommissionRow>(&format!(
                    "{} WHERE is_paid = ? ORDER BY created_at DESC, id DESC",
                    SELECT_COLUMNS
                ))
                .bind(is_paid)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CommissionRow>(&format!(
                    "{} ORDER BY created_at DESC, id DESC",
                    SELECT_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Commission::try_from).collect()
    }

    /// id로 조회
    #[cfg(test)]
    pub async fn find(&self, id: i64) -> Result<Commission, StoreError> {
        let mut conn = self.pool.acquire().await?;
        fetch_commission(&mut conn, id).await
    }

    /// 부분 수정
    ///
    /// `BEGIN IMMEDIATE`로 쓰기 잠금을 먼저 잡은 뒤 현재 행을 읽고, 패치를
    /// 적용해 커미션 금액을 다시 계산한 다음 기록한다. 동시에 들어온 수정은
    /// busy_timeout 동안 대기하며 차례로 적용된다 (마지막 쓰기 우선).
    pub async fn update(&self, id: i64, patch: &CommissionPatch) -> Result<Commission, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::Validation("Nenhum campo para atualizar".to_string()));
        }

        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = async {
            let commission = apply_patch(&mut conn, id, patch).await?;
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok::<_, StoreError>(commission)
        }
        .await;

        match result {
            Ok(commission) => {
                debug!("커미션 수정: id={} commission_value={}", id, commission.commission_value);
                Ok(commission)
            }
            Err(e) => {
                if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    warn!("롤백 실패: id={} {}", id, rollback);
                }
                Err(e)
            }
        }
    }

    /// 삭제 (hard delete)
    pub async fn delete(&self, id: i64) -> Result<i64, StoreError> {
        let deleted: Option<(i64,)> = sqlx::query_as("DELETE FROM commissions WHERE id = ? RETURNING id")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match deleted {
            Some((deleted_id,)) => {
                debug!("커미션 삭제: id={}", deleted_id);
                Ok(deleted_id)
            }
            None => Err(StoreError::NotFound(id)),
        }
    }
}

async fn fetch_commission(conn: &mut SqliteConnection, id: i64) -> Result<Commission, StoreError> {
    let row = sqlx::query_as::<_, CommissionRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(StoreError::NotFound(id))?;

    Commission::try_from(row)
}

/// 쓰기 잠금을 잡은 연결에서 읽기-수정-쓰기
async fn apply_patch(
    conn: &mut SqliteConnection,
    id: i64,
    patch: &CommissionPatch,
) -> Result<Commission, StoreError> {
    let mut commission = fetch_commission(conn, id).await?;
    patch.apply(&mut commission)?;
    commission.updated_at = Utc::now().max(commission.created_at);

    sqlx::query(
        "UPDATE commissions
         SET nf_number = ?, order_number_nectar = ?, order_number_embrascol = ?,
             value_nf = ?, factor = ?, commission_value = ?, is_paid = ?, updated_at = ?
         WHERE id = ?"
    )
    .bind(&commission.nf_number)
    .bind(&commission.order_number_nectar)
    .bind(&commission.order_number_embrascol)
    .bind(commission.value_nf.to_string())
    .bind(commission.factor.to_string())
    .bind(commission.commission_value.to_string())
    .bind(commission.is_paid)
    .bind(commission.updated_at)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(commission)
}
