use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
    Extension,
};
use log::info;
use serde::Serialize;
use serde_json::Value;

use crate::api::auth::CurrentUser;
use crate::api::models::*;
use crate::db::{Commission, StatusFilter};
use crate::error::{AppError, AppResult, MSG_INVALID_ID, MSG_ROUTE_NOT_FOUND};
use crate::export::{to_csv, EXPORT_FILENAME};
use crate::server::ServerState;

const MSG_LIST_FAILED: &str = "Erro ao buscar comissões";
const MSG_CREATE_FAILED: &str = "Erro ao criar comissão";
const MSG_UPDATE_FAILED: &str = "Erro ao atualizar comissão";
const MSG_DELETE_FAILED: &str = "Erro ao deletar comissão";
const MSG_EXPORT_FAILED: &str = "Erro ao exportar CSV";

/// 삭제 응답
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub id: i64,
}

fn parse_id(raw: &str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::validation(MSG_INVALID_ID))
}

/// 커미션 목록 조회 핸들러
pub async fn list_commissions(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Commission>>> {
    let filter = StatusFilter::from_query(query.status.as_deref());

    let commissions = state
        .repository
        .list(filter)
        .await
        .map_err(|e| AppError::from_store(e, MSG_LIST_FAILED))?;

    Ok(Json(commissions))
}

/// 커미션 생성 핸들러
pub async fn create_commission(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Commission>> {
    let Json(body) = payload?;
    let input = parse_new_commission(&body)?;

    let created = state
        .repository
        .create(&input)
        .await
        .map_err(|e| AppError::from_store(e, MSG_CREATE_FAILED))?;

    info!(
        "커미션 생성: id={} value_nf={} commission_value={} ({})",
        created.id, created.value_nf, created.commission_value, user.username
    );

    Ok(Json(created))
}

/// 커미션 부분 수정 핸들러
pub async fn update_commission(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Commission>> {
    let id = parse_id(&id)?;
    let Json(body) = payload?;
    let patch = parse_patch(&body)?;

    let updated = state
        .repository
        .update(id, &patch)
        .await
        .map_err(|e| AppError::from_store(e, MSG_UPDATE_FAILED))?;

    info!("커미션 수정: id={} ({})", updated.id, user.username);

    Ok(Json(updated))
}

/// 커미션 삭제 핸들러
pub async fn delete_commission(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let id = parse_id(&id)?;

    let deleted = state
        .repository
        .delete(id)
        .await
        .map_err(|e| AppError::from_store(e, MSG_DELETE_FAILED))?;

    info!("커미션 삭제: id={} ({})", deleted, user.username);

    Ok(Json(DeleteResponse {
        success: true,
        id: deleted,
    }))
}

/// CSV 내보내기 핸들러
pub async fn export_commissions(State(state): State<ServerState>) -> AppResult<Response> {
    let commissions = state
        .repository
        .list(StatusFilter::All)
        .await
        .map_err(|e| AppError::from_store(e, MSG_EXPORT_FAILED))?;

    let csv = to_csv(&commissions, &state.export_offset);
    info!("CSV 내보내기: {}건", commissions.len());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", EXPORT_FILENAME),
            ),
        ],
        csv,
    )
        .into_response())
}

/// 알 수 없는 API 경로
pub async fn api_not_found() -> AppError {
    AppError::NotFound(MSG_ROUTE_NOT_FOUND.to_string())
}
