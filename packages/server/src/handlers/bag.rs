use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::storage::{BagId, FileId};
use tracing::instrument;

use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::bag::*;
use crate::service::CreateOptions;
use crate::state::AppState;

fn parse_bag_id(raw: &str) -> Result<BagId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("Invalid bag id '{raw}'")))
}

#[instrument(skip(state, auth_user, payload), fields(user = %auth_user.user_id, file_id = payload.file_id))]
pub async fn create_bag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateBagRequest>,
) -> Result<impl IntoResponse, AppError> {
    let options = CreateOptions {
        hash: payload.algorithm()?,
        emit_event: true,
    };
    let file_id = FileId(payload.file_id);

    let _lock = state.locks.lock_file(&auth_user.user_id, file_id).await;
    let record = state
        .manager
        .create_with(&auth_user.user_id, file_id, options)
        .await?;

    Ok((StatusCode::CREATED, Json(BagResponse::from(record))))
}

#[instrument(skip(state, auth_user), fields(user = %auth_user.user_id))]
pub async fn list_bags(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<BagListResponse>, AppError> {
    let bags = state.manager.list(&auth_user.user_id).await?;
    Ok(Json(BagListResponse {
        total: bags.len(),
        bags,
    }))
}

#[instrument(skip(state, auth_user), fields(user = %auth_user.user_id))]
pub async fn storage_summary(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<StorageSummaryResponse>, AppError> {
    let root = state.manager.storage_summary(&auth_user.user_id).await?;
    Ok(Json(root.into()))
}

#[instrument(skip(state, auth_user), fields(user = %auth_user.user_id))]
pub async fn get_bag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(bag_id): Path<String>,
) -> Result<Json<BagRecordListResponse>, AppError> {
    let bag_id = parse_bag_id(&bag_id)?;
    let records = state
        .manager
        .find_by_bag_id(&auth_user.user_id, bag_id)
        .await?;
    Ok(Json(records.into()))
}

#[instrument(skip(state, auth_user), fields(user = %auth_user.user_id))]
pub async fn delete_bag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(bag_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let bag_id = parse_bag_id(&bag_id)?;

    let _lock = state.locks.lock_bag(&auth_user.user_id, bag_id).await;
    state
        .manager
        .delete(&auth_user.user_id, bag_id, true)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, auth_user), fields(user = %auth_user.user_id))]
pub async fn get_file_bags(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<i64>,
) -> Result<Json<BagRecordListResponse>, AppError> {
    let records = state
        .manager
        .find_by_file_id(&auth_user.user_id, FileId(file_id))
        .await?;
    Ok(Json(records.into()))
}

#[instrument(skip(state, auth_user), fields(user = %auth_user.user_id))]
pub async fn update_bag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<i64>,
) -> Result<Json<BagResponse>, AppError> {
    let file_id = FileId(file_id);

    let _lock = state.locks.lock_file(&auth_user.user_id, file_id).await;
    let record = state.manager.update(&auth_user.user_id, file_id).await?;

    Ok(Json(record.into()))
}

#[instrument(skip(state, auth_user), fields(user = %auth_user.user_id))]
pub async fn show_content(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<i64>,
) -> Result<Json<BagContentResponse>, AppError> {
    let file_id = FileId(file_id);
    let entries = state
        .manager
        .show_content(&auth_user.user_id, file_id)
        .await?;
    Ok(Json(BagContentResponse { file_id, entries }))
}

#[instrument(skip(state, auth_user), fields(user = %auth_user.user_id))]
pub async fn validate_bag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<i64>,
) -> Result<Json<ValidationResponse>, AppError> {
    let file_id = FileId(file_id);

    let _lock = state.locks.lock_file(&auth_user.user_id, file_id).await;
    let outcome = state.manager.validate(&auth_user.user_id, file_id).await?;

    Ok(Json(outcome.into()))
}
