use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::actor::Actor;
use super::error::AppError;
use super::AppState;
use crate::adapter::presenter::response::{ApplyResponse, ListResponse, NotificationList};
use crate::domain::entity::change_request::ChangeRequest;
use crate::domain::entity::row::Row;
use crate::usecase::change_approval::SubmitChangeInput;

#[derive(Debug, Deserialize)]
pub struct SubmitChangeRequest {
    pub table_id: String,
    pub row_id: String,
    pub proposed_changes: Row,
}

pub async fn submit_change(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<SubmitChangeRequest>,
) -> impl IntoResponse {
    let input = SubmitChangeInput {
        actor: actor.id,
        table_id: req.table_id,
        row_id: req.row_id,
        proposed_changes: req.proposed_changes,
    };
    match state.change_approval_uc.submit_change(input).await {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

pub async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<ChangeRequest>>, AppError> {
    let pending = state
        .change_approval_uc
        .get_pending_requests_for_reviewer()
        .await?;
    Ok(Json(pending.into()))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChangeRequest>, AppError> {
    Ok(Json(state.change_approval_uc.get_request(&id).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<ChangeRequest>, AppError> {
    Ok(Json(state.change_approval_uc.approve(&id, &actor.id).await?))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<ChangeRequest>, AppError> {
    Ok(Json(state.change_approval_uc.reject(&id, &actor.id).await?))
}

pub async fn apply(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<ApplyResponse>, AppError> {
    let outcome = state.change_approval_uc.apply_approved(&id, &actor.id).await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Deserialize)]
pub struct RecordDeploymentRequest {
    pub deployment_version_id: String,
}

pub async fn record_deployment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(req): Json<RecordDeploymentRequest>,
) -> Result<Json<ChangeRequest>, AppError> {
    let request = state
        .change_approval_uc
        .record_deployment(&id, &req.deployment_version_id, &actor.id)
        .await?;
    Ok(Json(request))
}

pub async fn list_notifications(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<NotificationList>, AppError> {
    let role = actor.role.ok_or_else(|| {
        AppError::bad_request("SYS_BO_VALIDATION_FAILED", "X-Actor-Role header is required")
    })?;
    let notifications = state.notifications_uc.execute(&actor.id, role).await?;
    Ok(Json(notifications.into()))
}
