use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::actor::Actor;
use super::error::AppError;
use super::AppState;
use crate::adapter::presenter::response::{ListResponse, VersionSummary};
use crate::domain::entity::row::Row;
use crate::domain::entity::table_version::TableVersion;
use crate::usecase::edit_table::EditContext;

pub async fn list_versions(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
) -> Result<Json<ListResponse<VersionSummary>>, AppError> {
    let versions = state.versions_uc.list_versions(&table_id).await?;
    let summaries: Vec<VersionSummary> = versions.into_iter().map(VersionSummary::from).collect();
    Ok(Json(summaries.into()))
}

pub async fn get_version(
    State(state): State<AppState>,
    Path((table_id, version_id)): Path<(String, Uuid)>,
) -> Result<Json<TableVersion>, AppError> {
    Ok(Json(state.versions_uc.get_version(&table_id, &version_id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct RestoreVersionQuery {
    pub description: Option<String>,
}

/// バージョンの内容でテーブルを置き換える。置き換え前の状態は新しいバージョンとして残る。
pub async fn restore_version(
    State(state): State<AppState>,
    Path((table_id, version_id)): Path<(String, Uuid)>,
    actor: Actor,
    Query(query): Query<RestoreVersionQuery>,
) -> Result<Json<Vec<Row>>, AppError> {
    let mut ctx = EditContext::new(actor.id);
    if let Some(description) = query.description {
        ctx = ctx.with_description(description);
    }
    let rows = state
        .edit_table_uc
        .restore_version(&table_id, &version_id, &ctx)
        .await?;
    Ok(Json(rows))
}
