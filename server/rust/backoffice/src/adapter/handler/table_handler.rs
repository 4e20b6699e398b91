use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::actor::Actor;
use super::error::AppError;
use super::AppState;
use crate::adapter::presenter::response::PaginatedResponse;
use crate::domain::entity::column_definition::ColumnDefinition;
use crate::domain::entity::row::Row;
use crate::domain::entity::sort_key::SortKey;
use crate::domain::entity::table_filter::TableFilter;
use crate::domain::entity::table_schema::TableSchema;
use crate::usecase::edit_table::EditContext;
use crate::usecase::list_rows::ListRowsInput;

pub async fn healthz() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let Some(pool) = &state.db_pool else {
        return (
            StatusCode::OK,
            Json(json!({"status": "ready", "checks": {"database": "not_configured"}})),
        );
    };
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({"status": "ready", "checks": {"database": "ok"}})),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not_ready", "checks": {"database": e.to_string()}})),
        ),
    }
}

fn schema_not_loaded(table_id: &str) -> AppError {
    AppError::unavailable(
        "SYS_BO_SCHEMA_NOT_LOADED",
        &format!("schema for table '{}' is not yet loadable", table_id),
    )
}

/// 編集系操作の前にスキーマをキャッシュへ読み込む。
async fn ensure_schema(state: &AppState, table_id: &str) -> Result<TableSchema, AppError> {
    state
        .registry
        .get_schema(table_id)
        .await
        .ok_or_else(|| schema_not_loaded(table_id))
}

pub async fn get_schema(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
) -> Result<Json<TableSchema>, AppError> {
    Ok(Json(ensure_schema(&state, &table_id).await?))
}

pub async fn refresh_schema(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    actor: Actor,
) -> Result<Json<TableSchema>, AppError> {
    info!(table_id = %table_id, actor = %actor.id, "schema refresh requested");
    state
        .registry
        .refresh_schema(&table_id)
        .await
        .map(Json)
        .ok_or_else(|| schema_not_loaded(&table_id))
}

pub async fn replace_schema(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    actor: Actor,
    Json(mut schema): Json<TableSchema>,
) -> Result<Json<TableSchema>, AppError> {
    schema.id = table_id;
    state.registry.update_schema(schema.clone())?;
    info!(table_id = %schema.id, actor = %actor.id, "schema replaced");
    Ok(Json(schema))
}

pub async fn add_column(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    actor: Actor,
    Json(column): Json<ColumnDefinition>,
) -> Result<(StatusCode, Json<TableSchema>), AppError> {
    ensure_schema(&state, &table_id).await?;
    let column_key = column.key.clone();
    let schema = state.registry.add_column(&table_id, column)?;
    info!(table_id = %table_id, column = %column_key, actor = %actor.id, "column added");
    Ok((StatusCode::CREATED, Json(schema)))
}

pub async fn update_column(
    State(state): State<AppState>,
    Path((table_id, column_key)): Path<(String, String)>,
    actor: Actor,
    Json(column): Json<ColumnDefinition>,
) -> Result<Json<TableSchema>, AppError> {
    ensure_schema(&state, &table_id).await?;
    let schema = state.registry.update_column(&table_id, &column_key, column)?;
    info!(table_id = %table_id, column = %column_key, actor = %actor.id, "column updated");
    Ok(Json(schema))
}

pub async fn remove_column(
    State(state): State<AppState>,
    Path((table_id, column_key)): Path<(String, String)>,
    actor: Actor,
) -> Result<Json<TableSchema>, AppError> {
    ensure_schema(&state, &table_id).await?;
    let schema = state.registry.remove_column(&table_id, &column_key)?;
    info!(table_id = %table_id, column = %column_key, actor = %actor.id, "column removed");
    Ok(Json(schema))
}

#[derive(Debug, Deserialize)]
pub struct ListRowsQuery {
    /// TableFilter 配列の JSON 文字列
    pub filters: Option<String>,
    /// "name,-created_at" 形式
    pub sort: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl ListRowsQuery {
    fn into_input(self, table_id: String) -> Result<ListRowsInput, AppError> {
        let filters = match self.filters.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(raw) => serde_json::from_str::<Vec<TableFilter>>(raw).map_err(|e| {
                AppError::bad_request(
                    "SYS_BO_VALIDATION_FAILED",
                    &format!("invalid filters parameter: {}", e),
                )
            })?,
        };
        let sort = self
            .sort
            .as_deref()
            .map(SortKey::parse_list)
            .unwrap_or_default();
        Ok(ListRowsInput {
            table_id,
            filters,
            sort,
            page: self.page,
            page_size: self.page_size,
        })
    }
}

pub async fn list_rows(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    Query(query): Query<ListRowsQuery>,
) -> Result<Json<PaginatedResponse<Row>>, AppError> {
    let input = query.into_input(table_id)?;
    let page = state.list_rows_uc.execute(&input).await?;
    let schema = state.registry.get_schema(&input.table_id).await;
    Ok(Json(PaginatedResponse::from_page(page, schema)))
}

pub async fn insert_row(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    actor: Actor,
    Json(row): Json<Row>,
) -> impl IntoResponse {
    let ctx = EditContext::new(actor.id);
    match state.edit_table_uc.insert_row(&table_id, &row, &ctx).await {
        Ok(inserted) => (StatusCode::CREATED, Json(inserted)).into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

pub async fn update_row(
    State(state): State<AppState>,
    Path((table_id, row_id)): Path<(String, String)>,
    actor: Actor,
    Json(changes): Json<Row>,
) -> Result<Json<Row>, AppError> {
    let ctx = EditContext::new(actor.id);
    let updated = state
        .edit_table_uc
        .update_row(&table_id, &row_id, &changes, &ctx)
        .await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct DeleteRowsRequest {
    pub ids: Vec<String>,
}

pub async fn delete_rows(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    actor: Actor,
    Json(req): Json<DeleteRowsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ctx = EditContext::new(actor.id);
    let deleted = state
        .edit_table_uc
        .delete_rows(&table_id, &req.ids, &ctx)
        .await?;
    Ok(Json(json!({"deleted": deleted})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parses_filters_and_sort() {
        let query = ListRowsQuery {
            filters: Some(
                r#"[{"columnKey":"name","type":"text","operator":"contains","value":"ac"}]"#
                    .to_string(),
            ),
            sort: Some("name,-amount".to_string()),
            page: Some(2),
            page_size: Some(10),
        };
        let input = query.into_input("users".to_string()).unwrap();
        assert_eq!(input.filters.len(), 1);
        assert_eq!(input.filters[0].column_key, "name");
        assert_eq!(input.sort, vec![SortKey::asc("name"), SortKey::desc("amount")]);
        assert_eq!(input.page, Some(2));
    }

    #[test]
    fn test_query_rejects_malformed_filters() {
        let query = ListRowsQuery {
            filters: Some("not json".to_string()),
            sort: None,
            page: None,
            page_size: None,
        };
        let err = query.into_input("users".to_string()).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_empty_query_means_no_filters() {
        let query = ListRowsQuery {
            filters: Some("  ".to_string()),
            sort: None,
            page: None,
            page_size: None,
        };
        let input = query.into_input("users".to_string()).unwrap();
        assert!(input.filters.is_empty());
        assert!(input.sort.is_empty());
    }
}
