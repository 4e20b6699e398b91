use serde::Serialize;

use crate::domain::entity::change_request::ChangeRequest;
use crate::domain::entity::notification::Notification;
use crate::domain::entity::row::Row;
use crate::domain::entity::table_schema::TableSchema;
use crate::domain::entity::table_version::TableVersion;
use crate::usecase::change_approval::ApplyOutcome;
use crate::usecase::list_rows::RowPage;

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub records: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<TableSchema>,
}

impl PaginatedResponse<Row> {
    pub fn from_page(page: RowPage, schema: Option<TableSchema>) -> Self {
        Self {
            records: page.rows,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            schema,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T: Serialize> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

/// バージョン一覧ではスナップショット本体を返さず件数だけを返す。
#[derive(Debug, Serialize)]
pub struct VersionSummary {
    pub id: uuid::Uuid,
    pub table_id: String,
    pub version_number: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub created_by: String,
    pub description: String,
    pub row_count: usize,
}

impl From<TableVersion> for VersionSummary {
    fn from(v: TableVersion) -> Self {
        Self {
            id: v.id,
            table_id: v.table_id,
            version_number: v.version_number,
            created_at: v.created_at,
            created_by: v.created_by,
            description: v.description,
            row_count: v.data.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    pub request: ChangeRequest,
    pub applied: usize,
    pub skipped: usize,
}

impl From<ApplyOutcome> for ApplyResponse {
    fn from(outcome: ApplyOutcome) -> Self {
        Self {
            request: outcome.request,
            applied: outcome.applied,
            skipped: outcome.skipped,
        }
    }
}

pub type NotificationList = ListResponse<Notification>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
