pub mod actor;
pub mod change_request_handler;
pub mod error;
pub mod table_handler;
pub mod version_handler;

use std::sync::Arc;

use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::usecase::{
    ChangeApprovalUseCase, EditTableUseCase, ListRowsUseCase, NotificationsUseCase,
    SchemaRegistry, VersionTrackingUseCase,
};

/// AppState はハンドラ間で共有するユースケース群を保持する。
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SchemaRegistry>,
    pub list_rows_uc: Arc<ListRowsUseCase>,
    pub edit_table_uc: Arc<EditTableUseCase>,
    pub versions_uc: Arc<VersionTrackingUseCase>,
    pub change_approval_uc: Arc<ChangeApprovalUseCase>,
    pub notifications_uc: Arc<NotificationsUseCase>,
    /// リモートストアを使わない構成では None。
    pub db_pool: Option<sqlx::PgPool>,
}

/// REST API のルーターを構築する。
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(table_handler::healthz))
        .route("/readyz", get(table_handler::readyz))
        // スキーマ
        .route(
            "/api/v1/tables/{table_id}/schema",
            get(table_handler::get_schema).put(table_handler::replace_schema),
        )
        .route(
            "/api/v1/tables/{table_id}/schema/refresh",
            post(table_handler::refresh_schema),
        )
        .route(
            "/api/v1/tables/{table_id}/schema/columns",
            post(table_handler::add_column),
        )
        .route(
            "/api/v1/tables/{table_id}/schema/columns/{column_key}",
            put(table_handler::update_column).delete(table_handler::remove_column),
        )
        // 行
        .route(
            "/api/v1/tables/{table_id}/rows",
            get(table_handler::list_rows)
                .post(table_handler::insert_row)
                .delete(table_handler::delete_rows),
        )
        .route(
            "/api/v1/tables/{table_id}/rows/{row_id}",
            patch(table_handler::update_row),
        )
        // バージョン
        .route(
            "/api/v1/tables/{table_id}/versions",
            get(version_handler::list_versions),
        )
        .route(
            "/api/v1/tables/{table_id}/versions/{version_id}",
            get(version_handler::get_version),
        )
        .route(
            "/api/v1/tables/{table_id}/versions/{version_id}/restore",
            post(version_handler::restore_version),
        )
        // 変更申請
        .route(
            "/api/v1/change-requests",
            post(change_request_handler::submit_change),
        )
        .route(
            "/api/v1/change-requests/pending",
            get(change_request_handler::list_pending),
        )
        .route(
            "/api/v1/change-requests/{id}",
            get(change_request_handler::get_request),
        )
        .route(
            "/api/v1/change-requests/{id}/approve",
            post(change_request_handler::approve),
        )
        .route(
            "/api/v1/change-requests/{id}/reject",
            post(change_request_handler::reject),
        )
        .route(
            "/api/v1/change-requests/{id}/apply",
            post(change_request_handler::apply),
        )
        .route(
            "/api/v1/change-requests/{id}/deployment",
            post(change_request_handler::record_deployment),
        )
        .route(
            "/api/v1/notifications",
            get(change_request_handler::list_notifications),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
