use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapter::presenter::response::{ErrorDetail, ErrorResponse};
use crate::usecase::change_approval::ChangeApprovalError;
use crate::usecase::edit_table::EditTableError;
use crate::usecase::list_rows::ListRowsError;
use crate::usecase::notifications::NotificationsError;
use crate::usecase::schema_registry::SchemaRegistryError;
use crate::usecase::version_tracking::VersionTrackingError;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn not_found(code: &str, message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn bad_request(code: &str, message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn conflict(code: &str, message: &str) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn unauthorized(code: &str, message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, message)
    }

    pub fn unprocessable(code: &str, message: &str) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, code, message)
    }

    pub fn unavailable(code: &str, message: &str) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, code, message)
    }

    pub fn internal(code: &str, message: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                request_id: uuid::Uuid::new_v4().to_string(),
                details: self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ListRowsError> for AppError {
    fn from(err: ListRowsError) -> Self {
        match err {
            ListRowsError::Validation(msg) => Self::bad_request("SYS_BO_VALIDATION_FAILED", &msg),
            ListRowsError::Unavailable(table) => Self::unavailable(
                "SYS_BO_STORE_UNAVAILABLE",
                &format!("store for table '{}' is not available", table),
            ),
            ListRowsError::Internal(msg) => Self::internal("SYS_BO_INTERNAL_ERROR", &msg),
        }
    }
}

impl From<SchemaRegistryError> for AppError {
    fn from(err: SchemaRegistryError) -> Self {
        let msg = err.to_string();
        match err {
            SchemaRegistryError::NotLoaded(_) => {
                Self::unavailable("SYS_BO_SCHEMA_NOT_LOADED", &msg)
            }
            SchemaRegistryError::ColumnNotFound(_) => {
                Self::not_found("SYS_BO_COLUMN_NOT_FOUND", &msg)
            }
            SchemaRegistryError::DuplicateColumn(_) => {
                Self::conflict("SYS_BO_DUPLICATE_COLUMN", &msg)
            }
            SchemaRegistryError::Validation(_) => Self::bad_request("SYS_BO_VALIDATION_FAILED", &msg),
        }
    }
}

impl From<EditTableError> for AppError {
    fn from(err: EditTableError) -> Self {
        let msg = err.to_string();
        match err {
            EditTableError::TableNotFound(_) => Self::unavailable("SYS_BO_SCHEMA_NOT_LOADED", &msg),
            EditTableError::RowNotFound(_) => Self::not_found("SYS_BO_ROW_NOT_FOUND", &msg),
            EditTableError::VersionNotFound(_) => Self::not_found("SYS_BO_VERSION_NOT_FOUND", &msg),
            EditTableError::Validation(violations) => {
                Self::unprocessable("SYS_BO_VALIDATION_FAILED", &msg)
                    .with_details(serde_json::json!(violations))
            }
            EditTableError::Unavailable(_) => Self::unavailable("SYS_BO_STORE_UNAVAILABLE", &msg),
            EditTableError::Internal(_) => Self::internal("SYS_BO_INTERNAL_ERROR", &msg),
        }
    }
}

impl From<VersionTrackingError> for AppError {
    fn from(err: VersionTrackingError) -> Self {
        let msg = err.to_string();
        match err {
            VersionTrackingError::NotFound(_) => Self::not_found("SYS_BO_VERSION_NOT_FOUND", &msg),
            VersionTrackingError::Internal(_) => Self::internal("SYS_BO_INTERNAL_ERROR", &msg),
        }
    }
}

impl From<ChangeApprovalError> for AppError {
    fn from(err: ChangeApprovalError) -> Self {
        let msg = err.to_string();
        match err {
            ChangeApprovalError::NotFound(_) => {
                Self::not_found("SYS_BO_CHANGE_REQUEST_NOT_FOUND", &msg)
            }
            ChangeApprovalError::Validation(_) => Self::bad_request("SYS_BO_VALIDATION_FAILED", &msg),
            ChangeApprovalError::InvalidFields(violations) => {
                Self::unprocessable("SYS_BO_VALIDATION_FAILED", &msg)
                    .with_details(serde_json::json!(violations))
            }
            ChangeApprovalError::InvalidStatus { .. } => {
                Self::conflict("SYS_BO_INVALID_STATUS", &msg)
            }
            ChangeApprovalError::ApplyFailed { .. } => Self::conflict("SYS_BO_APPLY_FAILED", &msg),
            ChangeApprovalError::Internal(_) => Self::internal("SYS_BO_INTERNAL_ERROR", &msg),
        }
    }
}

impl From<NotificationsError> for AppError {
    fn from(err: NotificationsError) -> Self {
        let msg = err.to_string();
        match err {
            NotificationsError::Validation(_) => Self::bad_request("SYS_BO_VALIDATION_FAILED", &msg),
            NotificationsError::Internal(_) => Self::internal("SYS_BO_INTERNAL_ERROR", &msg),
        }
    }
}
