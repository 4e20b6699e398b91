use std::sync::Arc;

use crate::domain::entity::change_request::ChangeRequest;
use crate::domain::entity::notification::{Notification, NotificationKind, ViewerRole};
use crate::domain::repository::ChangeRequestRepository;
use crate::domain::value_object::ChangeStatus;

/// NotificationsError は通知取得に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum NotificationsError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// NotificationsUseCase は変更申請の状態から閲覧者向けの通知を導出する。
/// 申請者には自分の申請の判定結果を、レビュアーには他者の PENDING 申請を返す。
pub struct NotificationsUseCase {
    change_repo: Arc<dyn ChangeRequestRepository>,
}

impl NotificationsUseCase {
    pub fn new(change_repo: Arc<dyn ChangeRequestRepository>) -> Self {
        Self { change_repo }
    }

    /// 新しい順の通知一覧を返す。
    pub async fn execute(&self, viewer: &str, role: ViewerRole) -> Result<Vec<Notification>, NotificationsError> {
        if viewer.is_empty() {
            return Err(NotificationsError::Validation("viewer is required".to_string()));
        }

        let mut notifications: Vec<Notification> = match role {
            ViewerRole::Submitter => self
                .change_repo
                .find_by_creator(viewer)
                .await
                .map_err(|e| NotificationsError::Internal(e.to_string()))?
                .iter()
                .filter_map(decision_notification)
                .collect(),
            ViewerRole::Reviewer => self
                .change_repo
                .find_by_status(ChangeStatus::Pending)
                .await
                .map_err(|e| NotificationsError::Internal(e.to_string()))?
                .iter()
                .filter(|r| r.created_by != viewer)
                .map(pending_notification)
                .collect(),
        };
        notifications.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(notifications)
    }
}

fn table_list(request: &ChangeRequest) -> String {
    request
        .table_schema_ids
        .iter()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

fn decision_notification(request: &ChangeRequest) -> Option<Notification> {
    let (kind, verb) = match request.status {
        ChangeStatus::Approved => (NotificationKind::RequestApproved, "approved"),
        ChangeStatus::Rejected => (NotificationKind::RequestRejected, "rejected"),
        ChangeStatus::Pending => return None,
    };
    let reviewer = request.reviewed_by.as_deref().unwrap_or("a reviewer");
    Some(Notification {
        request_id: request.id,
        kind,
        message: format!(
            "Your change request for {} was {} by {}",
            table_list(request),
            verb,
            reviewer
        ),
        occurred_at: request.reviewed_at.unwrap_or(request.created_at),
    })
}

fn pending_notification(request: &ChangeRequest) -> Notification {
    Notification {
        request_id: request.id,
        kind: NotificationKind::NewPendingRequest,
        message: format!(
            "{} submitted {} change(s) for {}",
            request.created_by,
            request.details.len(),
            table_list(request)
        ),
        occurred_at: request.created_at,
    }
}
