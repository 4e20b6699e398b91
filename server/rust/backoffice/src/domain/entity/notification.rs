use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ViewerRole は通知を閲覧するユーザーの役割。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerRole {
    Submitter,
    Reviewer,
}

impl ViewerRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "submitter" => Some(Self::Submitter),
            "reviewer" => Some(Self::Reviewer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewPendingRequest,
    RequestApproved,
    RequestRejected,
}

/// Notification は変更申請から導出される通知。永続化はしない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub request_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}
