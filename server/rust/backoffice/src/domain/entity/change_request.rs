use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::row::Row;
use crate::domain::value_object::ChangeStatus;

/// ChangeDetail は変更申請に含まれる 1 行分の変更提案。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDetail {
    pub id: Uuid,
    pub request_id: Uuid,
    pub table_id: String,
    pub original_row_id: String,
    pub proposed_changes: Row,
    pub status: ChangeStatus,
    /// 承認後に実テーブルへ反映済みかどうか。
    #[serde(default)]
    pub applied: bool,
}

/// ChangeRequest はレビュー対象となる変更申請を表すドメインエンティティ。
/// 申請単位の status が実テーブルへの反映可否を決める。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: Uuid,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub status: ChangeStatus,
    pub table_schema_ids: BTreeSet<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub deployment_version_id: Option<String>,
    pub details: Vec<ChangeDetail>,
}

impl ChangeRequest {
    pub fn new(created_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            status: ChangeStatus::Pending,
            table_schema_ids: BTreeSet::new(),
            reviewed_at: None,
            reviewed_by: None,
            deployment_version_id: None,
            details: Vec::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ChangeStatus::Pending
    }

    /// 変更明細を追加し、対象テーブル ID を記録する。
    pub fn add_detail(&mut self, table_id: &str, row_id: &str, proposed_changes: Row) -> &ChangeDetail {
        self.table_schema_ids.insert(table_id.to_string());
        self.details.push(ChangeDetail {
            id: Uuid::new_v4(),
            request_id: self.id,
            table_id: table_id.to_string(),
            original_row_id: row_id.to_string(),
            proposed_changes,
            status: ChangeStatus::Pending,
            applied: false,
        });
        &self.details[self.details.len() - 1]
    }

    /// PENDING → APPROVED。終端状態からは遷移せず false を返す。
    pub fn approve(&mut self, reviewer: &str) -> bool {
        self.decide(ChangeStatus::Approved, reviewer)
    }

    /// PENDING → REJECTED。終端状態からは遷移せず false を返す。
    pub fn reject(&mut self, reviewer: &str) -> bool {
        self.decide(ChangeStatus::Rejected, reviewer)
    }

    fn decide(&mut self, status: ChangeStatus, reviewer: &str) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.reviewed_at = Some(Utc::now());
        self.reviewed_by = Some(reviewer.to_string());
        for detail in &mut self.details {
            if detail.status == ChangeStatus::Pending {
                detail.status = status;
            }
        }
        true
    }
}
