use uuid::Uuid;

use crate::domain::value_object::ChangeStatus;

/// TableOperation はテーブルに適用された変更の種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOperation {
    Insert,
    Update,
    Delete,
    Replace,
}

/// TableEvent はイベントバス経由で配信される変更通知。
/// 受信側は差分を適用せず、通知を再取得のきっかけとして扱う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    TableChanged {
        table_id: String,
        operation: TableOperation,
    },
    /// 永続ローカルストアのキーが更新された（ブラウザの storage イベント相当）。
    StorageChanged { key: String },
    ChangeRequestUpdated {
        request_id: Uuid,
        status: ChangeStatus,
    },
}

impl TableEvent {
    /// このイベントが指定テーブルの再取得を要求するかどうか。
    pub fn affects_table(&self, table_id: &str) -> bool {
        match self {
            Self::TableChanged { table_id: t, .. } => t == table_id,
            Self::StorageChanged { key } => key.strip_prefix("table:") == Some(table_id),
            Self::ChangeRequestUpdated { .. } => false,
        }
    }
}
