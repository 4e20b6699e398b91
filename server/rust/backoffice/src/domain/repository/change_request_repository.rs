use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entity::change_request::ChangeRequest;
use crate::domain::value_object::ChangeStatus;

/// ChangeRequestRepository は変更申請と変更明細の永続化のためのリポジトリトレイト。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChangeRequestRepository: Send + Sync {
    /// ID で変更申請を明細ごと取得する。
    async fn find_by_id(&self, id: &Uuid) -> anyhow::Result<Option<ChangeRequest>>;

    /// 申請者の PENDING 状態の申請を取得する。
    async fn find_pending_by_creator(&self, created_by: &str) -> anyhow::Result<Option<ChangeRequest>>;

    /// 状態で絞り込んだ申請一覧を作成日時の古い順に取得する。
    async fn find_by_status(&self, status: ChangeStatus) -> anyhow::Result<Vec<ChangeRequest>>;

    /// 申請者の申請一覧を作成日時の古い順に取得する。
    async fn find_by_creator(&self, created_by: &str) -> anyhow::Result<Vec<ChangeRequest>>;

    /// 申請を明細ごと保存する。既存の申請は状態と明細を上書きする。
    async fn save(&self, request: &ChangeRequest) -> anyhow::Result<()>;
}
