use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entity::table_version::TableVersion;

/// TableVersionRepository はテーブルスナップショットの永続化のためのリポジトリトレイト。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableVersionRepository: Send + Sync {
    /// テーブルのバージョン一覧を新しい順に取得する。
    async fn find_by_table(&self, table_id: &str) -> anyhow::Result<Vec<TableVersion>>;

    /// ID でバージョンを取得する。
    async fn find_by_id(&self, table_id: &str, version_id: &Uuid) -> anyhow::Result<Option<TableVersion>>;

    /// バージョンを追加する。既存バージョンは変更しない。
    async fn create(&self, version: &TableVersion) -> anyhow::Result<()>;

    /// バージョンを削除する。存在しなければ false を返す。
    async fn delete(&self, table_id: &str, version_id: &Uuid) -> anyhow::Result<bool>;

    /// 新しい方から keep 件を残して古いバージョンを削除し、削除件数を返す。
    async fn prune(&self, table_id: &str, keep: usize) -> anyhow::Result<usize>;
}
