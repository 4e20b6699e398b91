use async_trait::async_trait;

use crate::domain::entity::column_definition::ColumnDefinition;
use crate::domain::entity::row::Row;
use crate::domain::entity::table_binding::TableBinding;

/// RowStore は論理テーブルの行データを保持するバックエンドのトレイト。
/// リモート (PostgreSQL) とローカル (永続キー・バリューストア) の 2 実装がある。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RowStore: Send + Sync {
    /// 全行を取得する。binding.default_order_column があれば降順で並べる。
    async fn fetch(&self, binding: &TableBinding) -> anyhow::Result<Vec<Row>>;

    /// スキーマ推定用に 1 行だけ取得する。空テーブルなら None。
    async fn sample(&self, binding: &TableBinding) -> anyhow::Result<Option<Row>>;

    /// 行を追加して保存後の行を返す。columns はローカルモードでの既定値補完に使う。
    async fn insert(
        &self,
        binding: &TableBinding,
        columns: &[ColumnDefinition],
        row: &Row,
    ) -> anyhow::Result<Row>;

    /// 主キー id の行に部分更新を適用して更新後の行を返す。
    async fn update(&self, binding: &TableBinding, id: &str, changes: &Row) -> anyhow::Result<Row>;

    /// 指定 ID の行を削除する。
    async fn delete(&self, binding: &TableBinding, ids: &[String]) -> anyhow::Result<()>;

    /// テーブル内容を rows で置き換える（バージョン復元用）。
    async fn replace_all(&self, binding: &TableBinding, rows: &[Row]) -> anyhow::Result<Vec<Row>>;
}
