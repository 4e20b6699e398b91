use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::entity::row::Row;
use crate::domain::entity::table_schema::TableSchema;
use crate::domain::entity::table_version::{CreateTableVersion, TableVersion};
use crate::domain::repository::TableVersionRepository;

/// VersionTrackingError はバージョン管理に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum VersionTrackingError {
    #[error("version not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// SaveVersionInput はスナップショット保存のリクエストを表す。
#[derive(Debug, Clone)]
pub struct SaveVersionInput<'a> {
    pub table_id: &'a str,
    pub rows: &'a [Row],
    pub description: &'a str,
    pub created_by: &'a str,
    pub schema: Option<&'a TableSchema>,
}

/// VersionTrackingUseCase はテーブルの全行スナップショットを採番して保存・復元する。
pub struct VersionTrackingUseCase {
    version_repo: Arc<dyn TableVersionRepository>,
    /// テーブルごとの保持件数。0 は無制限。
    max_versions: usize,
    // 採番から保存までを直列化する
    save_lock: Mutex<()>,
}

impl VersionTrackingUseCase {
    pub fn new(version_repo: Arc<dyn TableVersionRepository>, max_versions: usize) -> Self {
        Self {
            version_repo,
            max_versions,
            save_lock: Mutex::new(()),
        }
    }

    /// 行のディープコピーを次の番号で保存し、保持件数を超えた古いバージョンを削除する。
    /// 最初のバージョンは 1。
    pub async fn save_version(
        &self,
        input: SaveVersionInput<'_>,
    ) -> Result<TableVersion, VersionTrackingError> {
        let version = self.record_version(input).await?;
        self.enforce_retention(&version.table_id).await;
        Ok(version)
    }

    /// 行のディープコピーを次の番号で保存する。保持件数の調整は行わない。
    /// 後続の変更が失敗した場合は discard_version で取り消す。
    pub async fn record_version(
        &self,
        input: SaveVersionInput<'_>,
    ) -> Result<TableVersion, VersionTrackingError> {
        let _guard = self.save_lock.lock().await;

        let latest = self
            .version_repo
            .find_by_table(input.table_id)
            .await
            .map_err(|e| VersionTrackingError::Internal(e.to_string()))?
            .iter()
            .map(|v| v.version_number)
            .max()
            .unwrap_or(0);

        let version = TableVersion::new(CreateTableVersion {
            table_id: input.table_id.to_string(),
            version_number: latest + 1,
            created_by: input.created_by.to_string(),
            description: input.description.to_string(),
            data: input.rows.to_vec(),
            schema_snapshot: input.schema.cloned(),
        });

        self.version_repo
            .create(&version)
            .await
            .map_err(|e| VersionTrackingError::Internal(e.to_string()))?;
        info!(
            table_id = %version.table_id,
            version_number = version.version_number,
            rows = version.data.len(),
            "table version saved"
        );
        Ok(version)
    }

    /// 反映されなかった変更のスナップショットを取り消す。
    pub async fn discard_version(
        &self,
        table_id: &str,
        version_id: &Uuid,
    ) -> Result<(), VersionTrackingError> {
        let _guard = self.save_lock.lock().await;
        let removed = self
            .version_repo
            .delete(table_id, version_id)
            .await
            .map_err(|e| VersionTrackingError::Internal(e.to_string()))?;
        if removed {
            info!(table_id = %table_id, version_id = %version_id, "table version discarded");
        }
        Ok(())
    }

    /// 保持件数を超えた古いバージョンを削除する。失敗は警告のみ。
    pub async fn enforce_retention(&self, table_id: &str) {
        if self.max_versions == 0 {
            return;
        }
        let _guard = self.save_lock.lock().await;
        match self.version_repo.prune(table_id, self.max_versions).await {
            Ok(0) => {}
            Ok(removed) => info!(table_id = %table_id, removed, "old table versions pruned"),
            Err(e) => warn!(table_id = %table_id, error = %e, "failed to prune table versions"),
        }
    }

    /// バージョンの行データのコピーを返す。新しいバージョンは作成しない。
    pub async fn restore_version(
        &self,
        table_id: &str,
        version_id: &Uuid,
    ) -> Result<Vec<Row>, VersionTrackingError> {
        Ok(self.get_version(table_id, version_id).await?.data)
    }

    pub async fn get_version(
        &self,
        table_id: &str,
        version_id: &Uuid,
    ) -> Result<TableVersion, VersionTrackingError> {
        self.version_repo
            .find_by_id(table_id, version_id)
            .await
            .map_err(|e| VersionTrackingError::Internal(e.to_string()))?
            .ok_or_else(|| VersionTrackingError::NotFound(version_id.to_string()))
    }

    /// 新しい順のバージョン一覧。
    pub async fn list_versions(&self, table_id: &str) -> Result<Vec<TableVersion>, VersionTrackingError> {
        let mut versions = self
            .version_repo
            .find_by_table(table_id)
            .await
            .map_err(|e| VersionTrackingError::Internal(e.to_string()))?;
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }
}
