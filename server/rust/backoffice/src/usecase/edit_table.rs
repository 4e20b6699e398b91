use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use super::schema_registry::SchemaRegistry;
use super::table_store::{TableStore, TableStoreError};
use super::version_tracking::{SaveVersionInput, VersionTrackingError, VersionTrackingUseCase};
use crate::domain::entity::row::{row_id, Row};
use crate::domain::entity::table_schema::TableSchema;
use crate::domain::entity::table_version::TableVersion;
use crate::domain::service::{FieldViolation, RowValidator};

/// EditTableError はテーブル編集に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum EditTableError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("row not found: {0}")]
    RowNotFound(String),

    #[error("version not found: {0}")]
    VersionNotFound(String),

    #[error("validation failed")]
    Validation(Vec<FieldViolation>),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TableStoreError> for EditTableError {
    fn from(e: TableStoreError) -> Self {
        match e {
            TableStoreError::RowNotFound(id) => Self::RowNotFound(id),
            TableStoreError::RemoteUnavailable(table) => Self::Unavailable(table),
            TableStoreError::Store(msg) => Self::Internal(msg),
        }
    }
}

impl From<VersionTrackingError> for EditTableError {
    fn from(e: VersionTrackingError) -> Self {
        match e {
            VersionTrackingError::NotFound(id) => Self::VersionNotFound(id),
            VersionTrackingError::Internal(msg) => Self::Internal(msg),
        }
    }
}

/// EditContext は編集操作の実行者とスナップショットの説明を表す。
#[derive(Debug, Clone)]
pub struct EditContext {
    pub actor: String,
    pub description: Option<String>,
}

impl EditContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn describe(&self, default: String) -> String {
        self.description.clone().unwrap_or(default)
    }
}

/// EditTableUseCase は検証・変更前スナップショット・ストア更新の順でテーブルを編集する。
/// スナップショットの保存に失敗した場合はテーブルを変更しない。
/// ストア更新に失敗した場合はスナップショットを取り消す。
pub struct EditTableUseCase {
    registry: Arc<SchemaRegistry>,
    store: Arc<TableStore>,
    versions: Arc<VersionTrackingUseCase>,
}

impl EditTableUseCase {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        store: Arc<TableStore>,
        versions: Arc<VersionTrackingUseCase>,
    ) -> Self {
        Self {
            registry,
            store,
            versions,
        }
    }

    async fn schema(&self, table_id: &str) -> Result<TableSchema, EditTableError> {
        self.registry
            .get_schema(table_id)
            .await
            .ok_or_else(|| EditTableError::TableNotFound(table_id.to_string()))
    }

    async fn snapshot(
        &self,
        table_id: &str,
        rows: &[Row],
        schema: &TableSchema,
        ctx: &EditContext,
        default_description: String,
    ) -> Result<TableVersion, EditTableError> {
        let description = ctx.describe(default_description);
        let version = self
            .versions
            .record_version(SaveVersionInput {
                table_id,
                rows,
                description: &description,
                created_by: &ctx.actor,
                schema: Some(schema),
            })
            .await?;
        Ok(version)
    }

    /// ストア更新の結果に応じてスナップショットを確定または取り消す。
    async fn settle<T>(
        &self,
        table_id: &str,
        version: &TableVersion,
        result: Result<T, TableStoreError>,
    ) -> Result<T, EditTableError> {
        match result {
            Ok(value) => {
                self.versions.enforce_retention(table_id).await;
                Ok(value)
            }
            Err(e) => {
                if let Err(discard) = self.versions.discard_version(table_id, &version.id).await {
                    warn!(
                        table_id = %table_id,
                        version_id = %version.id,
                        error = %discard,
                        "snapshot of failed edit was not discarded"
                    );
                }
                Err(e.into())
            }
        }
    }

    /// 変更案をスキーマに照らして検証する。ストアには触れない。
    pub async fn validate_changes(&self, table_id: &str, changes: &Row) -> Result<(), EditTableError> {
        let schema = self.schema(table_id).await?;
        let violations = RowValidator::validate_update(&schema, changes);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(EditTableError::Validation(violations))
        }
    }

    pub async fn insert_row(&self, table_id: &str, row: &Row, ctx: &EditContext) -> Result<Row, EditTableError> {
        let schema = self.schema(table_id).await?;
        let primary_key = self.store.binding(table_id).primary_key;
        let violations = RowValidator::validate_insert(&schema, &primary_key, row);
        if !violations.is_empty() {
            return Err(EditTableError::Validation(violations));
        }

        let current = self.store.fetch(table_id).await?;
        let version = self
            .snapshot(table_id, &current, &schema, ctx, "before insert".to_string())
            .await?;
        let result = self.store.insert(table_id, &schema.columns, row).await;
        self.settle(table_id, &version, result).await
    }

    pub async fn update_row(
        &self,
        table_id: &str,
        id: &str,
        changes: &Row,
        ctx: &EditContext,
    ) -> Result<Row, EditTableError> {
        let schema = self.schema(table_id).await?;
        let violations = RowValidator::validate_update(&schema, changes);
        if !violations.is_empty() {
            return Err(EditTableError::Validation(violations));
        }

        let primary_key = self.store.binding(table_id).primary_key;
        let current = self.store.fetch(table_id).await?;
        if !current
            .iter()
            .any(|r| row_id(r, &primary_key).as_deref() == Some(id))
        {
            return Err(EditTableError::RowNotFound(id.to_string()));
        }

        let version = self
            .snapshot(table_id, &current, &schema, ctx, format!("before update of row {}", id))
            .await?;
        let result = self.store.update(table_id, id, changes).await;
        self.settle(table_id, &version, result).await
    }

    /// 指定 ID の行を削除し、実際に存在した件数を返す。
    pub async fn delete_rows(
        &self,
        table_id: &str,
        ids: &[String],
        ctx: &EditContext,
    ) -> Result<usize, EditTableError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let schema = self.schema(table_id).await?;
        let primary_key = self.store.binding(table_id).primary_key;
        let current = self.store.fetch(table_id).await?;
        let existing = current
            .iter()
            .filter(|r| row_id(r, &primary_key).is_some_and(|rid| ids.contains(&rid)))
            .count();
        if existing == 0 {
            return Ok(0);
        }

        let version = self
            .snapshot(
                table_id,
                &current,
                &schema,
                ctx,
                format!("before delete of {} rows", existing),
            )
            .await?;
        let result = self.store.delete(table_id, ids).await;
        self.settle(table_id, &version, result).await?;
        Ok(existing)
    }

    /// 現在の行をスナップショットしてからバージョンの内容でテーブルを置き換える。
    pub async fn restore_version(
        &self,
        table_id: &str,
        version_id: &Uuid,
        ctx: &EditContext,
    ) -> Result<Vec<Row>, EditTableError> {
        let target = self.versions.get_version(table_id, version_id).await?;
        let schema = self.schema(table_id).await?;
        let current = self.store.fetch(table_id).await?;

        let version = self
            .snapshot(
                table_id,
                &current,
                &schema,
                ctx,
                format!("before restore of version {}", target.version_number),
            )
            .await?;
        let result = self.store.replace_all(table_id, &target.data).await;
        let restored = self.settle(table_id, &version, result).await?;

        if let Some(snapshot) = target.schema_snapshot {
            if let Err(e) = self.registry.update_schema(snapshot) {
                warn!(table_id = %table_id, error = %e, "schema snapshot was not restored");
            }
        }
        Ok(restored)
    }
}
