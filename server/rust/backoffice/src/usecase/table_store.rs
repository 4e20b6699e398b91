use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::domain::entity::column_definition::ColumnDefinition;
use crate::domain::entity::row::Row;
use crate::domain::entity::table_binding::TableBinding;
use crate::domain::entity::table_event::{TableEvent, TableOperation};
use crate::domain::repository::RowStore;
use crate::domain::value_object::StorageBackend;
use crate::infrastructure::event_bus::TableEventBus;

/// TableStoreError はテーブルデータストア操作のエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum TableStoreError {
    #[error("remote store is not configured for table: {0}")]
    RemoteUnavailable(String),

    #[error("row not found: {0}")]
    RowNotFound(String),

    #[error("store error: {0}")]
    Store(String),
}

/// TableStore は論理テーブルごとのバインディングに従ってリモート / ローカルの
/// RowStore に処理を振り分けるアダプタ。
/// 変更に成功するたびに TableChanged をイベントバスへ配信する。
pub struct TableStore {
    bindings: HashMap<String, TableBinding>,
    default_backend: StorageBackend,
    remote: Option<Arc<dyn RowStore>>,
    local: Arc<dyn RowStore>,
    event_bus: Arc<TableEventBus>,
}

impl TableStore {
    pub fn new(
        bindings: HashMap<String, TableBinding>,
        default_backend: StorageBackend,
        remote: Option<Arc<dyn RowStore>>,
        local: Arc<dyn RowStore>,
        event_bus: Arc<TableEventBus>,
    ) -> Self {
        Self {
            bindings,
            default_backend,
            remote,
            local,
            event_bus,
        }
    }

    /// テーブルのバインディングを返す。未登録のテーブルは既定バックエンドで扱う。
    pub fn binding(&self, table_id: &str) -> TableBinding {
        self.bindings
            .get(table_id)
            .cloned()
            .unwrap_or_else(|| TableBinding::with_backend(table_id, self.default_backend))
    }

    fn backend(&self, binding: &TableBinding) -> Result<&Arc<dyn RowStore>, TableStoreError> {
        match binding.backend {
            StorageBackend::Local => Ok(&self.local),
            StorageBackend::Remote => self
                .remote
                .as_ref()
                .ok_or_else(|| TableStoreError::RemoteUnavailable(binding.table_id.clone())),
        }
    }

    fn publish(&self, table_id: &str, operation: TableOperation) {
        self.event_bus.publish(TableEvent::TableChanged {
            table_id: table_id.to_string(),
            operation,
        });
    }

    pub async fn fetch(&self, table_id: &str) -> Result<Vec<Row>, TableStoreError> {
        let binding = self.binding(table_id);
        let store = self.backend(&binding)?;
        store.fetch(&binding).await.map_err(|e| {
            error!(table_id = %table_id, error = %e, "failed to fetch rows");
            TableStoreError::Store(e.to_string())
        })
    }

    pub async fn sample(&self, table_id: &str) -> Result<Option<Row>, TableStoreError> {
        let binding = self.binding(table_id);
        let store = self.backend(&binding)?;
        store
            .sample(&binding)
            .await
            .map_err(|e| TableStoreError::Store(e.to_string()))
    }

    pub async fn insert(
        &self,
        table_id: &str,
        columns: &[ColumnDefinition],
        row: &Row,
    ) -> Result<Row, TableStoreError> {
        let binding = self.binding(table_id);
        let store = self.backend(&binding)?;
        let inserted = store.insert(&binding, columns, row).await.map_err(|e| {
            error!(table_id = %table_id, error = %e, "failed to insert row");
            TableStoreError::Store(e.to_string())
        })?;
        info!(table_id = %table_id, backend = ?binding.backend, "row inserted");
        self.publish(table_id, TableOperation::Insert);
        Ok(inserted)
    }

    pub async fn update(&self, table_id: &str, id: &str, changes: &Row) -> Result<Row, TableStoreError> {
        let binding = self.binding(table_id);
        let store = self.backend(&binding)?;
        let updated = store.update(&binding, id, changes).await.map_err(|e| {
            let msg = e.to_string();
            if msg.contains("row not found") {
                TableStoreError::RowNotFound(id.to_string())
            } else {
                error!(table_id = %table_id, row_id = %id, error = %msg, "failed to update row");
                TableStoreError::Store(msg)
            }
        })?;
        info!(table_id = %table_id, row_id = %id, "row updated");
        self.publish(table_id, TableOperation::Update);
        Ok(updated)
    }

    pub async fn delete(&self, table_id: &str, ids: &[String]) -> Result<(), TableStoreError> {
        let binding = self.binding(table_id);
        let store = self.backend(&binding)?;
        store.delete(&binding, ids).await.map_err(|e| {
            error!(table_id = %table_id, error = %e, "failed to delete rows");
            TableStoreError::Store(e.to_string())
        })?;
        info!(table_id = %table_id, count = ids.len(), "rows deleted");
        self.publish(table_id, TableOperation::Delete);
        Ok(())
    }

    /// テーブル内容を rows で置き換える。リモートモードでは単一トランザクションで実行する。
    pub async fn replace_all(&self, table_id: &str, rows: &[Row]) -> Result<Vec<Row>, TableStoreError> {
        let binding = self.binding(table_id);
        let store = self.backend(&binding)?;
        let replaced = store.replace_all(&binding, rows).await.map_err(|e| {
            error!(table_id = %table_id, error = %e, "failed to replace rows");
            TableStoreError::Store(e.to_string())
        })?;
        info!(table_id = %table_id, count = replaced.len(), "table contents replaced");
        self.publish(table_id, TableOperation::Replace);
        Ok(replaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::local_row_store::LocalRowStore;
    use crate::infrastructure::persistence::memory_kv_store::InMemoryKeyValueStore;
    use serde_json::json;

    fn as_row(v: serde_json::Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    fn local_store(bus: Arc<TableEventBus>) -> TableStore {
        let local: Arc<dyn RowStore> =
            Arc::new(LocalRowStore::new(Arc::new(InMemoryKeyValueStore::new())));
        TableStore::new(HashMap::new(), StorageBackend::Local, None, local, bus)
    }

    #[test]
    fn test_binding_falls_back_to_default_backend() {
        let mut bindings = HashMap::new();
        bindings.insert("applications".to_string(), TableBinding::remote("applications"));
        let local: Arc<dyn RowStore> =
            Arc::new(LocalRowStore::new(Arc::new(InMemoryKeyValueStore::new())));
        let store = TableStore::new(
            bindings,
            StorageBackend::Local,
            None,
            local,
            Arc::new(TableEventBus::default()),
        );

        assert_eq!(store.binding("applications").backend, StorageBackend::Remote);
        assert_eq!(store.binding("documents").backend, StorageBackend::Local);
    }

    #[tokio::test]
    async fn test_remote_table_without_database_is_unavailable() {
        let mut bindings = HashMap::new();
        bindings.insert("applications".to_string(), TableBinding::remote("applications"));
        let local: Arc<dyn RowStore> =
            Arc::new(LocalRowStore::new(Arc::new(InMemoryKeyValueStore::new())));
        let store = TableStore::new(
            bindings,
            StorageBackend::Local,
            None,
            local,
            Arc::new(TableEventBus::default()),
        );

        let result = store.fetch("applications").await;
        assert!(matches!(result, Err(TableStoreError::RemoteUnavailable(_))));
    }

    #[tokio::test]
    async fn test_mutations_publish_table_changed() {
        let bus = Arc::new(TableEventBus::default());
        let mut rx = bus.subscribe();
        let store = local_store(bus);

        store
            .insert("documents", &[], &as_row(json!({"id": "D1"})))
            .await
            .unwrap();
        store
            .update("documents", "D1", &as_row(json!({"title": "x"})))
            .await
            .unwrap();
        store.delete("documents", &["D1".to_string()]).await.unwrap();

        let ops: Vec<TableOperation> = (0..3)
            .map(|_| match rx.try_recv().unwrap() {
                TableEvent::TableChanged { operation, .. } => operation,
                other => panic!("unexpected event: {:?}", other),
            })
            .collect();
        assert_eq!(
            ops,
            vec![TableOperation::Insert, TableOperation::Update, TableOperation::Delete]
        );
    }

    #[tokio::test]
    async fn test_failed_update_does_not_publish() {
        let bus = Arc::new(TableEventBus::default());
        let mut rx = bus.subscribe();
        let store = local_store(bus);

        let result = store
            .update("documents", "missing", &as_row(json!({"title": "x"})))
            .await;
        assert!(matches!(result, Err(TableStoreError::RowNotFound(id)) if id == "missing"));
        assert!(rx.try_recv().is_err());
    }
}
