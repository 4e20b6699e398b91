use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use moka::sync::Cache;
use tracing::{info, warn};

use super::table_store::TableStore;
use crate::domain::entity::column_definition::ColumnDefinition;
use crate::domain::entity::table_schema::TableSchema;
use crate::domain::service::SchemaInferenceService;

/// SchemaRegistryError はキャッシュ上のスキーマ編集に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum SchemaRegistryError {
    #[error("schema not loaded: {0}")]
    NotLoaded(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("validation error: {0}")]
    Validation(String),
}

/// SchemaRegistry は論理テーブルのスキーマを解決してキャッシュする。
/// 設定で宣言されたスキーマを優先し、なければストアから 1 行取得して推定する。
/// 編集系の操作はキャッシュだけを書き換え、バックエンドには触れない。
/// 読み出しから書き戻しまでを edit_lock で直列化し、同時編集の取りこぼしを防ぐ。
pub struct SchemaRegistry {
    cache: Cache<String, TableSchema>,
    declared: HashMap<String, TableSchema>,
    store: Arc<TableStore>,
    edit_lock: Mutex<()>,
}

impl SchemaRegistry {
    pub fn new(
        store: Arc<TableStore>,
        declared: HashMap<String, TableSchema>,
        max_capacity: u64,
    ) -> Self {
        Self {
            cache: Cache::new(max_capacity),
            declared,
            store,
            edit_lock: Mutex::new(()),
        }
    }

    fn primary_key(&self, table_id: &str) -> String {
        self.store.binding(table_id).primary_key
    }

    /// スキーマを取得する。ストアに到達できない場合は「まだ読み込めない」として None を返す。
    pub async fn get_schema(&self, table_id: &str) -> Option<TableSchema> {
        if let Some(schema) = self.cache.get(table_id) {
            return Some(schema);
        }

        if let Some(schema) = self.declared.get(table_id) {
            self.cache.insert(table_id.to_string(), schema.clone());
            return Some(schema.clone());
        }

        let primary_key = self.primary_key(table_id);
        match self.store.sample(table_id).await {
            Ok(sample) => {
                let schema = SchemaInferenceService::infer(table_id, &primary_key, sample.as_ref());
                info!(
                    table_id = %table_id,
                    columns = schema.columns.len(),
                    "schema inferred"
                );
                self.cache.insert(table_id.to_string(), schema.clone());
                Some(schema)
            }
            Err(e) => {
                warn!(table_id = %table_id, error = %e, "schema is not loadable yet");
                None
            }
        }
    }

    /// キャッシュ済みスキーマを置き換える。
    pub fn update_schema(&self, schema: TableSchema) -> Result<(), SchemaRegistryError> {
        let primary_key = self.primary_key(&schema.id);
        schema
            .validate(&primary_key)
            .map_err(SchemaRegistryError::Validation)?;
        let _guard = self.edit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.cache.insert(schema.id.clone(), schema);
        Ok(())
    }

    /// キャッシュ済みスキーマを edit で書き換えて書き戻す。edit が失敗した場合は何も変えない。
    fn edit(
        &self,
        table_id: &str,
        edit: impl FnOnce(&mut TableSchema) -> Result<(), SchemaRegistryError>,
    ) -> Result<TableSchema, SchemaRegistryError> {
        let _guard = self.edit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut schema = self.loaded(table_id)?;
        edit(&mut schema)?;
        self.cache.insert(table_id.to_string(), schema.clone());
        Ok(schema)
    }

    pub fn add_column(
        &self,
        table_id: &str,
        column: ColumnDefinition,
    ) -> Result<TableSchema, SchemaRegistryError> {
        self.edit(table_id, |schema| {
            if schema.has_column(&column.key) {
                return Err(SchemaRegistryError::DuplicateColumn(column.key));
            }
            schema.columns.push(column);
            Ok(())
        })
    }

    pub fn remove_column(&self, table_id: &str, key: &str) -> Result<TableSchema, SchemaRegistryError> {
        if key == self.primary_key(table_id) {
            return Err(SchemaRegistryError::Validation(format!(
                "primary key column cannot be removed: {}",
                key
            )));
        }
        self.edit(table_id, |schema| {
            let before = schema.columns.len();
            schema.columns.retain(|c| c.key != key);
            if schema.columns.len() == before {
                return Err(SchemaRegistryError::ColumnNotFound(key.to_string()));
            }
            Ok(())
        })
    }

    /// key のカラム定義を column で置き換える。キーの変更も許すが、既存キーとの重複は拒否する。
    pub fn update_column(
        &self,
        table_id: &str,
        key: &str,
        column: ColumnDefinition,
    ) -> Result<TableSchema, SchemaRegistryError> {
        let primary_key = self.primary_key(table_id);
        self.edit(table_id, |schema| {
            if column.key != key && schema.has_column(&column.key) {
                return Err(SchemaRegistryError::DuplicateColumn(column.key));
            }
            let slot = schema
                .columns
                .iter_mut()
                .find(|c| c.key == key)
                .ok_or_else(|| SchemaRegistryError::ColumnNotFound(key.to_string()))?;
            *slot = column;
            schema
                .validate(&primary_key)
                .map_err(SchemaRegistryError::Validation)
        })
    }

    /// キャッシュを破棄して再解決する。
    pub async fn refresh_schema(&self, table_id: &str) -> Option<TableSchema> {
        self.invalidate(table_id);
        self.get_schema(table_id).await
    }

    pub fn invalidate(&self, table_id: &str) {
        self.cache.invalidate(table_id);
    }

    fn loaded(&self, table_id: &str) -> Result<TableSchema, SchemaRegistryError> {
        self.cache
            .get(table_id)
            .ok_or_else(|| SchemaRegistryError::NotLoaded(table_id.to_string()))
    }
}
