use serde::{Deserialize, Serialize};

use crate::domain::value_object::StorageBackend;

/// TableBinding は論理テーブルとバックエンドの対応を表す。
/// 起動時に設定から一度だけ解決され、ストアへ注入される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBinding {
    pub table_id: String,
    pub backend: StorageBackend,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// リモートモードのスキーマ名。未指定時は search_path に従う。
    #[serde(default)]
    pub schema_name: Option<String>,
    /// リモートモードの物理テーブル名。未指定時は table_id を使用する。
    #[serde(default)]
    pub remote_table: Option<String>,
    /// fetch 時に降順で並べる既定カラム。
    #[serde(default)]
    pub default_order_column: Option<String>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl TableBinding {
    pub fn remote(table_id: impl Into<String>) -> Self {
        Self::with_backend(table_id, StorageBackend::Remote)
    }

    pub fn local(table_id: impl Into<String>) -> Self {
        Self::with_backend(table_id, StorageBackend::Local)
    }

    pub fn with_backend(table_id: impl Into<String>, backend: StorageBackend) -> Self {
        Self {
            table_id: table_id.into(),
            backend,
            primary_key: default_primary_key(),
            schema_name: None,
            remote_table: None,
            default_order_column: None,
        }
    }

    pub fn physical_table(&self) -> &str {
        self.remote_table.as_deref().unwrap_or(&self.table_id)
    }
}
