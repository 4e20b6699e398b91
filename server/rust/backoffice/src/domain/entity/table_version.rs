use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::row::Row;
use super::table_schema::TableSchema;

/// TableVersion は変更直前のテーブル全行スナップショットを表すドメインエンティティ。
/// 生成後に変更されることはない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableVersion {
    pub id: Uuid,
    pub table_id: String,
    pub version_number: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub description: String,
    pub data: Vec<Row>,
    pub schema_snapshot: Option<TableSchema>,
}

/// CreateTableVersion はスナップショット作成リクエストを表す。
#[derive(Debug, Clone)]
pub struct CreateTableVersion {
    pub table_id: String,
    pub version_number: i64,
    pub created_by: String,
    pub description: String,
    pub data: Vec<Row>,
    pub schema_snapshot: Option<TableSchema>,
}

impl TableVersion {
    pub fn new(req: CreateTableVersion) -> Self {
        Self {
            id: Uuid::new_v4(),
            table_id: req.table_id,
            version_number: req.version_number,
            created_at: Utc::now(),
            created_by: req.created_by,
            description: req.description,
            data: req.data,
            schema_snapshot: req.schema_snapshot,
        }
    }
}
