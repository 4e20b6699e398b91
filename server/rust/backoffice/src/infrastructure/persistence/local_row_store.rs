use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::entity::column_definition::ColumnDefinition;
use crate::domain::entity::row::{has_value, new_row_id, row_id, Row};
use crate::domain::entity::table_binding::TableBinding;
use crate::domain::repository::{KeyValueStore, RowStore};

/// LocalRowStore はプロセス内のコレクションを正とし、変更のたびに
/// キー・バリューストアの "table:{table_id}" へ同期的に書き戻す RowStore 実装。
pub struct LocalRowStore {
    kv: Arc<dyn KeyValueStore>,
    tables: Mutex<HashMap<String, Vec<Row>>>,
}

impl LocalRowStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn storage_key(table_id: &str) -> String {
        format!("table:{}", table_id)
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Row>>>> {
        self.tables
            .lock()
            .map_err(|_| anyhow::anyhow!("local row store lock poisoned"))
    }

    /// 永続ストアから行を読み出す。未保存のテーブルは空として扱う。
    fn read_persisted(&self, table_id: &str) -> anyhow::Result<Vec<Row>> {
        match self.kv.get_item(&Self::storage_key(table_id))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn current(
        &self,
        tables: &HashMap<String, Vec<Row>>,
        table_id: &str,
    ) -> anyhow::Result<Vec<Row>> {
        match tables.get(table_id) {
            Some(rows) => Ok(rows.clone()),
            None => self.read_persisted(table_id),
        }
    }

    /// 新しいコレクションを計算して永続化し、成功した場合だけメモリ上の状態を差し替える。
    fn mutate<T>(
        &self,
        table_id: &str,
        f: impl FnOnce(&mut Vec<Row>) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let mut tables = self.lock()?;
        let mut next = self.current(&tables, table_id)?;
        let out = f(&mut next)?;
        self.kv
            .set_item(&Self::storage_key(table_id), &serde_json::to_string(&next)?)?;
        tables.insert(table_id.to_string(), next);
        Ok(out)
    }
}

/// スキーマの全カラムを型の既定値で埋めた上に、指定値を重ねた行を作る。
fn with_defaults(columns: &[ColumnDefinition], primary_key: &str, row: &Row) -> Row {
    let mut filled = Row::new();
    for col in columns {
        if col.key != primary_key {
            filled.insert(col.key.clone(), col.data_type.default_value());
        }
    }
    for (key, value) in row {
        filled.insert(key.clone(), value.clone());
    }
    if !has_value(&filled, primary_key) {
        filled.insert(primary_key.to_string(), Value::String(new_row_id()));
    }
    filled
}

#[async_trait]
impl RowStore for LocalRowStore {
    async fn fetch(&self, binding: &TableBinding) -> anyhow::Result<Vec<Row>> {
        let mut tables = self.lock()?;
        let rows = self.current(&tables, &binding.table_id)?;
        tables
            .entry(binding.table_id.clone())
            .or_insert_with(|| rows.clone());
        Ok(rows)
    }

    async fn sample(&self, binding: &TableBinding) -> anyhow::Result<Option<Row>> {
        let tables = self.lock()?;
        let rows = self.current(&tables, &binding.table_id)?;
        Ok(rows.into_iter().next())
    }

    async fn insert(
        &self,
        binding: &TableBinding,
        columns: &[ColumnDefinition],
        row: &Row,
    ) -> anyhow::Result<Row> {
        let pk = binding.primary_key.as_str();
        let filled = with_defaults(columns, pk, row);
        let id = row_id(&filled, pk);
        self.mutate(&binding.table_id, |rows| {
            if id.is_some() && rows.iter().any(|r| row_id(r, pk) == id) {
                anyhow::bail!("duplicate row id: {}", id.unwrap_or_default());
            }
            rows.push(filled.clone());
            Ok(filled)
        })
    }

    async fn update(&self, binding: &TableBinding, id: &str, changes: &Row) -> anyhow::Result<Row> {
        let pk = binding.primary_key.as_str();
        self.mutate(&binding.table_id, |rows| {
            let target = rows
                .iter_mut()
                .find(|r| row_id(r, pk).as_deref() == Some(id))
                .ok_or_else(|| anyhow::anyhow!("row not found: {}", id))?;
            for (key, value) in changes {
                if key != pk {
                    target.insert(key.clone(), value.clone());
                }
            }
            Ok(target.clone())
        })
    }

    async fn delete(&self, binding: &TableBinding, ids: &[String]) -> anyhow::Result<()> {
        let pk = binding.primary_key.as_str();
        self.mutate(&binding.table_id, |rows| {
            rows.retain(|r| row_id(r, pk).is_none_or(|id| !ids.contains(&id)));
            Ok(())
        })
    }

    async fn replace_all(&self, binding: &TableBinding, rows: &[Row]) -> anyhow::Result<Vec<Row>> {
        self.mutate(&binding.table_id, |current| {
            *current = rows.to_vec();
            Ok(current.clone())
        })
    }
}
