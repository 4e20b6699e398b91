use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::domain::entity::column_definition::ColumnDefinition;
use crate::domain::entity::row::Row;
use crate::domain::entity::table_binding::TableBinding;
use crate::domain::repository::RowStore;

/// RemoteRowStore は PostgreSQL 上のテーブルをスキーマレスな JSON 行として扱う RowStore 実装。
/// 行の読み出しは row_to_json、書き込みは jsonb_populate_record で型変換を DB 側に任せる。
pub struct RemoteRowStore {
    pool: PgPool,
}

impl RemoteRowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// 識別子をダブルクォートで囲む。内部の '"' は二重化する。
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// 英数字とアンダースコアのみからなる識別子だけを受け付ける。
fn validate_identifier(name: &str) -> anyhow::Result<()> {
    if name.is_empty() {
        anyhow::bail!("identifier must not be empty");
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        anyhow::bail!("invalid identifier: {}", name);
    }
    Ok(())
}

/// バインディングから修飾済みの物理テーブル名を組み立てる。
fn build_table_name(binding: &TableBinding) -> anyhow::Result<String> {
    let table = binding.physical_table();
    validate_identifier(table)?;
    match binding.schema_name.as_deref() {
        Some(schema) => {
            validate_identifier(schema)?;
            Ok(format!("{}.{}", quote_identifier(schema), quote_identifier(table)))
        }
        None => Ok(quote_identifier(table)),
    }
}

/// 行のキーを検証済みのカラムリストに変換する。主キーを除外する場合は skip に指定する。
fn column_list<'a>(row: &'a Row, skip: Option<&str>) -> anyhow::Result<Vec<&'a str>> {
    let mut cols = Vec::new();
    for key in row.keys() {
        if Some(key.as_str()) == skip {
            continue;
        }
        validate_identifier(key)?;
        cols.push(key.as_str());
    }
    Ok(cols)
}

fn quoted(cols: &[&str]) -> String {
    cols.iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn into_row(value: Value) -> anyhow::Result<Row> {
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected JSON object row, got {}", other),
    }
}

#[async_trait]
impl RowStore for RemoteRowStore {
    async fn fetch(&self, binding: &TableBinding) -> anyhow::Result<Vec<Row>> {
        let table_name = build_table_name(binding)?;
        let order_sql = match binding.default_order_column.as_deref() {
            Some(col) => {
                validate_identifier(col)?;
                format!(" ORDER BY t.{} DESC", quote_identifier(col))
            }
            None => String::new(),
        };
        let sql = format!("SELECT row_to_json(t)::jsonb FROM {} t{}", table_name, order_sql);
        let values: Vec<Value> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        values.into_iter().map(into_row).collect()
    }

    async fn sample(&self, binding: &TableBinding) -> anyhow::Result<Option<Row>> {
        let table_name = build_table_name(binding)?;
        let sql = format!("SELECT row_to_json(t)::jsonb FROM {} t LIMIT 1", table_name);
        let value: Option<Value> = sqlx::query_scalar(&sql).fetch_optional(&self.pool).await?;
        value.map(into_row).transpose()
    }

    async fn insert(
        &self,
        binding: &TableBinding,
        _columns: &[ColumnDefinition],
        row: &Row,
    ) -> anyhow::Result<Row> {
        let table_name = build_table_name(binding)?;
        let cols = column_list(row, None)?;

        // 未指定カラムは DB の DEFAULT に任せる。
        let value: Value = if cols.is_empty() {
            let sql = format!(
                "INSERT INTO {} AS t DEFAULT VALUES RETURNING row_to_json(t)::jsonb",
                table_name
            );
            sqlx::query_scalar(&sql).fetch_one(&self.pool).await?
        } else {
            let col_sql = quoted(&cols);
            let sql = format!(
                "INSERT INTO {table} AS t ({cols}) \
                 SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1) \
                 RETURNING row_to_json(t)::jsonb",
                table = table_name,
                cols = col_sql
            );
            sqlx::query_scalar(&sql)
                .bind(Value::Object(row.clone()))
                .fetch_one(&self.pool)
                .await?
        };
        into_row(value)
    }

    async fn update(&self, binding: &TableBinding, id: &str, changes: &Row) -> anyhow::Result<Row> {
        let table_name = build_table_name(binding)?;
        let pk = binding.primary_key.as_str();
        validate_identifier(pk)?;
        let cols = column_list(changes, Some(pk))?;

        let value: Option<Value> = if cols.is_empty() {
            let sql = format!(
                "SELECT row_to_json(t)::jsonb FROM {} t WHERE t.{}::text = $1",
                table_name,
                quote_identifier(pk)
            );
            sqlx::query_scalar(&sql).bind(id).fetch_optional(&self.pool).await?
        } else {
            let col_sql = quoted(&cols);
            let sql = format!(
                "UPDATE {table} AS t SET ({cols}) = \
                 (SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1)) \
                 WHERE t.{pk}::text = $2 \
                 RETURNING row_to_json(t)::jsonb",
                table = table_name,
                cols = col_sql,
                pk = quote_identifier(pk)
            );
            sqlx::query_scalar(&sql)
                .bind(Value::Object(changes.clone()))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
        };

        match value {
            Some(v) => into_row(v),
            None => anyhow::bail!("row not found: {}", id),
        }
    }

    async fn delete(&self, binding: &TableBinding, ids: &[String]) -> anyhow::Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let table_name = build_table_name(binding)?;
        let pk = binding.primary_key.as_str();
        validate_identifier(pk)?;
        let sql = format!(
            "DELETE FROM {} AS t WHERE t.{}::text = ANY($1)",
            table_name,
            quote_identifier(pk)
        );
        sqlx::query(&sql).bind(ids).execute(&self.pool).await?;
        Ok(())
    }

    async fn replace_all(&self, binding: &TableBinding, rows: &[Row]) -> anyhow::Result<Vec<Row>> {
        let table_name = build_table_name(binding)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DELETE FROM {}", table_name))
            .execute(&mut *tx)
            .await?;

        let restored: Vec<Value> = if rows.is_empty() {
            Vec::new()
        } else {
            let payload = Value::Array(rows.iter().cloned().map(Value::Object).collect());
            let sql = format!(
                "INSERT INTO {table} AS t \
                 SELECT * FROM jsonb_populate_recordset(NULL::{table}, $1) \
                 RETURNING row_to_json(t)::jsonb",
                table = table_name
            );
            sqlx::query_scalar(&sql)
                .bind(payload)
                .fetch_all(&mut *tx)
                .await?
        };

        tx.commit().await?;
        restored.into_iter().map(into_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("rate_sheets"), "\"rate_sheets\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("loan_amount").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("amount; DROP TABLE x").is_err());
        assert!(validate_identifier("a-b").is_err());
    }

    #[test]
    fn test_build_table_name() {
        let mut binding = TableBinding::remote("applications");
        assert_eq!(build_table_name(&binding).unwrap(), "\"applications\"");

        binding.schema_name = Some("lending".to_string());
        binding.remote_table = Some("credit_applications".to_string());
        assert_eq!(
            build_table_name(&binding).unwrap(),
            "\"lending\".\"credit_applications\""
        );

        binding.schema_name = Some("bad schema".to_string());
        assert!(build_table_name(&binding).is_err());
    }

    #[test]
    fn test_column_list_skips_primary_key_and_rejects_bad_keys() {
        let row = json!({"id": "A1", "amount": 500, "status": "open"})
            .as_object()
            .cloned()
            .unwrap();
        let cols = column_list(&row, Some("id")).unwrap();
        assert_eq!(cols, vec!["amount", "status"]);

        let bad = json!({"amount\"": 1}).as_object().cloned().unwrap();
        assert!(column_list(&bad, None).is_err());
    }

    #[test]
    fn test_into_row_rejects_non_object() {
        assert!(into_row(json!({"id": 1})).is_ok());
        assert!(into_row(json!([1, 2])).is_err());
    }
}
