use serde_json::Value;

use crate::domain::entity::column_definition::{title_case, ColumnDefinition};
use crate::domain::entity::row::Row;
use crate::domain::entity::table_schema::TableSchema;
use crate::domain::value_object::{DataType, InputMode};

/// 値の推定ではなく名前から読み取り専用と判断するタイムスタンプ系カラム。
const TIMESTAMP_COLUMNS: &[&str] = &["created_at", "updated_at", "deleted_at", "timestamp"];

/// SchemaInferenceService は 1 行のサンプルからテーブルスキーマを推定する。
pub struct SchemaInferenceService;

impl SchemaInferenceService {
    /// サンプル行からスキーマを推定する。サンプルが無い場合は主キーのみの最小スキーマを返す。
    ///
    /// 主キーを先頭に置き、残りのカラムはサンプル行のキー順に並べる。
    /// 同じサンプルからは常に同じカラム列が得られる。
    pub fn infer(table_id: &str, primary_key: &str, sample: Option<&Row>) -> TableSchema {
        let Some(sample) = sample else {
            return Self::minimal(table_id, primary_key);
        };

        let mut columns = Vec::with_capacity(sample.len() + 1);
        let pk_type = sample.get(primary_key).map_or(DataType::String, DataType::infer);
        columns.push(ColumnDefinition {
            data_type: pk_type,
            ..ColumnDefinition::primary_key(primary_key)
        });

        for (key, value) in sample {
            if key == primary_key {
                continue;
            }
            columns.push(Self::infer_column(key, value, primary_key));
        }

        TableSchema::new(table_id, title_case(table_id), columns)
    }

    /// 主キーカラムのみを持つ最小スキーマ。
    pub fn minimal(table_id: &str, primary_key: &str) -> TableSchema {
        TableSchema::new(
            table_id,
            title_case(table_id),
            vec![ColumnDefinition::primary_key(primary_key)],
        )
    }

    fn infer_column(key: &str, value: &Value, primary_key: &str) -> ColumnDefinition {
        let simple = !matches!(value, Value::Array(_) | Value::Object(_));
        let input_mode = if Self::is_system_column(key, primary_key) {
            InputMode::Output
        } else {
            InputMode::Input
        };
        ColumnDefinition {
            input_mode,
            sortable: simple,
            filterable: simple,
            ..ColumnDefinition::new(key, title_case(key), DataType::infer(value))
        }
    }

    /// 主キー・外部キー・タイムスタンプ系カラムは編集不可とする。
    pub fn is_system_column(key: &str, primary_key: &str) -> bool {
        key == primary_key
            || key.ends_with("_id")
            || key.ends_with("_at")
            || TIMESTAMP_COLUMNS.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Row {
        json!({
            "id": 17,
            "dealer_id": "D-9",
            "dealer_name": "Sunrise Auto",
            "amount": 18500.5,
            "approved": false,
            "created_at": "2024-01-01T00:00:00Z",
            "meta": {"source": "web"}
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn infers_types_and_editability() {
        let schema = SchemaInferenceService::infer("applications", "id", Some(&sample()));
        assert_eq!(schema.id, "applications");
        assert_eq!(schema.display_name, "Applications");
        assert_eq!(schema.columns[0].key, "id");
        assert_eq!(schema.columns[0].data_type, DataType::Number);
        assert_eq!(schema.columns[0].input_mode, InputMode::Output);

        let col = |k: &str| schema.column(k).unwrap().clone();
        assert_eq!(col("dealer_id").input_mode, InputMode::Output);
        assert_eq!(col("created_at").input_mode, InputMode::Output);
        assert_eq!(col("dealer_name").input_mode, InputMode::Input);
        assert_eq!(col("dealer_name").display_name, "Dealer Name");
        assert_eq!(col("amount").data_type, DataType::Number);
        assert_eq!(col("approved").data_type, DataType::Boolean);
        assert!(col("amount").sortable && col("amount").filterable);
        assert!(!col("meta").sortable && !col("meta").filterable);
        assert!(schema.validate("id").is_ok());
    }

    #[test]
    fn empty_table_falls_back_to_primary_key() {
        let schema = SchemaInferenceService::infer("documents", "doc_id", None);
        assert_eq!(schema.columns.len(), 1);
        assert_eq!(schema.columns[0].key, "doc_id");
        assert_eq!(schema.columns[0].input_mode, InputMode::Output);
    }

    #[test]
    fn primary_key_added_when_missing_from_sample() {
        let row = json!({"name": "x"}).as_object().cloned().unwrap();
        let schema = SchemaInferenceService::infer("t", "id", Some(&row));
        assert_eq!(schema.columns[0].key, "id");
        assert!(schema.validate("id").is_ok());
    }

    #[test]
    fn inference_is_deterministic() {
        let a = SchemaInferenceService::infer("applications", "id", Some(&sample()));
        let b = SchemaInferenceService::infer("applications", "id", Some(&sample()));
        let shape = |s: &TableSchema| {
            s.columns
                .iter()
                .map(|c| (c.key.clone(), c.data_type, c.input_mode))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&a), shape(&b));
    }
}
