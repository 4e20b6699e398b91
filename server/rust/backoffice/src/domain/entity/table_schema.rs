use serde::{Deserialize, Serialize};

use super::column_definition::ColumnDefinition;

/// TableSchema は論理テーブルのカラム構成を表す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub id: String,
    pub display_name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableSchema {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            columns,
        }
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn has_column(&self, key: &str) -> bool {
        self.column(key).is_some()
    }

    /// スキーマの不変条件を検証する。
    /// カラムキーが一意であり、主キーカラムが存在して Output であること。
    pub fn validate(&self, primary_key: &str) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for col in &self.columns {
            if col.key.is_empty() {
                return Err("column key must not be empty".to_string());
            }
            if !seen.insert(col.key.as_str()) {
                return Err(format!("duplicate column key: {}", col.key));
            }
        }
        match self.column(primary_key) {
            Some(pk) if pk.is_editable() => {
                Err(format!("primary key column '{primary_key}' must be read-only"))
            }
            Some(_) => Ok(()),
            None => Err(format!("primary key column '{primary_key}' is missing")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::DataType;

    fn schema() -> TableSchema {
        TableSchema::new(
            "dealer_programs",
            "Dealer Programs",
            vec![
                ColumnDefinition::primary_key("id"),
                ColumnDefinition::new("name", "Name", DataType::String),
                ColumnDefinition::new("rate", "Rate", DataType::Number),
            ],
        )
    }

    #[test]
    fn valid_schema() {
        assert!(schema().validate("id").is_ok());
        assert!(schema().has_column("rate"));
        assert!(!schema().has_column("term"));
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut s = schema();
        s.columns.push(ColumnDefinition::new("rate", "Rate 2", DataType::Number));
        assert!(s.validate("id").unwrap_err().contains("duplicate"));
    }

    #[test]
    fn editable_primary_key_rejected() {
        let mut s = schema();
        s.columns[0] = ColumnDefinition::new("id", "ID", DataType::String);
        assert!(s.validate("id").unwrap_err().contains("read-only"));
    }

    #[test]
    fn missing_primary_key_rejected() {
        let mut s = schema();
        s.columns.remove(0);
        assert!(s.validate("id").unwrap_err().contains("missing"));
    }
}
