use serde::Serialize;
use serde_json::Value;

use crate::domain::entity::row::{has_value, Row};
use crate::domain::entity::table_schema::TableSchema;

/// FieldViolation はカラム単位のバリデーション違反。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// RowValidator はストア呼び出し前に入力行をスキーマに照らして検証する。
/// スキーマに存在しないキーは検証対象外とする。
pub struct RowValidator;

impl RowValidator {
    /// insert 用の検証。必須 Input カラムの欠落、読み取り専用カラムへの書き込み、型不一致を検出する。
    /// 主キーだけは Output でも insert 時に指定できる。
    pub fn validate_insert(schema: &TableSchema, primary_key: &str, row: &Row) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        for col in &schema.columns {
            if col.is_editable() {
                if col.is_required && !has_value(row, &col.key) {
                    violations.push(FieldViolation::new(&col.key, "is required"));
                }
            } else if col.key != primary_key && row.contains_key(&col.key) {
                violations.push(FieldViolation::new(&col.key, "is read-only"));
            }
        }
        Self::check_values(schema, row, &mut violations);
        violations
    }

    /// update 用の検証。読み取り専用カラムの書き換え、必須カラムの null 化、型不一致を検出する。
    pub fn validate_update(schema: &TableSchema, changes: &Row) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        for (key, value) in changes {
            let Some(col) = schema.column(key) else {
                continue;
            };
            if !col.is_editable() {
                violations.push(FieldViolation::new(key, "is read-only"));
            } else if col.is_required && value.is_null() {
                violations.push(FieldViolation::new(key, "is required"));
            }
        }
        Self::check_values(schema, changes, &mut violations);
        violations
    }

    fn check_values(schema: &TableSchema, row: &Row, violations: &mut Vec<FieldViolation>) {
        for (key, value) in row {
            let Some(col) = schema.column(key) else {
                continue;
            };
            if !col.data_type.accepts(value) {
                violations.push(FieldViolation::new(
                    key,
                    format!("expected {} value", col.data_type),
                ));
                continue;
            }
            if let (Some(options), Value::String(s)) = (&col.filter_options, value) {
                if !options.iter().any(|o| o == s) {
                    violations.push(FieldViolation::new(
                        key,
                        format!("must be one of: {}", options.join(", ")),
                    ));
                }
            }
        }
    }
}
