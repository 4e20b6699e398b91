use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::domain::entity::row::Row;
use crate::domain::entity::table_filter::TableFilter;
use crate::domain::value_object::{FilterOperator, FilterType};

/// FilterEngine はメモリ上の行集合にカラム単位の述語フィルタを適用する。
/// 行はすべての有効なフィルタを満たす場合のみ残る（カラム間 AND）。
pub struct FilterEngine;

impl FilterEngine {
    pub fn apply(rows: &[Row], filters: &[TableFilter]) -> Vec<Row> {
        rows.iter()
            .filter(|row| Self::matches_all(row, filters))
            .cloned()
            .collect()
    }

    pub fn matches_all(row: &Row, filters: &[TableFilter]) -> bool {
        filters.iter().all(|f| Self::matches(row, f))
    }

    /// 1 つのフィルタを評価する。
    /// カラムが存在しない、または null の行は演算子に関係なく除外する。
    pub fn matches(row: &Row, filter: &TableFilter) -> bool {
        let cell = match row.get(&filter.column_key) {
            Some(v) if !v.is_null() => v,
            _ => return false,
        };
        if !filter.operator.is_supported_by(filter.filter_type) {
            return false;
        }

        match filter.filter_type {
            FilterType::Text => match_text(cell, filter),
            FilterType::Number => compare_ordered(
                as_number(cell),
                filter.operator,
                as_number(&filter.value),
                filter.value2.as_ref().and_then(as_number),
            ),
            FilterType::Date => compare_ordered(
                as_date(cell),
                filter.operator,
                as_date(&filter.value),
                filter.value2.as_ref().and_then(as_date),
            ),
            FilterType::Boolean => match (as_bool(cell), as_bool(&filter.value)) {
                (Some(actual), Some(expected)) => match filter.operator {
                    FilterOperator::Is => actual == expected,
                    FilterOperator::IsNot => actual != expected,
                    _ => false,
                },
                _ => false,
            },
        }
    }
}

fn match_text(cell: &Value, filter: &TableFilter) -> bool {
    let (Some(actual), Some(needle)) = (as_text(cell), as_text(&filter.value)) else {
        return false;
    };
    let actual = actual.to_lowercase();
    let needle = needle.to_lowercase();
    match filter.operator {
        FilterOperator::Contains => actual.contains(&needle),
        FilterOperator::Equals => actual == needle,
        FilterOperator::StartsWith => actual.starts_with(&needle),
        FilterOperator::EndsWith => actual.ends_with(&needle),
        _ => false,
    }
}

/// number / date 共通の比較。between は両端を含み、value2 が無ければ一致しない。
fn compare_ordered<T: PartialOrd>(
    actual: Option<T>,
    operator: FilterOperator,
    value: Option<T>,
    value2: Option<T>,
) -> bool {
    let (Some(actual), Some(value)) = (actual, value) else {
        return false;
    };
    match operator {
        FilterOperator::Equals => actual == value,
        FilterOperator::Gt => actual > value,
        FilterOperator::Lt => actual < value,
        FilterOperator::Gte => actual >= value,
        FilterOperator::Lte => actual <= value,
        FilterOperator::Between => value2.is_some_and(|upper| actual >= value && actual <= upper),
        _ => false,
    }
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// 日付比較用に時刻を切り捨てた暦日を取り出す。
/// RFC 3339 の場合は文字列に記載されたオフセット上の日付を使う。
fn as_date(v: &Value) -> Option<NaiveDate> {
    match v {
        Value::String(s) => parse_date(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    fn number(op: FilterOperator, value: Value) -> TableFilter {
        TableFilter::new("amount", FilterType::Number, op, value)
    }

    #[test]
    fn number_between_inclusive() {
        let rows = vec![row(json!({"id": "1", "amount": 150}))];
        let inside = TableFilter::between("amount", FilterType::Number, json!(100), json!(200));
        let outside = TableFilter::between("amount", FilterType::Number, json!(100), json!(120));
        assert_eq!(FilterEngine::apply(&rows, &[inside]), rows);
        assert!(FilterEngine::apply(&rows, &[outside]).is_empty());

        let edge = TableFilter::between("amount", FilterType::Number, json!(150), json!(150));
        assert_eq!(FilterEngine::apply(&rows, &[edge]).len(), 1);
    }

    #[test]
    fn between_without_value2_never_matches() {
        let rows = vec![row(json!({"amount": 150}))];
        let f = number(FilterOperator::Between, json!(100));
        assert!(FilterEngine::apply(&rows, &[f]).is_empty());
    }

    #[test]
    fn number_relational_operators() {
        let r = row(json!({"amount": 10}));
        assert!(FilterEngine::matches(&r, &number(FilterOperator::Equals, json!(10))));
        assert!(FilterEngine::matches(&r, &number(FilterOperator::Gt, json!(9))));
        assert!(!FilterEngine::matches(&r, &number(FilterOperator::Gt, json!(10))));
        assert!(FilterEngine::matches(&r, &number(FilterOperator::Gte, json!(10))));
        assert!(FilterEngine::matches(&r, &number(FilterOperator::Lt, json!("10.5"))));
        assert!(FilterEngine::matches(&r, &number(FilterOperator::Lte, json!(10))));
        assert!(!FilterEngine::matches(&r, &number(FilterOperator::Equals, json!("abc"))));
    }

    #[test]
    fn missing_or_null_column_is_excluded() {
        let rows = vec![
            row(json!({"id": "1"})),
            row(json!({"id": "2", "amount": null})),
            row(json!({"id": "3", "amount": 5})),
        ];
        let f = number(FilterOperator::Gte, json!(0));
        let out = FilterEngine::apply(&rows, &[f]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], json!("3"));

        let text = TableFilter::new("name", FilterType::Text, FilterOperator::Contains, json!(""));
        assert!(FilterEngine::apply(&rows, &[text]).is_empty());
    }

    #[test]
    fn text_operators_are_case_insensitive() {
        let r = row(json!({"dealer": "Sunrise Auto Group"}));
        let f = |op, v: &str| TableFilter::new("dealer", FilterType::Text, op, json!(v));
        assert!(FilterEngine::matches(&r, &f(FilterOperator::Contains, "auto")));
        assert!(FilterEngine::matches(&r, &f(FilterOperator::Equals, "sunrise auto group")));
        assert!(FilterEngine::matches(&r, &f(FilterOperator::StartsWith, "SUNRISE")));
        assert!(FilterEngine::matches(&r, &f(FilterOperator::EndsWith, "group")));
        assert!(!FilterEngine::matches(&r, &f(FilterOperator::Equals, "sunrise")));
    }

    #[test]
    fn boolean_is_and_is_not() {
        let r = row(json!({"active": true}));
        let is_true = TableFilter::new("active", FilterType::Boolean, FilterOperator::Is, json!(true));
        let is_not_true =
            TableFilter::new("active", FilterType::Boolean, FilterOperator::IsNot, json!(true));
        assert!(FilterEngine::matches(&r, &is_true));
        assert!(!FilterEngine::matches(&r, &is_not_true));
    }

    #[test]
    fn date_compares_calendar_day_only() {
        let r = row(json!({"funded_at": "2024-03-15T23:10:00Z"}));
        let same_day = TableFilter::new(
            "funded_at",
            FilterType::Date,
            FilterOperator::Equals,
            json!("2024-03-15"),
        );
        let range = TableFilter::between(
            "funded_at",
            FilterType::Date,
            json!("2024-03-01T08:00:00Z"),
            json!("2024-03-15T00:00:00Z"),
        );
        let after =
            TableFilter::new("funded_at", FilterType::Date, FilterOperator::Gt, json!("2024-03-15"));
        assert!(FilterEngine::matches(&r, &same_day));
        assert!(FilterEngine::matches(&r, &range));
        assert!(!FilterEngine::matches(&r, &after));
    }

    #[test]
    fn operator_outside_type_never_matches() {
        let r = row(json!({"amount": 10}));
        let f = number(FilterOperator::Contains, json!(1));
        assert!(!FilterEngine::matches(&r, &f));
    }

    #[test]
    fn composition_equals_sequential_application() {
        let rows = vec![
            row(json!({"id": "1", "amount": 150, "state": "TX"})),
            row(json!({"id": "2", "amount": 90, "state": "TX"})),
            row(json!({"id": "3", "amount": 180, "state": "CA"})),
        ];
        let f1 = number(FilterOperator::Gt, json!(100));
        let f2 = TableFilter::new("state", FilterType::Text, FilterOperator::Equals, json!("tx"));

        let combined = FilterEngine::apply(&rows, &[f1.clone(), f2.clone()]);
        let sequential = FilterEngine::apply(&FilterEngine::apply(&rows, &[f1]), &[f2]);
        assert_eq!(combined, sequential);
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0]["id"], json!("1"));
    }

    #[test]
    fn no_filters_returns_all_rows() {
        let rows = vec![row(json!({"id": "1"})), row(json!({"id": "2"}))];
        assert_eq!(FilterEngine::apply(&rows, &[]), rows);
    }
}
