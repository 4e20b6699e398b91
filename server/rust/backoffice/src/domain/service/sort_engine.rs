use std::cmp::Ordering;

use serde_json::Value;

use crate::domain::entity::row::Row;
use crate::domain::entity::sort_key::{SortDirection, SortKey};

/// SortEngine はメモリ上の行集合に複数キーの安定ソートを適用する。
pub struct SortEngine;

impl SortEngine {
    pub fn apply(rows: &[Row], keys: &[SortKey]) -> Vec<Row> {
        let mut sorted = rows.to_vec();
        if !keys.is_empty() {
            // slice::sort_by は安定ソート
            sorted.sort_by(|a, b| Self::compare_rows(a, b, keys));
        }
        sorted
    }

    /// 第一キーから順に比較し、等しい場合のみ次のキーへ進む。
    pub fn compare_rows(a: &Row, b: &Row, keys: &[SortKey]) -> Ordering {
        keys.iter()
            .map(|key| compare_cells(a.get(&key.column_key), b.get(&key.column_key), key.direction))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

/// 値の無いセルは方向に関係なく末尾に並べる。
fn compare_cells(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = compare_values(x, y);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

fn compare_values(x: &Value, y: &Value) -> Ordering {
    match (x, y) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        _ => type_rank(x)
            .cmp(&type_rank(y))
            .then_with(|| x.to_string().cmp(&y.to_string())),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    fn ids(rows: &[Row]) -> Vec<Value> {
        rows.iter().map(|r| r["id"].clone()).collect()
    }

    #[test]
    fn stable_for_equal_keys() {
        let rows = vec![row(json!({"id": 1, "x": 1})), row(json!({"id": 2, "x": 1}))];
        let sorted = SortEngine::apply(&rows, &[SortKey::asc("x")]);
        assert_eq!(ids(&sorted), vec![json!(1), json!(2)]);

        let sorted = SortEngine::apply(&rows, &[SortKey::desc("x")]);
        assert_eq!(ids(&sorted), vec![json!(1), json!(2)]);
    }

    #[test]
    fn multi_key_falls_through_on_equality() {
        let rows = vec![
            row(json!({"id": "a", "state": "TX", "amount": 100})),
            row(json!({"id": "b", "state": "CA", "amount": 300})),
            row(json!({"id": "c", "state": "TX", "amount": 250})),
            row(json!({"id": "d", "state": "ca", "amount": 50})),
        ];
        let sorted = SortEngine::apply(&rows, &[SortKey::asc("state"), SortKey::desc("amount")]);
        assert_eq!(ids(&sorted), vec![json!("b"), json!("d"), json!("c"), json!("a")]);
    }

    #[test]
    fn no_keys_preserves_order() {
        let rows = vec![row(json!({"id": 3})), row(json!({"id": 1})), row(json!({"id": 2}))];
        assert_eq!(SortEngine::apply(&rows, &[]), rows);
    }

    #[test]
    fn missing_values_sort_last_both_directions() {
        let rows = vec![
            row(json!({"id": 1})),
            row(json!({"id": 2, "amount": 5})),
            row(json!({"id": 3, "amount": null})),
            row(json!({"id": 4, "amount": 9})),
        ];
        let asc = SortEngine::apply(&rows, &[SortKey::asc("amount")]);
        assert_eq!(ids(&asc), vec![json!(2), json!(4), json!(1), json!(3)]);
        let desc = SortEngine::apply(&rows, &[SortKey::desc("amount")]);
        assert_eq!(ids(&desc), vec![json!(4), json!(2), json!(1), json!(3)]);
    }

    #[test]
    fn numbers_compare_numerically() {
        let rows = vec![row(json!({"id": 1, "n": 10})), row(json!({"id": 2, "n": 9.5}))];
        let sorted = SortEngine::apply(&rows, &[SortKey::asc("n")]);
        assert_eq!(ids(&sorted), vec![json!(2), json!(1)]);
    }
}
