use serde_json::{Map, Value};

/// Row はカラムキーから値へのマッピング。主キーを除きスキーマは強制しない。
pub type Row = Map<String, Value>;

/// 行から主キー値を文字列として取り出す。数値 ID は文字列化する。
pub fn row_id(row: &Row, primary_key: &str) -> Option<String> {
    match row.get(primary_key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// ローカルモードで採番する新しい行 ID。
pub fn new_row_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 行が null でない値を保持しているか。
pub fn has_value(row: &Row, key: &str) -> bool {
    row.get(key).is_some_and(|v| !v.is_null())
}
