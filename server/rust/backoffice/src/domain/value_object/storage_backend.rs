use serde::{Deserialize, Serialize};

/// StorageBackend は論理テーブルの行データがどこに保存されるかを表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// ホスト型リレーショナルストア (PostgreSQL)
    Remote,
    /// キー・バリュー型の永続ローカルキャッシュ
    Local,
}
