use std::collections::HashMap;

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use crate::domain::entity::column_definition::ColumnDefinition;
use crate::domain::entity::table_binding::TableBinding;
use crate::domain::entity::table_schema::TableSchema;
use crate::domain::value_object::StorageBackend;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub local_store: LocalStoreConfig,
    /// バインディングのないテーブルに適用するバックエンド。
    #[serde(default = "default_backend")]
    pub default_backend: StorageBackend,
    #[serde(default)]
    pub tables: Vec<TableConfig>,
    #[serde(default)]
    pub versioning: VersioningConfig,
    #[serde(default)]
    pub schema_cache: SchemaCacheConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    pub user: String,
    /// ログや Debug 出力に平文が出ないよう Secret でラップする。
    #[serde(default = "default_password")]
    pub password: Secret<String>,
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// PostgreSQL 接続 URL を生成する。
    /// search_path に backoffice スキーマを含め、変更申請テーブルへ直接アクセスできるようにする。
    pub fn connection_url(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}?sslmode={}&options=-c search_path%3D{},public",
            self.user,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.name,
            self.ssl_mode,
            self.schema
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalStoreConfig {
    /// 永続キー・バリューストアのディレクトリ。未指定時はインメモリストアを使う。
    #[serde(default)]
    pub path: Option<String>,
}

/// TableConfig は論理テーブル 1 件分の設定。
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    #[serde(flatten)]
    pub binding: TableBinding,
    #[serde(default)]
    pub display_name: Option<String>,
    /// 宣言済みカラム。空の場合は取得した行から推定する。
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
    /// 起動時に変更監視を開始するかどうか。
    #[serde(default)]
    pub watch: bool,
}

impl TableConfig {
    /// 宣言済みスキーマを返す。カラム宣言がなければ None。
    pub fn declared_schema(&self) -> Option<TableSchema> {
        if self.columns.is_empty() {
            return None;
        }
        let display_name = self
            .display_name
            .clone()
            .unwrap_or_else(|| crate::domain::entity::column_definition::title_case(&self.binding.table_id));
        Some(TableSchema::new(
            self.binding.table_id.clone(),
            display_name,
            self.columns.clone(),
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersioningConfig {
    /// テーブルごとに保持するバージョン数。0 は無制限。
    #[serde(default = "default_max_versions")]
    pub max_versions_per_table: usize,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            max_versions_per_table: default_max_versions(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaCacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
}

impl Default for SchemaCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// YAML ファイルから設定を読み込む。DATABASE_URL は main 側で優先される。
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 宣言済みスキーマの主キー制約とテーブル ID の重複を検証する。
    fn validate(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.binding.table_id.as_str()) {
                anyhow::bail!("duplicate table binding: {}", table.binding.table_id);
            }
            if let Some(schema) = table.declared_schema() {
                schema
                    .validate(&table.binding.primary_key)
                    .map_err(|e| anyhow::anyhow!("table '{}': {}", table.binding.table_id, e))?;
            }
        }
        Ok(())
    }

    /// テーブル ID をキーにしたバインディング表を構築する。
    pub fn bindings(&self) -> HashMap<String, TableBinding> {
        self.tables
            .iter()
            .map(|t| (t.binding.table_id.clone(), t.binding.clone()))
            .collect()
    }

    /// 宣言済みスキーマを持つテーブルのスキーマ表を構築する。
    pub fn declared_schemas(&self) -> HashMap<String, TableSchema> {
        self.tables
            .iter()
            .filter_map(|t| t.declared_schema().map(|s| (s.id.clone(), s)))
            .collect()
    }

    /// 起動時に監視を開始するテーブル ID。
    pub fn watched_tables(&self) -> Vec<String> {
        self.tables
            .iter()
            .filter(|t| t.watch)
            .map(|t| t.binding.table_id.clone())
            .collect()
    }
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8120
}

fn default_db_port() -> u16 {
    5432
}

fn default_schema() -> String {
    "backoffice".to_string()
}

fn default_password() -> Secret<String> {
    Secret::new(String::new())
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

fn default_max_connections() -> u32 {
    25
}

fn default_backend() -> StorageBackend {
    StorageBackend::Remote
}

fn default_max_versions() -> usize {
    50
}

fn default_cache_capacity() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}
