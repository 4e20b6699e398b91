/// KeyValueStore は文字列キー・文字列値のフラットな永続ストア。
/// ブラウザの localStorage と同じ契約で、書き込みは同期的に永続化される。
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()>;

    fn remove_item(&self, key: &str) -> anyhow::Result<()>;
}
