use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entity::table_version::TableVersion;
use crate::domain::repository::{KeyValueStore, TableVersionRepository};

/// TableVersionKvRepository はテーブルごとのバージョン履歴を
/// キー・バリューストアの "table_versions:{table_id}" に JSON 配列で保存する。
/// 配列は古い順に並べて保持する。
pub struct TableVersionKvRepository {
    kv: Arc<dyn KeyValueStore>,
    // 読み出しから書き戻しまでを直列化する
    write_lock: Mutex<()>,
}

impl TableVersionKvRepository {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    pub fn storage_key(table_id: &str) -> String {
        format!("table_versions:{}", table_id)
    }

    fn load(&self, table_id: &str) -> anyhow::Result<Vec<TableVersion>> {
        match self.kv.get_item(&Self::storage_key(table_id))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn store(&self, table_id: &str, versions: &[TableVersion]) -> anyhow::Result<()> {
        self.kv
            .set_item(&Self::storage_key(table_id), &serde_json::to_string(versions)?)
    }
}

#[async_trait]
impl TableVersionRepository for TableVersionKvRepository {
    async fn find_by_table(&self, table_id: &str) -> anyhow::Result<Vec<TableVersion>> {
        let mut versions = self.load(table_id)?;
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    async fn find_by_id(&self, table_id: &str, version_id: &Uuid) -> anyhow::Result<Option<TableVersion>> {
        Ok(self
            .load(table_id)?
            .into_iter()
            .find(|v| v.id == *version_id))
    }

    async fn create(&self, version: &TableVersion) -> anyhow::Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("version store lock poisoned"))?;
        let mut versions = self.load(&version.table_id)?;
        if versions
            .iter()
            .any(|v| v.id == version.id || v.version_number == version.version_number)
        {
            anyhow::bail!(
                "version {} already exists for table {}",
                version.version_number,
                version.table_id
            );
        }
        versions.push(version.clone());
        self.store(&version.table_id, &versions)
    }

    async fn delete(&self, table_id: &str, version_id: &Uuid) -> anyhow::Result<bool> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("version store lock poisoned"))?;
        let mut versions = self.load(table_id)?;
        let before = versions.len();
        versions.retain(|v| v.id != *version_id);
        if versions.len() == before {
            return Ok(false);
        }
        self.store(table_id, &versions)?;
        Ok(true)
    }

    async fn prune(&self, table_id: &str, keep: usize) -> anyhow::Result<usize> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("version store lock poisoned"))?;
        let mut versions = self.load(table_id)?;
        if versions.len() <= keep {
            return Ok(0);
        }
        versions.sort_by_key(|v| v.version_number);
        let removed = versions.len() - keep;
        versions.drain(..removed);
        self.store(table_id, &versions)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::table_version::CreateTableVersion;
    use crate::infrastructure::persistence::memory_kv_store::InMemoryKeyValueStore;

    fn version(table_id: &str, number: i64) -> TableVersion {
        TableVersion::new(CreateTableVersion {
            table_id: table_id.to_string(),
            version_number: number,
            created_by: "analyst@example.com".to_string(),
            description: format!("v{}", number),
            data: vec![],
            schema_snapshot: None,
        })
    }

    #[tokio::test]
    async fn test_find_by_table_newest_first() {
        let repo = TableVersionKvRepository::new(Arc::new(InMemoryKeyValueStore::new()));
        for n in 1..=3 {
            repo.create(&version("rate_sheets", n)).await.unwrap();
        }
        repo.create(&version("dealer_programs", 1)).await.unwrap();

        let versions = repo.find_by_table("rate_sheets").await.unwrap();
        let numbers: Vec<i64> = versions.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
        assert_eq!(repo.find_by_table("dealer_programs").await.unwrap().len(), 1);
        assert!(repo.find_by_table("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let repo = TableVersionKvRepository::new(Arc::new(InMemoryKeyValueStore::new()));
        let v = version("rate_sheets", 1);
        repo.create(&v).await.unwrap();

        assert_eq!(repo.find_by_id("rate_sheets", &v.id).await.unwrap(), Some(v.clone()));
        assert!(repo.find_by_id("other", &v.id).await.unwrap().is_none());
        assert!(repo
            .find_by_id("rate_sheets", &Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_version_number_is_rejected() {
        let repo = TableVersionKvRepository::new(Arc::new(InMemoryKeyValueStore::new()));
        repo.create(&version("rate_sheets", 1)).await.unwrap();
        assert!(repo.create(&version("rate_sheets", 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_prune_keeps_newest() {
        let repo = TableVersionKvRepository::new(Arc::new(InMemoryKeyValueStore::new()));
        for n in 1..=5 {
            repo.create(&version("rate_sheets", n)).await.unwrap();
        }

        assert_eq!(repo.prune("rate_sheets", 2).await.unwrap(), 3);
        let numbers: Vec<i64> = repo
            .find_by_table("rate_sheets")
            .await
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();
        assert_eq!(numbers, vec![5, 4]);
        assert_eq!(repo.prune("rate_sheets", 10).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_only_the_given_version() {
        let repo = TableVersionKvRepository::new(Arc::new(InMemoryKeyValueStore::new()));
        let v1 = version("rate_sheets", 1);
        let v2 = version("rate_sheets", 2);
        repo.create(&v1).await.unwrap();
        repo.create(&v2).await.unwrap();

        assert!(repo.delete("rate_sheets", &v2.id).await.unwrap());
        assert!(!repo.delete("rate_sheets", &v2.id).await.unwrap());
        let remaining = repo.find_by_table("rate_sheets").await.unwrap();
        assert_eq!(remaining, vec![v1]);
    }
}
