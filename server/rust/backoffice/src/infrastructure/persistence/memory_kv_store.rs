use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::entity::table_event::TableEvent;
use crate::domain::repository::KeyValueStore;
use crate::infrastructure::event_bus::TableEventBus;

/// InMemoryKeyValueStore はプロセス内で完結するキー・バリューストア。
/// ローカルストアのパスが設定されていない場合とテストで使用する。
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    items: RwLock<HashMap<String, String>>,
    event_bus: Option<Arc<TableEventBus>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 書き込みのたびに StorageChanged を配信するストアを生成する。
    pub fn with_event_bus(event_bus: Arc<TableEventBus>) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            event_bus: Some(event_bus),
        }
    }

    fn notify(&self, key: &str) {
        if let Some(bus) = &self.event_bus {
            bus.publish(TableEvent::StorageChanged {
                key: key.to_string(),
            });
        }
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let items = self
            .items
            .read()
            .map_err(|_| anyhow::anyhow!("key-value store lock poisoned"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        {
            let mut items = self
                .items
                .write()
                .map_err(|_| anyhow::anyhow!("key-value store lock poisoned"))?;
            items.insert(key.to_string(), value.to_string());
        }
        self.notify(key);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        let removed = {
            let mut items = self
                .items
                .write()
                .map_err(|_| anyhow::anyhow!("key-value store lock poisoned"))?;
            items.remove(key).is_some()
        };
        if removed {
            self.notify(key);
        }
        Ok(())
    }
}
