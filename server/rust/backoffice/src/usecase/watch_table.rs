use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::table_store::TableStore;
use super::table_view::{TableView, TableViewRegistry};
use crate::infrastructure::event_bus::TableEventBus;

/// 取得失敗時の試行回数と初回待機時間。待機は試行ごとに倍になる。
const REFETCH_MAX_ATTEMPTS: u32 = 4;
const REFETCH_INITIAL_DELAY: Duration = Duration::from_millis(50);

/// WatchTableUseCase はイベントバスを購読し、監視対象テーブルの変更通知を受けるたびに
/// 全行を取り直して TableView を更新する。通知の内容は差分として適用しない。
pub struct WatchTableUseCase {
    store: Arc<TableStore>,
    views: Arc<TableViewRegistry>,
    event_bus: Arc<TableEventBus>,
}

impl WatchTableUseCase {
    pub fn new(
        store: Arc<TableStore>,
        views: Arc<TableViewRegistry>,
        event_bus: Arc<TableEventBus>,
    ) -> Self {
        Self {
            store,
            views,
            event_bus,
        }
    }

    /// 監視タスクを起動する。初回取得の前に購読するため、起動直後の変更も取りこぼさない。
    pub fn spawn(&self, table_id: &str) -> JoinHandle<()> {
        let view = self.views.get_or_create(table_id);
        let store = self.store.clone();
        let mut rx = self.event_bus.subscribe();

        tokio::spawn(async move {
            refresh(&view, &store).await;
            info!(table_id = %view.table_id(), "table watch started");
            loop {
                match rx.recv().await {
                    Ok(event) if event.affects_table(view.table_id()) => {
                        debug!(table_id = %view.table_id(), ?event, "table change received");
                        refresh(&view, &store).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(table_id = %view.table_id(), skipped, "table watch lagged");
                        refresh(&view, &store).await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            info!(table_id = %view.table_id(), "table watch stopped");
        })
    }
}

/// ビューを取り直す。取得に失敗した場合は待機を挟んで再試行する。
async fn refresh(view: &TableView, store: &TableStore) {
    let mut delay = REFETCH_INITIAL_DELAY;
    for attempt in 1..=REFETCH_MAX_ATTEMPTS {
        match view.refresh(store).await {
            Ok(true) => return,
            Ok(false) => {
                debug!(table_id = %view.table_id(), "stale table fetch discarded");
                return;
            }
            Err(e) if attempt < REFETCH_MAX_ATTEMPTS => {
                warn!(
                    table_id = %view.table_id(),
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "table refetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                warn!(
                    table_id = %view.table_id(),
                    attempts = REFETCH_MAX_ATTEMPTS,
                    error = %e,
                    "table refetch gave up until next change"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::domain::entity::row::Row;
    use crate::domain::repository::row_store::MockRowStore;
    use crate::domain::repository::RowStore;
    use crate::domain::value_object::StorageBackend;
    use crate::infrastructure::persistence::local_row_store::LocalRowStore;
    use crate::infrastructure::persistence::memory_kv_store::InMemoryKeyValueStore;
    use serde_json::json;

    async fn wait_for_rows(views: &TableViewRegistry, table_id: &str, expected: usize) -> Vec<Row> {
        for _ in 0..100 {
            if let Some(rows) = views.snapshot(table_id) {
                if rows.len() == expected {
                    return rows;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("table view did not reach {} rows", expected);
    }

    #[tokio::test]
    async fn test_watch_refetches_on_change() {
        let bus = Arc::new(TableEventBus::default());
        let local: Arc<dyn RowStore> =
            Arc::new(LocalRowStore::new(Arc::new(InMemoryKeyValueStore::new())));
        let store = Arc::new(TableStore::new(
            HashMap::new(),
            StorageBackend::Local,
            None,
            local,
            bus.clone(),
        ));
        let views = Arc::new(TableViewRegistry::new());
        let uc = WatchTableUseCase::new(store.clone(), views.clone(), bus);

        let handle = uc.spawn("documents");
        wait_for_rows(&views, "documents", 0).await;

        store
            .insert("documents", &[], &json!({"id": "D1"}).as_object().cloned().unwrap())
            .await
            .unwrap();
        let rows = wait_for_rows(&views, "documents", 1).await;
        assert_eq!(rows[0]["id"], json!("D1"));

        // 他テーブルの変更では取り直さない
        store
            .insert("other", &[], &json!({"id": "O1"}).as_object().cloned().unwrap())
            .await
            .unwrap();
        assert_eq!(views.snapshot("documents").unwrap().len(), 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_failed_refetch_is_retried() {
        let mut local = MockRowStore::new();
        local
            .expect_fetch()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("connection reset")));
        local
            .expect_fetch()
            .returning(|_| Ok(vec![json!({"id": "D1"}).as_object().cloned().unwrap()]));
        let bus = Arc::new(TableEventBus::default());
        let store = Arc::new(TableStore::new(
            HashMap::new(),
            StorageBackend::Local,
            None,
            Arc::new(local),
            bus.clone(),
        ));
        let views = Arc::new(TableViewRegistry::new());
        let uc = WatchTableUseCase::new(store, views.clone(), bus);

        let handle = uc.spawn("documents");
        // 初回取得は失敗するが、次の変更通知を待たずに取り直される
        let rows = wait_for_rows(&views, "documents", 1).await;
        assert_eq!(rows[0]["id"], json!("D1"));

        handle.abort();
    }
}
