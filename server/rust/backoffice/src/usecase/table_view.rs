use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::table_store::{TableStore, TableStoreError};
use crate::domain::entity::row::Row;

struct Snapshot {
    epoch: u64,
    rows: Vec<Row>,
}

/// TableView はテーブルの最後に取得したスナップショットを保持する。
/// 取得要求ごとにエポックを採番し、最新の要求より古い取得結果は破棄する。
pub struct TableView {
    table_id: String,
    issued: AtomicU64,
    snapshot: RwLock<Option<Snapshot>>,
}

impl TableView {
    pub fn new(table_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            issued: AtomicU64::new(0),
            snapshot: RwLock::new(None),
        }
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    /// 取得要求を発行し、そのエポックを返す。
    pub fn begin_fetch(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 取得結果を反映する。より新しい要求が発行済みなら破棄して false を返す。
    pub fn commit(&self, epoch: u64, rows: Vec<Row>) -> bool {
        if epoch < self.issued.load(Ordering::SeqCst) {
            return false;
        }
        let Ok(mut slot) = self.snapshot.write() else {
            return false;
        };
        if slot.as_ref().is_some_and(|s| s.epoch >= epoch) {
            return false;
        }
        *slot = Some(Snapshot { epoch, rows });
        true
    }

    /// 反映済みのスナップショット。まだ一度も取得していなければ None。
    pub fn rows(&self) -> Option<Vec<Row>> {
        self.snapshot
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().map(|s| s.rows.clone()))
    }

    /// ストアから全行を取り直してスナップショットを更新する。
    pub async fn refresh(&self, store: &TableStore) -> Result<bool, TableStoreError> {
        let epoch = self.begin_fetch();
        let rows = store.fetch(&self.table_id).await?;
        Ok(self.commit(epoch, rows))
    }
}

/// TableViewRegistry は監視中テーブルの TableView を保持する。
#[derive(Default)]
pub struct TableViewRegistry {
    views: RwLock<HashMap<String, Arc<TableView>>>,
}

impl TableViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table_id: &str) -> Option<Arc<TableView>> {
        self.views.read().ok()?.get(table_id).cloned()
    }

    pub fn get_or_create(&self, table_id: &str) -> Arc<TableView> {
        if let Some(view) = self.get(table_id) {
            return view;
        }
        match self.views.write() {
            Ok(mut views) => views
                .entry(table_id.to_string())
                .or_insert_with(|| Arc::new(TableView::new(table_id)))
                .clone(),
            Err(_) => Arc::new(TableView::new(table_id)),
        }
    }

    /// 反映済みスナップショットがあればそれを返す。
    pub fn snapshot(&self, table_id: &str) -> Option<Vec<Row>> {
        self.get(table_id)?.rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(id: &str) -> Vec<Row> {
        vec![json!({"id": id}).as_object().cloned().unwrap()]
    }

    #[test]
    fn test_stale_fetch_result_is_discarded() {
        let view = TableView::new("applications");
        let first = view.begin_fetch();
        let second = view.begin_fetch();

        // 後から発行した要求が先に完了する
        assert!(view.commit(second, rows("new")));
        assert!(!view.commit(first, rows("old")));
        assert_eq!(view.rows().unwrap(), rows("new"));
    }

    #[test]
    fn test_in_order_results_are_applied() {
        let view = TableView::new("applications");
        assert!(view.rows().is_none());

        let e1 = view.begin_fetch();
        assert!(view.commit(e1, rows("a")));
        let e2 = view.begin_fetch();
        assert!(view.commit(e2, rows("b")));
        assert_eq!(view.rows().unwrap(), rows("b"));
        // 同じエポックの二重反映はしない
        assert!(!view.commit(e2, rows("c")));
    }

    #[test]
    fn test_registry_reuses_views() {
        let registry = TableViewRegistry::new();
        assert!(registry.get("applications").is_none());
        let a = registry.get_or_create("applications");
        let b = registry.get_or_create("applications");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.snapshot("applications").is_none());

        let epoch = a.begin_fetch();
        a.commit(epoch, rows("x"));
        assert_eq!(registry.snapshot("applications").unwrap(), rows("x"));
    }
}
