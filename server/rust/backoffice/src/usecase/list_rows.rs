use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::schema_registry::SchemaRegistry;
use super::table_store::{TableStore, TableStoreError};
use super::table_view::TableViewRegistry;
use crate::domain::entity::row::Row;
use crate::domain::entity::sort_key::SortKey;
use crate::domain::entity::table_filter::{FilterSet, TableFilter};
use crate::domain::service::{FilterEngine, SortEngine};

const MAX_PAGE_SIZE: usize = 1_000;

/// ListRowsError は行一覧取得に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum ListRowsError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// ListRowsInput は行一覧取得のリクエストを表す。
#[derive(Debug, Clone, Default)]
pub struct ListRowsInput {
    pub table_id: String,
    pub filters: Vec<TableFilter>,
    pub sort: Vec<SortKey>,
    /// 1 始まり。page_size と組み合わせて使う。
    pub page: Option<usize>,
    /// 未指定なら全件を返す。
    pub page_size: Option<usize>,
}

/// RowPage は絞り込み・並べ替え後の 1 ページ分の行を表す。
#[derive(Debug, Clone, Serialize)]
pub struct RowPage {
    pub rows: Vec<Row>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// ListRowsUseCase は行を取得し、フィルタ → ソート → ページングの順で返す。
/// 監視中のテーブルは TableView のスナップショットを使う。
pub struct ListRowsUseCase {
    registry: Arc<SchemaRegistry>,
    store: Arc<TableStore>,
    views: Arc<TableViewRegistry>,
}

impl ListRowsUseCase {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        store: Arc<TableStore>,
        views: Arc<TableViewRegistry>,
    ) -> Self {
        Self {
            registry,
            store,
            views,
        }
    }

    pub async fn execute(&self, input: &ListRowsInput) -> Result<RowPage, ListRowsError> {
        if input.page == Some(0) {
            return Err(ListRowsError::Validation("page must be >= 1".to_string()));
        }
        if let Some(size) = input.page_size {
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(ListRowsError::Validation(format!(
                    "page_size must be between 1 and {}",
                    MAX_PAGE_SIZE
                )));
            }
        }

        let rows = match self.views.snapshot(&input.table_id) {
            Some(rows) => rows,
            None => self.store.fetch(&input.table_id).await.map_err(|e| match e {
                TableStoreError::RemoteUnavailable(t) => ListRowsError::Unavailable(t),
                other => ListRowsError::Internal(other.to_string()),
            })?,
        };

        // 同じカラムへのフィルタは後勝ち
        let mut filters: FilterSet = input.filters.iter().cloned().collect();
        let mut sort = input.sort.clone();
        if let Some(schema) = self.registry.get_schema(&input.table_id).await {
            for f in input.filters.iter() {
                if schema.column(&f.column_key).is_some_and(|c| !c.filterable) {
                    debug!(column = %f.column_key, "ignoring filter on non-filterable column");
                    filters.remove(&f.column_key);
                }
            }
            sort.retain(|k| schema.column(&k.column_key).is_none_or(|c| c.sortable));
        }

        let filtered = FilterEngine::apply(&rows, filters.as_slice());
        let sorted = SortEngine::apply(&filtered, &sort);
        let total = sorted.len();

        let page = input.page.unwrap_or(1);
        let page_size = input.page_size.unwrap_or(total);
        let rows = if page_size == 0 {
            Vec::new()
        } else {
            sorted
                .into_iter()
                .skip((page - 1).saturating_mul(page_size))
                .take(page_size)
                .collect()
        };

        Ok(RowPage {
            rows,
            total,
            page,
            page_size,
        })
    }
}
