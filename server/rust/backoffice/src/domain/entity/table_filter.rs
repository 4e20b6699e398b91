use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::value_object::{FilterOperator, FilterType};

/// TableFilter は 1 カラムに対する述語フィルタを表す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableFilter {
    pub column_key: String,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub operator: FilterOperator,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Value>,
}

impl TableFilter {
    pub fn new(
        column_key: impl Into<String>,
        filter_type: FilterType,
        operator: FilterOperator,
        value: Value,
    ) -> Self {
        Self {
            column_key: column_key.into(),
            filter_type,
            operator,
            value,
            value2: None,
        }
    }

    pub fn between(
        column_key: impl Into<String>,
        filter_type: FilterType,
        value: Value,
        value2: Value,
    ) -> Self {
        Self {
            value2: Some(value2),
            ..Self::new(column_key, filter_type, FilterOperator::Between, value)
        }
    }
}

/// FilterSet は有効なフィルタの集合。カラムごとに高々 1 つのフィルタを保持し、
/// 同じカラムへの再設定は既存フィルタを置き換える。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    filters: Vec<TableFilter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, filter: TableFilter) {
        match self
            .filters
            .iter_mut()
            .find(|f| f.column_key == filter.column_key)
        {
            Some(existing) => *existing = filter,
            None => self.filters.push(filter),
        }
    }

    pub fn remove(&mut self, column_key: &str) -> Option<TableFilter> {
        let idx = self.filters.iter().position(|f| f.column_key == column_key)?;
        Some(self.filters.remove(idx))
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn as_slice(&self) -> &[TableFilter] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl FromIterator<TableFilter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = TableFilter>>(iter: I) -> Self {
        let mut set = Self::new();
        for filter in iter {
            set.set(filter);
        }
        set
    }
}
