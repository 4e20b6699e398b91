use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// SortKey は 1 つのソート条件を表す。SortKey の並びは左端を第一キーとする全順序を定義する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column_key: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(column_key: impl Into<String>) -> Self {
        Self {
            column_key: column_key.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column_key: impl Into<String>) -> Self {
        Self {
            column_key: column_key.into(),
            direction: SortDirection::Desc,
        }
    }

    /// "name,-created_at" 形式のクエリ文字列を SortKey 列に変換する。
    /// 先頭の '-' は降順を表す。空要素は無視する。
    pub fn parse_list(s: &str) -> Vec<Self> {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .filter_map(|item| match item.strip_prefix('-') {
                Some("") => None,
                Some(col) => Some(Self::desc(col)),
                None => Some(Self::asc(item)),
            })
            .collect()
    }
}
