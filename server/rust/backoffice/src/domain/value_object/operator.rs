use serde::{Deserialize, Serialize};

/// FilterType はフィルタが値をどの型として比較するかを表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Text,
    Number,
    Boolean,
    Date,
}

/// FilterOperator はフィルタ演算子を表す。
/// 利用可能な演算子は FilterType ごとに異なる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
    Gt,
    Lt,
    Gte,
    Lte,
    Between,
    Is,
    IsNot,
}

impl FilterOperator {
    /// 演算子が指定された FilterType で利用可能かを判定する。
    pub fn is_supported_by(self, filter_type: FilterType) -> bool {
        match filter_type {
            FilterType::Text => matches!(
                self,
                Self::Contains | Self::Equals | Self::StartsWith | Self::EndsWith
            ),
            FilterType::Number | FilterType::Date => matches!(
                self,
                Self::Equals | Self::Gt | Self::Lt | Self::Gte | Self::Lte | Self::Between
            ),
            FilterType::Boolean => matches!(self, Self::Is | Self::IsNot),
        }
    }
}
