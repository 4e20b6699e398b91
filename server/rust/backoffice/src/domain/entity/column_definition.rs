use serde::{Deserialize, Serialize};

use crate::domain::value_object::{DataType, InputMode};

/// ColumnDefinition は論理テーブルのカラム定義を表す。
/// key はスキーマ内で一意でなければならない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub key: String,
    pub display_name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub input_mode: InputMode,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default = "default_true")]
    pub filterable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_options: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl ColumnDefinition {
    /// 編集可能な単純型カラムを生成する。ソート・フィルタはともに有効。
    pub fn new(key: impl Into<String>, display_name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            data_type,
            input_mode: InputMode::Input,
            is_required: false,
            sortable: true,
            filterable: true,
            filter_options: None,
        }
    }

    /// 主キーカラムを生成する。主キーは常に Output。
    pub fn primary_key(key: impl Into<String>) -> Self {
        let key = key.into();
        let display_name = title_case(&key);
        Self {
            input_mode: InputMode::Output,
            ..Self::new(key, display_name, DataType::String)
        }
    }

    pub fn read_only(mut self) -> Self {
        self.input_mode = InputMode::Output;
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn is_editable(&self) -> bool {
        self.input_mode.is_editable()
    }
}

/// snake_case のキーから表示名を生成する。"loan_amount" → "Loan Amount"。
/// "id" セグメントは "ID" と表記する。
pub fn title_case(key: &str) -> String {
    key.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|word| {
            if word.eq_ignore_ascii_case("id") {
                return "ID".to_string();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
