use serde::{Deserialize, Serialize};

/// InputMode はカラムが編集可能 (Input) か算出・読み取り専用 (Output) かを表す。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    #[default]
    Input,
    Output,
}

impl InputMode {
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Input)
    }
}
