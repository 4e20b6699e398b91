use serde::{Deserialize, Serialize};
use std::fmt;

/// ChangeStatus は変更申請および変更明細の状態を表す。
/// APPROVED / REJECTED は終端状態であり、以降の遷移は発生しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    Pending,
    Approved,
    Rejected,
}

impl ChangeStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!ChangeStatus::Pending.is_terminal());
        assert!(ChangeStatus::Approved.is_terminal());
        assert!(ChangeStatus::Rejected.is_terminal());
    }

    #[test]
    fn parse_roundtrip() {
        for status in [ChangeStatus::Pending, ChangeStatus::Approved, ChangeStatus::Rejected] {
            assert_eq!(ChangeStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ChangeStatus::parse("DONE"), None);
    }
}
