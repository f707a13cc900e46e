use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a release build.
///
/// `PENDING -> BEFORE_TRIGGER -> RUNNING -> (COMPLETED | FAILED)`. A build may
/// also fail straight from `PENDING` or `BEFORE_TRIGGER` when it is abandoned
/// before any table pass starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Pending,
    BeforeTrigger,
    Running,
    Completed,
    Failed,
}

impl BuildStatus {
    pub fn can_transition_to(self, next: BuildStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::BeforeTrigger)
                | (Self::BeforeTrigger, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Pending | Self::BeforeTrigger | Self::Running, Self::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::BeforeTrigger => "BEFORE_TRIGGER",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        assert!(BuildStatus::Pending.can_transition_to(BuildStatus::BeforeTrigger));
        assert!(BuildStatus::BeforeTrigger.can_transition_to(BuildStatus::Running));
        assert!(BuildStatus::Running.can_transition_to(BuildStatus::Completed));
        assert!(BuildStatus::Running.can_transition_to(BuildStatus::Failed));
    }

    #[test]
    fn terminal_states_are_final() {
        for next in [
            BuildStatus::Pending,
            BuildStatus::BeforeTrigger,
            BuildStatus::Running,
            BuildStatus::Completed,
            BuildStatus::Failed,
        ] {
            assert!(!BuildStatus::Completed.can_transition_to(next));
            assert!(!BuildStatus::Failed.can_transition_to(next));
        }
        assert!(!BuildStatus::Pending.can_transition_to(BuildStatus::Completed));
    }
}
