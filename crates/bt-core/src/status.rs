#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lifecycle status of an execution task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Status {
    /// Created but not spawned yet.
    #[default]
    Uninitialized,
    Running,
    Success,
    Failure,
    /// Forcibly stopped by its parent or by the executor.
    Terminated,
}

impl Status {
    /// `Success` or `Failure`.
    pub fn is_finished(self) -> bool {
        matches!(self, Status::Success | Status::Failure)
    }

    /// Whether a node-specific tick routine may legally return this value.
    pub fn is_tick_result(self) -> bool {
        matches!(self, Status::Running | Status::Success | Status::Failure)
    }

    /// Swap `Success` and `Failure`; every other status is returned unchanged.
    pub fn inverted(self) -> Self {
        match self {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            other => other,
        }
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            Status::Success
        } else {
            Status::Failure
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Status::Uninitialized => "uninitialized",
            Status::Running => "running",
            Status::Success => "success",
            Status::Failure => "failure",
            Status::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Old/new status pair delivered to a parent when one of its children finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub old: Status,
    pub new: Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_running_success_failure_are_tick_results() {
        assert!(Status::Running.is_tick_result());
        assert!(Status::Success.is_tick_result());
        assert!(Status::Failure.is_tick_result());
        assert!(!Status::Terminated.is_tick_result());
        assert!(!Status::Uninitialized.is_tick_result());
    }

    #[test]
    fn inversion_leaves_non_terminal_statuses_alone() {
        assert_eq!(Status::Success.inverted(), Status::Failure);
        assert_eq!(Status::Failure.inverted(), Status::Success);
        assert_eq!(Status::Running.inverted(), Status::Running);
        assert_eq!(Status::Terminated.inverted(), Status::Terminated);
    }
}
