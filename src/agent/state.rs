//! Execution loop state.

use std::fmt;

/// Reason recorded when a run hits its iteration budget.
pub const BUDGET_EXCEEDED: &str = "iteration budget exceeded";

/// Reason recorded when an abort handle stops a run.
pub const CANCELLED: &str = "cancelled";

/// Where an execution loop is in its decide, invoke, observe cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Querying the reasoning service or dispatching a tool
    #[default]
    Running,
    /// The reasoning service produced a final answer
    Finished(String),
    /// The run stopped without a final answer
    Abandoned(String),
}

impl LoopState {
    /// Returns true while the loop is still iterating.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true once a final answer was produced.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }

    /// Returns true if the run stopped without a final answer.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Self::Abandoned(_))
    }

    /// Returns true in either terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.is_running()
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Finished(_) => write!(f, "finished"),
            Self::Abandoned(reason) => write!(f, "abandoned ({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_running() {
        assert_eq!(LoopState::default(), LoopState::Running);
        assert!(LoopState::default().is_running());
    }

    #[test]
    fn terminal_states() {
        assert!(LoopState::Finished("5".to_string()).is_terminal());
        assert!(LoopState::Abandoned(BUDGET_EXCEEDED.to_string()).is_abandoned());
        assert!(!LoopState::Running.is_terminal());
    }

    #[test]
    fn display_format() {
        assert_eq!(LoopState::Running.to_string(), "running");
        assert_eq!(
            LoopState::Abandoned(BUDGET_EXCEEDED.to_string()).to_string(),
            "abandoned (iteration budget exceeded)"
        );
    }
}
