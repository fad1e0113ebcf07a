//! Loop-level error types.
//!
//! Tool failures never show up here: they are observations fed back to the
//! reasoning service. `AgentError` covers what happens outside any tool.
//!
//! No external error crates (anyhow, thiserror, eyre) are used.

use crate::llm::{LLMError, LLMErrorKind};
use crate::tools::ToolError;
use std::fmt;
use std::time::Duration;

/// Errors that end a run or prevent one from starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentError {
    /// The specific error that occurred
    pub kind: AgentErrorKind,
}

/// Specific loop error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentErrorKind {
    /// The reasoning service returned an error
    ReasoningServiceFailure {
        /// The service's error
        source: LLMError,
    },
    /// The reasoning service did not answer within the deadline
    ReasoningTimeout {
        /// The deadline that expired
        duration: Duration,
    },
    /// The reasoning service panicked
    ReasoningPanicked,
    /// The loop ran out of iterations
    IterationBudgetExceeded {
        /// The configured budget
        max_iterations: usize,
    },
    /// Configuration error
    Configuration {
        /// The configuration field that was invalid
        field: String,
        /// Why it was invalid
        reason: String,
    },
    /// Reading input or writing output failed
    Io {
        /// Description of the failure
        reason: String,
    },
}

impl AgentError {
    /// Creates a new AgentError with the given kind.
    #[must_use]
    pub fn new(kind: AgentErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a reasoning service failure.
    #[must_use]
    pub fn reasoning_failure(source: LLMError) -> Self {
        Self::new(AgentErrorKind::ReasoningServiceFailure { source })
    }

    /// Creates a reasoning timeout error.
    #[must_use]
    pub fn reasoning_timeout(duration: Duration) -> Self {
        Self::new(AgentErrorKind::ReasoningTimeout { duration })
    }

    /// Creates a reasoning panicked error.
    #[must_use]
    pub fn reasoning_panicked() -> Self {
        Self::new(AgentErrorKind::ReasoningPanicked)
    }

    /// Creates an iteration budget exceeded error.
    #[must_use]
    pub fn iteration_budget_exceeded(max_iterations: usize) -> Self {
        Self::new(AgentErrorKind::IterationBudgetExceeded { max_iterations })
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::Configuration {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates an I/O error.
    #[must_use]
    pub fn io(reason: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::Io {
            reason: reason.into(),
        })
    }

    /// Returns true if the reasoning service failed, timed out or panicked.
    #[must_use]
    pub fn is_reasoning_failure(&self) -> bool {
        matches!(
            self.kind,
            AgentErrorKind::ReasoningServiceFailure { .. }
                | AgentErrorKind::ReasoningTimeout { .. }
                | AgentErrorKind::ReasoningPanicked
        )
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, AgentErrorKind::Configuration { .. })
    }
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AgentErrorKind::ReasoningServiceFailure { source } => {
                write!(f, "reasoning service failed: {source}")
            }
            AgentErrorKind::ReasoningTimeout { duration } => {
                write!(
                    f,
                    "reasoning service did not respond within {} seconds; raise reasoning_timeout_secs or check the provider",
                    duration.as_secs()
                )
            }
            AgentErrorKind::ReasoningPanicked => {
                write!(f, "reasoning service panicked while choosing the next action")
            }
            AgentErrorKind::IterationBudgetExceeded { max_iterations } => {
                write!(
                    f,
                    "iteration budget of {max_iterations} exceeded; raise max_iterations or simplify the task"
                )
            }
            AgentErrorKind::Configuration { field, reason } => {
                write!(f, "invalid configuration for '{field}': {reason}")
            }
            AgentErrorKind::Io { reason } => write!(f, "I/O error: {reason}"),
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            AgentErrorKind::ReasoningServiceFailure { source } => Some(source),
            _ => None,
        }
    }
}

impl From<LLMError> for AgentError {
    fn from(error: LLMError) -> Self {
        match error.kind {
            LLMErrorKind::InvalidConfig { field, reason } => Self::configuration(field, reason),
            _ => Self::reasoning_failure(error),
        }
    }
}

impl From<ToolError> for AgentError {
    fn from(error: ToolError) -> Self {
        Self::configuration("tools", error.to_string())
    }
}

impl From<std::io::Error> for AgentError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_failure_wraps_source() {
        let error = AgentError::from(LLMError::network("connection refused"));
        assert!(error.is_reasoning_failure());
        assert!(error.to_string().contains("connection refused"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn llm_config_errors_become_configuration() {
        let error = AgentError::from(LLMError::invalid_config("model", "must not be empty"));
        assert!(error.is_configuration());
        assert!(!error.is_reasoning_failure());
        assert_eq!(
            error.to_string(),
            "invalid configuration for 'model': must not be empty"
        );
    }

    #[test]
    fn timeout_and_panic_count_as_reasoning_failures() {
        assert!(AgentError::reasoning_timeout(Duration::from_secs(5)).is_reasoning_failure());
        assert!(AgentError::reasoning_panicked().is_reasoning_failure());
    }

    #[test]
    fn budget_display_mentions_limit() {
        let error = AgentError::iteration_budget_exceeded(5);
        assert!(error.to_string().contains("budget of 5"));
    }
}
