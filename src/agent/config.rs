//! Execution loop configuration.
//!
//! Maps onto the `[agent]` table of the configuration file.

use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default system message.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant. Use the available tools \
when they help you answer accurately, and reply with a final answer once you have enough \
information.";

/// Configuration for an [`ExecutionLoop`](crate::agent::ExecutionLoop).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Standing instructions for the reasoning service
    pub system_message: String,
    /// Maximum number of tool steps per run
    pub max_iterations: usize,
    /// Sampling temperature passed to the reasoning service
    pub temperature: f32,
    /// Record rationale and raw decision history for every run
    pub debug: bool,
    /// Deadline for a single reasoning query, in seconds
    pub reasoning_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            max_iterations: 5,
            temperature: 0.0,
            debug: false,
            reasoning_timeout_secs: 120,
        }
    }
}

impl AgentConfig {
    /// Creates a configuration with the given system message.
    ///
    /// # Examples
    ///
    /// ```
    /// use acton_tools_agent::agent::AgentConfig;
    ///
    /// let config = AgentConfig::new("You are a helpful assistant.");
    /// assert_eq!(config.max_iterations, 5);
    /// ```
    #[must_use]
    pub fn new(system_message: impl Into<String>) -> Self {
        Self {
            system_message: system_message.into(),
            ..Self::default()
        }
    }

    /// Sets the iteration budget.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Enables debug recording for every run.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the per-query reasoning deadline.
    #[must_use]
    pub fn with_reasoning_timeout(mut self, timeout: Duration) -> Self {
        self.reasoning_timeout_secs = timeout.as_secs();
        self
    }

    /// Returns the per-query reasoning deadline.
    #[must_use]
    pub fn reasoning_timeout(&self) -> Duration {
        Duration::from_secs(self.reasoning_timeout_secs)
    }

    /// Checks the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending field.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.max_iterations == 0 {
            return Err(AgentError::configuration(
                "max_iterations",
                "must be at least 1",
            ));
        }
        if self.reasoning_timeout_secs == 0 {
            return Err(AgentError::configuration(
                "reasoning_timeout_secs",
                "must be at least 1",
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AgentError::configuration(
                "temperature",
                "must be between 0.0 and 2.0",
            ));
        }
        Ok(())
    }
}
