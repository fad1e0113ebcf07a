//! Configuration file schema.

use crate::agent::AgentConfig;
use crate::error::AgentError;
use crate::llm::ProviderConfig;
use crate::logging::LoggingConfig;
use crate::tools::ToolEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment variable overriding the agent system message.
pub const SYSTEM_MESSAGE_ENV: &str = "SYSTEM_MESSAGE";

/// Environment variable overriding the iteration budget.
pub const MAX_ITERATIONS_ENV: &str = "MAX_ITERATIONS";

/// Root of the configuration file.
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Loop settings
    pub agent: AgentConfig,
    /// Reasoning service settings
    pub provider: ProviderConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Tool entries by name; None enables every built-in with defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<BTreeMap<String, ToolEntry>>,
}

impl AppConfig {
    /// Applies `SYSTEM_MESSAGE` and `MAX_ITERATIONS` from the process
    /// environment. The API key is resolved lazily by the provider.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `MAX_ITERATIONS` is not a number.
    pub fn apply_env(&mut self) -> Result<(), AgentError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the iteration override is not a number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(message) = lookup(SYSTEM_MESSAGE_ENV).filter(|m| !m.trim().is_empty()) {
            self.agent.system_message = message;
        }

        if let Some(raw) = lookup(MAX_ITERATIONS_ENV) {
            self.agent.max_iterations = raw.trim().parse().map_err(|_| {
                AgentError::configuration(
                    "max_iterations",
                    format!("{MAX_ITERATIONS_ENV}='{raw}' is not a positive integer"),
                )
            })?;
        }

        Ok(())
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field as a configuration error.
    pub fn validate(&self) -> Result<(), AgentError> {
        self.agent.validate()?;
        self.provider.validate()?;
        Ok(())
    }
}
