//! Built-in tools.
//!
//! ## Available Tools
//!
//! - **calculator**: arithmetic over numbers and nested expressions
//! - **http_request**: GET/POST/PUT/DELETE against public HTTP endpoints
//! - **wikipedia**: article summaries from Wikipedia
//! - **code_execution**: Python snippets in a process sandbox
//!
//! ## Usage
//!
//! ```rust
//! use acton_tools_agent::tools::builtins::BuiltinKind;
//!
//! let kind: BuiltinKind = "calculator".parse().unwrap();
//! let tool = kind.build(&toml::Table::new()).unwrap();
//! assert_eq!(tool.config().name(), "calculator");
//! ```

mod calculator;
mod code_execution;
mod http_request;
mod wikipedia;

pub use calculator::CalculatorTool;
pub use code_execution::CodeExecutionTool;
pub use http_request::{HttpRequestSettings, HttpRequestTool};
pub use wikipedia::{WikipediaSettings, WikipediaTool};

use crate::tools::sandbox::SandboxPolicy;
use crate::tools::{ToolConfig, ToolError, ToolExecutor};
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The built-in tool types, keyed by their configuration `type` name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    /// [`CalculatorTool`]
    Calculator,
    /// [`HttpRequestTool`]
    HttpRequest,
    /// [`WikipediaTool`]
    Wikipedia,
    /// [`CodeExecutionTool`]
    CodeExecution,
}

impl BuiltinKind {
    /// Every built-in, in catalog order.
    pub const ALL: [Self; 4] = [
        Self::Calculator,
        Self::HttpRequest,
        Self::Wikipedia,
        Self::CodeExecution,
    ];

    /// Returns the configuration `type` name, which is also the tool name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Calculator => "calculator",
            Self::HttpRequest => "http_request",
            Self::Wikipedia => "wikipedia",
            Self::CodeExecution => "code_execution",
        }
    }

    /// Returns the static tool configuration without constructing the tool.
    #[must_use]
    pub fn tool_config(self) -> ToolConfig {
        match self {
            Self::Calculator => CalculatorTool::tool_config(),
            Self::HttpRequest => HttpRequestTool::tool_config(),
            Self::Wikipedia => WikipediaTool::tool_config(),
            Self::CodeExecution => CodeExecutionTool::tool_config(),
        }
    }

    /// Constructs the tool from its `config` table.
    ///
    /// An empty table yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the table does not match the tool's settings,
    /// or whatever error the tool's constructor reports.
    pub fn build(self, settings: &toml::Table) -> Result<Arc<dyn ToolExecutor>, ToolError> {
        let tool: Arc<dyn ToolExecutor> = match self {
            Self::Calculator => Arc::new(CalculatorTool::new()),
            Self::HttpRequest => Arc::new(HttpRequestTool::new(self.settings(settings)?)?),
            Self::Wikipedia => Arc::new(WikipediaTool::new(self.settings(settings)?)?),
            Self::CodeExecution => {
                let policy: SandboxPolicy = self.settings(settings)?;
                Arc::new(CodeExecutionTool::new(policy)?)
            }
        };
        Ok(tool)
    }

    fn settings<T: DeserializeOwned>(self, table: &toml::Table) -> Result<T, ToolError> {
        toml::Value::Table(table.clone())
            .try_into()
            .map_err(|e| ToolError::invalid_input(self.name(), format!("invalid settings: {e}")))
    }
}

impl fmt::Display for BuiltinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuiltinKind {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ToolError::unknown_tool(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in BuiltinKind::ALL {
            assert_eq!(kind.name().parse::<BuiltinKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = "shell".parse::<BuiltinKind>().unwrap_err();
        assert!(err.is_unknown_tool());
    }

    #[test]
    fn every_builtin_builds_with_defaults() {
        for kind in BuiltinKind::ALL {
            let tool = kind.build(&toml::Table::new()).unwrap();
            assert_eq!(tool.config().name(), kind.name());
        }
    }

    #[test]
    fn static_config_matches_built_tool() {
        for kind in BuiltinKind::ALL {
            let config = kind.tool_config();
            assert_eq!(config.name(), kind.name());
            assert!(!config.definition.description.is_empty());
            assert_eq!(config.definition.input_schema["type"], "object");
        }
    }

    #[test]
    fn only_code_execution_is_sandboxed() {
        let sandboxed: Vec<_> = BuiltinKind::ALL
            .into_iter()
            .filter(|k| k.tool_config().sandboxed)
            .collect();
        assert_eq!(sandboxed, [BuiltinKind::CodeExecution]);
    }

    #[test]
    fn settings_table_is_applied() {
        let table: toml::Table =
            toml::from_str("default_timeout_secs = 3\nmax_timeout_secs = 5").unwrap();
        let tool = BuiltinKind::CodeExecution.build(&table).unwrap();
        assert_eq!(tool.config().timeout, std::time::Duration::from_secs(5));
    }

    #[test]
    fn mistyped_settings_are_invalid_input() {
        let table: toml::Table = toml::from_str("timeout_secs = \"soon\"").unwrap();
        let err = BuiltinKind::HttpRequest.build(&table).unwrap_err();
        assert!(err.is_invalid_input());
    }
}
