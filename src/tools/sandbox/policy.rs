//! Sandbox policy.
//!
//! A `SandboxPolicy` is fixed when the code execution tool is constructed and
//! shared read-only by every invocation afterwards.

use crate::tools::error::ToolError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Modules importable by default.
///
/// Pure computation only: nothing here can reach the filesystem, the network
/// or other processes on its own.
pub const DEFAULT_ALLOWED_MODULES: &[&str] = &[
    "bisect",
    "cmath",
    "collections",
    "copy",
    "dataclasses",
    "datetime",
    "decimal",
    "enum",
    "fractions",
    "functools",
    "heapq",
    "itertools",
    "json",
    "math",
    "operator",
    "random",
    "re",
    "statistics",
    "string",
    "textwrap",
    "time",
    "typing",
    "unicodedata",
];

/// Limits and capabilities applied to sandboxed code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxPolicy {
    /// Interpreter executable, looked up on `PATH` when it has no slash
    pub interpreter: String,
    /// Wall-clock limit when the call does not specify one, in seconds
    pub default_timeout_secs: u64,
    /// Upper bound for a per-call timeout, in seconds
    pub max_timeout_secs: u64,
    /// Address-space ceiling for the interpreter process, in MiB
    pub memory_limit_mb: u64,
    /// Top-level modules the code may import
    pub allowed_modules: BTreeSet<String>,
    /// Permit process creation from inside the sandbox
    pub allow_subprocess: bool,
    /// Permit opening files from inside the sandbox
    pub allow_file_access: bool,
    /// Permit socket use from inside the sandbox
    pub allow_network: bool,
    /// Per-stream cap on captured output, in bytes
    pub max_output_bytes: usize,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            default_timeout_secs: 10,
            max_timeout_secs: 60,
            memory_limit_mb: 256,
            allowed_modules: DEFAULT_ALLOWED_MODULES
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
            allow_subprocess: false,
            allow_file_access: false,
            allow_network: false,
            max_output_bytes: 1024 * 1024,
        }
    }
}

impl SandboxPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interpreter executable.
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Sets the default timeout in seconds.
    #[must_use]
    pub fn with_default_timeout_secs(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    /// Sets the memory ceiling in MiB.
    #[must_use]
    pub fn with_memory_limit_mb(mut self, mb: u64) -> Self {
        self.memory_limit_mb = mb;
        self
    }

    /// Adds a module to the import allow-list.
    #[must_use]
    pub fn allow_module(mut self, module: impl Into<String>) -> Self {
        self.allowed_modules.insert(module.into());
        self
    }

    /// Returns the default wall-clock timeout.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    /// Returns the largest timeout a call may request.
    #[must_use]
    pub fn max_timeout(&self) -> Duration {
        Duration::from_secs(self.max_timeout_secs)
    }

    /// Returns the memory ceiling in bytes.
    #[must_use]
    pub fn memory_limit_bytes(&self) -> u64 {
        self.memory_limit_mb.saturating_mul(1024 * 1024)
    }

    /// Returns true if `module` may be imported.
    #[must_use]
    pub fn is_allowed(&self, module: &str) -> bool {
        self.allowed_modules.contains(module)
    }

    /// Resolves the effective timeout for one call.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the requested timeout is not a positive,
    /// finite number of seconds.
    pub fn effective_timeout(&self, requested_secs: Option<f64>) -> Result<Duration, ToolError> {
        let Some(secs) = requested_secs else {
            return Ok(self.default_timeout());
        };

        if !secs.is_finite() || secs <= 0.0 {
            return Err(ToolError::invalid_input(
                "code_execution",
                "Timeout must be a positive number of seconds",
            ));
        }

        #[allow(clippy::cast_precision_loss)]
        let capped = secs.min(self.max_timeout_secs as f64);
        Ok(Duration::from_secs_f64(capped))
    }

    /// Checks the policy for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns an internal error describing the first inconsistent setting.
    pub fn validate(&self) -> Result<(), ToolError> {
        if self.interpreter.trim().is_empty() {
            return Err(ToolError::internal("sandbox interpreter cannot be empty"));
        }
        if self.default_timeout_secs == 0 {
            return Err(ToolError::internal(
                "sandbox default_timeout_secs must be greater than zero",
            ));
        }
        if self.max_timeout_secs < self.default_timeout_secs {
            return Err(ToolError::internal(
                "sandbox max_timeout_secs must be at least default_timeout_secs",
            ));
        }
        if self.memory_limit_mb == 0 {
            return Err(ToolError::internal(
                "sandbox memory_limit_mb must be greater than zero",
            ));
        }
        Ok(())
    }
}
