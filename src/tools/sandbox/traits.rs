//! Sandbox trait definitions.

use crate::tools::error::ToolError;
use serde_json::{json, Map, Value};
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// The result type for sandbox execution futures.
pub type SandboxExecutionFuture =
    Pin<Box<dyn Future<Output = Result<SandboxOutput, ToolError>> + Send + 'static>>;

/// Captured result of one sandboxed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxOutput {
    /// Standard output, trailing whitespace trimmed
    pub stdout: String,
    /// Standard error, trailing whitespace trimmed
    pub stderr: String,
    /// Exit status; negative values are the terminating signal
    pub exit_code: i32,
    /// Whether either stream hit the output cap
    pub truncated: bool,
}

impl SandboxOutput {
    /// Returns true if the process exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Encodes the output, omitting empty streams and a zero exit code.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if !self.stdout.is_empty() {
            map.insert("stdout".to_string(), json!(self.stdout));
        }
        if !self.stderr.is_empty() {
            map.insert("stderr".to_string(), json!(self.stderr));
        }
        if !self.success() {
            map.insert("exit_code".to_string(), json!(self.exit_code));
        }
        if self.truncated {
            map.insert("truncated".to_string(), json!(true));
        }
        Value::Object(map)
    }
}

/// Runs untrusted source code in isolation.
///
/// Each call must use a fresh, independent execution environment; nothing may
/// be shared between concurrent calls.
pub trait Sandbox: Send + Sync + Debug {
    /// Executes `code` with the given wall-clock limit.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::timeout` when the limit expires and
    /// `ToolError::execution_failed` when the interpreter cannot be started.
    fn execute(&self, code: &str, timeout: Duration) -> SandboxExecutionFuture;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_output_omits_exit_code_and_empty_streams() {
        let output = SandboxOutput {
            stdout: "hi".to_string(),
            ..SandboxOutput::default()
        };
        assert_eq!(output.to_value(), json!({"stdout": "hi"}));
    }

    #[test]
    fn failed_output_keeps_streams_and_code() {
        let output = SandboxOutput {
            stdout: "partial".to_string(),
            stderr: "Traceback".to_string(),
            exit_code: 1,
            truncated: false,
        };
        assert_eq!(
            output.to_value(),
            json!({"stdout": "partial", "stderr": "Traceback", "exit_code": 1})
        );
    }

    #[test]
    fn silent_success_is_empty_object() {
        assert_eq!(SandboxOutput::default().to_value(), json!({}));
    }
}
