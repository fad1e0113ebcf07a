//! Tool contract and configuration.
//!
//! Every tool implements [`ToolExecutor`]. The executor reports failures as
//! [`ToolError`]s; the provided [`ToolExecutor::invoke`] and
//! [`ToolExecutor::invoke_blocking`] methods turn the outcome into an
//! [`Observation`] so that nothing escapes the tool boundary as a fault.

use crate::messages::ToolDefinition;
use crate::tools::error::ToolError;
use crate::tools::observation::Observation;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::time::Duration;

/// Configuration for a constructed tool.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// The catalog entry shown to the reasoning service
    pub definition: ToolDefinition,
    /// Whether this tool runs untrusted input in an isolated process
    pub sandboxed: bool,
    /// Longest a single dispatch may take, enforced by the registry
    pub timeout: Duration,
}

impl ToolConfig {
    /// Creates a new tool configuration.
    #[must_use]
    pub fn new(definition: ToolDefinition) -> Self {
        Self {
            definition,
            sandboxed: false,
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets whether the tool runs in a sandbox.
    #[must_use]
    pub fn with_sandbox(mut self, sandboxed: bool) -> Self {
        self.sandboxed = sandboxed;
        self
    }

    /// Sets the dispatch deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

/// The result type for tool execution futures.
pub type ToolExecutionFuture = Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + 'static>>;

/// Future returned by [`ToolExecutor::invoke`].
pub type ObservationFuture = Pin<Box<dyn Future<Output = Observation> + Send + 'static>>;

/// Trait implemented by every tool.
///
/// Implementors provide [`config`](Self::config) and [`execute`](Self::execute);
/// callers use [`invoke`](Self::invoke) from async code or
/// [`invoke_blocking`](Self::invoke_blocking) from synchronous code.
///
/// # Example
///
/// ```rust
/// use acton_tools_agent::messages::ToolDefinition;
/// use acton_tools_agent::tools::{ToolConfig, ToolExecutionFuture, ToolExecutor};
/// use serde_json::{json, Value};
///
/// #[derive(Debug)]
/// struct EchoTool;
///
/// impl ToolExecutor for EchoTool {
///     fn config(&self) -> ToolConfig {
///         ToolConfig::new(ToolDefinition {
///             name: "echo".to_string(),
///             description: "Returns its input".to_string(),
///             input_schema: json!({"type": "object"}),
///         })
///     }
///
///     fn execute(&self, args: Value) -> ToolExecutionFuture {
///         Box::pin(async move { Ok(json!({ "echo": args })) })
///     }
/// }
///
/// let observation = EchoTool.invoke_blocking(json!({"x": 1}));
/// assert!(observation.is_success());
/// ```
pub trait ToolExecutor: Send + Sync + Debug {
    /// Returns the tool's catalog entry and execution settings.
    fn config(&self) -> ToolConfig;

    /// Executes the tool with the given arguments.
    ///
    /// Implementations validate `args` themselves and report malformed input
    /// as [`ToolError::invalid_input`].
    fn execute(&self, args: Value) -> ToolExecutionFuture;

    /// Cheap synchronous validation run before [`execute`](Self::execute).
    ///
    /// The default implementation accepts any arguments.
    fn validate_args(&self, _args: &Value) -> Result<(), ToolError> {
        Ok(())
    }

    /// Runs the tool and converts the outcome into an [`Observation`].
    ///
    /// Panics raised by the tool are caught and reported as an internal error.
    fn invoke(&self, args: Value) -> ObservationFuture {
        if let Err(error) = self.validate_args(&args) {
            return Box::pin(async move { Observation::failure(error) });
        }

        let name = self.config().definition.name;
        let execution = match std::panic::catch_unwind(AssertUnwindSafe(|| self.execute(args))) {
            Ok(execution) => execution,
            Err(_) => {
                return Box::pin(async move {
                    Observation::failure(ToolError::internal(format!("tool '{name}' panicked")))
                })
            }
        };

        Box::pin(async move {
            match AssertUnwindSafe(execution).catch_unwind().await {
                Ok(result) => Observation::from(result),
                Err(_) => {
                    tracing::error!(tool = %name, "tool panicked during execution");
                    Observation::failure(ToolError::internal(format!("tool '{name}' panicked")))
                }
            }
        })
    }

    /// Blocking form of [`invoke`](Self::invoke).
    ///
    /// Drives the invocation on a private current-thread runtime. Must not be
    /// called from inside an async context; use `invoke` there instead.
    fn invoke_blocking(&self, args: Value) -> Observation {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Observation::failure(ToolError::internal(
                "invoke_blocking called from within an async runtime; use invoke instead",
            ));
        }

        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.invoke(args)),
            Err(e) => Observation::failure(ToolError::internal(format!(
                "failed to start runtime: {e}"
            ))),
        }
    }
}

/// Decodes tool arguments into a typed struct.
///
/// Accepts either a JSON object or a string holding JSON text, which is how
/// many reasoning services hand over tool input.
///
/// # Errors
///
/// Returns [`ToolError::invalid_input`] with `Invalid JSON input` when a string
/// payload is not JSON, or with the decoder message when fields are missing or
/// have the wrong type.
pub fn parse_args<T: DeserializeOwned>(tool_name: &str, args: Value) -> Result<T, ToolError> {
    let args = match args {
        Value::String(text) => serde_json::from_str::<Value>(&text)
            .map_err(|_| ToolError::invalid_input(tool_name, "Invalid JSON input"))?,
        other => other,
    };

    if !args.is_object() {
        return Err(ToolError::invalid_input(
            tool_name,
            "Invalid input: expected a JSON object",
        ));
    }

    serde_json::from_value(args)
        .map_err(|e| ToolError::invalid_input(tool_name, format!("Invalid input: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct PairArgs {
        a: f64,
        b: f64,
    }

    #[derive(Debug)]
    struct PanickingTool;

    impl ToolExecutor for PanickingTool {
        fn config(&self) -> ToolConfig {
            ToolConfig::new(ToolDefinition {
                name: "boom".to_string(),
                description: "always panics".to_string(),
                input_schema: json!({"type": "object"}),
            })
        }

        fn execute(&self, _args: Value) -> ToolExecutionFuture {
            Box::pin(async move { panic!("kaboom") })
        }
    }

    #[derive(Debug)]
    struct StrictTool;

    impl ToolExecutor for StrictTool {
        fn config(&self) -> ToolConfig {
            ToolConfig::new(ToolDefinition {
                name: "strict".to_string(),
                description: "rejects everything".to_string(),
                input_schema: json!({"type": "object"}),
            })
        }

        fn execute(&self, _args: Value) -> ToolExecutionFuture {
            Box::pin(async move { Ok(json!({"ran": true})) })
        }

        fn validate_args(&self, _args: &Value) -> Result<(), ToolError> {
            Err(ToolError::invalid_input("strict", "nope"))
        }
    }

    #[test]
    fn tool_config_defaults() {
        let config = PanickingTool.config();
        assert_eq!(config.name(), "boom");
        assert!(!config.sandboxed);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn tool_config_builder() {
        let config = PanickingTool
            .config()
            .with_sandbox(true)
            .with_timeout(Duration::from_secs(5));
        assert!(config.sandboxed);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn parse_args_accepts_object() {
        let args: PairArgs = parse_args("calculator", json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(args.a, 1.0);
        assert_eq!(args.b, 2.0);
    }

    #[test]
    fn parse_args_accepts_json_text() {
        let args: PairArgs = parse_args("calculator", json!(r#"{"a": 3, "b": 4}"#)).unwrap();
        assert_eq!(args.b, 4.0);
    }

    #[test]
    fn parse_args_rejects_non_json_text() {
        let err = parse_args::<PairArgs>("calculator", json!("a plus b")).unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(err.message(), "Invalid JSON input");
    }

    #[test]
    fn parse_args_rejects_missing_field() {
        let err = parse_args::<PairArgs>("calculator", json!({"a": 1})).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.message().contains("b"));
    }

    #[test]
    fn parse_args_rejects_non_object() {
        let err = parse_args::<PairArgs>("calculator", json!([1, 2])).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[tokio::test]
    async fn invoke_converts_panic_into_failure() {
        let observation = PanickingTool.invoke(json!({})).await;
        let error = observation.error().unwrap();
        assert!(error.message().contains("panicked"));
    }

    #[tokio::test]
    async fn invoke_skips_execute_when_validation_fails() {
        let observation = StrictTool.invoke(json!({})).await;
        assert!(observation.error().is_some_and(ToolError::is_invalid_input));
    }

    #[test]
    fn invoke_blocking_runs_outside_runtime() {
        let observation = StrictTool.invoke_blocking(json!({}));
        assert!(!observation.is_success());
    }

    #[tokio::test]
    async fn invoke_blocking_refuses_inside_runtime() {
        let observation = StrictTool.invoke_blocking(json!({}));
        assert_eq!(observation.error().map(ToolError::code), Some("internal"));
    }
}
