//! Sandboxed code execution built-in tool.
//!
//! Runs a Python snippet under a [`SandboxPolicy`] and returns whatever it
//! printed. Snippets importing modules outside the allow-list are refused
//! before any interpreter starts.

use crate::messages::ToolDefinition;
use crate::tools::sandbox::{
    ImportScanner, ProcessSandbox, Sandbox, SandboxMetrics, SandboxPolicy,
};
use crate::tools::{parse_args, ToolConfig, ToolError, ToolExecutionFuture, ToolExecutor};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const TOOL_NAME: &str = "code_execution";

/// The only language the tool accepts.
const SUPPORTED_LANGUAGE: &str = "python";

/// Code execution tool executor.
#[derive(Debug, Clone)]
pub struct CodeExecutionTool {
    policy: Arc<SandboxPolicy>,
    sandbox: Arc<dyn Sandbox>,
    scanner: ImportScanner,
    metrics: Arc<SandboxMetrics>,
}

#[derive(Debug, Deserialize)]
struct CodeExecutionArgs {
    code: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    timeout: Option<f64>,
}

impl CodeExecutionTool {
    /// Creates a tool that runs code in a [`ProcessSandbox`].
    ///
    /// # Errors
    ///
    /// Returns an internal error if the policy is inconsistent.
    pub fn new(policy: SandboxPolicy) -> Result<Self, ToolError> {
        let sandbox = ProcessSandbox::new(policy.clone())?;
        let metrics = Arc::clone(sandbox.metrics());
        Ok(Self {
            policy: Arc::new(policy),
            sandbox: Arc::new(sandbox),
            scanner: ImportScanner::new()?,
            metrics,
        })
    }

    /// Creates a tool backed by a custom sandbox implementation.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the policy is inconsistent.
    pub fn with_sandbox(policy: SandboxPolicy, sandbox: Arc<dyn Sandbox>) -> Result<Self, ToolError> {
        policy.validate()?;
        Ok(Self {
            policy: Arc::new(policy),
            sandbox,
            scanner: ImportScanner::new()?,
            metrics: Arc::new(SandboxMetrics::default()),
        })
    }

    /// Returns the policy applied to every call.
    #[must_use]
    pub fn policy(&self) -> &SandboxPolicy {
        &self.policy
    }

    /// Returns the sandbox activity counters.
    #[must_use]
    pub fn metrics(&self) -> &Arc<SandboxMetrics> {
        &self.metrics
    }

    /// Returns the tool configuration for registration.
    #[must_use]
    pub fn tool_config() -> ToolConfig {
        ToolConfig::new(ToolDefinition {
            name: TOOL_NAME.to_string(),
            description: "Execute a Python snippet in an isolated sandbox and return its \
                          stdout, stderr and exit code. Print results to see them. Only \
                          allow-listed standard library modules may be imported."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "The Python source to execute"
                    },
                    "language": {
                        "type": "string",
                        "enum": ["python"],
                        "description": "Programming language (default: python)"
                    },
                    "timeout": {
                        "type": "number",
                        "description": "Timeout in seconds (default: 10)",
                        "exclusiveMinimum": 0
                    }
                },
                "required": ["code"]
            }),
        })
        .with_sandbox(true)
    }
}

impl ToolExecutor for CodeExecutionTool {
    fn config(&self) -> ToolConfig {
        Self::tool_config().with_timeout(self.policy.max_timeout())
    }

    fn execute(&self, args: Value) -> ToolExecutionFuture {
        let tool = self.clone();

        Box::pin(async move {
            let args: CodeExecutionArgs = parse_args(TOOL_NAME, args)?;

            let language = args
                .language
                .as_deref()
                .map_or_else(|| SUPPORTED_LANGUAGE.to_string(), |l| l.trim().to_ascii_lowercase());
            if language != SUPPORTED_LANGUAGE {
                tool.metrics.record_rejection();
                return Err(ToolError::unsupported_language(
                    args.language.unwrap_or_default(),
                ));
            }

            if args.code.trim().is_empty() {
                return Err(ToolError::invalid_input(TOOL_NAME, "Code cannot be empty"));
            }

            let timeout = tool.policy.effective_timeout(args.timeout)?;

            let blocked = tool
                .scanner
                .disallowed(&args.code, |module| tool.policy.is_allowed(module));
            if !blocked.is_empty() {
                tool.metrics.record_rejection();
                tracing::warn!(modules = ?blocked, "refusing code with unauthorized imports");
                return Err(ToolError::unauthorized_import(blocked));
            }

            let output = tool.sandbox.execute(&args.code, timeout).await?;
            Ok(output.to_value())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::sandbox::{SandboxExecutionFuture, SandboxOutput};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Sandbox double that records calls instead of running anything.
    #[derive(Debug, Default)]
    struct SpySandbox {
        calls: AtomicUsize,
    }

    impl Sandbox for SpySandbox {
        fn execute(&self, _code: &str, timeout: Duration) -> SandboxExecutionFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(SandboxOutput {
                    stdout: format!("{}", timeout.as_secs()),
                    ..SandboxOutput::default()
                })
            })
        }
    }

    fn spy_tool() -> (CodeExecutionTool, Arc<SpySandbox>) {
        let spy = Arc::new(SpySandbox::default());
        let tool = CodeExecutionTool::with_sandbox(SandboxPolicy::default(), spy.clone()).unwrap();
        (tool, spy)
    }

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    #[tokio::test]
    async fn unauthorized_import_never_reaches_sandbox() {
        let (tool, spy) = spy_tool();
        let observation = tool
            .invoke(json!({"code": "import os\nprint(os.listdir('/'))"}))
            .await;

        let error = observation.error().unwrap();
        assert!(error.is_unauthorized_import());
        assert_eq!(observation.to_value()["modules"], json!(["os"]));
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
        assert_eq!(tool.metrics().snapshot().rejected, 1);
    }

    #[tokio::test]
    async fn import_inside_one_line_block_is_rejected() {
        let (tool, spy) = spy_tool();
        let observation = tool
            .invoke(json!({"code": "if True: import os\nprint(os.getcwd())"}))
            .await;

        assert!(observation.error().is_some_and(ToolError::is_unauthorized_import));
        assert_eq!(observation.to_value()["modules"], json!(["os"]));
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsupported_language_is_rejected() {
        let (tool, spy) = spy_tool();
        let err = tool
            .execute(json!({"code": "puts 1", "language": "Ruby"}))
            .await
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Unsupported language: Ruby. Only Python is currently supported."
        );
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn language_is_case_insensitive() {
        let (tool, spy) = spy_tool();
        let value = tool
            .execute(json!({"code": "print(1)", "language": "Python"}))
            .await
            .unwrap();
        assert_eq!(value["stdout"], "10");
        assert_eq!(spy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_override_is_passed_through() {
        let (tool, _spy) = spy_tool();
        let value = tool
            .execute(json!({"code": "print(1)", "timeout": 3}))
            .await
            .unwrap();
        assert_eq!(value["stdout"], "3");
    }

    #[tokio::test]
    async fn non_positive_timeout_is_invalid() {
        let (tool, spy) = spy_tool();
        let err = tool
            .execute(json!({"code": "print(1)", "timeout": 0}))
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_code_is_invalid_input() {
        let (tool, _spy) = spy_tool();
        let observation = tool.invoke(json!({"language": "python"})).await;
        assert!(observation.error().is_some_and(ToolError::is_invalid_input));
    }

    #[tokio::test]
    async fn print_hi_returns_stdout_only() {
        if !python_available() {
            return;
        }
        let tool = CodeExecutionTool::new(SandboxPolicy::default()).unwrap();
        let observation = tool.invoke(json!({"code": "print('hi')"})).await;
        assert_eq!(observation.to_value(), json!({"stdout": "hi"}));
    }

    #[tokio::test]
    async fn import_rejection_spawns_nothing() {
        let tool = CodeExecutionTool::new(SandboxPolicy::default()).unwrap();
        let observation = tool.invoke(json!({"code": "import subprocess"})).await;
        assert!(observation.error().is_some_and(ToolError::is_unauthorized_import));

        let snapshot = tool.metrics().snapshot();
        assert_eq!(snapshot.spawned, 0);
        assert_eq!(snapshot.rejected, 1);
    }

    #[tokio::test]
    async fn sleeping_past_timeout_reports_timeout() {
        if !python_available() {
            return;
        }
        let tool = CodeExecutionTool::new(SandboxPolicy::default()).unwrap();
        let started = std::time::Instant::now();
        let observation = tool
            .invoke(json!({"code": "import time\ntime.sleep(20)", "timeout": 1}))
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(
            observation.to_value()["error"],
            json!("timed out after 1 seconds")
        );
        assert_eq!(tool.metrics().snapshot().active, 0);
    }

    #[tokio::test]
    async fn runtime_error_returns_streams_and_exit_code() {
        if !python_available() {
            return;
        }
        let tool = CodeExecutionTool::new(SandboxPolicy::default()).unwrap();
        let value = tool
            .execute(json!({"code": "print('before')\n1/0"}))
            .await
            .unwrap();
        assert_eq!(value["stdout"], "before");
        assert_eq!(value["exit_code"], 1);
        assert!(value["stderr"]
            .as_str()
            .is_some_and(|s| s.contains("ZeroDivisionError")));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn config_is_sandboxed() {
        let config = CodeExecutionTool::tool_config();
        assert!(config.sandboxed);
        assert_eq!(config.name(), "code_execution");
    }
}
