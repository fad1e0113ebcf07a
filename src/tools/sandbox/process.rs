//! Process-per-call sandbox.
//!
//! Every call gets a fresh temporary directory holding the script, a fresh
//! interpreter process with a scrubbed environment, and (on Unix) its own
//! process group plus address-space, CPU and file-size limits. The directory
//! and the process are owned by values that clean up on drop, so success,
//! timeout, error and cancellation all leave nothing behind.

use crate::tools::error::ToolError;
use crate::tools::sandbox::guard::{self, SCRIPT_NAME};
use crate::tools::sandbox::policy::SandboxPolicy;
use crate::tools::sandbox::traits::{Sandbox, SandboxExecutionFuture, SandboxOutput};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::OnceCell;

const TOOL_NAME: &str = "code_execution";

/// Counters describing sandbox activity.
#[derive(Debug, Default)]
pub struct SandboxMetrics {
    spawned: AtomicU64,
    rejected: AtomicU64,
    timed_out: AtomicU64,
    active: AtomicU64,
    last_pid: AtomicU32,
}

/// Point-in-time copy of [`SandboxMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SandboxMetricsSnapshot {
    /// Interpreter processes started
    pub spawned: u64,
    /// Calls refused before any process was started
    pub rejected: u64,
    /// Runs killed for exceeding their deadline
    pub timed_out: u64,
    /// Runs currently in flight
    pub active: u64,
    /// PID of the most recently started interpreter
    pub last_pid: Option<u32>,
}

impl SandboxMetrics {
    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> SandboxMetricsSnapshot {
        let last_pid = self.last_pid.load(Ordering::SeqCst);
        SandboxMetricsSnapshot {
            spawned: self.spawned.load(Ordering::SeqCst),
            rejected: self.rejected.load(Ordering::SeqCst),
            timed_out: self.timed_out.load(Ordering::SeqCst),
            active: self.active.load(Ordering::SeqCst),
            last_pid: (last_pid != 0).then_some(last_pid),
        }
    }

    /// Records a call refused by policy checks.
    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
    }

    fn record_spawn(&self, pid: Option<u32>) {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        if let Some(pid) = pid {
            self.last_pid.store(pid, Ordering::SeqCst);
        }
    }

    fn enter(self: &Arc<Self>) -> ActiveRun {
        self.active.fetch_add(1, Ordering::SeqCst);
        ActiveRun(Arc::clone(self))
    }
}

/// Decrements the active-run counter when dropped.
struct ActiveRun(Arc<SandboxMetrics>);

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Kills the whole process group of a sandboxed run when dropped.
///
/// Covers grandchildren the interpreter may have started and the
/// cancellation path, where the run future is dropped mid-flight.
struct ProcessGroupGuard {
    #[cfg_attr(not(all(unix, feature = "sandbox-hardening")), allow(dead_code))]
    pgid: Option<i32>,
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        #[cfg(all(unix, feature = "sandbox-hardening"))]
        if let Some(pgid) = self.pgid {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
        }
    }
}

/// Sandbox that runs each call in a new interpreter process.
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    policy: Arc<SandboxPolicy>,
    bootstrap: Arc<str>,
    interpreter: Arc<OnceCell<PathBuf>>,
    metrics: Arc<SandboxMetrics>,
}

impl ProcessSandbox {
    /// Creates a sandbox for the given policy.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the policy is inconsistent.
    pub fn new(policy: SandboxPolicy) -> Result<Self, ToolError> {
        policy.validate()?;
        let bootstrap = guard::bootstrap(&policy);

        Ok(Self {
            policy: Arc::new(policy),
            bootstrap: Arc::from(bootstrap),
            interpreter: Arc::new(OnceCell::new()),
            metrics: Arc::new(SandboxMetrics::default()),
        })
    }

    /// Returns the policy this sandbox enforces.
    #[must_use]
    pub fn policy(&self) -> &SandboxPolicy {
        &self.policy
    }

    /// Returns the shared activity counters.
    #[must_use]
    pub fn metrics(&self) -> &Arc<SandboxMetrics> {
        &self.metrics
    }

    /// Resolves the real interpreter binary once.
    ///
    /// Launchers such as version-manager shims depend on the caller's
    /// environment, which the sandbox clears, so the interpreter is asked for
    /// its own executable path while the environment is still intact.
    async fn interpreter_path(&self) -> Result<PathBuf, ToolError> {
        let configured = self.policy.interpreter.clone();
        self.interpreter
            .get_or_try_init(|| async move {
                let output = Command::new(&configured)
                    .args(["-I", "-c", "import sys; print(sys.executable)"])
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::null())
                    .kill_on_drop(true)
                    .output()
                    .await
                    .map_err(|e| {
                        ToolError::execution_failed(
                            TOOL_NAME,
                            format!("Python interpreter '{configured}' is not available: {e}"),
                        )
                    })?;

                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !output.status.success() || path.is_empty() {
                    return Err(ToolError::execution_failed(
                        TOOL_NAME,
                        format!("Python interpreter '{configured}' did not report its executable"),
                    ));
                }

                tracing::debug!(interpreter = %path, "resolved sandbox interpreter");
                Ok(PathBuf::from(path))
            })
            .await
            .cloned()
    }

    fn build_command(&self, interpreter: &Path, workdir: &Path, timeout: Duration) -> Command {
        let mut cmd = Command::new(interpreter);
        cmd.args(["-I", "-B", "-X", "utf8", "-c"])
            .arg(&*self.bootstrap)
            .arg(workdir.join(SCRIPT_NAME))
            .current_dir(workdir)
            .env_clear()
            .env("PATH", "/usr/local/bin:/usr/bin:/bin")
            .env("HOME", workdir)
            .env("TMPDIR", workdir)
            .env("LANG", "C.UTF-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(all(unix, feature = "sandbox-hardening"))]
        {
            let memory_bytes = self.policy.memory_limit_bytes();
            let cpu_secs = timeout.as_secs().saturating_add(1);
            let limit_files = !self.policy.allow_file_access;

            cmd.process_group(0);
            // SAFETY: the closure only calls setrlimit, which is
            // async-signal-safe, and allocates nothing.
            unsafe {
                cmd.pre_exec(move || {
                    use rlimit::Resource;

                    // Unsupported limits degrade to the remaining bounds.
                    let _ = rlimit::setrlimit(Resource::AS, memory_bytes, memory_bytes);
                    let _ = rlimit::setrlimit(Resource::CPU, cpu_secs, cpu_secs);
                    if limit_files {
                        let _ = rlimit::setrlimit(Resource::FSIZE, 0, 0);
                    }
                    Ok(())
                });
            }
        }
        #[cfg(not(all(unix, feature = "sandbox-hardening")))]
        let _ = timeout;

        cmd
    }

    async fn run(self, code: String, timeout: Duration) -> Result<SandboxOutput, ToolError> {
        let interpreter = self.interpreter_path().await?;

        let workdir = tempfile::Builder::new()
            .prefix("acton-sandbox-")
            .tempdir()
            .map_err(|e| {
                ToolError::execution_failed(TOOL_NAME, format!("failed to create sandbox directory: {e}"))
            })?;
        tokio::fs::write(workdir.path().join(SCRIPT_NAME), code.as_bytes())
            .await
            .map_err(|e| {
                ToolError::execution_failed(TOOL_NAME, format!("failed to write script: {e}"))
            })?;

        let mut child = self
            .build_command(&interpreter, workdir.path(), timeout)
            .spawn()
            .map_err(|e| {
                ToolError::execution_failed(TOOL_NAME, format!("failed to spawn interpreter: {e}"))
            })?;

        let pid = child.id();
        self.metrics.record_spawn(pid);
        let _active = self.metrics.enter();
        let _group = ProcessGroupGuard {
            pgid: pid.and_then(|p| i32::try_from(p).ok()),
        };
        tracing::debug!(pid = ?pid, timeout_secs = timeout.as_secs_f64(), "sandbox process started");

        let limit = self.policy.max_output_bytes;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let collect = async {
            let (out, err) = tokio::join!(drain(stdout, limit), drain(stderr, limit));
            let status = child.wait().await;
            (out, err, status)
        };
        let outcome = tokio::time::timeout(timeout, collect).await;

        let ((stdout, out_truncated), (stderr, err_truncated), status) = match outcome {
            Ok(collected) => collected,
            Err(_) => {
                terminate(&mut child).await;
                self.metrics.timed_out.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(pid = ?pid, timeout_secs = timeout.as_secs_f64(), "sandbox run timed out");
                return Err(ToolError::timeout(TOOL_NAME, timeout));
            }
        };

        let status = status.map_err(|e| {
            ToolError::execution_failed(TOOL_NAME, format!("failed to wait for interpreter: {e}"))
        })?;

        let output = SandboxOutput {
            stdout: String::from_utf8_lossy(&stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&stderr).trim_end().to_string(),
            exit_code: exit_code(status),
            truncated: out_truncated || err_truncated,
        };
        tracing::debug!(pid = ?pid, exit_code = output.exit_code, "sandbox process finished");
        Ok(output)
    }
}

impl Sandbox for ProcessSandbox {
    fn execute(&self, code: &str, timeout: Duration) -> SandboxExecutionFuture {
        Box::pin(self.clone().run(code.to_string(), timeout))
    }
}

/// Reads a stream up to `limit` bytes and discards the rest.
async fn drain<R>(reader: Option<R>, limit: usize) -> (Vec<u8>, bool)
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let Some(reader) = reader else {
        return (buf, false);
    };

    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut limited = reader.take(cap);
    let _ = limited.read_to_end(&mut buf).await;

    let truncated = buf.len() > limit;
    if truncated {
        buf.truncate(limit);
        let mut rest = limited.into_inner();
        let _ = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await;
    }
    (buf, truncated)
}

/// Kills the interpreter (and its group) and reaps it.
async fn terminate(child: &mut Child) {
    #[cfg(all(unix, feature = "sandbox-hardening"))]
    if let Some(pid) = child.id().and_then(|p| i32::try_from(p).ok()) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
    }
    let _ = child.start_kill();
    let _ = child.wait().await;
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
