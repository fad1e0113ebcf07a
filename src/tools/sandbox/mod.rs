//! Sandboxed code execution.
//!
//! Untrusted snippets run through three layers:
//!
//! 1. **Import policy**: [`ImportScanner`] lists the modules a snippet
//!    declares and anything outside the [`SandboxPolicy`] allow-list is
//!    refused before a process exists.
//! 2. **Capability guard**: the interpreter is started through a bootstrap
//!    that removes subprocess, socket and file access as the policy dictates.
//! 3. **Process isolation**: [`ProcessSandbox`] gives every call its own
//!    interpreter, temporary directory and scrubbed environment, with a
//!    wall-clock timeout and (on Unix) resource limits and process-group
//!    termination.
//!
//! The first two layers are best-effort filters. Only the third is enforced
//! by the operating system, and on non-Unix platforms only its timeout and
//! cleanup guarantees apply.

mod guard;
mod imports;
mod policy;
mod process;
mod traits;

pub use imports::ImportScanner;
pub use policy::{SandboxPolicy, DEFAULT_ALLOWED_MODULES};
pub use process::{ProcessSandbox, SandboxMetrics, SandboxMetricsSnapshot};
pub use traits::{Sandbox, SandboxExecutionFuture, SandboxOutput};
