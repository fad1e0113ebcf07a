//! Interpreter bootstrap that installs the capability policy.
//!
//! The interpreter is started with `-c <bootstrap> <script>`. The bootstrap
//! reads the user script, removes the capabilities the policy forbids and then
//! executes the script in a fresh `__main__` namespace. Uncaught exceptions
//! are reported with the bootstrap's own frames removed, so tracebacks only
//! point into `main.py`.

use crate::tools::sandbox::policy::SandboxPolicy;

/// File name of the user script inside the per-run directory.
pub const SCRIPT_NAME: &str = "main.py";

const READ_SCRIPT: &str = r#"import builtins as _sb_builtins, sys as _sb_sys
with open(_sb_sys.argv[1], "r", encoding="utf-8") as _sb_f:
    _sb_src = _sb_f.read()
_sb_sys.argv = ["main.py"]
def _sb_deny(_sb_what):
    def _sb_blocked(*_a, **_k):
        raise PermissionError(_sb_what + " is disabled in the sandbox")
    return _sb_blocked
"#;

const DENY_SUBPROCESS: &str = r#"import os as _sb_os
for _sb_n in ("system", "popen", "fork", "forkpty", "vfork", "execl", "execle", "execlp",
              "execlpe", "execv", "execve", "execvp", "execvpe", "spawnl", "spawnle",
              "spawnlp", "spawnlpe", "spawnv", "spawnve", "spawnvp", "spawnvpe",
              "posix_spawn", "posix_spawnp", "kill", "killpg"):
    if hasattr(_sb_os, _sb_n):
        setattr(_sb_os, _sb_n, _sb_deny("os." + _sb_n))
for _sb_m in ("subprocess", "_posixsubprocess", "multiprocessing", "pty", "pipes"):
    _sb_sys.modules[_sb_m] = None
"#;

const DENY_NETWORK: &str = r#"for _sb_m in ("socket", "_socket", "ssl", "_ssl", "socketserver", "asyncio"):
    _sb_sys.modules[_sb_m] = None
"#;

const DENY_FILES: &str = r#"import io as _sb_io
_sb_builtins.open = _sb_deny("file access")
_sb_io.open = _sb_deny("file access")
"#;

const RUN_SCRIPT: &str = r#"try:
    exec(compile(_sb_src, "main.py", "exec"), {"__name__": "__main__", "__builtins__": _sb_builtins})
except SystemExit:
    raise
except BaseException as _sb_e:
    import traceback as _sb_tb
    _sb_te = _sb_tb.TracebackException(type(_sb_e), _sb_e, _sb_e.__traceback__)
    _sb_te.stack = _sb_tb.StackSummary.from_list(
        [_sb_fr for _sb_fr in _sb_te.stack if _sb_fr.filename != "<string>"])
    _sb_sys.stderr.write("".join(_sb_te.format()))
    _sb_sys.exit(1)
"#;

/// Builds the bootstrap source for `policy`.
#[must_use]
pub fn bootstrap(policy: &SandboxPolicy) -> String {
    let mut source = String::from(READ_SCRIPT);
    if !policy.allow_subprocess {
        source.push_str(DENY_SUBPROCESS);
    }
    if !policy.allow_network {
        source.push_str(DENY_NETWORK);
    }
    if !policy.allow_file_access {
        source.push_str(DENY_FILES);
    }
    source.push_str(RUN_SCRIPT);
    source
}
