//! Execution loop and its supporting types.
//!
//! An [`ExecutionLoop`] owns one [`ConversationMemory`] and borrows the
//! shared tool registry and reasoning service. Each `run` produces a
//! [`RunResult`].

mod config;
mod execution;
mod memory;
mod result;
mod state;
mod step;

pub use config::{AgentConfig, DEFAULT_SYSTEM_MESSAGE};
pub use execution::ExecutionLoop;
pub use memory::ConversationMemory;
pub use result::{DebugBundle, RunReport, RunResult, DEFAULT_CONFIDENCE};
pub use state::{LoopState, BUDGET_EXCEEDED, CANCELLED};
pub use step::{Action, Step, Task};
