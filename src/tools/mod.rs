//! Tool system.
//!
//! - **Tool contract**: [`ToolExecutor`] plus its [`ToolConfig`]
//! - **Observations**: every invocation ends in an [`Observation`], success or failure
//! - **Tool registry**: immutable name-to-tool mapping shared by execution loops
//! - **Built-ins**: calculator, HTTP request, Wikipedia lookup, sandboxed code execution
//! - **Sandbox**: policy, static import check and the process sandbox
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                      ExecutionLoop                           |
//! |                                                              |
//! |  Decision::ToolCall --> registry.dispatch(name, input)      |
//! +-------------------------------------------------------------+
//!                            |
//!                            v
//! +-------------------------------------------------------------+
//! |                   ToolRegistry (Arc, read-only)              |
//! |                                                              |
//! |  lookup --> ToolExecutor::invoke --> Observation            |
//! |  miss   --> Observation::Failure(unknown_tool)              |
//! +-------------------------------------------------------------+
//! ```

pub mod builtins;
pub mod definition;
pub mod error;
pub mod observation;
pub mod registry;
pub mod sandbox;

pub use crate::messages::ToolDefinition;
pub use definition::{
    parse_args, ObservationFuture, ToolConfig, ToolExecutionFuture, ToolExecutor,
};
pub use error::{ToolError, ToolErrorKind};
pub use observation::Observation;
pub use registry::{
    RegisteredTool, RegistryMetrics, RegistryMetricsSnapshot, ToolEntry, ToolRegistry,
    ToolRegistryBuilder, DISPATCH_GRACE,
};
