//! # acton-tools-agent: a tool-augmented LLM execution loop
//!
//! A reasoning service decides, step by step, either to call one of a fixed
//! set of tools or to give a final answer. Each tool result is fed back as an
//! observation until the answer arrives or the iteration budget runs out.
//!
//! ## Architecture
//!
//! - **Execution loop** ([`agent::ExecutionLoop`]): decide, invoke, observe,
//!   with its own [`agent::ConversationMemory`]
//! - **Reasoning service** ([`llm::ReasoningService`]): an OpenAI-compatible
//!   client or a scripted stand-in
//! - **Tool registry** ([`tools::ToolRegistry`]): name-keyed dispatch; every
//!   outcome, including failure, becomes an [`tools::Observation`]
//! - **Sandbox** ([`tools::sandbox`]): runs untrusted Python snippets in a
//!   fresh, resource-limited process
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use acton_tools_agent::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), AgentError> {
//! let provider = ProviderConfig::default();
//! let reasoner = Arc::new(OpenAIReasoner::new(&provider)?);
//! let registry = Arc::new(ToolRegistry::builtins()?);
//!
//! let mut agent = ExecutionLoop::new(AgentConfig::default(), reasoner, registry)?;
//! let result = agent.run("What is 15 divided by 3?", false).await;
//! println!("{}", result.to_value());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod messages;
pub mod tools;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agent::{
        AgentConfig, ConversationMemory, ExecutionLoop, LoopState, RunReport, RunResult, Step,
        Task,
    };
    pub use crate::config::AppConfig;
    pub use crate::error::{AgentError, AgentErrorKind};
    pub use crate::llm::{
        Decision, LLMError, OpenAIReasoner, ProviderConfig, ReasoningContext, ReasoningService,
        ScriptedReasoner,
    };
    pub use crate::messages::{Message, MessageRole, ToolCall, ToolDefinition};
    pub use crate::tools::{
        Observation, ToolConfig, ToolError, ToolExecutor, ToolRegistry,
    };
    pub use crate::types::RunId;
}
