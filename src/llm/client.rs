//! Reasoning service abstraction.
//!
//! The execution loop treats the language model as an opaque collaborator:
//! given the conversation so far and the tool catalog, it returns the next
//! decision. Anything that implements [`ReasoningService`] can drive a loop.

use crate::llm::error::LLMError;
use crate::messages::{Message, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde_json::Value;

/// Everything the reasoning service is shown for one decision.
#[derive(Debug, Clone, Copy)]
pub struct ReasoningContext<'a> {
    /// Standing instructions for the service
    pub system_message: &'a str,
    /// Text of the task being worked on
    pub task: &'a str,
    /// Conversation turns so far, oldest first; includes the task turn
    pub memory: &'a [Message],
    /// Tools the service may choose from
    pub catalog: &'a [ToolDefinition],
    /// Sampling temperature requested by the loop
    pub temperature: f32,
}

/// The next move chosen by the reasoning service.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Stop and answer
    FinalAnswer {
        /// The answer text
        answer: String,
        /// Reasoning produced before answering
        rationale: Option<String>,
    },
    /// Invoke a tool and come back with its observation
    ToolCall {
        /// The requested call; an empty id is filled in by the loop
        call: ToolCall,
        /// Reasoning produced before choosing the tool
        rationale: Option<String>,
    },
}

impl Decision {
    /// Creates a final answer without rationale.
    #[must_use]
    pub fn final_answer(answer: impl Into<String>) -> Self {
        Self::FinalAnswer {
            answer: answer.into(),
            rationale: None,
        }
    }

    /// Creates a tool call without rationale.
    #[must_use]
    pub fn tool_call(tool: impl Into<String>, input: Value) -> Self {
        Self::ToolCall {
            call: ToolCall {
                id: String::new(),
                name: tool.into(),
                arguments: input,
            },
            rationale: None,
        }
    }

    /// Attaches rationale text.
    #[must_use]
    pub fn with_rationale(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            Self::FinalAnswer { rationale, .. } | Self::ToolCall { rationale, .. } => {
                *rationale = Some(text.into());
            }
        }
        self
    }

    /// Returns the rationale, if any.
    #[must_use]
    pub fn rationale(&self) -> Option<&str> {
        match self {
            Self::FinalAnswer { rationale, .. } | Self::ToolCall { rationale, .. } => {
                rationale.as_deref()
            }
        }
    }

    /// Returns true for a final answer.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::FinalAnswer { .. })
    }
}

/// Trait for reasoning services.
///
/// # Example
///
/// ```ignore
/// use acton_tools_agent::llm::{OpenAIReasoner, ProviderConfig, ReasoningService};
///
/// let reasoner = OpenAIReasoner::new(&ProviderConfig::default())?;
/// let decision = reasoner.next_action(&context).await?;
/// ```
#[async_trait]
pub trait ReasoningService: Send + Sync + std::fmt::Debug {
    /// Chooses the next decision for `context`.
    ///
    /// The service only reads the context; it never appends to memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot produce a decision.
    async fn next_action(&self, context: &ReasoningContext<'_>) -> Result<Decision, LLMError>;

    /// Returns the name of this service for logging.
    fn provider_name(&self) -> &'static str;
}
