//! Reasoning service module.
//!
//! The [`ReasoningService`] trait, its error type, provider configuration,
//! an OpenAI-compatible implementation and a scripted implementation.

mod client;
mod config;
mod error;
mod openai;
mod scripted;

pub use client::{Decision, ReasoningContext, ReasoningService};
pub use config::{ProviderConfig, RetryConfig, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::{LLMError, LLMErrorKind};
pub use openai::OpenAIReasoner;
pub use scripted::{RecordedContext, ScriptedReasoner};
