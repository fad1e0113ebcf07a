//! Deterministic reasoning service.
//!
//! `ScriptedReasoner` replays a fixed list of decisions, or computes each one
//! with a closure, and records every context it was shown. Tests use it to
//! drive the loop without any network access.

use crate::llm::client::{Decision, ReasoningContext, ReasoningService};
use crate::llm::error::LLMError;
use crate::messages::Message;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

type DecideFn = dyn Fn(&ReasoningContext<'_>) -> Result<Decision, LLMError> + Send + Sync;

enum Script {
    Queue(Mutex<VecDeque<Result<Decision, LLMError>>>),
    Function(Box<DecideFn>),
}

/// Owned copy of a [`ReasoningContext`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedContext {
    /// Task text
    pub task: String,
    /// Conversation turns shown
    pub memory: Vec<Message>,
    /// Names of the tools offered
    pub tools: Vec<String>,
}

impl From<&ReasoningContext<'_>> for RecordedContext {
    fn from(context: &ReasoningContext<'_>) -> Self {
        Self {
            task: context.task.to_string(),
            memory: context.memory.to_vec(),
            tools: context.catalog.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

/// Reasoning service that follows a script.
pub struct ScriptedReasoner {
    script: Script,
    seen: Mutex<Vec<RecordedContext>>,
}

impl std::fmt::Debug for ScriptedReasoner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.script {
            Script::Queue(_) => "queue",
            Script::Function(_) => "function",
        };
        f.debug_struct("ScriptedReasoner")
            .field("script", &kind)
            .field("calls", &self.calls())
            .finish()
    }
}

impl ScriptedReasoner {
    /// Replays `decisions` in order.
    ///
    /// Once the script runs out every further call fails with
    /// `InvalidRequest`.
    #[must_use]
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self::with_results(decisions.into_iter().map(Ok))
    }

    /// Replays `results` in order, including failures.
    #[must_use]
    pub fn with_results(results: impl IntoIterator<Item = Result<Decision, LLMError>>) -> Self {
        Self {
            script: Script::Queue(Mutex::new(results.into_iter().collect())),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Computes every decision with `decide`.
    #[must_use]
    pub fn from_fn<F>(decide: F) -> Self
    where
        F: Fn(&ReasoningContext<'_>) -> Result<Decision, LLMError> + Send + Sync + 'static,
    {
        Self {
            script: Script::Function(Box::new(decide)),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Returns every context seen so far, oldest first.
    #[must_use]
    pub fn contexts(&self) -> Vec<RecordedContext> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    /// Returns the number of decisions requested so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoner {
    async fn next_action(&self, context: &ReasoningContext<'_>) -> Result<Decision, LLMError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(RecordedContext::from(context));
        }

        match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .map_err(|_| LLMError::invalid_request("script lock poisoned"))?
                .pop_front()
                .unwrap_or_else(|| Err(LLMError::invalid_request("script exhausted"))),
            Script::Function(decide) => decide(context),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context<'a>(memory: &'a [Message]) -> ReasoningContext<'a> {
        ReasoningContext {
            system_message: "",
            task: "task",
            memory,
            catalog: &[],
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn queue_replays_in_order_then_fails() {
        let reasoner = ScriptedReasoner::new([
            Decision::tool_call("calculator", json!({})),
            Decision::final_answer("done"),
        ]);
        let memory = [Message::user("task")];

        assert!(!reasoner.next_action(&context(&memory)).await.unwrap().is_final());
        assert!(reasoner.next_action(&context(&memory)).await.unwrap().is_final());
        assert!(reasoner.next_action(&context(&memory)).await.is_err());
        assert_eq!(reasoner.calls(), 3);
    }

    #[tokio::test]
    async fn closure_sees_memory_and_is_recorded() {
        let reasoner = ScriptedReasoner::from_fn(|ctx| {
            Ok(Decision::final_answer(format!("{} turns", ctx.memory.len())))
        });
        let memory = [Message::user("a"), Message::assistant("b")];

        let decision = reasoner.next_action(&context(&memory)).await.unwrap();
        assert_eq!(decision, Decision::final_answer("2 turns"));
        assert_eq!(reasoner.contexts()[0].memory, memory);
    }
}
