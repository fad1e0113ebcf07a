//! Conversation memory.
//!
//! An append-only list of turns owned by one execution loop. The reasoning
//! service only ever sees a shared slice of it.

use crate::agent::step::Step;
use crate::messages::{Message, ToolCall};

/// Ordered conversation turns for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationMemory {
    turns: Vec<Message>,
}

impl ConversationMemory {
    /// Creates empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Message::user(content));
    }

    /// Appends an assistant turn carrying a final answer.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Message::assistant(content));
    }

    /// Appends a completed step: the assistant's tool call and the tool's
    /// observation, together.
    ///
    /// Taking the whole step means an action can never be recorded without
    /// its observation.
    pub fn record_step(&mut self, step: &Step) {
        let call = ToolCall {
            id: step.action.id.clone(),
            name: step.action.tool.clone(),
            arguments: step.action.input.clone(),
        };
        let rationale = step.action.rationale.clone().unwrap_or_default();

        self.turns.reserve(2);
        self.turns
            .push(Message::assistant_with_tools(rationale, vec![call]));
        self.turns.push(Message::tool(
            step.action.id.clone(),
            step.observation.to_value().to_string(),
        ));
    }

    /// Clears every turn. Idempotent.
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// Returns the turns, oldest first.
    #[must_use]
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    /// Returns the number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if there are no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
