//! Turns, tool calls and catalog entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions prepended to every query
    System,
    /// A submitted task
    User,
    /// A decision: a final answer, or a tool call with its rationale
    Assistant,
    /// An observation answering one tool call
    Tool,
}

impl MessageRole {
    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversation turn.
///
/// Assistant turns that call a tool carry `tool_calls`; the tool turn that
/// answers them carries the matching `tool_call_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(MessageRole::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(MessageRole::User, content)
    }

    /// A final answer.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(MessageRole::Assistant, content)
    }

    /// A decision to call tools; `content` holds the rationale, possibly empty.
    #[must_use]
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::text(MessageRole::Assistant, content)
        }
    }

    /// The observation for call `tool_call_id`, encoded as JSON text.
    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::text(MessageRole::Tool, content)
        }
    }

    /// Ids of the tool calls this turn requests; empty for other turns.
    pub fn call_ids(&self) -> impl Iterator<Item = &str> {
        self.tool_calls
            .iter()
            .flatten()
            .map(|call| call.id.as_str())
    }
}

/// What the reasoning service sees of a tool: name, purpose and input schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the tool input
    pub input_schema: Value,
}

/// A request to invoke one tool.
///
/// `arguments` is passed to the tool untouched; tools accept either an object
/// or a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_turns_link_by_call_id() {
        let call = ToolCall::new(
            "call_1",
            "calculator",
            json!({"operation": "divide", "a": 15, "b": 3}),
        );
        let request = Message::assistant_with_tools("Dividing first.", vec![call]);
        let answer = Message::tool("call_1", r#"{"result":5.0}"#);

        assert_eq!(request.role, MessageRole::Assistant);
        assert_eq!(request.call_ids().collect::<Vec<_>>(), ["call_1"]);
        assert_eq!(answer.role, MessageRole::Tool);
        assert_eq!(answer.tool_call_id.as_deref(), Some("call_1"));
        assert!(answer.tool_calls.is_none());
    }

    #[test]
    fn text_turns_have_no_calls() {
        let turn = Message::user("What is 15 / 3?");
        assert_eq!(turn.content, "What is 15 / 3?");
        assert_eq!(turn.call_ids().count(), 0);
        assert!(turn.tool_call_id.is_none());
    }

    #[test]
    fn text_turn_encoding_omits_tool_fields() {
        let encoded = serde_json::to_value(Message::system("be brief")).unwrap();
        assert_eq!(encoded, json!({"role": "system", "content": "be brief"}));
    }

    #[test]
    fn roles_use_lowercase_names() {
        assert_eq!(MessageRole::Tool.to_string(), "tool");
        assert_eq!(
            serde_json::to_value(MessageRole::Assistant).unwrap(),
            json!("assistant")
        );
    }
}
