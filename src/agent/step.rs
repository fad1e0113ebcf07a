//! Tasks, actions and steps.

use crate::tools::Observation;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

/// A task submitted to the loop. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// The task text
    pub text: String,
    /// Record rationale and raw decision history for this run
    pub debug: bool,
}

impl Task {
    /// Creates a task with debug recording off.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            debug: false,
        }
    }

    /// Enables or disables debug recording.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl From<&str> for Task {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Task {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// One tool call chosen by the reasoning service.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Call identifier linking the assistant turn to the tool turn
    pub id: String,
    /// Name of the tool to invoke
    pub tool: String,
    /// Tool input, passed through untouched
    pub input: Value,
    /// Reasoning produced before choosing the tool
    pub rationale: Option<String>,
    /// When the decision was received
    pub timestamp: DateTime<Utc>,
}

/// An action paired with the observation it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// The action taken
    pub action: Action,
    /// What the tool returned
    pub observation: Observation,
}

impl Step {
    /// Encodes the step for a run result.
    ///
    /// With `debug` set the encoding also carries the rationale (`thought`)
    /// and a raw text rendering of the decision (`raw_log`).
    #[must_use]
    pub fn to_value(&self, debug: bool) -> Value {
        let mut map = Map::new();
        map.insert("action".to_string(), json!(self.action.tool));
        map.insert("input".to_string(), self.action.input.clone());
        map.insert("output".to_string(), self.observation.to_value());
        map.insert(
            "timestamp".to_string(),
            json!(self.action.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        if debug {
            if let Some(thought) = &self.action.rationale {
                map.insert("thought".to_string(), json!(thought));
            }
            map.insert("raw_log".to_string(), json!(self.raw_log()));
        }

        Value::Object(map)
    }

    /// Renders the decision as plain text.
    #[must_use]
    pub fn raw_log(&self) -> String {
        let mut log = String::new();
        if let Some(thought) = &self.action.rationale {
            log.push_str(thought);
            log.push('\n');
        }
        log.push_str(&format!(
            "Action: {}\nAction Input: {}",
            self.action.tool, self.action.input
        ));
        log
    }
}
