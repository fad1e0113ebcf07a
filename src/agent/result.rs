//! Run results.
//!
//! A [`RunResult`] is always well formed: either a report with the final
//! answer and the step transcript, or a bare error.

use crate::agent::step::Step;
use crate::error::AgentError;
use crate::types::RunId;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Confidence reported for every answer. No scoring is performed.
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// Raw decision history recorded in debug mode.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugBundle {
    /// Rationale produced with the final answer
    pub final_thought: String,
    /// Number of tool steps taken
    pub total_steps: usize,
}

/// Outcome of a run that reached a final answer or ran out of budget.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Identifier of the run, for log correlation
    pub run_id: RunId,
    /// The answer text; the last partial text when abandoned
    pub response: String,
    /// Answer confidence
    pub confidence: f64,
    /// Tool steps in invocation order
    pub steps: Vec<Step>,
    /// Whether debug details are encoded
    pub debug: Option<DebugBundle>,
    /// Why the run stopped without a final answer
    pub abandoned: Option<String>,
}

impl RunReport {
    /// Returns true if the run stopped without a final answer.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.abandoned.is_some()
    }

    /// Encodes the report.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let debug = self.debug.is_some();
        let steps: Vec<Value> = self.steps.iter().map(|s| s.to_value(debug)).collect();

        let mut map = Map::new();
        map.insert(
            "result".to_string(),
            json!({
                "final_output": {
                    "response": self.response,
                    "confidence": self.confidence,
                },
                "steps": steps,
            }),
        );

        if let Some(bundle) = &self.debug {
            let raw_steps: Vec<Value> = self
                .steps
                .iter()
                .map(|step| {
                    json!({
                        "thought": step.action.rationale.clone().unwrap_or_default(),
                        "action": step.action.tool,
                        "action_input": step.action.input,
                        "observation": step.observation.to_value(),
                    })
                })
                .collect();
            map.insert(
                "debug".to_string(),
                json!({
                    "final_thought": bundle.final_thought,
                    "total_steps": bundle.total_steps,
                    "raw_steps": raw_steps,
                }),
            );
        }

        if let Some(reason) = &self.abandoned {
            map.insert("abandoned".to_string(), json!(reason));
        }

        Value::Object(map)
    }
}

/// The response to one `run` call.
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    /// The loop finished or was abandoned with a partial answer
    Completed(RunReport),
    /// A fault outside any tool ended the run
    Failed {
        /// What went wrong
        error: AgentError,
    },
}

impl RunResult {
    /// Returns the report, if the run did not fail.
    #[must_use]
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }

    /// Returns the error, if the run failed.
    #[must_use]
    pub fn error(&self) -> Option<&AgentError> {
        match self {
            Self::Completed(_) => None,
            Self::Failed { error } => Some(error),
        }
    }

    /// Returns the answer text, if the run did not fail.
    #[must_use]
    pub fn response(&self) -> Option<&str> {
        self.report().map(|r| r.response.as_str())
    }

    /// Returns the steps taken; empty for a failed run.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        self.report().map_or(&[], |r| r.steps.as_slice())
    }

    /// Returns true if the run failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Encodes the result.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Completed(report) => report.to_value(),
            Self::Failed { error } => json!({ "error": error.to_string() }),
        }
    }
}

impl From<AgentError> for RunResult {
    fn from(error: AgentError) -> Self {
        Self::Failed { error }
    }
}

impl Serialize for RunResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::step::Action;
    use crate::llm::LLMError;
    use crate::tools::Observation;
    use chrono::Utc;

    fn report(debug: bool, abandoned: Option<&str>) -> RunReport {
        let step = Step {
            action: Action {
                id: "call_1".to_string(),
                tool: "calculator".to_string(),
                input: json!({"operation": "add", "a": 2, "b": 3}),
                rationale: Some("add".to_string()),
                timestamp: Utc::now(),
            },
            observation: Observation::success(json!({"result": 5.0})),
        };
        RunReport {
            run_id: RunId::new(),
            response: "5".to_string(),
            confidence: DEFAULT_CONFIDENCE,
            steps: vec![step],
            debug: debug.then(|| DebugBundle {
                final_thought: "done".to_string(),
                total_steps: 1,
            }),
            abandoned: abandoned.map(str::to_string),
        }
    }

    #[test]
    fn completed_encoding() {
        let value = RunResult::Completed(report(false, None)).to_value();
        assert_eq!(value["result"]["final_output"]["response"], "5");
        assert_eq!(value["result"]["final_output"]["confidence"], 1.0);
        assert_eq!(value["result"]["steps"][0]["action"], "calculator");
        assert!(value.get("debug").is_none());
        assert!(value.get("abandoned").is_none());
    }

    #[test]
    fn debug_bundle_duplicates_history() {
        let value = RunResult::Completed(report(true, None)).to_value();
        let debug = &value["debug"];
        assert_eq!(debug["final_thought"], "done");
        assert_eq!(debug["total_steps"], 1);
        assert_eq!(debug["raw_steps"][0]["thought"], "add");
        assert_eq!(debug["raw_steps"][0]["observation"], json!({"result": 5.0}));
        assert_eq!(value["result"]["steps"][0]["thought"], "add");
    }

    #[test]
    fn abandoned_marker_is_encoded() {
        let value = RunResult::Completed(report(false, Some("iteration budget exceeded"))).to_value();
        assert_eq!(value["abandoned"], "iteration budget exceeded");
    }

    #[test]
    fn failed_encoding_is_only_error() {
        let result = RunResult::from(AgentError::from(LLMError::network("refused")));
        let value = result.to_value();
        assert_eq!(value.as_object().unwrap().len(), 1);
        assert!(value["error"].as_str().unwrap().contains("refused"));
        assert!(result.steps().is_empty());
    }

    #[test]
    fn serialize_matches_to_value() {
        let result = RunResult::Completed(report(false, None));
        assert_eq!(serde_json::to_value(&result).unwrap(), result.to_value());
    }
}
