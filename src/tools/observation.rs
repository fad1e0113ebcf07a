//! The result of a single tool invocation.
//!
//! An observation is either a success payload or an error descriptor, never
//! both. On the wire a success is the payload object itself (for example
//! `{"result": 20.0}`), while a failure is an object with an `error` message,
//! a machine-readable `kind` and any structured details the error carries.

use crate::tools::error::{ToolError, ToolErrorKind};
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// The tool succeeded with this payload
    Success(Value),
    /// The tool failed with this error
    Failure(ToolError),
}

impl Observation {
    /// Wraps a success payload.
    ///
    /// Non-object payloads are wrapped as `{"result": payload}` so the
    /// encoded form is always an object. A payload object that itself carries
    /// an `error` key is moved under `result` for the same reason.
    #[must_use]
    pub fn success(payload: Value) -> Self {
        match payload {
            Value::Object(map) if !map.contains_key("error") => Self::Success(Value::Object(map)),
            other => Self::Success(json!({ "result": other })),
        }
    }

    /// Wraps an error descriptor.
    #[must_use]
    pub fn failure(error: ToolError) -> Self {
        Self::Failure(error)
    }

    /// Returns true for a success observation.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the error, if this observation is a failure.
    #[must_use]
    pub fn error(&self) -> Option<&ToolError> {
        match self {
            Self::Failure(error) => Some(error),
            Self::Success(_) => None,
        }
    }

    /// Returns the success payload, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure(_) => None,
        }
    }

    /// Encodes the observation as JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Success(payload) => payload.clone(),
            Self::Failure(error) => {
                let mut map = Map::new();
                map.insert("error".to_string(), Value::String(error.message()));
                map.insert("kind".to_string(), Value::String(error.code().to_string()));
                match error.kind() {
                    ToolErrorKind::AmbiguousQuery { query, options, .. } => {
                        map.insert("query".to_string(), json!(query));
                        map.insert("options".to_string(), json!(options));
                    }
                    ToolErrorKind::UnauthorizedImport { modules } => {
                        map.insert("modules".to_string(), json!(modules));
                    }
                    _ => {}
                }
                Value::Object(map)
            }
        }
    }
}

impl From<Result<Value, ToolError>> for Observation {
    fn from(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(error) => Self::failure(error),
        }
    }
}

impl std::fmt::Display for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl Serialize for Observation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}
