//! Tool error types.
//!
//! Every failure a tool can hit is described by a `ToolError`. Tools never let
//! these escape as faults: the contract converts them into an error
//! [`Observation`](crate::tools::Observation) that is fed back to the
//! reasoning service like any other result.

use std::fmt;
use std::time::Duration;

/// Errors that can occur while validating or executing a tool call.
///
/// Uses `Box<ToolErrorKind>` to keep the error small inside `Result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    kind: Box<ToolErrorKind>,
}

/// Specific tool error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// The payload was malformed or missing required fields
    InvalidInput {
        /// The tool that rejected the payload
        tool_name: String,
        /// What was invalid
        reason: String,
    },
    /// No tool with this name exists in the registry
    UnknownTool {
        /// The requested tool name
        tool_name: String,
    },
    /// The payload was well-formed but asked for an unsupported operation
    UnsupportedOperation {
        /// The tool that rejected the operation
        tool_name: String,
        /// Human-readable description of the unsupported value
        reason: String,
    },
    /// The code tool was asked to run a language it does not support
    UnsupportedLanguage {
        /// The requested language
        language: String,
    },
    /// Submitted code imports modules outside the sandbox allow-list
    UnauthorizedImport {
        /// The offending top-level module names
        modules: Vec<String>,
    },
    /// A network-bound tool could not complete its request
    TransportFailure {
        /// The tool that failed
        tool_name: String,
        /// Reason for failure
        reason: String,
    },
    /// The tool exceeded its deadline
    Timeout {
        /// The tool that timed out
        tool_name: String,
        /// The deadline that was exceeded
        duration: Duration,
    },
    /// The lookup produced no result
    NotFound {
        /// The tool that performed the lookup
        tool_name: String,
        /// Message describing what was not found
        reason: String,
    },
    /// The lookup matched several candidates
    AmbiguousQuery {
        /// The tool that performed the lookup
        tool_name: String,
        /// The query that was ambiguous
        query: String,
        /// Alternative candidates the caller may choose from
        options: Vec<String>,
    },
    /// The tool ran but the operation itself failed
    ExecutionFailed {
        /// The tool that failed
        tool_name: String,
        /// Reason for failure
        reason: String,
    },
    /// Two tools with the same name were registered
    AlreadyRegistered {
        /// The duplicated name
        tool_name: String,
    },
    /// Internal error
    Internal {
        /// Description of the internal error
        message: String,
    },
}

impl ToolError {
    /// Creates a new ToolError with the given kind.
    #[must_use]
    pub fn new(kind: ToolErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }

    /// Returns a reference to the error kind.
    #[must_use]
    pub fn kind(&self) -> &ToolErrorKind {
        &self.kind
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidInput {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates an unknown tool error.
    #[must_use]
    pub fn unknown_tool(tool_name: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::UnknownTool {
            tool_name: tool_name.into(),
        })
    }

    /// Creates an unsupported operation error.
    #[must_use]
    pub fn unsupported_operation(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::UnsupportedOperation {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates an unsupported language error.
    #[must_use]
    pub fn unsupported_language(language: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::UnsupportedLanguage {
            language: language.into(),
        })
    }

    /// Creates an unauthorized import error.
    #[must_use]
    pub fn unauthorized_import(modules: Vec<String>) -> Self {
        Self::new(ToolErrorKind::UnauthorizedImport { modules })
    }

    /// Creates a transport failure error.
    #[must_use]
    pub fn transport_failure(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::TransportFailure {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(tool_name: impl Into<String>, duration: Duration) -> Self {
        Self::new(ToolErrorKind::Timeout {
            tool_name: tool_name.into(),
            duration,
        })
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates an ambiguous query error.
    #[must_use]
    pub fn ambiguous_query(
        tool_name: impl Into<String>,
        query: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        Self::new(ToolErrorKind::AmbiguousQuery {
            tool_name: tool_name.into(),
            query: query.into(),
            options,
        })
    }

    /// Creates an execution failed error.
    #[must_use]
    pub fn execution_failed(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates an already registered error.
    #[must_use]
    pub fn already_registered(tool_name: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::AlreadyRegistered {
            tool_name: tool_name.into(),
        })
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal {
            message: message.into(),
        })
    }

    /// Stable snake_case code for the error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self.kind.as_ref() {
            ToolErrorKind::InvalidInput { .. } => "invalid_input",
            ToolErrorKind::UnknownTool { .. } => "unknown_tool",
            ToolErrorKind::UnsupportedOperation { .. } => "unsupported_operation",
            ToolErrorKind::UnsupportedLanguage { .. } => "unsupported_language",
            ToolErrorKind::UnauthorizedImport { .. } => "unauthorized_import",
            ToolErrorKind::TransportFailure { .. } => "transport_failure",
            ToolErrorKind::Timeout { .. } => "timeout",
            ToolErrorKind::NotFound { .. } => "not_found",
            ToolErrorKind::AmbiguousQuery { .. } => "ambiguous_query",
            ToolErrorKind::ExecutionFailed { .. } => "execution_failed",
            ToolErrorKind::AlreadyRegistered { .. } => "already_registered",
            ToolErrorKind::Internal { .. } => "internal",
        }
    }

    /// The bare message placed in an observation's `error` field.
    ///
    /// Unlike `Display`, this omits the tool name and remediation hints so the
    /// reasoning service sees the failure exactly as the tool reported it.
    #[must_use]
    pub fn message(&self) -> String {
        match self.kind.as_ref() {
            ToolErrorKind::InvalidInput { reason, .. }
            | ToolErrorKind::UnsupportedOperation { reason, .. }
            | ToolErrorKind::TransportFailure { reason, .. }
            | ToolErrorKind::NotFound { reason, .. }
            | ToolErrorKind::ExecutionFailed { reason, .. } => reason.clone(),
            ToolErrorKind::UnknownTool { tool_name } => format!("Unknown tool: {tool_name}"),
            ToolErrorKind::UnsupportedLanguage { language } => format!(
                "Unsupported language: {language}. Only Python is currently supported."
            ),
            ToolErrorKind::UnauthorizedImport { modules } => {
                format!("Unauthorized import: {}", modules.join(", "))
            }
            ToolErrorKind::Timeout { duration, .. } => {
                format!("timed out after {} seconds", duration.as_secs_f64())
            }
            ToolErrorKind::AmbiguousQuery { .. } => "Disambiguation page".to_string(),
            ToolErrorKind::AlreadyRegistered { tool_name } => {
                format!("Tool already registered: {tool_name}")
            }
            ToolErrorKind::Internal { message } => message.clone(),
        }
    }

    /// Returns true if the tool exceeded its deadline.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::Timeout { .. })
    }

    /// Returns true if the payload was rejected as malformed.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::InvalidInput { .. })
    }

    /// Returns true if the registry had no tool with the requested name.
    #[must_use]
    pub fn is_unknown_tool(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::UnknownTool { .. })
    }

    /// Returns true if the sandbox import policy rejected the code.
    #[must_use]
    pub fn is_unauthorized_import(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::UnauthorizedImport { .. })
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.as_ref() {
            ToolErrorKind::InvalidInput { tool_name, reason } => {
                write!(
                    f,
                    "tool '{}' rejected its input: {}; check the input arguments",
                    tool_name, reason
                )
            }
            ToolErrorKind::UnknownTool { tool_name } => {
                write!(
                    f,
                    "tool '{}' not found; verify the tool is enabled in the configuration",
                    tool_name
                )
            }
            ToolErrorKind::UnsupportedOperation { tool_name, reason } => {
                write!(f, "tool '{}' does not support this request: {}", tool_name, reason)
            }
            ToolErrorKind::UnsupportedLanguage { language } => {
                write!(
                    f,
                    "unsupported language '{}'; only python is currently supported",
                    language
                )
            }
            ToolErrorKind::UnauthorizedImport { modules } => {
                write!(
                    f,
                    "code imports modules outside the sandbox allow-list: {}; \
                     extend allowed_modules to permit them",
                    modules.join(", ")
                )
            }
            ToolErrorKind::TransportFailure { tool_name, reason } => {
                write!(f, "tool '{}' transport failure: {}", tool_name, reason)
            }
            ToolErrorKind::Timeout {
                tool_name,
                duration,
            } => {
                write!(
                    f,
                    "tool '{}' timed out after {} seconds",
                    tool_name,
                    duration.as_secs_f64()
                )
            }
            ToolErrorKind::NotFound { tool_name, reason } => {
                write!(f, "tool '{}' found nothing: {}", tool_name, reason)
            }
            ToolErrorKind::AmbiguousQuery {
                tool_name, query, ..
            } => {
                write!(
                    f,
                    "tool '{}' found several matches for '{}'; pick one of the offered options",
                    tool_name, query
                )
            }
            ToolErrorKind::ExecutionFailed { tool_name, reason } => {
                write!(f, "tool '{}' execution failed: {}", tool_name, reason)
            }
            ToolErrorKind::AlreadyRegistered { tool_name } => {
                write!(
                    f,
                    "tool '{}' is already registered; tool names must be unique",
                    tool_name
                )
            }
            ToolErrorKind::Internal { message } => {
                write!(f, "internal tool error: {}", message)
            }
        }
    }
}

impl std::error::Error for ToolError {}
