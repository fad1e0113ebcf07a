//! Reasoning service errors.
//!
//! Every failure a reasoning service can report, from transport problems to
//! a reply the loop cannot turn into a [`Decision`](crate::llm::Decision).
//! The loop never inspects these beyond [`LLMError::is_retriable`]; a run
//! that receives one ends with an error result.

use std::fmt;
use std::time::Duration;

/// A failed reasoning query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LLMError {
    /// What went wrong
    pub kind: LLMErrorKind,
}

/// Categories of reasoning service failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LLMErrorKind {
    /// The endpoint could not be reached or the connection dropped
    Network {
        /// Transport detail
        message: String,
    },
    /// HTTP 429
    RateLimited {
        /// Wait requested by the server, or the backoff default
        retry_after: Duration,
    },
    /// Any other non-success HTTP status
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Server-supplied message
        message: String,
        /// Server-supplied error type, e.g. `invalid_request_error`
        error_type: Option<String>,
    },
    /// The key was missing, wrong or revoked
    AuthenticationFailed {
        /// Server-supplied reason
        reason: String,
    },
    /// The query could not be built or the script ran out
    InvalidRequest {
        /// What was wrong with it
        reason: String,
    },
    /// The reply held neither a final answer nor a usable tool call
    ParseError {
        /// What could not be read
        message: String,
    },
    /// The client-side deadline passed
    Timeout {
        /// The deadline
        duration: Duration,
    },
    /// Provider configuration cannot work
    InvalidConfig {
        /// Offending field
        field: String,
        /// Why
        reason: String,
    },
}

impl LLMError {
    #[must_use]
    fn from_kind(kind: LLMErrorKind) -> Self {
        Self { kind }
    }

    /// Connection or transport failure.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::from_kind(LLMErrorKind::Network {
            message: message.into(),
        })
    }

    /// HTTP 429 with the wait the server asked for.
    #[must_use]
    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::from_kind(LLMErrorKind::RateLimited { retry_after })
    }

    /// Non-success HTTP status other than 401 and 429.
    #[must_use]
    pub fn api_error(
        status_code: u16,
        message: impl Into<String>,
        error_type: Option<String>,
    ) -> Self {
        Self::from_kind(LLMErrorKind::ApiError {
            status_code,
            message: message.into(),
            error_type,
        })
    }

    #[must_use]
    pub fn authentication_failed(reason: impl Into<String>) -> Self {
        Self::from_kind(LLMErrorKind::AuthenticationFailed {
            reason: reason.into(),
        })
    }

    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::from_kind(LLMErrorKind::InvalidRequest {
            reason: reason.into(),
        })
    }

    /// The reply could not be read as a decision.
    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::from_kind(LLMErrorKind::ParseError {
            message: message.into(),
        })
    }

    #[must_use]
    pub fn timeout(duration: Duration) -> Self {
        Self::from_kind(LLMErrorKind::Timeout { duration })
    }

    /// Provider configuration rejected before any request was sent.
    #[must_use]
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::from_kind(LLMErrorKind::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Stable snake_case identifier for logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self.kind {
            LLMErrorKind::Network { .. } => "network",
            LLMErrorKind::RateLimited { .. } => "rate_limited",
            LLMErrorKind::ApiError { .. } => "api_error",
            LLMErrorKind::AuthenticationFailed { .. } => "authentication_failed",
            LLMErrorKind::InvalidRequest { .. } => "invalid_request",
            LLMErrorKind::ParseError { .. } => "parse_error",
            LLMErrorKind::Timeout { .. } => "timeout",
            LLMErrorKind::InvalidConfig { .. } => "invalid_config",
        }
    }

    /// Whether sending the same query again might succeed.
    ///
    /// Transport failures, rate limits, deadlines and 5xx statuses qualify.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match &self.kind {
            LLMErrorKind::Network { .. }
            | LLMErrorKind::RateLimited { .. }
            | LLMErrorKind::Timeout { .. } => true,
            LLMErrorKind::ApiError { status_code, .. } => (500..=599).contains(status_code),
            _ => false,
        }
    }

    /// The server-requested wait, for rate limits only.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        if let LLMErrorKind::RateLimited { retry_after } = self.kind {
            Some(retry_after)
        } else {
            None
        }
    }

    /// HTTP status behind this error, when there was one.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            LLMErrorKind::ApiError { status_code, .. } => Some(status_code),
            LLMErrorKind::RateLimited { .. } => Some(429),
            LLMErrorKind::AuthenticationFailed { .. } => Some(401),
            _ => None,
        }
    }
}

impl fmt::Display for LLMError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LLMErrorKind::Network { message } => write!(
                f,
                "network error reaching the reasoning service: {message}; is base_url reachable?"
            ),
            LLMErrorKind::RateLimited { retry_after } => write!(
                f,
                "reasoning service rate limit hit; wait {}s before the next run",
                retry_after.as_secs()
            ),
            LLMErrorKind::ApiError {
                status_code,
                message,
                error_type: Some(error_type),
            } => write!(f, "reasoning service returned HTTP {status_code} ({error_type}): {message}"),
            LLMErrorKind::ApiError {
                status_code,
                message,
                error_type: None,
            } => write!(f, "reasoning service returned HTTP {status_code}: {message}"),
            LLMErrorKind::AuthenticationFailed { reason } => write!(
                f,
                "reasoning service rejected the API key: {reason}; check provider.api_key_env"
            ),
            LLMErrorKind::InvalidRequest { reason } => {
                write!(f, "invalid reasoning request: {reason}")
            }
            LLMErrorKind::ParseError { message } => {
                write!(f, "unreadable reasoning service reply: {message}")
            }
            LLMErrorKind::Timeout { duration } => write!(
                f,
                "reasoning request timed out after {}s; raise provider.timeout_secs",
                duration.as_secs()
            ),
            LLMErrorKind::InvalidConfig { field, reason } => {
                write!(f, "provider.{field} {reason}")
            }
        }
    }
}

impl std::error::Error for LLMError {}
