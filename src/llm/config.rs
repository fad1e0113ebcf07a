//! Reasoning service configuration.
//!
//! Maps directly onto the `[provider]` table of the configuration file.

use crate::llm::error::LLMError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default environment variable holding the API key.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration for an OpenAI-compatible reasoning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// The model to use (e.g., "gpt-4o-mini")
    pub model: String,
    /// Base URL for the API, without the `/chat/completions` suffix
    pub base_url: String,
    /// Direct API key value; prefer `api_key_env`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable containing the API key
    pub api_key_env: String,
    /// Request timeout, in seconds
    pub timeout_secs: u64,
    /// Maximum tokens to generate per decision
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Retry behaviour for transient failures
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 120,
            max_tokens: 1024,
            temperature: 0.0,
            retry: RetryConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Creates a configuration for a custom OpenAI-compatible endpoint.
    ///
    /// # Examples
    ///
    /// ```
    /// use acton_tools_agent::llm::ProviderConfig;
    ///
    /// let config = ProviderConfig::openai_compatible("http://localhost:11434/v1", "qwen2.5:7b");
    /// assert_eq!(config.chat_completions_endpoint(), "http://localhost:11434/v1/chat/completions");
    /// ```
    #[must_use]
    pub fn openai_compatible(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the model to use.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the chat completions endpoint.
    #[must_use]
    pub fn chat_completions_endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Resolves the API key: the explicit value first, then `api_key_env`.
    ///
    /// Local OpenAI-compatible servers usually need no key, so a missing key
    /// resolves to `None` rather than an error.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok().filter(|key| !key.is_empty()))
    }

    /// Checks the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<(), LLMError> {
        if self.model.trim().is_empty() {
            return Err(LLMError::invalid_config("model", "must not be empty"));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(LLMError::invalid_config(
                "base_url",
                format!("'{}' is not a valid URL", self.base_url),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(LLMError::invalid_config("timeout_secs", "must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LLMError::invalid_config(
                "temperature",
                "must be between 0.0 and 2.0",
            ));
        }
        Ok(())
    }
}

/// Retry configuration for failed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial backoff, in milliseconds
    pub initial_backoff_ms: u64,
    /// Maximum backoff, in milliseconds
    pub max_backoff_ms: u64,
    /// Backoff multiplier (exponential factor)
    pub backoff_multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
            backoff_multiplier: 2,
        }
    }
}

impl RetryConfig {
    /// Disables retries.
    #[must_use]
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculates the backoff duration for a given attempt.
    ///
    /// Attempt 0 is the first request and has no backoff.
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let multiplier = self.backoff_multiplier.saturating_pow(attempt - 1);
        let backoff = Duration::from_millis(self.initial_backoff_ms).saturating_mul(multiplier);
        backoff.min(Duration::from_millis(self.max_backoff_ms))
    }
}
