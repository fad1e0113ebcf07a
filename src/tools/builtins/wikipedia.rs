//! Wikipedia lookup built-in tool.
//!
//! Searches Wikipedia for a query, picks the best match and returns its
//! summary. Disambiguation pages are reported as ambiguous with the
//! alternative titles so the reasoning service can refine its query.

use crate::messages::ToolDefinition;
use crate::tools::{parse_args, ToolConfig, ToolError, ToolExecutionFuture, ToolExecutor};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const TOOL_NAME: &str = "wikipedia";

/// Number of alternative titles offered for an ambiguous query.
const MAX_OPTIONS: usize = 5;

/// Settings for the Wikipedia tool, read from `[tools.<name>.config]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikipediaSettings {
    /// Base URL; `{language}` is replaced with the requested language code
    pub base_url: String,
    /// Language used when the call does not specify one
    pub default_language: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WikipediaSettings {
    fn default() -> Self {
        Self {
            base_url: "https://{language}.wikipedia.org".to_string(),
            default_language: "en".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Wikipedia lookup tool executor.
#[derive(Debug, Clone)]
pub struct WikipediaTool {
    client: reqwest::Client,
    settings: WikipediaSettings,
}

#[derive(Debug, Deserialize)]
struct WikipediaArgs {
    query: String,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    page_type: String,
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    pageid: Option<u64>,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<DesktopUrls>,
}

#[derive(Debug, Deserialize)]
struct DesktopUrls {
    page: Option<String>,
}

impl WikipediaTool {
    /// Creates a new Wikipedia tool.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the HTTP client cannot be constructed.
    pub fn new(settings: WikipediaSettings) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("acton-tools-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    /// Returns the tool configuration for registration.
    #[must_use]
    pub fn tool_config() -> ToolConfig {
        ToolConfig::new(ToolDefinition {
            name: TOOL_NAME.to_string(),
            description: "Look up a topic on Wikipedia and return the summary of the best \
                          matching article."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The topic to search for"
                    },
                    "language": {
                        "type": "string",
                        "description": "Wikipedia language code (default: en)"
                    }
                },
                "required": ["query"]
            }),
        })
    }

    fn base_url(&self, language: &str) -> Result<Url, ToolError> {
        let raw = self.settings.base_url.replace("{language}", language);
        Url::parse(&raw)
            .map_err(|e| ToolError::internal(format!("invalid Wikipedia base URL '{raw}': {e}")))
    }
}

fn validate_language(language: &str) -> Result<(), ToolError> {
    let valid = (2..=12).contains(&language.len())
        && language
            .chars()
            .all(|c| c.is_ascii_lowercase() || c == '-')
        && !language.starts_with('-');
    if valid {
        Ok(())
    } else {
        Err(ToolError::invalid_input(
            TOOL_NAME,
            format!("Invalid language code: {language}"),
        ))
    }
}

fn transport_error(error: &reqwest::Error, timeout_secs: u64) -> ToolError {
    if error.is_timeout() {
        ToolError::timeout(TOOL_NAME, Duration::from_secs(timeout_secs))
    } else {
        ToolError::transport_failure(TOOL_NAME, format!("Wikipedia request failed: {error}"))
    }
}

impl ToolExecutor for WikipediaTool {
    fn config(&self) -> ToolConfig {
        Self::tool_config().with_timeout(Duration::from_secs(self.settings.timeout_secs))
    }

    fn execute(&self, args: Value) -> ToolExecutionFuture {
        let tool = self.clone();

        Box::pin(async move {
            let args: WikipediaArgs = parse_args(TOOL_NAME, args)?;
            let query = args.query.trim().to_string();
            if query.is_empty() {
                return Err(ToolError::invalid_input(TOOL_NAME, "Query cannot be empty"));
            }
            let language = args
                .language
                .map(|l| l.trim().to_ascii_lowercase())
                .unwrap_or_else(|| tool.settings.default_language.clone());
            validate_language(&language)?;

            let timeout_secs = tool.settings.timeout_secs;
            let base = tool.base_url(&language)?;

            let mut search_url = base.clone();
            search_url.set_path("/w/api.php");
            let search: SearchResponse = tool
                .client
                .get(search_url)
                .query(&[
                    ("action", "query"),
                    ("list", "search"),
                    ("srsearch", query.as_str()),
                    ("srlimit", "6"),
                    ("format", "json"),
                ])
                .send()
                .await
                .map_err(|e| transport_error(&e, timeout_secs))?
                .error_for_status()
                .map_err(|e| transport_error(&e, timeout_secs))?
                .json()
                .await
                .map_err(|e| {
                    ToolError::transport_failure(TOOL_NAME, format!("Malformed search response: {e}"))
                })?;

            let titles: Vec<String> = search
                .query
                .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
                .unwrap_or_default();
            let Some(best) = titles.first().cloned() else {
                return Err(ToolError::not_found(
                    TOOL_NAME,
                    format!("No Wikipedia articles found for: {query}"),
                ));
            };

            let mut summary_url = base;
            summary_url
                .path_segments_mut()
                .map_err(|()| ToolError::internal("Wikipedia base URL cannot hold a path"))?
                .clear()
                .extend(["api", "rest_v1", "page", "summary"])
                .push(&best.replace(' ', "_"));

            tracing::debug!(query = %query, title = %best, "fetching Wikipedia summary");

            let response = tool
                .client
                .get(summary_url)
                .send()
                .await
                .map_err(|e| transport_error(&e, timeout_secs))?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(ToolError::not_found(
                    TOOL_NAME,
                    format!("No Wikipedia page found for: {query}"),
                ));
            }
            let summary: PageSummary = response
                .error_for_status()
                .map_err(|e| transport_error(&e, timeout_secs))?
                .json()
                .await
                .map_err(|e| {
                    ToolError::transport_failure(TOOL_NAME, format!("Malformed page summary: {e}"))
                })?;

            if summary.page_type == "disambiguation" {
                let options = titles
                    .into_iter()
                    .filter(|t| *t != best)
                    .take(MAX_OPTIONS)
                    .collect();
                return Err(ToolError::ambiguous_query(TOOL_NAME, query, options));
            }

            let url = summary
                .content_urls
                .and_then(|c| c.desktop)
                .and_then(|d| d.page)
                .unwrap_or_default();

            Ok(json!({
                "title": summary.title,
                "url": url,
                "extract": summary.extract,
                "page_id": summary.pageid,
            }))
        })
    }
}
