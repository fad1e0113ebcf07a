//! HTTP request built-in tool.
//!
//! Performs a single GET, POST, PUT or DELETE request and reports the status,
//! headers and body. JSON responses are returned as structured values.

use crate::messages::ToolDefinition;
use crate::tools::{parse_args, ToolConfig, ToolError, ToolExecutionFuture, ToolExecutor};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::redirect::Policy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use url::{Host, Url};

const TOOL_NAME: &str = "http_request";

/// Redirect hops followed before a request fails.
const MAX_REDIRECTS: usize = 10;

/// Settings for the HTTP request tool, read from `[tools.<name>.config]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpRequestSettings {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Response bodies larger than this are truncated
    pub max_response_bytes: usize,
    /// Permit requests to loopback and private network addresses
    pub allow_private_hosts: bool,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for HttpRequestSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_response_bytes: 5 * 1024 * 1024,
            allow_private_hosts: false,
            user_agent: concat!("acton-tools-agent/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP request tool executor.
#[derive(Debug, Clone)]
pub struct HttpRequestTool {
    client: reqwest::Client,
    settings: HttpRequestSettings,
}

#[derive(Debug, Deserialize)]
struct HttpRequestArgs {
    #[serde(default = "default_method")]
    method: String,
    url: String,
    #[serde(default)]
    headers: Option<HashMap<String, String>>,
    #[serde(default)]
    body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl HttpRequestTool {
    /// Creates a new HTTP request tool.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the HTTP client cannot be constructed.
    pub fn new(settings: HttpRequestSettings) -> Result<Self, ToolError> {
        let allow_private_hosts = settings.allow_private_hosts;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .redirect(Policy::custom(move |attempt| {
                match Self::check_redirect(attempt.url(), attempt.previous().len(), allow_private_hosts) {
                    Ok(()) => attempt.follow(),
                    Err(e) => attempt.error(e.message()),
                }
            }))
            .build()
            .map_err(|e| ToolError::internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    /// Returns the tool configuration for registration.
    #[must_use]
    pub fn tool_config() -> ToolConfig {
        ToolConfig::new(ToolDefinition {
            name: TOOL_NAME.to_string(),
            description: "Make an HTTP request to an external API. Supports GET, POST, PUT \
                          and DELETE with optional headers and a JSON body."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "method": {
                        "type": "string",
                        "enum": ["GET", "POST", "PUT", "DELETE"],
                        "description": "HTTP method (default: GET)"
                    },
                    "url": {
                        "type": "string",
                        "description": "URL to request (http or https)"
                    },
                    "headers": {
                        "type": "object",
                        "description": "Optional request headers",
                        "additionalProperties": {"type": "string"}
                    },
                    "body": {
                        "description": "Optional JSON request body"
                    }
                },
                "required": ["url"]
            }),
        })
    }

    /// Parses the URL and applies the scheme and host policy.
    fn validate_url(url: &str, allow_private_hosts: bool) -> Result<Url, ToolError> {
        let parsed = Url::parse(url)
            .map_err(|e| ToolError::invalid_input(TOOL_NAME, format!("Invalid URL: {e}")))?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ToolError::invalid_input(
                    TOOL_NAME,
                    format!("Unsupported URL scheme: {scheme}"),
                ));
            }
        }

        if !allow_private_hosts && is_private_host(parsed.host()) {
            return Err(ToolError::invalid_input(
                TOOL_NAME,
                "Requests to localhost or private network addresses are not allowed",
            ));
        }

        Ok(parsed)
    }

    /// Every redirect hop passes the same URL policy as the original request.
    fn check_redirect(next: &Url, hops: usize, allow_private_hosts: bool) -> Result<(), ToolError> {
        if hops >= MAX_REDIRECTS {
            return Err(ToolError::invalid_input(
                TOOL_NAME,
                format!("Too many redirects (limit {MAX_REDIRECTS})"),
            ));
        }
        Self::validate_url(next.as_str(), allow_private_hosts).map(|_| ())
    }
}

fn is_private_host(host: Option<Host<&str>>) -> bool {
    match host {
        None => true,
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => is_private_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_private_ip(IpAddr::V6(ip)),
    }
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_ip(IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

fn build_headers(headers: HashMap<String, String>) -> Result<HeaderMap, ToolError> {
    let mut header_map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::try_from(key.as_str())
            .map_err(|e| ToolError::invalid_input(TOOL_NAME, format!("Invalid header name: {e}")))?;
        let val = HeaderValue::try_from(value.as_str()).map_err(|e| {
            ToolError::invalid_input(TOOL_NAME, format!("Invalid header value: {e}"))
        })?;
        header_map.insert(name, val);
    }
    Ok(header_map)
}

impl ToolExecutor for HttpRequestTool {
    fn config(&self) -> ToolConfig {
        Self::tool_config().with_timeout(Duration::from_secs(self.settings.timeout_secs))
    }

    fn execute(&self, args: Value) -> ToolExecutionFuture {
        let client = self.client.clone();
        let settings = self.settings.clone();

        Box::pin(async move {
            let args: HttpRequestArgs = parse_args(TOOL_NAME, args)?;
            let url = Self::validate_url(&args.url, settings.allow_private_hosts)?;

            let method = args.method.trim().to_ascii_uppercase();
            let mut request = match method.as_str() {
                "GET" => client.get(url),
                "POST" => client.post(url),
                "PUT" => client.put(url),
                "DELETE" => client.delete(url),
                _ => {
                    return Err(ToolError::unsupported_operation(
                        TOOL_NAME,
                        format!("Unsupported HTTP method: {}", args.method),
                    ));
                }
            };

            if let Some(headers) = args.headers {
                request = request.headers(build_headers(headers)?);
            }

            if let Some(body) = args.body.filter(|b| !b.is_null()) {
                request = request.json(&body);
            }

            tracing::debug!(method = %method, url = %args.url, "sending HTTP request");

            let response = request.send().await.map_err(|e| {
                if e.is_timeout() {
                    ToolError::timeout(TOOL_NAME, Duration::from_secs(settings.timeout_secs))
                } else if e.is_redirect() {
                    let reason = std::error::Error::source(&e)
                        .map_or_else(|| e.to_string(), ToString::to_string);
                    ToolError::invalid_input(TOOL_NAME, format!("Redirect refused: {reason}"))
                } else {
                    ToolError::transport_failure(TOOL_NAME, format!("Request failed: {e}"))
                }
            })?;

            let status_code = response.status().as_u16();
            let is_json = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));
            let headers: Map<String, Value> = response
                .headers()
                .iter()
                .filter_map(|(k, v)| {
                    v.to_str()
                        .ok()
                        .map(|s| (k.as_str().to_string(), Value::String(s.to_string())))
                })
                .collect();

            let bytes = response.bytes().await.map_err(|e| {
                if e.is_timeout() {
                    ToolError::timeout(TOOL_NAME, Duration::from_secs(settings.timeout_secs))
                } else {
                    ToolError::transport_failure(TOOL_NAME, format!("Failed to read response: {e}"))
                }
            })?;

            let truncated = bytes.len() > settings.max_response_bytes;
            let body = if truncated {
                Value::String(
                    String::from_utf8_lossy(&bytes[..settings.max_response_bytes]).into_owned(),
                )
            } else if is_json {
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            } else {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            };

            let mut result = json!({
                "status_code": status_code,
                "headers": headers,
                "body": body,
            });
            if truncated {
                result["truncated"] = Value::Bool(true);
            }
            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response and returns the raw request text.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    fn local_tool() -> HttpRequestTool {
        HttpRequestTool::new(HttpRequestSettings {
            allow_private_hosts: true,
            timeout_secs: 5,
            ..HttpRequestSettings::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn get_parses_json_body() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"ok\":true}",
        )
        .await;

        let value = local_tool()
            .execute(json!({"url": format!("{base}/status")}))
            .await
            .unwrap();

        assert_eq!(value["status_code"], 200);
        assert_eq!(value["body"], json!({"ok": true}));
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /status"));
    }

    #[tokio::test]
    async fn post_sends_json_and_returns_text() {
        let (base, server) = serve_once(
            "HTTP/1.1 201 Created\r\nContent-Type: text/plain\r\nContent-Length: 7\r\nConnection: close\r\n\r\ncreated",
        )
        .await;

        let value = local_tool()
            .execute(json!({
                "method": "post",
                "url": format!("{base}/items"),
                "headers": {"X-Trace": "abc"},
                "body": {"name": "widget"}
            }))
            .await
            .unwrap();

        assert_eq!(value["status_code"], 201);
        assert_eq!(value["body"], "created");
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /items"));
        assert!(request.to_ascii_lowercase().contains("x-trace: abc"));
        assert!(request.contains(r#"{"name":"widget"}"#));
    }

    #[tokio::test]
    async fn unsupported_method_is_rejected() {
        let err = local_tool()
            .execute(json!({"method": "PATCH", "url": "http://127.0.0.1:1/"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unsupported_operation");
        assert_eq!(err.message(), "Unsupported HTTP method: PATCH");
    }

    #[tokio::test]
    async fn connection_refused_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = local_tool()
            .execute(json!({"url": format!("http://{addr}/")}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "transport_failure");
    }

    #[test]
    fn validate_url_rejects_non_http_schemes() {
        let err = HttpRequestTool::validate_url("ftp://example.com/file", false).unwrap_err();
        assert!(err.message().contains("ftp"));
    }

    #[test]
    fn validate_url_blocks_private_hosts_by_default() {
        for url in [
            "http://localhost/api",
            "http://127.0.0.1/",
            "http://10.1.2.3/",
            "http://192.168.0.10/",
            "http://172.20.0.1/",
            "http://[::1]/",
            "http://[fd00::1]/",
        ] {
            assert!(
                HttpRequestTool::validate_url(url, false).is_err(),
                "{url} should be blocked"
            );
        }
    }

    #[test]
    fn validate_url_allows_public_hosts() {
        assert!(HttpRequestTool::validate_url("https://api.example.com/v1", false).is_ok());
        assert!(HttpRequestTool::validate_url("http://172.32.0.1/", false).is_ok());
    }

    #[test]
    fn missing_url_is_invalid_input() {
        let err = local_tool().invoke_blocking(json!({"method": "GET"}));
        assert!(err.error().is_some_and(ToolError::is_invalid_input));
    }

    #[test]
    fn redirects_to_private_hosts_are_refused() {
        let public = Url::parse("https://example.com/next").unwrap();
        let private = Url::parse("http://169.254.169.254/latest/meta-data").unwrap();

        assert!(HttpRequestTool::check_redirect(&public, 1, false).is_ok());
        assert!(HttpRequestTool::check_redirect(&private, 1, false).is_err());
        assert!(HttpRequestTool::check_redirect(&private, 1, true).is_ok());
        assert!(HttpRequestTool::check_redirect(&public, MAX_REDIRECTS, false).is_err());
    }

    #[tokio::test]
    async fn endless_redirects_are_cut_off() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 302 Found\r\nLocation: /again\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    )
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        let err = local_tool()
            .execute(json!({"url": format!("http://{addr}/start")}))
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.message().contains("Too many redirects"), "{}", err.message());
    }
}
