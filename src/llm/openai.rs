//! OpenAI-compatible reasoning service.
//!
//! Uses the chat completions API with function calling. Works against
//! OpenAI itself and compatible servers (Ollama, vLLM, LocalAI).

use crate::llm::client::{Decision, ReasoningContext, ReasoningService};
use crate::llm::config::{ProviderConfig, RetryConfig};
use crate::llm::error::LLMError;
use crate::messages::{Message, MessageRole, ToolCall, ToolDefinition};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reasoning service backed by an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIReasoner {
    /// HTTP client
    client: Client,
    /// Full chat completions URL
    endpoint: String,
    /// API key (optional for local providers like Ollama)
    api_key: Option<String>,
    /// Model name
    model: String,
    /// Maximum tokens to generate
    max_tokens: u32,
    /// Retry behaviour for transient failures
    retry: RetryConfig,
    /// Longest wait between attempts
    max_backoff: Duration,
    /// Per-request timeout
    timeout: Duration,
}

/// Request body for the chat completions API.
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAITool>,
}

/// A message in OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// A tool definition in OpenAI format.
#[derive(Debug, Clone, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunction,
}

/// A function definition in OpenAI format.
#[derive(Debug, Clone, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// A tool call in OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: OpenAIFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// A function call in OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionChoice {
    message: OpenAIMessage,
}

/// Error response from the API.
#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorDetail {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
    message: String,
}

impl OpenAIReasoner {
    /// Creates a reasoner from provider configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration is unusable and
    /// `Network` if the HTTP client cannot be created.
    pub fn new(config: &ProviderConfig) -> Result<Self, LLMError> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LLMError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.chat_completions_endpoint(),
            api_key: config.resolve_api_key(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            retry: config.retry,
            max_backoff: Duration::from_millis(config.retry.max_backoff_ms),
            timeout: config.timeout(),
        })
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Converts the system message and memory to OpenAI API format.
    fn convert_messages(system_message: &str, memory: &[Message]) -> Vec<OpenAIMessage> {
        let system = (!system_message.is_empty()).then(|| OpenAIMessage {
            role: "system".to_string(),
            content: Some(system_message.to_string()),
            tool_calls: None,
            tool_call_id: None,
        });

        system
            .into_iter()
            .chain(memory.iter().map(|msg| {
                let tool_calls = msg.tool_calls.as_ref().map(|calls| {
                    calls
                        .iter()
                        .map(|tc| OpenAIToolCall {
                            id: tc.id.clone(),
                            call_type: function_type(),
                            function: OpenAIFunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.to_string(),
                            },
                        })
                        .collect()
                });

                let content = if msg.role == MessageRole::Assistant && msg.content.is_empty() {
                    None
                } else {
                    Some(msg.content.clone())
                };

                OpenAIMessage {
                    role: msg.role.to_string(),
                    content,
                    tool_calls,
                    tool_call_id: msg.tool_call_id.clone(),
                }
            }))
            .collect()
    }

    /// Converts tool definitions to OpenAI API format.
    fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAITool> {
        tools
            .iter()
            .map(|t| OpenAITool {
                tool_type: "function",
                function: OpenAIFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect()
    }

    /// Turns the assistant message into a decision.
    ///
    /// The first tool call wins; further calls in the same message are
    /// ignored because the loop dispatches one tool per iteration. Arguments
    /// that are not valid JSON are passed on as text so the tool can report
    /// them as invalid input.
    fn decide(message: OpenAIMessage) -> Decision {
        let text = message
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        match message.tool_calls.and_then(|calls| calls.into_iter().next()) {
            Some(tc) => {
                let arguments = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::Value::String(tc.function.arguments));
                Decision::ToolCall {
                    call: ToolCall {
                        id: tc.id,
                        name: tc.function.name,
                        arguments,
                    },
                    rationale: text,
                }
            }
            None => Decision::FinalAnswer {
                answer: text.unwrap_or_default(),
                rationale: None,
            },
        }
    }

    /// Parses an error response from the API.
    async fn parse_error_response(response: reqwest::Response) -> LLMError {
        let status = response.status();
        let status_code = status.as_u16();

        if status_code == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return LLMError::rate_limited(Duration::from_secs(retry_after));
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<OpenAIErrorResponse>(&error_body) {
            let detail = api_error.error;
            let is_auth = status_code == 401
                || matches!(
                    detail.error_type.as_deref().or(detail.code.as_deref()),
                    Some("authentication_error" | "invalid_api_key")
                );

            if is_auth {
                LLMError::authentication_failed(detail.message)
            } else if detail.error_type.as_deref() == Some("invalid_request_error") {
                LLMError::invalid_request(detail.message)
            } else {
                LLMError::api_error(status_code, detail.message, detail.error_type)
            }
        } else if status_code == 401 {
            LLMError::authentication_failed(status.canonical_reason().unwrap_or("unauthorized"))
        } else {
            let message = if error_body.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                error_body
            };
            LLMError::api_error(status_code, message, None)
        }
    }

    async fn send_once(&self, body: &ChatCompletionRequest) -> Result<Decision, LLMError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(body);

        if let Some(ref api_key) = self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LLMError::timeout(self.timeout)
            } else {
                LLMError::network(format!("request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(Self::parse_error_response(response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LLMError::parse_error(format!("failed to parse response: {e}")))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::parse_error("response contained no choices"))?;

        Ok(Self::decide(choice.message))
    }
}

#[async_trait]
impl ReasoningService for OpenAIReasoner {
    async fn next_action(&self, context: &ReasoningContext<'_>) -> Result<Decision, LLMError> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: Self::convert_messages(context.system_message, context.memory),
            max_tokens: self.max_tokens,
            temperature: context.temperature,
            tools: Self::convert_tools(context.catalog),
        };

        let mut attempt = 0;
        loop {
            match self.send_once(&body).await {
                Ok(decision) => return Ok(decision),
                Err(error) if error.is_retriable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let wait = error
                        .retry_after()
                        .unwrap_or_else(|| self.retry.backoff_for_attempt(attempt))
                        .min(self.max_backoff);
                    tracing::warn!(
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %error,
                        "retrying reasoning request"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMErrorKind;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response per accepted connection, in order.
    /// Returns the base URL and a handle yielding the raw requests.
    async fn serve(responses: Vec<String>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 64 * 1024];
                let mut received = Vec::new();
                loop {
                    let n = socket.read(&mut buf).await.unwrap();
                    received.extend_from_slice(&buf[..n]);
                    let text = String::from_utf8_lossy(&received);
                    if let Some(split) = text.find("\r\n\r\n") {
                        let length = text[..split]
                            .lines()
                            .find_map(|l| {
                                l.to_ascii_lowercase()
                                    .strip_prefix("content-length:")
                                    .map(|v| v.trim().parse::<usize>().unwrap())
                            })
                            .unwrap_or(0);
                        if received.len() >= split + 4 + length || n == 0 {
                            break;
                        }
                    }
                    if n == 0 {
                        break;
                    }
                }
                requests.push(String::from_utf8_lossy(&received).into_owned());
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            requests
        });
        (format!("http://{addr}/v1"), handle)
    }

    fn http(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn reasoner(base_url: &str) -> OpenAIReasoner {
        let config = ProviderConfig::openai_compatible(base_url, "test-model")
            .with_api_key("sk-test")
            .with_retry(RetryConfig {
                max_retries: 1,
                initial_backoff_ms: 10,
                max_backoff_ms: 10,
                backoff_multiplier: 1,
            });
        OpenAIReasoner::new(&config).unwrap()
    }

    fn catalog() -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "calculator".to_string(),
            description: "Arithmetic".to_string(),
            input_schema: json!({"type": "object"}),
        }]
    }

    async fn ask(reasoner: &OpenAIReasoner) -> Result<Decision, LLMError> {
        let memory = vec![Message::user("What is 2 + 3?")];
        let catalog = catalog();
        let context = ReasoningContext {
            system_message: "You are helpful.",
            task: "What is 2 + 3?",
            memory: &memory,
            catalog: &catalog,
            temperature: 0.0,
        };
        reasoner.next_action(&context).await
    }

    #[tokio::test]
    async fn tool_call_response_becomes_tool_decision() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "I should add.",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "calculator", "arguments": "{\"operation\":\"add\",\"a\":2,\"b\":3}"}
                    }]
                }
            }]
        });
        let (url, server) = serve(vec![http("200 OK", &body.to_string())]).await;

        let decision = ask(&reasoner(&url)).await.unwrap();
        let requests = server.await.unwrap();

        assert_eq!(
            decision,
            Decision::ToolCall {
                call: ToolCall {
                    id: "call_1".to_string(),
                    name: "calculator".to_string(),
                    arguments: json!({"operation": "add", "a": 2, "b": 3}),
                },
                rationale: Some("I should add.".to_string()),
            }
        );

        let request = &requests[0];
        assert!(request.starts_with("POST /v1/chat/completions"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains("\"role\":\"system\""));
        assert!(request.contains("\"name\":\"calculator\""));
    }

    #[tokio::test]
    async fn plain_content_becomes_final_answer() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": " 5 \n"}}]});
        let (url, _server) = serve(vec![http("200 OK", &body.to_string())]).await;

        let decision = ask(&reasoner(&url)).await.unwrap();
        assert_eq!(decision, Decision::final_answer("5"));
    }

    #[tokio::test]
    async fn malformed_arguments_are_passed_as_text() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "tool_calls": [{
                "id": "c", "function": {"name": "calculator", "arguments": "{not json"}
            }]}}]
        });
        let (url, _server) = serve(vec![http("200 OK", &body.to_string())]).await;

        match ask(&reasoner(&url)).await.unwrap() {
            Decision::ToolCall { call, .. } => assert_eq!(call.arguments, json!("{not json")),
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authentication_failed() {
        let body = json!({"error": {"message": "Incorrect API key", "type": "invalid_request_error", "code": "invalid_api_key"}});
        let (url, _server) = serve(vec![http("401 Unauthorized", &body.to_string())]).await;

        let err = ask(&reasoner(&url)).await.unwrap_err();
        assert!(matches!(err.kind, LLMErrorKind::AuthenticationFailed { .. }));
    }

    #[tokio::test]
    async fn server_error_is_retried_once() {
        let ok = json!({"choices": [{"message": {"role": "assistant", "content": "done"}}]});
        let (url, server) = serve(vec![
            http("503 Service Unavailable", "{}"),
            http("200 OK", &ok.to_string()),
        ])
        .await;

        let decision = ask(&reasoner(&url)).await.unwrap();
        assert_eq!(decision, Decision::final_answer("done"));
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_choices_is_parse_error() {
        let (url, _server) = serve(vec![http("200 OK", "{\"choices\": []}")]).await;
        let err = ask(&reasoner(&url)).await.unwrap_err();
        assert!(matches!(err.kind, LLMErrorKind::ParseError { .. }));
    }

    #[test]
    fn memory_is_converted_with_tool_turns() {
        let memory = vec![
            Message::user("task"),
            Message::assistant_with_tools(
                "",
                vec![ToolCall {
                    id: "call_0".to_string(),
                    name: "calculator".to_string(),
                    arguments: json!({"a": 1}),
                }],
            ),
            Message::tool("call_0", "{\"result\":1.0}"),
        ];

        let converted = OpenAIReasoner::convert_messages("sys", &memory);
        assert_eq!(converted.len(), 4);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[2].role, "assistant");
        assert!(converted[2].content.is_none());
        assert_eq!(converted[3].tool_call_id.as_deref(), Some("call_0"));
    }
}
