// src/provider/openai.rs — OpenAI Chat Completions provider (and compatible endpoints)

use std::time::Duration;

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, Message, ModelProvider, Role, StopReason, TokenUsage};
use crate::infra::errors::ReviserError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

pub struct OpenAIProvider {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.into())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Rebuild the HTTP client with a request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ReviserError> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReviserError::Config(format!("OpenAI HTTP client: {e}")))?;
        Ok(self)
    }

    /// Build from `OPENAI_API_KEY`; `OPENAI_BASE_URL` beats `base_url`.
    pub fn from_env(base_url: Option<&str>) -> Result<Self, ReviserError> {
        let key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ReviserError::MissingApiKey(API_KEY_ENV))?;
        let base = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|u| !u.is_empty())
            .or_else(|| base_url.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        Ok(Self::with_base_url(key, base))
    }
}

fn wire_role(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn wire_message(m: &Message) -> serde_json::Value {
    let mut msg = serde_json::json!({
        "role": wire_role(&m.role),
        "content": m.content,
    });
    if let Some(tc_id) = &m.tool_call_id {
        msg["tool_call_id"] = serde_json::json!(tc_id);
    }
    if !m.tool_calls.is_empty() {
        let calls: Vec<serde_json::Value> = m
            .tool_calls
            .iter()
            .map(|tc| {
                serde_json::json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {
                        "name": tc.name,
                        "arguments": tc.arguments.to_string(),
                    }
                })
            })
            .collect();
        msg["tool_calls"] = serde_json::json!(calls);
    }
    msg
}

/// Request body for `/chat/completions`.
fn build_body(request: &ChatRequest) -> serde_json::Value {
    let mut messages = Vec::new();
    if let Some(system) = &request.system {
        messages.push(serde_json::json!({"role": "system", "content": system}));
    }
    messages.extend(request.messages.iter().map(wire_message));

    let mut body = serde_json::json!({
        "model": request.model,
        "messages": messages,
    });

    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    if let Some(temp) = request.temperature {
        body["temperature"] = serde_json::json!(temp);
    }
    if !request.tools.is_empty() {
        let tools: Vec<serde_json::Value> = request
            .tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
        body["tools"] = serde_json::json!(tools);
    }
    if let Some(name) = &request.tool_choice {
        body["tool_choice"] = serde_json::json!({
            "type": "function",
            "function": { "name": name },
        });
    }
    body
}

fn parse_response(resp: &serde_json::Value) -> Result<ChatResponse, ReviserError> {
    let choice = resp["choices"]
        .get(0)
        .ok_or_else(|| ReviserError::MalformedResponse("response has no choices".into()))?;

    let content = choice["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    let mut tool_calls = Vec::new();
    for tc in choice["message"]["tool_calls"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
    {
        let raw_args = tc["function"]["arguments"].as_str().unwrap_or("{}");
        let arguments = serde_json::from_str(raw_args).map_err(|e| {
            ReviserError::MalformedResponse(format!("tool call arguments are not JSON: {e}"))
        })?;
        tool_calls.push(super::ToolCall {
            id: tc["id"].as_str().unwrap_or("").to_string(),
            name: tc["function"]["name"].as_str().unwrap_or("").to_string(),
            arguments,
        });
    }

    let usage = TokenUsage {
        input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    };

    let stop_reason = match choice["finish_reason"].as_str() {
        Some("stop") => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        Some("tool_calls") => StopReason::ToolUse,
        _ => StopReason::Unknown,
    };

    Ok(ChatResponse {
        content,
        tool_calls,
        usage,
        stop_reason,
    })
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    fn id(&self) -> &str {
        "openai"
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ReviserError> {
        let body = build_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReviserError::Provider {
                provider: "openai".into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(5000);
            return Err(ReviserError::RateLimited {
                provider: "openai".into(),
                retry_after_ms,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ReviserError::Provider {
                provider: "openai".into(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value = response.json().await.map_err(|e| ReviserError::Provider {
            provider: "openai".into(),
            message: format!("Failed to parse response: {}", e),
            retriable: false,
        })?;

        let parsed = parse_response(&resp)?;
        tracing::debug!(
            model = %request.model,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            tool_calls = parsed.tool_calls.len(),
            "Chat completion",
        );
        Ok(parsed)
    }
}
