use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{
    push_user_part, Message, MessagePart, MessageRole, Provider, ProviderFuture,
    ProviderResponse, ProviderUsage,
};
use crate::data::ImageAttachment;
use crate::settings::Settings;

const BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouter {
    key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Option<Duration>,
    messages: Vec<Message>,
}

impl OpenRouter {
    pub fn new(key: impl Into<String>) -> Self {
        Self::from_settings(key, &Settings::default())
    }

    pub fn from_settings(key: impl Into<String>, settings: &Settings) -> Self {
        Self {
            key: key.into(),
            model: settings.ai_model.clone(),
            base_url: base_url(&settings.ai_base_url),
            temperature: settings.ai_temperature,
            max_tokens: settings.ai_max_tokens,
            timeout: settings.ai_timeout_secs.map(Duration::from_secs),
            messages: Vec::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if !base_url.trim().is_empty() {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        self
    }

    fn request_body(&self) -> Value {
        let messages = self
            .messages
            .iter()
            .map(|message| match message.role {
                MessageRole::System => {
                    json!({"role": "system", "content": message_text(message)})
                }
                MessageRole::User => {
                    let parts = message
                        .parts
                        .iter()
                        .map(|part| match part {
                            MessagePart::Text(text) => json!({"type": "text", "text": text}),
                            MessagePart::Image(image) => {
                                let url = image.data_url(&BASE64.encode(&image.bytes));
                                json!({"type": "image_url", "image_url": {"url": url}})
                            }
                        })
                        .collect::<Vec<_>>();
                    json!({"role": "user", "content": parts})
                }
            })
            .collect::<Vec<_>>();

        json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }
}

impl Provider for OpenRouter {
    fn append_system_input(mut self, input: String) -> Self {
        self.messages.push(Message::system(input));
        self
    }

    fn append_user_input(mut self, input: String) -> Self {
        push_user_part(&mut self.messages, MessagePart::Text(input));
        self
    }

    fn append_user_data(mut self, data: ImageAttachment) -> Self {
        push_user_part(&mut self.messages, MessagePart::Image(data));
        self
    }

    fn complete(self) -> ProviderFuture {
        Box::pin(async move { call_chat_completions(self).await })
    }
}

fn base_url(configured: &str) -> String {
    std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| configured.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn message_text(message: &Message) -> String {
    message
        .parts
        .iter()
        .filter_map(|part| match part {
            MessagePart::Text(text) => Some(text.as_str()),
            MessagePart::Image(_) => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

async fn call_chat_completions(provider: OpenRouter) -> Result<ProviderResponse> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = provider.timeout {
        builder = builder.timeout(timeout);
    }
    let client = builder
        .build()
        .with_context(|| "failed to build HTTP client")?;
    let url = format!("{}/chat/completions", provider.base_url);
    let body = provider.request_body();

    debug!("sending chat completion to {} (model {})", url, provider.model);
    let response = client
        .post(&url)
        .bearer_auth(&provider.key)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("failed to reach {}", url))?;

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if !status.is_success() {
        let detail = extract_api_error(&text).unwrap_or(text);
        return Err(anyhow!("chat completion API error ({}): {}", status, detail));
    }
    extract_content_response(&text, &provider.model)
}

pub(crate) fn extract_content_response(
    text: &str,
    fallback_model: &str,
) -> Result<ProviderResponse> {
    let payload: ChatResponse =
        serde_json::from_str(text).with_context(|| "failed to parse chat completion JSON")?;
    let content = payload
        .choices
        .first()
        .and_then(|choice| {
            choice
                .message
                .as_ref()
                .and_then(|message| message.content.as_ref())
                .and_then(content_text)
                .or_else(|| choice.text.clone())
        })
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| anyhow!("no content returned from chat completion API"))?;

    let model = payload
        .model
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage.map(|usage| ProviderUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    });
    Ok(ProviderResponse {
        content,
        model,
        usage,
    })
}

fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("");
            if joined.is_empty() { None } else { Some(joined) }
        }
        _ => None,
    }
}

fn extract_api_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ApiError>,
    }

    #[derive(Deserialize)]
    struct ApiError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        code: Option<Value>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    let code = error.code.map(|code| match code {
        Value::String(value) => value,
        other => other.to_string(),
    });
    Some(format_error_parts(error.message, error.kind, code))
}

fn format_error_parts(
    message: Option<String>,
    kind: Option<String>,
    code: Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(message) = message.filter(|value| !value.trim().is_empty()) {
        parts.push(message);
    }
    if let Some(kind) = kind.filter(|value| !value.trim().is_empty()) {
        parts.push(format!("type: {}", kind));
    }
    if let Some(code) = code.filter(|value| !value.trim().is_empty()) {
        parts.push(format!("code: {}", code));
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(" | ")
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}
