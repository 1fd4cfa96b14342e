use anyhow::Result;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

use crate::data::ImageAttachment;

mod openrouter;

pub use openrouter::OpenRouter;

#[derive(Debug, Clone, Serialize)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub content: String,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

#[derive(Debug, Clone, Copy)]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone)]
pub enum MessagePart {
    Text(String),
    Image(ImageAttachment),
}

impl Message {
    pub fn system(content: String) -> Self {
        Self {
            role: MessageRole::System,
            parts: vec![MessagePart::Text(content)],
        }
    }

    pub fn user(part: MessagePart) -> Self {
        Self {
            role: MessageRole::User,
            parts: vec![part],
        }
    }
}

/// Appends a user part to the trailing user message, or opens a new one.
pub(crate) fn push_user_part(messages: &mut Vec<Message>, part: MessagePart) {
    match messages.last_mut() {
        Some(message) if matches!(message.role, MessageRole::User) => message.parts.push(part),
        _ => messages.push(Message::user(part)),
    }
}

pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<ProviderResponse>> + Send>>;

pub trait Provider: Clone + Send + Sync {
    fn append_system_input(self, input: String) -> Self;
    fn append_user_input(self, input: String) -> Self;
    fn append_user_data(self, data: ImageAttachment) -> Self;
    fn complete(self) -> ProviderFuture;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_parts_share_one_message() {
        let mut messages = vec![Message::system("sys".to_string())];
        push_user_part(&mut messages, MessagePart::Text("hello".to_string()));
        push_user_part(
            &mut messages,
            MessagePart::Image(ImageAttachment::from_bytes(vec![0xFF, 0xD8, 0xFF], None)),
        );
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[1].role, MessageRole::User));
        assert_eq!(messages[1].parts.len(), 2);
    }
}
