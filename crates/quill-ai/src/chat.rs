//! Conversation with the writing coach

use std::sync::Arc;

use quill_core::{Notification, Notifier};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::action::AiAction;
use crate::client::{AiFunction, AiRequest};
use crate::error::AiError;

pub const GREETING: &str = "Hi! I'm here to help you develop your novel. Ask me about plot, characters, themes, pacing, or anything else!";

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Chat transcript plus the function that answers it.
///
/// Each message is sent on its own as a `chat` action; the transcript is kept
/// for display only.
pub struct ChatSession {
    ai: Arc<dyn AiFunction>,
    notifier: Arc<dyn Notifier>,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(ai: Arc<dyn AiFunction>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            ai,
            notifier,
            messages: vec![ChatMessage::assistant(GREETING)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send a message and append the reply.
    ///
    /// Blank input is ignored and returns `Ok(None)`. On failure the user's
    /// message stays in the transcript without a reply.
    pub async fn send(&mut self, text: &str) -> Result<Option<String>, AiError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.messages.push(ChatMessage::user(text));

        let request = AiRequest::new(AiAction::Chat).with_prompt(text);
        match self.ai.invoke(&request).await {
            Ok(reply) => {
                self.messages.push(ChatMessage::assistant(reply.clone()));
                Ok(Some(reply))
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                let message = match &e {
                    AiError::Network(_) | AiError::InvalidResponse(_) => {
                        "Failed to send message".to_string()
                    }
                    _ => e.user_message(),
                };
                self.notifier.notify(Notification::error(message));
                Err(e)
            }
        }
    }
}
