//! AI function backed by an OpenAI-compatible chat completions endpoint
//!
//! This is what runs behind the AI function URL: it turns an [`AiRequest`]
//! into a system and user message from the [`PromptTable`] and returns the
//! first choice's content.

use std::time::Duration;

use async_trait::async_trait;
use quill_core::AiConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chat::ChatMessage;
use crate::client::{AiFunction, AiRequest};
use crate::error::{AiError, PAYMENT_REQUIRED_MESSAGE, RATE_LIMIT_MESSAGE};
use crate::prompts::{PromptInput, PromptTable};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

pub struct ChatCompletionsGateway {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    prompts: PromptTable,
}

impl ChatCompletionsGateway {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Config(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            api_key,
            model: model.into(),
            prompts: PromptTable::default(),
        })
    }

    /// Returns `Ok(None)` when no gateway URL is configured.
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>, AiError> {
        let Some(url) = &config.gateway_url else {
            return Ok(None);
        };
        Self::new(
            url,
            config.api_key.clone(),
            &config.gateway_model,
            config.timeout(),
        )
        .map(Some)
    }

    pub fn with_prompts(mut self, prompts: PromptTable) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn status_error(status: u16) -> AiError {
        match status {
            429 => AiError::RateLimited {
                message: RATE_LIMIT_MESSAGE.to_string(),
            },
            402 => AiError::PaymentRequired {
                message: PAYMENT_REQUIRED_MESSAGE.to_string(),
            },
            _ => AiError::Api {
                status,
                message: format!("AI Gateway error: {}", status),
            },
        }
    }
}

#[async_trait]
impl AiFunction for ChatCompletionsGateway {
    async fn invoke(&self, request: &AiRequest) -> Result<String, AiError> {
        let rendered = self.prompts.render(
            request.action,
            &PromptInput {
                text: request.text.as_deref(),
                context: request.context.as_deref(),
                prompt: request.prompt.as_deref(),
            },
        )?;

        let body = CompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::system(rendered.system),
                ChatMessage::user(rendered.user),
            ],
            stream: false,
        };
        debug!(action = %request.action, model = %self.model, "calling AI gateway");

        let mut builder = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %detail, "AI gateway error");
            return Err(Self::status_error(status.as_u16()));
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AiError::InvalidResponse("no choices in completion".to_string()))
    }
}
