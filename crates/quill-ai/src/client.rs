//! Client for the AI text function
//!
//! The function takes `{action, text?, context?, prompt?}` and answers with
//! `{result}` on success or `{error}` with a non-2xx status.

use async_trait::async_trait;
use quill_core::AiConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::action::AiAction;
use crate::error::AiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiRequest {
    pub action: AiAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl AiRequest {
    pub fn new(action: AiAction) -> Self {
        Self {
            action,
            text: None,
            context: None,
            prompt: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResponse {
    pub result: String,
}

/// Anything that can run an AI action and return generated text.
#[async_trait]
pub trait AiFunction: Send + Sync {
    async fn invoke(&self, request: &AiRequest) -> Result<String, AiError>;
}

/// Calls a remote AI function over HTTP.
pub struct HttpAiFunction {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpAiFunction {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
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
        })
    }

    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        Self::new(&config.function_url, config.api_key.clone(), config.timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AiFunction for HttpAiFunction {
    async fn invoke(&self, request: &AiRequest) -> Result<String, AiError> {
        debug!(action = %request.action, url = %self.url, "invoking AI function");

        let mut builder = self.client.post(&self.url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = AiError::from_status(status.as_u16(), &body);
            warn!(
                action = %request.action,
                status = status.as_u16(),
                error = %err,
                "AI function failed"
            );
            return Err(err);
        }

        let body: AiResponse = response.json().await?;
        Ok(body.result)
    }
}
