//! Speech-to-text for dictation

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quill_core::AiConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AiError;

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe recorded audio (webm) into text.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, AiError>;
}

#[derive(Debug, Serialize)]
struct TranscribeRequest {
    /// Base64 without a data-URL prefix
    audio: String,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    text: Option<String>,
}

pub struct HttpTranscriber {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpTranscriber {
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
        Self::new(&config.transcribe_url, config.api_key.clone(), config.timeout())
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, AiError> {
        if audio.is_empty() {
            return Err(AiError::Validation("No audio recorded".to_string()));
        }
        debug!(bytes = audio.len(), "sending audio for transcription");

        let body = TranscribeRequest {
            audio: STANDARD.encode(audio),
        };
        let mut builder = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let err = AiError::from_status(status.as_u16(), &detail);
            warn!(status = status.as_u16(), error = %err, "transcription failed");
            return Err(err);
        }

        let parsed: TranscribeResponse = response.json().await?;
        parsed
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AiError::InvalidResponse("No transcription returned".to_string()))
    }
}
