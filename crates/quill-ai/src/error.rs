//! Error types for quill-ai

use thiserror::Error;

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again in a moment.";
pub const PAYMENT_REQUIRED_MESSAGE: &str = "Payment required. Please add credits to continue.";

/// Errors from the AI text function, the gateway behind it, or transcription.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// HTTP 429
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// HTTP 402
    #[error("Payment required: {message}")]
    PaymentRequired { message: String },

    /// Any other non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Input rejected before any request was sent
    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AiError {
    /// Message to show the writer.
    ///
    /// Rate-limit and payment errors get their own wording; everything else
    /// uses the message returned by the function when there is one.
    pub fn user_message(&self) -> String {
        match self {
            AiError::RateLimited { message } if !message.is_empty() => message.clone(),
            AiError::RateLimited { .. } => RATE_LIMIT_MESSAGE.to_string(),
            AiError::PaymentRequired { message } if !message.is_empty() => message.clone(),
            AiError::PaymentRequired { .. } => PAYMENT_REQUIRED_MESSAGE.to_string(),
            AiError::Api { message, .. } if !message.is_empty() => message.clone(),
            AiError::Validation(message) => message.clone(),
            AiError::UnknownAction(_) => "Invalid action".to_string(),
            _ => "AI operation failed".to_string(),
        }
    }

    /// Map a failed HTTP response to an error, reading `{"error": ...}` from the body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));
        match status {
            429 => AiError::RateLimited {
                message: message.unwrap_or_else(|| RATE_LIMIT_MESSAGE.to_string()),
            },
            402 => AiError::PaymentRequired {
                message: message.unwrap_or_else(|| PAYMENT_REQUIRED_MESSAGE.to_string()),
            },
            _ => AiError::Api {
                status,
                message: message.unwrap_or_else(|| "AI request failed".to_string()),
            },
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AiError::RateLimited { .. })
    }
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AiError::InvalidResponse(e.to_string())
        } else {
            AiError::Network(e.to_string())
        }
    }
}
