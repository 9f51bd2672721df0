//! Configuration for quill
//!
//! Centralized configuration for autosave timing, version listings, the AI
//! function endpoints and local storage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Application-wide configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuillConfig {
    /// Debounce windows for the autosave scheduler
    pub autosave: AutosaveConfig,
    /// Version history display settings
    pub versions: VersionConfig,
    /// AI function endpoints
    pub ai: AiConfig,
    /// Local database settings
    pub storage: StorageConfig,
}

/// Debounce windows for buffer commits and remote persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Idle time before the edit buffer is committed into the chapter list
    pub commit_delay_ms: u64,
    /// Idle time after the last chapter-list change before it is persisted
    pub persist_delay_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            commit_delay_ms: 1000,
            persist_delay_ms: 2000,
        }
    }
}

impl AutosaveConfig {
    pub fn commit_delay(&self) -> Duration {
        Duration::from_millis(self.commit_delay_ms)
    }

    pub fn persist_delay(&self) -> Duration {
        Duration::from_millis(self.persist_delay_ms)
    }
}

/// Version history display settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionConfig {
    /// Number of words shown in a version preview
    pub preview_words: usize,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self { preview_words: 40 }
    }
}

/// AI text function and transcription endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// URL of the AI text-generation function
    pub function_url: String,
    /// URL of the speech-to-text function
    pub transcribe_url: String,
    /// Bearer token sent to both functions
    pub api_key: Option<String>,
    /// Characters of trailing text sent as context
    pub context_chars: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// OpenAI-compatible chat completions endpoint used when quill serves the
    /// AI function itself
    pub gateway_url: Option<String>,
    /// Model requested from the gateway
    pub gateway_model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            function_url: "http://127.0.0.1:54321/functions/v1/ai-writer".to_string(),
            transcribe_url: "http://127.0.0.1:54321/functions/v1/transcribe-audio".to_string(),
            api_key: None,
            context_chars: 500,
            timeout_secs: 60,
            gateway_url: None,
            gateway_model: "google/gemini-2.5-flash".to_string(),
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Local database settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Explicit database path; falls back to the user data directory
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured path, or `<data dir>/quill/quill.db`.
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("quill")
                .join("quill.db")
        })
    }
}

impl QuillConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json_str).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Read a `.toml` or `.json` file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&raw)?,
            _ => Self::from_toml(&raw)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.autosave.commit_delay_ms == 0 {
            return Err(ConfigError::OutOfRange(
                "autosave.commit_delay_ms must be positive".to_string(),
            ));
        }
        if self.autosave.persist_delay_ms == 0 {
            return Err(ConfigError::OutOfRange(
                "autosave.persist_delay_ms must be positive".to_string(),
            ));
        }
        if self.ai.context_chars == 0 {
            return Err(ConfigError::OutOfRange(
                "ai.context_chars must be positive".to_string(),
            ));
        }
        if self.ai.function_url.trim().is_empty() {
            return Err(ConfigError::MissingField("ai.function_url".to_string()));
        }
        Ok(())
    }
}
