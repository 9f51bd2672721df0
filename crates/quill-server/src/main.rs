//! Quill Server Binary
//!
//! Environment:
//! - `QUILL_ADDR`: listen address (default `127.0.0.1:8080`)
//! - `QUILL_DB`: database path (default from `QUILL_CONFIG` or the user data directory)
//! - `QUILL_CONFIG`: optional TOML config file
//! - `QUILL_GATEWAY_URL` / `QUILL_GATEWAY_KEY` / `QUILL_GATEWAY_MODEL`: chat
//!   completions endpoint backing `/functions/ai-writer`
//! - `QUILL_LOG` / `RUST_LOG`: log filter

use std::path::PathBuf;
use std::sync::Arc;

use quill_ai::ChatCompletionsGateway;
use quill_core::QuillConfig;
use quill_server::{serve, AppState};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("QUILL_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config() -> Result<QuillConfig, Box<dyn std::error::Error>> {
    let mut config = match std::env::var("QUILL_CONFIG") {
        Ok(path) => QuillConfig::load(&PathBuf::from(path))?,
        Err(_) => QuillConfig::default(),
    };
    if let Ok(url) = std::env::var("QUILL_GATEWAY_URL") {
        config.ai.gateway_url = Some(url);
    }
    if let Ok(key) = std::env::var("QUILL_GATEWAY_KEY") {
        config.ai.api_key = Some(key);
    }
    if let Ok(model) = std::env::var("QUILL_GATEWAY_MODEL") {
        config.ai.gateway_model = model;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = load_config()?;
    let db_path = std::env::var("QUILL_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config.storage.resolved_database_path());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut state =
        AppState::with_database(&db_path)?.with_preview_words(config.versions.preview_words);
    match ChatCompletionsGateway::from_config(&config.ai)? {
        Some(gateway) => {
            tracing::info!(model = gateway.model(), "AI gateway enabled");
            state = state.with_ai(Arc::new(gateway));
        }
        None => tracing::info!("No AI gateway configured; /functions/ai-writer disabled"),
    }

    let addr = std::env::var("QUILL_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    serve(&addr, Arc::new(state)).await
}
