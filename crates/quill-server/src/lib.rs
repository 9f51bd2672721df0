//! Quill Server - manuscript storage over HTTP
//!
//! Exposes the relational side of quill (manuscripts, chapter versions,
//! drafts and story records) as a JSON API, and optionally serves the AI text
//! function through a chat completions gateway.

pub mod error;
pub mod http;

use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use quill_ai::AiFunction;
use quill_core::{SqliteStore, Store, StoreError, VersionConfig};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Answers `POST /functions/ai-writer` when set
    pub ai: Option<Arc<dyn AiFunction>>,
    /// Words shown in version history previews
    pub preview_words: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            ai: None,
            preview_words: VersionConfig::default().preview_words,
        }
    }

    /// Open (or create) the SQLite database at `db_path`.
    pub fn with_database(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = SqliteStore::open(db_path.as_ref())?;
        tracing::info!("Opened database at {:?}", db_path.as_ref());
        Ok(Self::new(Arc::new(store)))
    }

    pub fn with_preview_words(mut self, words: usize) -> Self {
        self.preview_words = words;
        self
    }

    pub fn with_ai(mut self, ai: Arc<dyn AiFunction>) -> Self {
        self.ai = Some(ai);
        self
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Manuscript endpoints
        .route(
            "/manuscripts",
            get(http::list_manuscripts).post(http::create_manuscript),
        )
        .route(
            "/manuscripts/{id}",
            get(http::get_manuscript).delete(http::delete_manuscript),
        )
        .route("/manuscripts/{id}/content", put(http::update_content))
        // Version endpoints
        .route(
            "/manuscripts/{id}/chapters/{chapter_id}/versions",
            get(http::list_versions).post(http::create_version),
        )
        .route(
            "/versions/{id}",
            get(http::get_version).delete(http::delete_version),
        )
        // Draft endpoints
        .route(
            "/manuscripts/{id}/drafts",
            get(http::list_drafts).post(http::create_draft),
        )
        .route("/drafts/{id}/load", post(http::load_draft))
        .route("/drafts/{id}", delete(http::delete_draft))
        // Story record endpoints
        .route(
            "/manuscripts/{id}/records/{kind}",
            get(http::list_records).post(http::create_record),
        )
        .route(
            "/records/{kind}/{id}",
            get(http::get_record)
                .put(http::update_record)
                .delete(http::delete_record),
        )
        // AI function
        .route("/functions/ai-writer", post(http::ai_writer))
        // System endpoints
        .route("/status", get(http::get_status))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Quill server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
