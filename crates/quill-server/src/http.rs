//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quill_ai::{AiRequest, AiResponse};
use quill_core::records::{payload_sort_key, validate_payload};
use quill_core::store::blocking;
use quill_core::{
    Chapter, ChapterVersion, Draft, DraftService, Manuscript, ManuscriptContent,
    NewChapterVersion, NewDraft, NewManuscript, RecordKind, StoredRecord,
};

use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

fn parse_kind(kind: &str) -> ApiResult<RecordKind> {
    kind.parse::<RecordKind>()
        .map_err(|_| ApiError::NotFound(format!("Unknown record kind: {}", kind)))
}

// ============================================================================
// Manuscripts
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner: String,
}

/// Manuscripts of one owner, most recently updated first
pub async fn list_manuscripts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<Vec<Manuscript>>> {
    let manuscripts =
        blocking(&state.store, move |store| store.list_manuscripts(&query.owner)).await?;
    Ok(Json(manuscripts))
}

#[derive(Debug, Deserialize)]
pub struct CreateManuscriptRequest {
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub async fn create_manuscript(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateManuscriptRequest>,
) -> ApiResult<(StatusCode, Json<Manuscript>)> {
    let mut new = NewManuscript::new(request.owner_id, request.title);
    if let Some(description) = request.description {
        new = new.with_description(description);
    }
    let manuscript = blocking(&state.store, move |store| store.create_manuscript(new)).await?;
    tracing::info!(manuscript_id = %manuscript.id, "created manuscript");
    Ok((StatusCode::CREATED, Json(manuscript)))
}

pub async fn get_manuscript(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Manuscript>> {
    blocking(&state.store, move |store| store.get_manuscript(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Manuscript not found: {}", id)))
}

pub async fn delete_manuscript(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    blocking(&state.store, move |store| store.delete_manuscript(id)).await?;
    tracing::info!(manuscript_id = %id, "deleted manuscript");
    Ok(StatusCode::NO_CONTENT)
}

/// Overwrite the chapter list. Last write wins.
pub async fn update_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(content): Json<ManuscriptContent>,
) -> ApiResult<Json<serde_json::Value>> {
    let updated_at = Utc::now();
    let chapters = content.chapters.len();
    blocking(&state.store, move |store| {
        store.update_content(id, &content.chapters, updated_at)
    })
    .await?;
    tracing::debug!(manuscript_id = %id, chapters, "updated manuscript content");

    Ok(Json(serde_json::json!({
        "success": true,
        "updated_at": updated_at.to_rfc3339()
    })))
}

// ============================================================================
// Chapter versions
// ============================================================================

/// Version as listed in the history panel
#[derive(Debug, Serialize)]
pub struct VersionSummary {
    #[serde(flatten)]
    pub version: ChapterVersion,
    pub word_count: usize,
    pub preview: String,
}

/// Snapshots of a chapter, newest first
pub async fn list_versions(
    State(state): State<Arc<AppState>>,
    Path((id, chapter_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<Vec<VersionSummary>>> {
    let versions =
        blocking(&state.store, move |store| store.list_versions(id, &chapter_id)).await?;
    let summaries = versions
        .into_iter()
        .map(|version| VersionSummary {
            word_count: version.word_count(),
            preview: version.preview(state.preview_words),
            version,
        })
        .collect();
    Ok(Json(summaries))
}

#[derive(Debug, Deserialize)]
pub struct CreateVersionRequest {
    pub title: String,
    pub content: String,
}

pub async fn create_version(
    State(state): State<Arc<AppState>>,
    Path((id, chapter_id)): Path<(Uuid, String)>,
    Json(request): Json<CreateVersionRequest>,
) -> ApiResult<(StatusCode, Json<ChapterVersion>)> {
    let new = NewChapterVersion {
        manuscript_id: id,
        chapter_id,
        title: request.title,
        content: request.content,
    };
    let version = blocking(&state.store, move |store| store.append_version(new)).await?;
    tracing::info!(
        manuscript_id = %id,
        chapter_id = %version.chapter_id,
        version_number = version.version_number,
        "saved chapter version"
    );
    Ok((StatusCode::CREATED, Json(version)))
}

pub async fn get_version(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ChapterVersion>> {
    blocking(&state.store, move |store| store.get_version(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Version not found: {}", id)))
}

pub async fn delete_version(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    blocking(&state.store, move |store| store.delete_version(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Drafts
// ============================================================================

pub async fn list_drafts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Draft>>> {
    let drafts = DraftService::new(Arc::clone(&state.store))
        .list_drafts(id)
        .await?;
    Ok(Json(drafts))
}

#[derive(Debug, Deserialize)]
pub struct CreateDraftRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub chapters: Vec<Chapter>,
}

/// Save a new draft and make it current
pub async fn create_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateDraftRequest>,
) -> ApiResult<(StatusCode, Json<Draft>)> {
    let draft = DraftService::new(Arc::clone(&state.store))
        .save_draft(NewDraft {
            manuscript_id: id,
            title: request.title.trim().to_string(),
            description: request.description.filter(|d| !d.trim().is_empty()),
            chapters: request.chapters,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(draft)))
}

/// Make a draft current and return it with its chapters
pub async fn load_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Draft>> {
    let draft = DraftService::new(Arc::clone(&state.store))
        .load_draft(id)
        .await?;
    Ok(Json(draft))
}

pub async fn delete_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    DraftService::new(Arc::clone(&state.store))
        .delete_draft(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Story records
// ============================================================================

pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Path((id, kind)): Path<(Uuid, String)>,
) -> ApiResult<Json<Vec<StoredRecord>>> {
    let kind = parse_kind(&kind)?;
    let records = blocking(&state.store, move |store| store.list_records(kind, id)).await?;
    Ok(Json(records))
}

/// Create a record from its JSON fields
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Path((id, kind)): Path<(Uuid, String)>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<(StatusCode, Json<StoredRecord>)> {
    let kind = parse_kind(&kind)?;
    validate_payload(kind, &payload)?;

    let now = Utc::now();
    let record = StoredRecord {
        id: Uuid::new_v4(),
        kind,
        manuscript_id: id,
        sort_key: payload_sort_key(kind, &payload),
        payload,
        created_at: now,
        updated_at: now,
    };
    let record = blocking(&state.store, move |store| store.insert_record(record)).await?;
    tracing::debug!(%kind, id = %record.id, manuscript_id = %id, "created record");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<StoredRecord>> {
    let kind = parse_kind(&kind)?;
    blocking(&state.store, move |store| store.get_record(kind, id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Record not found: {}", id)))
}

/// Replace a record's fields
pub async fn update_record(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<Json<StoredRecord>> {
    let kind = parse_kind(&kind)?;
    validate_payload(kind, &payload)?;

    let existing = blocking(&state.store, move |store| store.get_record(kind, id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Record not found: {}", id)))?;
    let record = StoredRecord {
        sort_key: payload_sort_key(kind, &payload),
        payload,
        updated_at: Utc::now(),
        ..existing
    };
    let record = blocking(&state.store, move |store| store.update_record(record)).await?;
    Ok(Json(record))
}

pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> ApiResult<StatusCode> {
    let kind = parse_kind(&kind)?;
    blocking(&state.store, move |store| store.delete_record(kind, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// AI function
// ============================================================================

/// Run an AI action through the configured gateway
pub async fn ai_writer(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<AiResponse>> {
    let ai = state
        .ai
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("AI gateway is not configured".to_string()))?;
    let request: AiRequest = serde_json::from_value(body).map_err(|e| {
        tracing::warn!(error = %e, "rejected AI request");
        ApiError::BadRequest("Invalid action".to_string())
    })?;

    tracing::info!(action = %request.action, "AI writer request");
    let result = ai.invoke(&request).await?;
    tracing::info!(action = %request.action, result_length = result.len(), "AI writer success");
    Ok(Json(AiResponse { result }))
}

// ============================================================================
// System
// ============================================================================

/// Get system status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "ai_gateway": state.ai.is_some()
    }))
}
