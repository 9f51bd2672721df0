//! Quill Core - Manuscript editing for long-form fiction
//!
//! This crate holds everything the quill editor does that is not UI or AI:
//!
//! - **Document**: ordered chapter list, active chapter and edit buffer
//! - **Autosave**: two trailing debounce timers (buffer to list, list to store)
//! - **Versions**: numbered per-chapter snapshots with restore
//! - **Drafts**: named whole-manuscript snapshots, one of them current
//! - **Records**: characters, locations, timeline events, plot points and conflicts
//! - **Store**: storage traits with in-memory and SQLite backends
//! - **Session**: an open manuscript wiring the pieces together
//! - **Stats / Export**: word counts, writing goals, plain text and Markdown
//! - **Config**: timer delays, AI endpoints and storage location
//!
//! # Data flow
//!
//! ```text
//! keystroke → buffer ──(1s idle)──▶ chapter list ──(2s idle)──▶ store
//!                                         │
//!                            save version / save draft (on demand)
//! ```
//!
//! Failures never propagate past the action that caused them: they are logged
//! with `tracing` and reported through a [`Notifier`].

pub mod autosave;
pub mod config;
pub mod document;
pub mod drafts;
pub mod error;
pub mod export;
pub mod manuscript;
pub mod notify;
pub mod records;
pub mod session;
pub mod stats;
pub mod store;
pub mod versions;

pub use autosave::{AutosaveScheduler, Debouncer};
pub use config::{AiConfig, AutosaveConfig, QuillConfig, StorageConfig, VersionConfig};
pub use document::DocumentStore;
pub use drafts::{Draft, DraftService, NewDraft};
pub use error::{ConfigError, QuillError, Result, StoreError, ValidationError};
pub use export::{export_markdown, export_plain_text};
pub use manuscript::{
    Chapter, ChapterMetadata, ChapterStatus, Manuscript, ManuscriptContent, NewManuscript,
};
pub use notify::{
    ChannelNotifier, CollectingNotifier, Notification, NotificationLevel, Notifier,
    TracingNotifier,
};
pub use records::{
    Character, Conflict, Location, PlotPoint, Record, RecordKind, RecordService, StoredRecord,
    StoryRecord, TimelineEvent,
};
pub use session::EditorSession;
pub use stats::{html_to_text, word_count, WordStats, WritingGoals};
#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
pub use store::{
    DraftStore, InMemoryStore, ManuscriptStore, RecordStore, Store, VersionStore,
};
pub use versions::{ChapterVersion, NewChapterVersion, VersionService};
