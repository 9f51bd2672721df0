use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::{DraftStore, ManuscriptStore, RecordStore, VersionStore};
use crate::drafts::{Draft, NewDraft};
use crate::error::StoreError;
use crate::manuscript::{Chapter, Manuscript, ManuscriptContent, NewManuscript};
use crate::records::{RecordKind, StoredRecord};
use crate::versions::{ChapterVersion, NewChapterVersion};

/// SQLite-backed implementation of every store trait.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| storage("open", e))?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| storage("open_in_memory", e))?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS manuscripts (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chapter_versions (
                id TEXT PRIMARY KEY,
                manuscript_id TEXT NOT NULL REFERENCES manuscripts(id) ON DELETE CASCADE,
                chapter_id TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                version_number INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (manuscript_id, chapter_id, version_number)
            );

            CREATE TABLE IF NOT EXISTS version_counters (
                manuscript_id TEXT NOT NULL REFERENCES manuscripts(id) ON DELETE CASCADE,
                chapter_id TEXT NOT NULL,
                last_number INTEGER NOT NULL,
                PRIMARY KEY (manuscript_id, chapter_id)
            );

            CREATE TABLE IF NOT EXISTS drafts (
                id TEXT PRIMARY KEY,
                manuscript_id TEXT NOT NULL REFERENCES manuscripts(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT,
                content TEXT NOT NULL,
                is_current INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS story_records (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                manuscript_id TEXT NOT NULL REFERENCES manuscripts(id) ON DELETE CASCADE,
                payload TEXT NOT NULL,
                sort_key INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_manuscripts_owner ON manuscripts(owner_id, updated_at);
            CREATE INDEX IF NOT EXISTS idx_versions_chapter ON chapter_versions(manuscript_id, chapter_id);
            CREATE INDEX IF NOT EXISTS idx_drafts_manuscript ON drafts(manuscript_id);
            CREATE INDEX IF NOT EXISTS idx_records_kind ON story_records(manuscript_id, kind);
            ",
        )
        .map_err(|e| storage("init_schema", e))
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn manuscript_exists(conn: &Connection, id: Uuid) -> Result<bool, StoreError> {
        conn.query_row(
            "SELECT 1 FROM manuscripts WHERE id = ?1",
            params![id.to_string()],
            |_| Ok(()),
        )
        .optional()
        .map(|row| row.is_some())
        .map_err(|e| storage("manuscript_exists", e))
    }

    fn require_manuscript(conn: &Connection, id: Uuid) -> Result<(), StoreError> {
        if Self::manuscript_exists(conn, id)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("manuscript {}", id)))
        }
    }

    fn get_draft(conn: &Connection, id: Uuid) -> Result<Option<Draft>, StoreError> {
        conn.query_row(
            &format!("{} WHERE id = ?1", DRAFT_SELECT),
            params![id.to_string()],
            DraftRow::read,
        )
        .optional()
        .map_err(|e| storage("get_draft", e))?
        .map(DraftRow::into_draft)
        .transpose()
    }
}

const MANUSCRIPT_SELECT: &str =
    "SELECT id, owner_id, title, description, content, created_at, updated_at FROM manuscripts";
const VERSION_SELECT: &str = "SELECT id, manuscript_id, chapter_id, title, content, version_number, created_at FROM chapter_versions";
const DRAFT_SELECT: &str = "SELECT id, manuscript_id, title, description, content, is_current, created_at, updated_at FROM drafts";
const RECORD_SELECT: &str =
    "SELECT id, kind, manuscript_id, payload, sort_key, created_at, updated_at FROM story_records";

fn storage(context: &str, e: rusqlite::Error) -> StoreError {
    StoreError::Storage(format!("{}: {}", context, e))
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|e| StoreError::Storage(format!("bad id {}: {}", s, e)))
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

/// Current time truncated to the precision the tables keep.
fn now_millis() -> (i64, DateTime<Utc>) {
    let ms = Utc::now().timestamp_millis();
    (ms, from_millis(ms))
}

fn encode_chapters(chapters: &[Chapter]) -> Result<String, StoreError> {
    serde_json::to_string(&ManuscriptContent {
        chapters: chapters.to_vec(),
    })
    .map_err(|e| StoreError::Storage(format!("encode chapters: {}", e)))
}

fn decode_chapters(raw: &str) -> Result<Vec<Chapter>, StoreError> {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(|value| ManuscriptContent::from_value(&value).chapters)
        .map_err(|e| StoreError::Storage(format!("parse chapters: {}", e)))
}

struct ManuscriptRow {
    id: String,
    owner_id: String,
    title: String,
    description: Option<String>,
    content: String,
    created_at: i64,
    updated_at: i64,
}

impl ManuscriptRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            content: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_manuscript(self) -> Result<Manuscript, StoreError> {
        Ok(Manuscript {
            id: parse_uuid(&self.id)?,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            chapters: decode_chapters(&self.content)?,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        })
    }
}

struct VersionRow {
    id: String,
    manuscript_id: String,
    chapter_id: String,
    title: String,
    content: String,
    version_number: u32,
    created_at: i64,
}

impl VersionRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            manuscript_id: row.get(1)?,
            chapter_id: row.get(2)?,
            title: row.get(3)?,
            content: row.get(4)?,
            version_number: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_version(self) -> Result<ChapterVersion, StoreError> {
        Ok(ChapterVersion {
            id: parse_uuid(&self.id)?,
            manuscript_id: parse_uuid(&self.manuscript_id)?,
            chapter_id: self.chapter_id,
            title: self.title,
            content: self.content,
            version_number: self.version_number,
            created_at: from_millis(self.created_at),
        })
    }
}

struct DraftRow {
    id: String,
    manuscript_id: String,
    title: String,
    description: Option<String>,
    content: String,
    is_current: bool,
    created_at: i64,
    updated_at: i64,
}

impl DraftRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            manuscript_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            content: row.get(4)?,
            is_current: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_draft(self) -> Result<Draft, StoreError> {
        Ok(Draft {
            id: parse_uuid(&self.id)?,
            manuscript_id: parse_uuid(&self.manuscript_id)?,
            title: self.title,
            description: self.description,
            chapters: decode_chapters(&self.content)?,
            is_current: self.is_current,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        })
    }
}

struct RecordRow {
    id: String,
    kind: String,
    manuscript_id: String,
    payload: String,
    sort_key: i64,
    created_at: i64,
    updated_at: i64,
}

impl RecordRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            manuscript_id: row.get(2)?,
            payload: row.get(3)?,
            sort_key: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<StoredRecord, StoreError> {
        Ok(StoredRecord {
            id: parse_uuid(&self.id)?,
            kind: self.kind.parse()?,
            manuscript_id: parse_uuid(&self.manuscript_id)?,
            payload: serde_json::from_str(&self.payload)
                .map_err(|e| StoreError::Storage(format!("parse payload: {}", e)))?,
            sort_key: self.sort_key,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        })
    }
}

/// Run a select and convert every row.
fn collect_rows<R, T>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    read: fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>,
    convert: fn(R) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    let mut stmt = conn.prepare(sql).map_err(|e| storage("prepare", e))?;
    let rows = stmt
        .query_map(params, read)
        .map_err(|e| storage("query", e))?
        .collect::<rusqlite::Result<Vec<R>>>()
        .map_err(|e| storage("read row", e))?;
    rows.into_iter().map(convert).collect()
}

impl ManuscriptStore for SqliteStore {
    fn create_manuscript(&self, new: NewManuscript) -> Result<Manuscript, StoreError> {
        new.validate()
            .map_err(|e| StoreError::Validation(e.to_string()))?;
        let (_, now) = now_millis();
        let manuscript = new.into_manuscript(now);
        let content = encode_chapters(&manuscript.chapters)?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO manuscripts (id, owner_id, title, description, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                manuscript.id.to_string(),
                manuscript.owner_id,
                manuscript.title,
                manuscript.description,
                content,
                manuscript.created_at.timestamp_millis(),
                manuscript.updated_at.timestamp_millis(),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::AlreadyExists(format!("manuscript {}", manuscript.id))
            }
            other => storage("insert manuscript", other),
        })?;
        debug!(manuscript_id = %manuscript.id, "created manuscript");
        Ok(manuscript)
    }

    fn get_manuscript(&self, id: Uuid) -> Result<Option<Manuscript>, StoreError> {
        let conn = self.conn();
        conn.query_row(
            &format!("{} WHERE id = ?1", MANUSCRIPT_SELECT),
            params![id.to_string()],
            ManuscriptRow::read,
        )
        .optional()
        .map_err(|e| storage("get_manuscript", e))?
        .map(ManuscriptRow::into_manuscript)
        .transpose()
    }

    fn list_manuscripts(&self, owner_id: &str) -> Result<Vec<Manuscript>, StoreError> {
        let conn = self.conn();
        collect_rows(
            &conn,
            &format!(
                "{} WHERE owner_id = ?1 ORDER BY updated_at DESC, rowid DESC",
                MANUSCRIPT_SELECT
            ),
            params![owner_id],
            ManuscriptRow::read,
            ManuscriptRow::into_manuscript,
        )
    }

    fn update_content(
        &self,
        id: Uuid,
        chapters: &[Chapter],
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let content = encode_chapters(chapters)?;
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE manuscripts SET content = ?1, updated_at = ?2 WHERE id = ?3",
                params![content, updated_at.timestamp_millis(), id.to_string()],
            )
            .map_err(|e| storage("update_content", e))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("manuscript {}", id)));
        }
        Ok(())
    }

    fn delete_manuscript(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM manuscripts WHERE id = ?1", params![id.to_string()])
            .map_err(|e| storage("delete_manuscript", e))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("manuscript {}", id)));
        }
        Ok(())
    }
}

impl VersionStore for SqliteStore {
    fn append_version(&self, new: NewChapterVersion) -> Result<ChapterVersion, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(|e| storage("begin", e))?;
        Self::require_manuscript(&tx, new.manuscript_id)?;

        let ms = new.manuscript_id.to_string();
        // Counter row is seeded from existing snapshots the first time a chapter is seen
        let version_number: u32 = tx
            .query_row(
                "INSERT INTO version_counters (manuscript_id, chapter_id, last_number)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(version_number), 0) + 1
                                  FROM chapter_versions
                                  WHERE manuscript_id = ?1 AND chapter_id = ?2))
                 ON CONFLICT (manuscript_id, chapter_id)
                 DO UPDATE SET last_number = last_number + 1
                 RETURNING last_number",
                params![ms, new.chapter_id],
                |row| row.get(0),
            )
            .map_err(|e| storage("next version number", e))?;

        let id = Uuid::new_v4();
        let (created_ms, created_at) = now_millis();
        tx.execute(
            "INSERT INTO chapter_versions (id, manuscript_id, chapter_id, title, content, version_number, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                ms,
                new.chapter_id,
                new.title,
                new.content,
                version_number,
                created_ms,
            ],
        )
        .map_err(|e| storage("insert version", e))?;
        tx.commit().map_err(|e| storage("commit", e))?;

        Ok(ChapterVersion {
            id,
            manuscript_id: new.manuscript_id,
            chapter_id: new.chapter_id,
            title: new.title,
            content: new.content,
            version_number,
            created_at,
        })
    }

    fn list_versions(
        &self,
        manuscript_id: Uuid,
        chapter_id: &str,
    ) -> Result<Vec<ChapterVersion>, StoreError> {
        let conn = self.conn();
        collect_rows(
            &conn,
            &format!(
                "{} WHERE manuscript_id = ?1 AND chapter_id = ?2 ORDER BY version_number DESC",
                VERSION_SELECT
            ),
            params![manuscript_id.to_string(), chapter_id],
            VersionRow::read,
            VersionRow::into_version,
        )
    }

    fn get_version(&self, id: Uuid) -> Result<Option<ChapterVersion>, StoreError> {
        let conn = self.conn();
        conn.query_row(
            &format!("{} WHERE id = ?1", VERSION_SELECT),
            params![id.to_string()],
            VersionRow::read,
        )
        .optional()
        .map_err(|e| storage("get_version", e))?
        .map(VersionRow::into_version)
        .transpose()
    }

    fn delete_version(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM chapter_versions WHERE id = ?1", params![id.to_string()])
            .map_err(|e| storage("delete_version", e))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("version {}", id)));
        }
        Ok(())
    }
}

impl DraftStore for SqliteStore {
    fn insert_current_draft(&self, new: NewDraft) -> Result<Draft, StoreError> {
        let content = encode_chapters(&new.chapters)?;
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(|e| storage("begin", e))?;
        Self::require_manuscript(&tx, new.manuscript_id)?;

        let ms = new.manuscript_id.to_string();
        tx.execute(
            "UPDATE drafts SET is_current = 0 WHERE manuscript_id = ?1",
            params![ms],
        )
        .map_err(|e| storage("clear current draft", e))?;

        let id = Uuid::new_v4();
        let (now_ms, now) = now_millis();
        tx.execute(
            "INSERT INTO drafts (id, manuscript_id, title, description, content, is_current, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
            params![id.to_string(), ms, new.title, new.description, content, now_ms],
        )
        .map_err(|e| storage("insert draft", e))?;
        tx.commit().map_err(|e| storage("commit", e))?;

        Ok(Draft {
            id,
            manuscript_id: new.manuscript_id,
            title: new.title,
            description: new.description,
            chapters: new.chapters,
            is_current: true,
            created_at: now,
            updated_at: now,
        })
    }

    fn list_drafts(&self, manuscript_id: Uuid) -> Result<Vec<Draft>, StoreError> {
        let conn = self.conn();
        collect_rows(
            &conn,
            &format!(
                "{} WHERE manuscript_id = ?1 ORDER BY created_at DESC, rowid DESC",
                DRAFT_SELECT
            ),
            params![manuscript_id.to_string()],
            DraftRow::read,
            DraftRow::into_draft,
        )
    }

    fn mark_current(&self, id: Uuid) -> Result<Draft, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(|e| storage("begin", e))?;
        let draft = Self::get_draft(&tx, id)?
            .ok_or_else(|| StoreError::NotFound(format!("draft {}", id)))?;

        let (now_ms, _) = now_millis();
        tx.execute(
            "UPDATE drafts SET is_current = (id = ?1),
                    updated_at = CASE WHEN id = ?1 THEN ?2 ELSE updated_at END
             WHERE manuscript_id = ?3",
            params![id.to_string(), now_ms, draft.manuscript_id.to_string()],
        )
        .map_err(|e| storage("mark_current", e))?;
        let marked = Self::get_draft(&tx, id)?
            .ok_or_else(|| StoreError::NotFound(format!("draft {}", id)))?;
        tx.commit().map_err(|e| storage("commit", e))?;
        Ok(marked)
    }

    fn delete_draft(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM drafts WHERE id = ?1", params![id.to_string()])
            .map_err(|e| storage("delete_draft", e))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("draft {}", id)));
        }
        Ok(())
    }
}

impl RecordStore for SqliteStore {
    fn insert_record(&self, record: StoredRecord) -> Result<StoredRecord, StoreError> {
        let payload = serde_json::to_string(&record.payload)
            .map_err(|e| StoreError::Storage(format!("encode payload: {}", e)))?;
        let conn = self.conn();
        Self::require_manuscript(&conn, record.manuscript_id)?;
        conn.execute(
            "INSERT INTO story_records (id, kind, manuscript_id, payload, sort_key, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                record.kind.as_str(),
                record.manuscript_id.to_string(),
                payload,
                record.sort_key,
                record.created_at.timestamp_millis(),
                record.updated_at.timestamp_millis(),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::AlreadyExists(format!("record {}", record.id))
            }
            other => storage("insert record", other),
        })?;
        Ok(StoredRecord {
            created_at: from_millis(record.created_at.timestamp_millis()),
            updated_at: from_millis(record.updated_at.timestamp_millis()),
            ..record
        })
    }

    fn get_record(&self, kind: RecordKind, id: Uuid) -> Result<Option<StoredRecord>, StoreError> {
        let conn = self.conn();
        conn.query_row(
            &format!("{} WHERE id = ?1 AND kind = ?2", RECORD_SELECT),
            params![id.to_string(), kind.as_str()],
            RecordRow::read,
        )
        .optional()
        .map_err(|e| storage("get_record", e))?
        .map(RecordRow::into_record)
        .transpose()
    }

    fn list_records(
        &self,
        kind: RecordKind,
        manuscript_id: Uuid,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let conn = self.conn();
        collect_rows(
            &conn,
            &format!(
                "{} WHERE kind = ?1 AND manuscript_id = ?2 ORDER BY sort_key, created_at, rowid",
                RECORD_SELECT
            ),
            params![kind.as_str(), manuscript_id.to_string()],
            RecordRow::read,
            RecordRow::into_record,
        )
    }

    fn update_record(&self, record: StoredRecord) -> Result<StoredRecord, StoreError> {
        let payload = serde_json::to_string(&record.payload)
            .map_err(|e| StoreError::Storage(format!("encode payload: {}", e)))?;
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE story_records SET payload = ?1, sort_key = ?2, updated_at = ?3
                 WHERE id = ?4 AND kind = ?5",
                params![
                    payload,
                    record.sort_key,
                    record.updated_at.timestamp_millis(),
                    record.id.to_string(),
                    record.kind.as_str(),
                ],
            )
            .map_err(|e| storage("update_record", e))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("{} {}", record.kind, record.id)));
        }
        conn.query_row(
            &format!("{} WHERE id = ?1", RECORD_SELECT),
            params![record.id.to_string()],
            RecordRow::read,
        )
        .map_err(|e| storage("reload record", e))?
        .into_record()
    }

    fn delete_record(&self, kind: RecordKind, id: Uuid) -> Result<(), StoreError> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "DELETE FROM story_records WHERE id = ?1 AND kind = ?2",
                params![id.to_string(), kind.as_str()],
            )
            .map_err(|e| storage("delete_record", e))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("{} {}", kind, id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manuscript::Chapter;

    fn store_with_manuscript() -> (SqliteStore, Uuid) {
        let store = SqliteStore::open_in_memory().unwrap();
        let ms = store
            .create_manuscript(NewManuscript::new("user-1", "Novel"))
            .unwrap();
        (store, ms.id)
    }

    #[test]
    fn test_manuscript_round_trip() {
        let (store, id) = store_with_manuscript();
        let chapters = vec![
            Chapter::new("1", "Opening", "<p>It began.</p>"),
            Chapter::new("2", "Chapter 2", ""),
        ];
        store.update_content(id, &chapters, Utc::now()).unwrap();

        let loaded = store.get_manuscript(id).unwrap().unwrap();
        assert_eq!(loaded.title, "Novel");
        assert_eq!(loaded.chapters, chapters);
    }

    #[test]
    fn test_unreadable_content_is_an_error() {
        let (store, id) = store_with_manuscript();
        store
            .conn()
            .execute(
                "UPDATE manuscripts SET content = 'not json' WHERE id = ?1",
                [id.to_string()],
            )
            .unwrap();

        let result = store.get_manuscript(id);
        assert!(matches!(result, Err(StoreError::Storage(_))));
    }

    #[test]
    fn test_counter_survives_deleting_latest_version() {
        let (store, id) = store_with_manuscript();
        let new = |content: &str| NewChapterVersion {
            manuscript_id: id,
            chapter_id: "1".into(),
            title: "Chapter 1".into(),
            content: content.into(),
        };
        store.append_version(new("a")).unwrap();
        let v2 = store.append_version(new("b")).unwrap();
        store.delete_version(v2.id).unwrap();

        let v3 = store.append_version(new("c")).unwrap();
        assert_eq!(v3.version_number, 3);
        let numbers: Vec<u32> = store
            .list_versions(id, "1")
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();
        assert_eq!(numbers, vec![3, 1]);
    }

    #[test]
    fn test_mark_current_switches_flag() {
        let (store, id) = store_with_manuscript();
        let draft = |title: &str| NewDraft {
            manuscript_id: id,
            title: title.into(),
            description: None,
            chapters: vec![Chapter::numbered("1")],
        };
        let first = store.insert_current_draft(draft("one")).unwrap();
        let second = store.insert_current_draft(draft("two")).unwrap();

        let marked = store.mark_current(first.id).unwrap();
        assert!(marked.is_current);
        let drafts = store.list_drafts(id).unwrap();
        let current: Vec<Uuid> = drafts.iter().filter(|d| d.is_current).map(|d| d.id).collect();
        assert_eq!(current, vec![first.id]);
        assert!(drafts.iter().any(|d| d.id == second.id && !d.is_current));
    }

    #[test]
    fn test_record_kind_is_part_of_the_key() {
        let (store, id) = store_with_manuscript();
        let now = Utc::now();
        let record = StoredRecord {
            id: Uuid::new_v4(),
            kind: RecordKind::Character,
            manuscript_id: id,
            payload: serde_json::json!({"name": "Ada"}),
            sort_key: 0,
            created_at: now,
            updated_at: now,
        };
        store.insert_record(record.clone()).unwrap();

        assert!(store.get_record(RecordKind::Location, record.id).unwrap().is_none());
        assert!(store.get_record(RecordKind::Character, record.id).unwrap().is_some());
        assert!(matches!(
            store.delete_record(RecordKind::Location, record.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_manuscript_cascades_to_children() {
        let (store, id) = store_with_manuscript();
        store
            .append_version(NewChapterVersion {
                manuscript_id: id,
                chapter_id: "1".into(),
                title: "Chapter 1".into(),
                content: "x".into(),
            })
            .unwrap();
        store.delete_manuscript(id).unwrap();

        assert!(store.list_versions(id, "1").unwrap().is_empty());
        assert!(matches!(
            store.delete_manuscript(id),
            Err(StoreError::NotFound(_))
        ));
    }
}
