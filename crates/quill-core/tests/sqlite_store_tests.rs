//! SQLite store against a real database file

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use quill_core::{
    Chapter, Character, DraftStore, ManuscriptStore, NewChapterVersion, NewDraft, NewManuscript,
    PlotPoint, RecordService, SqliteStore, StoreError, VersionStore,
};
use tempfile::TempDir;

fn open(dir: &TempDir) -> SqliteStore {
    SqliteStore::open(&dir.path().join("quill.db")).unwrap()
}

fn snapshot(manuscript_id: uuid::Uuid, content: &str) -> NewChapterVersion {
    NewChapterVersion {
        manuscript_id,
        chapter_id: "1".to_string(),
        title: "Chapter 1".to_string(),
        content: content.to_string(),
    }
}

#[test]
fn test_content_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let id = {
        let store = open(&dir);
        let ms = store
            .create_manuscript(NewManuscript::new("user-1", "Night Train").with_description("  "))
            .unwrap();
        assert_eq!(ms.description, None);
        let chapters = vec![
            Chapter::new("1", "Arrival", "<p>Late again.</p>"),
            Chapter::new("3", "Departure", ""),
        ];
        store
            .update_content(ms.id, &chapters, chrono::Utc::now())
            .unwrap();
        ms.id
    };

    let store = open(&dir);
    let ms = store.get_manuscript(id).unwrap().unwrap();
    assert_eq!(ms.title, "Night Train");
    assert_eq!(ms.chapters.len(), 2);
    assert_eq!(ms.chapters[1].id, "3");
}

#[test]
fn test_version_numbers_continue_after_reopen() {
    let dir = TempDir::new().unwrap();
    let id = {
        let store = open(&dir);
        let ms = store
            .create_manuscript(NewManuscript::new("user-1", "Novel"))
            .unwrap();
        store.append_version(snapshot(ms.id, "a")).unwrap();
        store.append_version(snapshot(ms.id, "b")).unwrap();
        ms.id
    };

    let store = open(&dir);
    let v3 = store.append_version(snapshot(id, "c")).unwrap();
    assert_eq!(v3.version_number, 3);
    assert_eq!(store.get_version(v3.id).unwrap().unwrap().content, "c");
}

#[test]
fn test_concurrent_snapshots_get_distinct_numbers() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open(&dir));
    let id = store
        .create_manuscript(NewManuscript::new("user-1", "Novel"))
        .unwrap()
        .id;

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                store
                    .append_version(snapshot(id, &i.to_string()))
                    .unwrap()
                    .version_number
            })
        })
        .collect();
    let mut numbers: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    numbers.sort();
    assert_eq!(numbers, (1..=8).collect::<Vec<u32>>());
}

#[test]
fn test_versions_for_missing_manuscript() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let err = store
        .append_version(snapshot(uuid::Uuid::new_v4(), "x"))
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn test_drafts_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let id = store
        .create_manuscript(NewManuscript::new("user-1", "Novel"))
        .unwrap()
        .id;
    for title in ["one", "two", "three"] {
        store
            .insert_current_draft(NewDraft {
                manuscript_id: id,
                title: title.to_string(),
                description: None,
                chapters: vec![Chapter::numbered("1")],
            })
            .unwrap();
    }
    let titles: Vec<String> = store
        .list_drafts(id)
        .unwrap()
        .into_iter()
        .map(|d| d.title)
        .collect();
    assert_eq!(titles, vec!["three", "two", "one"]);
}

#[tokio::test]
async fn test_records_through_service() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open(&dir));
    let id = store
        .create_manuscript(NewManuscript::new("user-1", "Novel"))
        .unwrap()
        .id;
    let records = RecordService::new(Arc::clone(&store));

    for (title, order) in [("Climax", 3), ("Inciting incident", 1), ("Midpoint", 2)] {
        records
            .create(
                id,
                PlotPoint {
                    title: title.to_string(),
                    chapter_id: "1".to_string(),
                    tension_level: Some(order * 3),
                    sequence_order: order,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }
    let titles: Vec<String> = records
        .list::<PlotPoint>(id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.data.title)
        .collect();
    assert_eq!(titles, vec!["Inciting incident", "Midpoint", "Climax"]);

    let mut ada = records
        .create(
            id,
            Character {
                name: "Ada".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    ada.data.role = Some("protagonist".to_string());
    records.update(ada.clone()).await.unwrap();
    let fetched = records.get::<Character>(ada.id).await.unwrap().unwrap();
    assert_eq!(fetched.data.role.as_deref(), Some("protagonist"));

    store.delete_manuscript(id).unwrap();
    assert!(records.get::<Character>(ada.id).await.unwrap().is_none());
}
