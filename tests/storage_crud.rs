//! Storage CRUD tests with real `SQLite` (no mocks).
//!
//! Tests `create_issue`, `get_issue`, `replace_issue`, `patch_issue` and
//! `delete_issue`, including timestamp handling and not-found behavior.

mod common;

use common::fixtures::{self, IssueBuilder};
use common::{test_db, test_db_with_dir, test_log};
use issue_tracker::model::{Priority, Status};
use issue_tracker::storage::{IssueUpdate, ListFilters, SqliteStorage, StorageOptions};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ============================================================================
// CREATE
// ============================================================================

#[test]
fn create_issue_minimal_fields() {
    let _log = test_log("create_issue_minimal_fields");
    let storage = test_db();

    let issue = storage.create_issue(&fixtures::fields("minimal")).unwrap();

    assert!(issue.id > 0);
    assert_eq!(issue.title, "minimal");
    assert_eq!(issue.reporter, fixtures::REPORTER);
    assert_eq!(issue.status, Status::Open);
    assert_eq!(issue.priority, Priority::Medium);
    assert!(issue.description.is_none());
    assert!(issue.assignee.is_none());
    assert_eq!(issue.created_at, issue.updated_at);
}

#[test]
fn create_issue_all_fields_round_trip() {
    let storage = test_db();
    let fields = IssueBuilder::new("Everything set")
        .with_description("Steps to reproduce")
        .with_status(Status::InProgress)
        .with_priority(Priority::Critical)
        .with_assignee("bob")
        .build();

    let created = storage.create_issue(&fields).unwrap();
    let fetched = storage.get_issue(created.id).unwrap().expect("issue exists");

    assert_eq!(fetched, created);
    assert_eq!(fetched.description.as_deref(), Some("Steps to reproduce"));
    assert_eq!(fetched.status, Status::InProgress);
    assert_eq!(fetched.priority, Priority::Critical);
    assert_eq!(fetched.assignee.as_deref(), Some("bob"));
}

#[test]
fn create_assigns_increasing_ids() {
    let storage = test_db();
    let ids: Vec<i64> = (0..5)
        .map(|i| {
            storage
                .create_issue(&fixtures::fields(&format!("issue-{i}")))
                .unwrap()
                .id
        })
        .collect();

    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn create_preserves_unicode_text() {
    let storage = test_db();
    let fields = IssueBuilder::new("Ошибка при сохранении 🐛")
        .with_reporter("José")
        .build();

    let issue = storage.create_issue(&fields).unwrap();
    assert_eq!(issue.title, "Ошибка при сохранении 🐛");
    assert_eq!(issue.reporter, "José");
}

// ============================================================================
// GET
// ============================================================================

#[test]
fn get_nonexistent_issue_returns_none() {
    let storage = test_db();
    assert!(storage.get_issue(12345).unwrap().is_none());
}

// ============================================================================
// REPLACE
// ============================================================================

#[test]
fn replace_overwrites_every_mutable_field() {
    let storage = test_db();
    let original = storage
        .create_issue(
            &IssueBuilder::new("before")
                .with_description("old description")
                .with_assignee("alice")
                .with_priority(Priority::High)
                .with_status(Status::InProgress)
                .build(),
        )
        .unwrap();

    thread::sleep(Duration::from_millis(5));
    let replaced = storage
        .replace_issue(original.id, &fixtures::fields("after"))
        .unwrap()
        .expect("issue exists");

    assert_eq!(replaced.id, original.id);
    assert_eq!(replaced.title, "after");
    assert!(replaced.description.is_none());
    assert!(replaced.assignee.is_none());
    assert_eq!(replaced.status, Status::Open);
    assert_eq!(replaced.priority, Priority::Medium);
    assert_eq!(replaced.created_at, original.created_at);
    assert!(replaced.updated_at > original.updated_at);
}

#[test]
fn replace_nonexistent_issue_changes_nothing() {
    let storage = test_db();
    let existing = storage.create_issue(&fixtures::fields("keep")).unwrap();

    let result = storage
        .replace_issue(existing.id + 100, &fixtures::fields("ghost"))
        .unwrap();
    assert!(result.is_none());

    let all = storage.list_issues(&ListFilters::default()).unwrap();
    assert_eq!(all, vec![existing]);
}

// ============================================================================
// PATCH
// ============================================================================

#[test]
fn patch_changes_only_given_fields() {
    let storage = test_db();
    let original = storage
        .create_issue(
            &IssueBuilder::new("patch me")
                .with_description("details")
                .with_assignee("alice")
                .build(),
        )
        .unwrap();

    thread::sleep(Duration::from_millis(5));
    let updates = IssueUpdate {
        status: Some(Status::Resolved),
        ..Default::default()
    };
    let patched = storage
        .patch_issue(original.id, &updates)
        .unwrap()
        .expect("issue exists");

    assert_eq!(patched.status, Status::Resolved);
    assert_eq!(patched.title, original.title);
    assert_eq!(patched.description, original.description);
    assert_eq!(patched.assignee, original.assignee);
    assert_eq!(patched.priority, original.priority);
    assert_eq!(patched.reporter, original.reporter);
    assert_eq!(patched.created_at, original.created_at);
    assert!(patched.updated_at > original.updated_at);
}

#[test]
fn patch_can_clear_optional_fields() {
    let storage = test_db();
    let original = storage
        .create_issue(
            &IssueBuilder::new("clear me")
                .with_description("details")
                .with_assignee("alice")
                .build(),
        )
        .unwrap();

    let updates = IssueUpdate {
        description: Some(None),
        assignee: Some(None),
        ..Default::default()
    };
    let patched = storage.patch_issue(original.id, &updates).unwrap().unwrap();

    assert!(patched.description.is_none());
    assert!(patched.assignee.is_none());
    assert_eq!(patched.title, "clear me");
}

#[test]
fn patch_sets_every_field() {
    let storage = test_db();
    let original = storage.create_issue(&fixtures::fields("old")).unwrap();

    let updates = IssueUpdate {
        title: Some("new".to_string()),
        description: Some(Some("desc".to_string())),
        status: Some(Status::Closed),
        priority: Some(Priority::Low),
        reporter: Some("carol".to_string()),
        assignee: Some(Some("dave".to_string())),
    };
    let patched = storage.patch_issue(original.id, &updates).unwrap().unwrap();

    assert_eq!(patched.title, "new");
    assert_eq!(patched.description.as_deref(), Some("desc"));
    assert_eq!(patched.status, Status::Closed);
    assert_eq!(patched.priority, Priority::Low);
    assert_eq!(patched.reporter, "carol");
    assert_eq!(patched.assignee.as_deref(), Some("dave"));
}

#[test]
fn patch_nonexistent_issue_returns_none() {
    let storage = test_db();
    let updates = IssueUpdate {
        title: Some("ghost".to_string()),
        ..Default::default()
    };
    assert!(storage.patch_issue(999, &updates).unwrap().is_none());
    assert_eq!(storage.count_issues(&ListFilters::default()).unwrap(), 0);
}

// ============================================================================
// DELETE
// ============================================================================

#[test]
fn delete_removes_row_permanently() {
    let storage = test_db();
    let issue = storage.create_issue(&fixtures::fields("doomed")).unwrap();

    assert!(storage.delete_issue(issue.id).unwrap());
    assert!(storage.get_issue(issue.id).unwrap().is_none());
    assert!(!storage.delete_issue(issue.id).unwrap());
}

#[test]
fn delete_leaves_other_rows_alone() {
    let storage = test_db();
    let keep = storage.create_issue(&fixtures::fields("keep")).unwrap();
    let drop = storage.create_issue(&fixtures::fields("drop")).unwrap();

    storage.delete_issue(drop.id).unwrap();

    let remaining = storage.list_issues(&ListFilters::default()).unwrap();
    assert_eq!(remaining, vec![keep]);
}

// ============================================================================
// FILE-BACKED POOL
// ============================================================================

#[test]
fn pooled_reads_see_writes_immediately() {
    let (storage, _dir) = test_db_with_dir();

    for i in 0..6 {
        let issue = storage
            .create_issue(&fixtures::fields(&format!("pooled-{i}")))
            .unwrap();
        let fetched = storage.get_issue(issue.id).unwrap();
        assert_eq!(fetched, Some(issue));
    }
    assert_eq!(storage.count_issues(&ListFilters::default()).unwrap(), 6);
}

#[test]
fn concurrent_writers_all_succeed() {
    let (storage, _dir) = test_db_with_dir();
    let storage = Arc::new(storage);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                for i in 0..10 {
                    storage
                        .create_issue(&fixtures::fields(&format!("t{t}-{i}")))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(storage.count_issues(&ListFilters::default()).unwrap(), 80);
}

#[test]
fn zero_read_pool_falls_back_to_writer() {
    let dir = tempfile::TempDir::new().unwrap();
    let options = StorageOptions {
        read_pool_size: 0,
        ..StorageOptions::default()
    };
    let storage = SqliteStorage::open(&dir.path().join("issues.db"), options).unwrap();

    let issue = storage.create_issue(&fixtures::fields("solo")).unwrap();
    assert_eq!(storage.get_issue(issue.id).unwrap(), Some(issue));
    storage.ping().unwrap();
}
