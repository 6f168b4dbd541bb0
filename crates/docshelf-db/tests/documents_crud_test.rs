//! Integration tests for the document lifecycle: insert, fetch, status
//! transitions, and delete.
//!
//! These tests require a running PostgreSQL with migrations applied; run
//! with `cargo test -- --ignored`.

use docshelf_core::{
    stored_filename, CreateDocumentRequest, DocumentRepository, DocumentStatus, Error,
};
use docshelf_db::test_fixtures::connect_test_db;
use uuid::Uuid;

fn test_request(name: &str) -> CreateDocumentRequest {
    CreateDocumentRequest {
        original_filename: format!("{}.pdf", name),
        stored_filename: stored_filename(Uuid::now_v7()),
        file_size: 1024,
    }
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_insert_creates_pending_document() {
    let db = connect_test_db().await;

    let id = db.documents.insert(test_request("pending-doc")).await.unwrap();
    let doc = db.documents.fetch(id).await.unwrap();

    assert_eq!(doc.status, DocumentStatus::Pending);
    assert!(doc.content.is_none());
    assert!(doc.page_count.is_none());
    assert!(doc.tags.is_empty());

    db.documents.delete(id).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_mark_processed_sets_content_and_page_count() {
    let db = connect_test_db().await;

    let id = db.documents.insert(test_request("processed-doc")).await.unwrap();
    db.documents
        .mark_processed(id, "hello world", 2)
        .await
        .unwrap();

    let doc = db.documents.fetch(id).await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Processed);
    assert_eq!(doc.content.as_deref(), Some("hello world"));
    assert_eq!(doc.page_count, Some(2));
    assert!(doc.processed_at_utc.is_some());

    db.documents.delete(id).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_terminal_status_never_transitions_back() {
    let db = connect_test_db().await;

    let id = db.documents.insert(test_request("terminal-doc")).await.unwrap();
    db.documents.mark_failed(id, "boom").await.unwrap();

    // failed -> processed is forbidden
    let err = db.documents.mark_processed(id, "text", 1).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    // failed -> failed is also forbidden (single transition)
    let err = db.documents.mark_failed(id, "again").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let doc = db.documents.fetch(id).await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Failed);
    assert_eq!(doc.error_detail.as_deref(), Some("boom"));

    db.documents.delete(id).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_delete_then_fetch_is_not_found() {
    let db = connect_test_db().await;

    let id = db.documents.insert(test_request("deleted-doc")).await.unwrap();
    let deleted = db.documents.delete(id).await.unwrap();
    assert_eq!(deleted.id, id);

    let err = db.documents.fetch(id).await.unwrap_err();
    assert!(matches!(err, Error::DocumentNotFound(_)));
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_delete_missing_is_not_found() {
    let db = connect_test_db().await;

    let err = db.documents.delete(Uuid::now_v7()).await.unwrap_err();
    assert!(matches!(err, Error::DocumentNotFound(_)));
}
