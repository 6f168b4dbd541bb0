//! End-to-end ingestion lifecycle: store file -> pending row -> queue job
//! -> worker extracts -> processed row -> search -> tag -> delete.
//!
//! Requires a running PostgreSQL with migrations applied AND pdftotext
//! (poppler-utils) on PATH; run with `cargo test -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use docshelf_core::{
    stored_filename, CreateDocumentRequest, DocumentRepository, DocumentStatus, Error,
    JobRepository, JobType, TagRepository, TextExtractor,
};
use docshelf_db::test_fixtures::connect_test_db;
use docshelf_db::{FilesystemBackend, StorageBackend};
use docshelf_jobs::{ExtractTextHandler, JobWorker, PdfTextExtractor, WorkerConfig};
use uuid::Uuid;

/// Minimal valid PDF containing the text "hello world".
const HELLO_PDF: &[u8] = b"%PDF-1.0
1 0 obj
<< /Type /Catalog /Pages 2 0 R >>
endobj

2 0 obj
<< /Type /Pages /Kids [3 0 R] /Count 1 >>
endobj

3 0 obj
<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792]
   /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>
endobj

4 0 obj
<< /Length 44 >>
stream
BT /F1 12 Tf 100 700 Td (hello world) Tj ET
endstream
endobj

5 0 obj
<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>
endobj

trailer
<< /Size 6 /Root 1 0 R >>
%%EOF";

async fn wait_for_terminal_status(
    db: &docshelf_db::Database,
    id: Uuid,
) -> docshelf_core::Document {
    for _ in 0..100 {
        let doc = db.documents.fetch(id).await.expect("document fetch");
        if doc.status.is_terminal() {
            return doc;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("Document {} never reached a terminal status", id);
}

#[tokio::test]
#[ignore] // Requires database connection and pdftotext installed
async fn test_upload_to_processed_lifecycle() {
    if !PdfTextExtractor.health_check().await.unwrap_or(false) {
        eprintln!("Skipping: pdftotext not installed");
        return;
    }

    let upload_dir = tempfile::tempdir().unwrap();
    let db = connect_test_db()
        .await
        .with_file_store(FilesystemBackend::new(upload_dir.path()));

    // Ingest order: file on disk, then pending row, then queued job.
    let document_id = Uuid::now_v7();
    let stored = stored_filename(document_id);
    db.file_store()
        .unwrap()
        .write(&stored, HELLO_PDF)
        .await
        .unwrap();
    let id = db
        .documents
        .insert(CreateDocumentRequest {
            original_filename: "report.pdf".to_string(),
            stored_filename: stored.clone(),
            file_size: HELLO_PDF.len() as i64,
        })
        .await
        .unwrap();
    let pending = db.documents.fetch(id).await.unwrap();
    assert_eq!(pending.status, DocumentStatus::Pending);

    db.jobs
        .queue(
            Some(id),
            JobType::ExtractText,
            JobType::ExtractText.default_priority(),
            None,
        )
        .await
        .unwrap();

    // Worker picks the job up off the request path.
    let worker = JobWorker::new(
        db.clone(),
        WorkerConfig::default().with_poll_interval(50),
    );
    worker
        .register_handler(ExtractTextHandler::new(
            db.clone(),
            Arc::new(PdfTextExtractor),
        ))
        .await;
    let handle = worker.start();

    let doc = wait_for_terminal_status(&db, id).await;
    assert_eq!(doc.status, DocumentStatus::Processed);
    assert_eq!(doc.page_count, Some(1));
    assert!(doc.content.as_deref().unwrap_or("").contains("hello world"));

    // Search finds it with a snippet around the match.
    let hits = db.search.search("hello", 50).await.unwrap();
    let hit = hits.iter().find(|h| h.id == id).expect("search hit");
    assert!(hit.snippet.contains("hello world"));

    // Case-variant attach yields exactly one tag.
    db.tags
        .attach(id, &["invoice".to_string(), "Invoice".to_string()])
        .await
        .unwrap();
    let doc = db.documents.fetch(id).await.unwrap();
    assert_eq!(doc.tags.len(), 1);
    assert_eq!(doc.tags[0].name.to_lowercase(), "invoice");

    // Delete removes the row and the stored file.
    let deleted = db.documents.delete(id).await.unwrap();
    db.file_store()
        .unwrap()
        .delete(&deleted.stored_filename)
        .await
        .unwrap();
    let err = db.documents.fetch(id).await.unwrap_err();
    assert!(matches!(err, Error::DocumentNotFound(_)));
    assert!(!db.file_store().unwrap().exists(&stored).await.unwrap());

    handle.shutdown().await.ok();
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_corrupt_pdf_marks_document_failed_and_removes_file() {
    let upload_dir = tempfile::tempdir().unwrap();
    let db = connect_test_db()
        .await
        .with_file_store(FilesystemBackend::new(upload_dir.path()));

    // %PDF-free garbage passes upload validation (extension only) but the
    // extractor rejects it.
    let garbage = b"this is not a pdf";
    let document_id = Uuid::now_v7();
    let stored = stored_filename(document_id);
    db.file_store().unwrap().write(&stored, garbage).await.unwrap();
    let id = db
        .documents
        .insert(CreateDocumentRequest {
            original_filename: "broken.pdf".to_string(),
            stored_filename: stored.clone(),
            file_size: garbage.len() as i64,
        })
        .await
        .unwrap();
    db.jobs
        .queue(
            Some(id),
            JobType::ExtractText,
            JobType::ExtractText.default_priority(),
            None,
        )
        .await
        .unwrap();

    let worker = JobWorker::new(
        db.clone(),
        WorkerConfig::default().with_poll_interval(50),
    );
    worker
        .register_handler(ExtractTextHandler::new(
            db.clone(),
            Arc::new(PdfTextExtractor),
        ))
        .await;
    let handle = worker.start();

    let doc = wait_for_terminal_status(&db, id).await;
    assert_eq!(doc.status, DocumentStatus::Failed);
    assert!(doc.content.is_none());
    assert!(doc.error_detail.is_some());
    // Failure removed the stored file but kept the audit row.
    assert!(!db.file_store().unwrap().exists(&stored).await.unwrap());

    db.documents.delete(id).await.unwrap();
    handle.shutdown().await.ok();
}
