//! Core traits for docshelf abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// DOCUMENT REPOSITORY
// =============================================================================

/// Request for creating a document row at upload acceptance.
#[derive(Debug, Clone)]
pub struct CreateDocumentRequest {
    pub original_filename: String,
    pub stored_filename: String,
    pub file_size: i64,
}

/// Request for listing documents.
#[derive(Debug, Clone, Default)]
pub struct ListDocumentsRequest {
    /// Maximum results (default 100, clamped to the server-side ceiling).
    pub limit: Option<i64>,
    /// Pagination offset.
    pub offset: Option<i64>,
    /// Restrict to documents carrying this tag (case-insensitive).
    pub tag: Option<String>,
}

/// Response for listing documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDocumentsResponse {
    pub documents: Vec<DocumentSummary>,
    pub total: i64,
}

/// Repository for document CRUD and lifecycle operations.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Insert a new document with status `pending`. Returns the new ID.
    async fn insert(&self, req: CreateDocumentRequest) -> Result<Uuid>;

    /// Fetch a full document, including content and tags.
    async fn fetch(&self, id: Uuid) -> Result<Document>;

    /// List documents ordered by creation time descending, with tags
    /// loaded in the same statement (no per-row queries).
    async fn list(&self, req: ListDocumentsRequest) -> Result<ListDocumentsResponse>;

    /// Record successful extraction: content, page count, `processed`.
    /// Only valid from `pending`.
    async fn mark_processed(&self, id: Uuid, content: &str, page_count: i32) -> Result<()>;

    /// Record failed extraction: `failed` plus an error detail.
    /// Only valid from `pending`.
    async fn mark_failed(&self, id: Uuid, error_detail: &str) -> Result<()>;

    /// Delete the document row, cascading tag associations. Returns the
    /// deleted row so the caller can remove the on-disk file.
    async fn delete(&self, id: Uuid) -> Result<Document>;

    /// Check whether a document exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Repository for tag management and document-tag associations.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Look up a tag case-insensitively, creating it when absent.
    /// Concurrent calls with the same name converge on one row.
    async fn get_or_create(&self, name: &str) -> Result<Tag>;

    /// Attach each named tag to the document, creating tags as needed.
    /// Already-linked tags are skipped. Fails with `DocumentNotFound`
    /// when the document does not exist.
    async fn attach(&self, document_id: Uuid, names: &[String]) -> Result<()>;

    /// Remove one association. Fails with `NotFound` when the
    /// association does not exist. The tag row itself is retained.
    async fn detach(&self, document_id: Uuid, tag_id: Uuid) -> Result<()>;

    /// Every tag with its attachment count, ordered by name.
    async fn list_all(&self) -> Result<Vec<TagWithUsage>>;

    /// Tags attached to one document.
    async fn list_for_document(&self, document_id: Uuid) -> Result<Vec<Tag>>;
}

// =============================================================================
// JOB REPOSITORY
// =============================================================================

/// Repository for the background job queue.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Queue a new job. Returns the job ID.
    async fn queue(
        &self,
        document_id: Option<Uuid>,
        job_type: JobType,
        priority: i32,
        payload: Option<JsonValue>,
    ) -> Result<Uuid>;

    /// Atomically claim the next pending job, if any.
    async fn claim_next(&self) -> Result<Option<Job>>;

    /// Mark a job as completed with an optional result payload.
    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()>;

    /// Mark a job as failed, re-queueing it while retries remain.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Update job progress for observability.
    async fn update_progress(&self, job_id: Uuid, percent: i32, message: Option<&str>)
        -> Result<()>;

    /// Number of pending jobs.
    async fn pending_count(&self) -> Result<i64>;
}

// =============================================================================
// TEXT EXTRACTION
// =============================================================================

/// The text-extraction collaborator: file bytes in, extracted text and
/// page count out, or a failure. Implementations must not block the
/// calling runtime (subprocess or dedicated worker).
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text and page count from raw file data.
    async fn extract(&self, data: &[u8], filename: &str) -> Result<ExtractedText>;

    /// Check whether the extractor's external dependencies are available.
    async fn health_check(&self) -> Result<bool>;

    /// Human-readable name of this extractor.
    fn name(&self) -> &str;
}
