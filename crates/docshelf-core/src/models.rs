//! Core data models shared across the docshelf crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// DOCUMENTS
// =============================================================================

/// Processing state of an uploaded document.
///
/// Transitions are one-way: `Pending -> Processed` or `Pending -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processed,
    Failed,
}

impl DocumentStatus {
    /// Database/string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processed => "processed",
            DocumentStatus::Failed => "failed",
        }
    }

    /// True once the document has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DocumentStatus::Pending)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "processed" => Ok(DocumentStatus::Processed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("Unknown document status: {}", other)),
        }
    }
}

/// A stored document, including extracted content and attached tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    /// Filename as supplied by the uploader (display only).
    pub original_filename: String,
    /// Collision-resistant on-disk name inside the upload directory.
    pub stored_filename: String,
    pub file_size: i64,
    /// Null until extraction succeeds.
    pub page_count: Option<i32>,
    /// Null until extraction succeeds, and on extraction failure.
    pub content: Option<String>,
    pub status: DocumentStatus,
    /// Populated when status is `failed`.
    pub error_detail: Option<String>,
    pub created_at_utc: DateTime<Utc>,
    pub processed_at_utc: Option<DateTime<Utc>>,
    pub tags: Vec<Tag>,
}

/// Lightweight document view for list responses (no content body).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub original_filename: String,
    pub file_size: i64,
    pub page_count: Option<i32>,
    pub status: DocumentStatus,
    pub created_at_utc: DateTime<Utc>,
    /// Tag display names, loaded in the same query as the page.
    pub tags: Vec<String>,
}

// =============================================================================
// TAGS
// =============================================================================

/// A named label attached to documents.
///
/// `name` is the display form; uniqueness is enforced case-insensitively
/// on the lower-cased canonical form at the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub created_at_utc: DateTime<Utc>,
}

/// A tag together with its attachment count, for filter UIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithUsage {
    pub id: Uuid,
    pub name: String,
    pub created_at_utc: DateTime<Utc>,
    pub document_count: i64,
}

// =============================================================================
// SEARCH
// =============================================================================

/// One content-search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub filename: String,
    /// Window of content surrounding the first match.
    pub snippet: String,
}

// =============================================================================
// EXTRACTION
// =============================================================================

/// Output of the text-extraction collaborator.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: i32,
    /// Extractor-specific metadata (producer, char counts, ...).
    pub metadata: JsonValue,
}

// =============================================================================
// JOBS
// =============================================================================

/// Status of a job in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Type of job to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Extract text and page count from a stored document file.
    ExtractText,
}

impl JobType {
    /// Default priority for this job type (higher = more urgent).
    pub fn default_priority(&self) -> i32 {
        match self {
            // Extraction gates everything downstream of an upload.
            JobType::ExtractText => 7,
        }
    }
}

/// A job in the processing queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub document_id: Option<Uuid>,
    pub job_type: JobType,
    pub status: JobStatus,
    pub priority: i32,
    pub payload: Option<JsonValue>,
    pub error_message: Option<String>,
    pub progress_percent: i32,
    pub progress_message: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at_utc: DateTime<Utc>,
    pub started_at_utc: Option<DateTime<Utc>>,
    pub completed_at_utc: Option<DateTime<Utc>>,
}
