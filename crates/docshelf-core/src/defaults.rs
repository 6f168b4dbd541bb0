//! Centralized default constants for the docshelf system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates should reference these constants instead of defining
//! their own magic numbers.

// =============================================================================
// UPLOADS
// =============================================================================

/// Maximum upload size in bytes (50 MiB).
pub const MAX_UPLOAD_SIZE_BYTES: usize = 50 * 1024 * 1024;

/// File extensions accepted for upload (lowercase, without dot).
pub const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["pdf"];

/// Default upload directory when UPLOAD_DIR is not set.
pub const UPLOAD_DIR: &str = "/var/lib/docshelf/uploads";

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for document listing.
pub const PAGE_LIMIT: i64 = 100;

/// Hard server-side ceiling on page size (prevents unbounded reads).
pub const PAGE_LIMIT_MAX: i64 = 100;

/// Default page offset.
pub const PAGE_OFFSET: i64 = 0;

// =============================================================================
// SEARCH
// =============================================================================

/// Default result limit for content search.
pub const SEARCH_LIMIT: i64 = 50;

/// Characters of surrounding context on each side of a search match.
pub const SNIPPET_RADIUS: usize = 80;

// =============================================================================
// TAGS
// =============================================================================

/// Maximum tag name length in characters.
pub const TAG_NAME_MAX_LEN: usize = 100;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default allowed CORS origin (local Vite dev server).
pub const ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// Placeholder signing key for local development. Startup warns when this
/// value is still in use.
pub const DEV_SECRET_KEY: &str = "change-me-in-production";

// =============================================================================
// JOBS
// =============================================================================

/// Maximum number of jobs processed concurrently by the worker.
pub const JOB_MAX_CONCURRENT: usize = 4;

/// Polling interval in milliseconds when the job queue is empty.
pub const JOB_POLL_INTERVAL_MS: u64 = 500;

/// Per-job execution timeout in seconds.
pub const JOB_TIMEOUT_SECS: u64 = 600;

/// Broadcast channel capacity for worker events.
pub const WORKER_EVENT_CAPACITY: usize = 256;

// =============================================================================
// EXTRACTION
// =============================================================================

/// Timeout in seconds for a single external extraction command.
pub const EXTRACTION_CMD_TIMEOUT_SECS: u64 = 120;

/// Page count above which PDF text extraction is batched.
pub const LARGE_PDF_PAGE_THRESHOLD: usize = 100;

/// Pages per batch when extracting large PDFs.
pub const PDF_BATCH_PAGES: usize = 50;
