//! # docshelf-db
//!
//! PostgreSQL database layer for docshelf.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for documents, tags, and jobs
//! - Case-insensitive content search with snippet extraction
//! - Filesystem storage backend for uploaded files
//!
//! ## Example
//!
//! ```rust,ignore
//! use docshelf_db::Database;
//! use docshelf_core::{CreateDocumentRequest, DocumentRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/docshelf").await?;
//!
//!     let id = db.documents.insert(CreateDocumentRequest {
//!         original_filename: "report.pdf".to_string(),
//!         stored_filename: "0198c0de-....pdf".to_string(),
//!         file_size: 10_240,
//!     }).await?;
//!
//!     println!("Created document: {}", id);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod documents;
pub mod files;
pub mod jobs;
pub mod pool;
pub mod search;
pub mod tags;

// Test fixtures for integration tests
// Note: always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use docshelf_core::*;

// Re-export repository implementations
pub use documents::PgDocumentRepository;
pub use files::{FilesystemBackend, StorageBackend};
pub use jobs::PgJobRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use search::{make_snippet, PgContentSearch};
pub use tags::{normalize_tag_name, validate_tag_name, PgTagRepository};

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Document repository for CRUD and lifecycle operations.
    pub documents: PgDocumentRepository,
    /// Tag repository for tagging and associations.
    pub tags: PgTagRepository,
    /// Job repository for background processing.
    pub jobs: PgJobRepository,
    /// Content search provider.
    pub search: PgContentSearch,
    /// Storage backend for uploaded files.
    /// Use `with_file_store` to configure.
    pub files: Option<Arc<dyn StorageBackend>>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            documents: PgDocumentRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            jobs: PgJobRepository::new(pool.clone()),
            search: PgContentSearch::new(pool.clone()),
            files: None,
            pool,
        }
    }

    /// Configure the storage backend for uploaded files.
    pub fn with_file_store(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.files = Some(Arc::new(backend));
        self
    }

    /// The configured storage backend, or an error when none is set.
    pub fn file_store(&self) -> Result<&Arc<dyn StorageBackend>> {
        self.files
            .as_ref()
            .ok_or_else(|| Error::Internal("File storage not configured".to_string()))
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            documents: PgDocumentRepository::new(self.pool.clone()),
            tags: PgTagRepository::new(self.pool.clone()),
            jobs: PgJobRepository::new(self.pool.clone()),
            search: PgContentSearch::new(self.pool.clone()),
            files: self.files.clone(),
        }
    }
}
