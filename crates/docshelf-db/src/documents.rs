//! Document repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use docshelf_core::defaults::{PAGE_LIMIT, PAGE_LIMIT_MAX, PAGE_OFFSET};
use docshelf_core::{
    CreateDocumentRequest, Document, DocumentRepository, DocumentStatus, DocumentSummary, Error,
    ListDocumentsRequest, ListDocumentsResponse, Result, Tag,
};

/// Clamp a requested page size to the server-side ceiling.
fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(PAGE_LIMIT).clamp(1, PAGE_LIMIT_MAX)
}

/// Clamp a requested offset to a non-negative value.
fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(PAGE_OFFSET).max(0)
}

fn parse_status(raw: &str) -> Result<DocumentStatus> {
    raw.parse()
        .map_err(|e: String| Error::Internal(format!("Unexpected status in document row: {}", e)))
}

/// Map a listing row to a DocumentSummary. Tags arrive pre-aggregated as a
/// comma-separated string from `string_agg` (tag names cannot contain
/// commas, see tags::validate_tag_name).
fn map_row_to_summary(row: sqlx::postgres::PgRow) -> Result<DocumentSummary> {
    let status: String = row.get("status");
    let tags_str: String = row.get("tags");
    let tags = if tags_str.is_empty() {
        Vec::new()
    } else {
        tags_str.split(',').map(String::from).collect()
    };

    Ok(DocumentSummary {
        id: row.get("id"),
        original_filename: row.get("original_filename"),
        file_size: row.get("file_size"),
        page_count: row.get("page_count"),
        status: parse_status(&status)?,
        created_at_utc: row.get("created_at_utc"),
        tags,
    })
}

fn map_row_to_document(row: sqlx::postgres::PgRow, tags: Vec<Tag>) -> Result<Document> {
    let status: String = row.get("status");
    Ok(Document {
        id: row.get("id"),
        original_filename: row.get("original_filename"),
        stored_filename: row.get("stored_filename"),
        file_size: row.get("file_size"),
        page_count: row.get("page_count"),
        content: row.get("content"),
        status: parse_status(&status)?,
        error_detail: row.get("error_detail"),
        created_at_utc: row.get("created_at_utc"),
        processed_at_utc: row.get("processed_at_utc"),
        tags,
    })
}

/// PostgreSQL implementation of DocumentRepository.
pub struct PgDocumentRepository {
    pool: Pool<Postgres>,
}

impl PgDocumentRepository {
    /// Create a new PgDocumentRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_tags(&self, document_id: Uuid) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT t.id, t.name, t.created_at_utc
             FROM document_tag dt
             JOIN tag t ON t.id = dt.tag_id
             WHERE dt.document_id = $1
             ORDER BY t.canonical",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| Tag {
                id: row.get("id"),
                name: row.get("name"),
                created_at_utc: row.get("created_at_utc"),
            })
            .collect())
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn insert(&self, req: CreateDocumentRequest) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO document
                 (id, original_filename, stored_filename, file_size, status, created_at_utc)
             VALUES ($1, $2, $3, $4, 'pending'::document_status, $5)",
        )
        .bind(id)
        .bind(&req.original_filename)
        .bind(&req.stored_filename)
        .bind(req.file_size)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "documents",
            op = "insert",
            document_id = %id,
            file_size = req.file_size,
            "Document row created"
        );
        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<Document> {
        let row = sqlx::query(
            "SELECT id, original_filename, stored_filename, file_size, page_count, content,
                    status::text AS status, error_detail, created_at_utc, processed_at_utc
             FROM document WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::DocumentNotFound(id))?;

        let tags = self.fetch_tags(id).await?;
        map_row_to_document(row, tags)
    }

    async fn list(&self, req: ListDocumentsRequest) -> Result<ListDocumentsResponse> {
        let limit = clamp_limit(req.limit);
        let offset = clamp_offset(req.offset);
        let tag_canonical = req
            .tag
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());

        let tag_clause = if tag_canonical.is_some() {
            "AND EXISTS (SELECT 1 FROM document_tag dt
                         JOIN tag t ON t.id = dt.tag_id
                         WHERE dt.document_id = d.id AND t.canonical = $1) "
        } else {
            ""
        };

        // Count query
        let count_sql = format!("SELECT COUNT(*) FROM document d WHERE TRUE {}", tag_clause);
        let total: i64 = {
            let mut q = sqlx::query_scalar(&count_sql);
            if let Some(ref canonical) = tag_canonical {
                q = q.bind(canonical);
            }
            q.fetch_one(&self.pool).await.map_err(Error::Database)?
        };

        // Page query. Tags are aggregated in the same statement so the
        // query count stays constant regardless of page size.
        let mut param_idx = 1;
        if tag_canonical.is_some() {
            param_idx += 1;
        }
        let page_sql = format!(
            r#"
            SELECT
                d.id, d.original_filename, d.file_size, d.page_count,
                d.status::text AS status, d.created_at_utc,
                COALESCE(
                    (SELECT string_agg(t.name, ',' ORDER BY t.canonical)
                     FROM document_tag dt
                     JOIN tag t ON t.id = dt.tag_id
                     WHERE dt.document_id = d.id),
                    ''
                ) AS tags
            FROM document d
            WHERE TRUE {}
            ORDER BY d.created_at_utc DESC
            LIMIT ${} OFFSET ${}
            "#,
            tag_clause,
            param_idx,
            param_idx + 1
        );

        let rows = {
            let mut q = sqlx::query(&page_sql);
            if let Some(ref canonical) = tag_canonical {
                q = q.bind(canonical);
            }
            q = q.bind(limit).bind(offset);
            q.fetch_all(&self.pool).await.map_err(Error::Database)?
        };

        let documents = rows
            .into_iter()
            .map(map_row_to_summary)
            .collect::<Result<Vec<DocumentSummary>>>()?;

        Ok(ListDocumentsResponse { documents, total })
    }

    async fn mark_processed(&self, id: Uuid, content: &str, page_count: i32) -> Result<()> {
        let now = Utc::now();
        let updated = sqlx::query(
            "UPDATE document
             SET content = $2, page_count = $3, status = 'processed'::document_status,
                 error_detail = NULL, processed_at_utc = $4
             WHERE id = $1 AND status = 'pending'::document_status",
        )
        .bind(id)
        .bind(content)
        .bind(page_count)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            if self.exists(id).await? {
                // Terminal statuses never transition back.
                return Err(Error::InvalidInput(format!(
                    "Document {} is not pending",
                    id
                )));
            }
            return Err(Error::DocumentNotFound(id));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error_detail: &str) -> Result<()> {
        let now = Utc::now();
        let updated = sqlx::query(
            "UPDATE document
             SET status = 'failed'::document_status, error_detail = $2,
                 content = NULL, page_count = NULL, processed_at_utc = $3
             WHERE id = $1 AND status = 'pending'::document_status",
        )
        .bind(id)
        .bind(error_detail)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            if self.exists(id).await? {
                return Err(Error::InvalidInput(format!(
                    "Document {} is not pending",
                    id
                )));
            }
            return Err(Error::DocumentNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<Document> {
        let row = sqlx::query(
            "DELETE FROM document WHERE id = $1
             RETURNING id, original_filename, stored_filename, file_size, page_count, content,
                       status::text AS status, error_detail, created_at_utc, processed_at_utc",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::DocumentNotFound(id))?;

        debug!(
            subsystem = "database",
            component = "documents",
            op = "delete",
            document_id = %id,
            "Document row deleted"
        );
        // Associations cascade with the row; tags themselves are retained.
        map_row_to_document(row, Vec::new())
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM document WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(exists)
    }
}
