//! Content search implementation.
//!
//! Substring search over extracted document content using a bound ILIKE
//! parameter. User input is never concatenated into the SQL text; wildcard
//! characters are escaped so a query like `100%` matches literally.

use sqlx::{Pool, Postgres, Row};

use docshelf_core::defaults::SNIPPET_RADIUS;
use docshelf_core::{Error, Result, SearchHit};

use crate::escape_like;

/// Content search provider over processed documents.
pub struct PgContentSearch {
    pool: Pool<Postgres>,
}

impl PgContentSearch {
    /// Create a new PgContentSearch with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Case-insensitive substring search over document content.
    ///
    /// Only `processed` documents participate (pending and failed rows
    /// have no content). A blank query returns no results.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", escape_like(query));
        let rows = sqlx::query(
            r#"
            SELECT id, original_filename, content
            FROM document
            WHERE status = 'processed'::document_status
              AND content ILIKE $1 ESCAPE '\'
            ORDER BY created_at_utc DESC
            LIMIT $2
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let hits = rows
            .into_iter()
            .map(|row| {
                let content: Option<String> = row.get("content");
                SearchHit {
                    id: row.get("id"),
                    filename: row.get("original_filename"),
                    snippet: make_snippet(content.as_deref().unwrap_or(""), query, SNIPPET_RADIUS),
                }
            })
            .collect();

        Ok(hits)
    }
}

/// Move an index down to the nearest char boundary.
fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Move an index up to the nearest char boundary.
fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Build a snippet: a window of `radius` bytes of context on each side of
/// the first case-insensitive match, ellipsized where the window cuts into
/// surrounding text.
///
/// Case-folding can shift byte offsets for some scripts, so every index is
/// clamped to a char boundary of the original text before slicing.
pub fn make_snippet(content: &str, query: &str, radius: usize) -> String {
    let lowered_content = content.to_lowercase();
    let lowered_query = query.to_lowercase();

    let (match_start, match_len) = match lowered_content.find(&lowered_query) {
        Some(pos) => (pos, lowered_query.len()),
        None => (0, 0),
    };

    let start = floor_char_boundary(content, match_start.saturating_sub(radius));
    let end = ceil_char_boundary(content, match_start + match_len + radius);

    let mut snippet = String::new();
    if start > 0 {
        snippet.push('…');
    }
    snippet.push_str(content[start..end].trim());
    if end < content.len() {
        snippet.push('…');
    }
    snippet
}
