//! Tag repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use docshelf_core::defaults::TAG_NAME_MAX_LEN;
use docshelf_core::{Error, Result, Tag, TagRepository, TagWithUsage};

/// Validate a tag name.
///
/// Rules:
/// - Length between 1-100 characters after trimming
/// - Allowed characters: alphanumeric, spaces, hyphens (-), underscores (_),
///   dots (.), forward slashes (/)
/// - No commas (tag lists are aggregated comma-separated) or other
///   special characters
///
/// Returns Ok(()) if valid, Err with message if invalid.
pub fn validate_tag_name(tag: &str) -> std::result::Result<(), String> {
    if tag.is_empty() {
        return Err("Tag name cannot be empty".to_string());
    }
    if tag.chars().count() > TAG_NAME_MAX_LEN {
        return Err(format!(
            "Tag name must be {} characters or less",
            TAG_NAME_MAX_LEN
        ));
    }

    let invalid_chars: Vec<char> = tag
        .chars()
        .filter(|c| {
            !c.is_alphanumeric() && !matches!(c, ' ' | '-' | '_' | '.' | '/')
        })
        .collect();

    if !invalid_chars.is_empty() {
        let chars_display: String = invalid_chars
            .iter()
            .take(5)
            .map(|c| format!("'{}'", c))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(format!(
            "Tag contains invalid characters: {}. Only alphanumeric characters, spaces, hyphens, underscores, dots, and forward slashes are allowed",
            chars_display
        ));
    }

    Ok(())
}

/// Normalize a tag name into (display, canonical) forms.
///
/// The display form is the trimmed input; the canonical form is its
/// lower-casing, used for case-insensitive uniqueness and lookups.
pub fn normalize_tag_name(name: &str) -> std::result::Result<(String, String), String> {
    let display = name.trim().to_string();
    validate_tag_name(&display)?;
    let canonical = display.to_lowercase();
    Ok((display, canonical))
}

/// PostgreSQL implementation of TagRepository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn document_exists(&self, document_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM document WHERE id = $1)")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(exists)
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn get_or_create(&self, name: &str) -> Result<Tag> {
        let (display, canonical) = normalize_tag_name(name).map_err(Error::InvalidInput)?;
        let now = Utc::now();

        // Conflict-safe upsert: concurrent calls with any casing converge
        // on the first row created for the canonical form. The no-op
        // DO UPDATE makes RETURNING yield the surviving row.
        let row = sqlx::query(
            "INSERT INTO tag (id, name, canonical, created_at_utc)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (canonical) DO UPDATE SET canonical = EXCLUDED.canonical
             RETURNING id, name, created_at_utc",
        )
        .bind(Uuid::now_v7())
        .bind(&display)
        .bind(&canonical)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Tag {
            id: row.get("id"),
            name: row.get("name"),
            created_at_utc: row.get("created_at_utc"),
        })
    }

    async fn attach(&self, document_id: Uuid, names: &[String]) -> Result<()> {
        if !self.document_exists(document_id).await? {
            return Err(Error::DocumentNotFound(document_id));
        }

        // Validate every name before touching the database.
        let mut normalized = Vec::with_capacity(names.len());
        for name in names {
            normalized.push(normalize_tag_name(name).map_err(Error::InvalidInput)?);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        for (display, canonical) in normalized {
            let tag_id: Uuid = sqlx::query_scalar(
                "INSERT INTO tag (id, name, canonical, created_at_utc)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (canonical) DO UPDATE SET canonical = EXCLUDED.canonical
                 RETURNING id",
            )
            .bind(Uuid::now_v7())
            .bind(&display)
            .bind(&canonical)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;

            // Re-attach is a no-op, not an error.
            sqlx::query(
                "INSERT INTO document_tag (document_id, tag_id, created_at_utc)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (document_id, tag_id) DO NOTHING",
            )
            .bind(document_id)
            .bind(tag_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn detach(&self, document_id: Uuid, tag_id: Uuid) -> Result<()> {
        let deleted =
            sqlx::query("DELETE FROM document_tag WHERE document_id = $1 AND tag_id = $2")
                .bind(document_id)
                .bind(tag_id)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;

        if deleted.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "Tag {} is not attached to document {}",
                tag_id, document_id
            )));
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<TagWithUsage>> {
        let rows = sqlx::query(
            r#"
            SELECT
                t.id,
                t.name,
                t.created_at_utc,
                COUNT(dt.document_id) AS document_count
            FROM tag t
            LEFT JOIN document_tag dt ON dt.tag_id = t.id
            GROUP BY t.id, t.name, t.created_at_utc
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| TagWithUsage {
                id: row.get("id"),
                name: row.get("name"),
                created_at_utc: row.get("created_at_utc"),
                document_count: row.get("document_count"),
            })
            .collect())
    }

    async fn list_for_document(&self, document_id: Uuid) -> Result<Vec<Tag>> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_common_names() {
        for name in ["invoice", "Q3 Reports", "tax/2026", "to-review", "v1.2"] {
            assert!(validate_tag_name(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(validate_tag_name("").is_err());
    }

    #[test]
    fn test_validate_rejects_commas() {
        let err = validate_tag_name("a,b").unwrap_err();
        assert!(err.contains("','"));
    }

    #[test]
    fn test_validate_rejects_over_long() {
        let long = "a".repeat(TAG_NAME_MAX_LEN + 1);
        assert!(validate_tag_name(&long).is_err());
    }

    #[test]
    fn test_normalize_trims_and_lowercases() {
        let (display, canonical) = normalize_tag_name("  Invoice ").unwrap();
        assert_eq!(display, "Invoice");
        assert_eq!(canonical, "invoice");
    }

    #[test]
    fn test_normalize_case_variants_share_canonical() {
        let (_, a) = normalize_tag_name("Foo").unwrap();
        let (_, b) = normalize_tag_name("foo").unwrap();
        let (_, c) = normalize_tag_name("FOO").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_normalize_rejects_whitespace_only() {
        assert!(normalize_tag_name("   ").is_err());
    }
}
