//! Job queue repository for background processing.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use docshelf_core::{Error, Job, JobRepository, JobStatus, JobType, Result};

/// PostgreSQL implementation of JobRepository.
pub struct PgJobRepository {
    pool: Pool<Postgres>,
}

impl PgJobRepository {
    /// Create a new PgJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn job_type_to_str(job_type: JobType) -> &'static str {
        match job_type {
            JobType::ExtractText => "extract_text",
        }
    }

    fn str_to_job_type(raw: &str) -> Result<JobType> {
        match raw {
            "extract_text" => Ok(JobType::ExtractText),
            other => Err(Error::Internal(format!("Unknown job type: {}", other))),
        }
    }

    fn str_to_job_status(raw: &str) -> Result<JobStatus> {
        match raw {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::Internal(format!("Unknown job status: {}", other))),
        }
    }

    fn parse_job_row(row: sqlx::postgres::PgRow) -> Result<Job> {
        let job_type: String = row.get("job_type");
        let status: String = row.get("status");
        Ok(Job {
            id: row.get("id"),
            document_id: row.get("document_id"),
            job_type: Self::str_to_job_type(&job_type)?,
            status: Self::str_to_job_status(&status)?,
            priority: row.get("priority"),
            payload: row.get("payload"),
            error_message: row.get("error_message"),
            progress_percent: row.get("progress_percent"),
            progress_message: row.get("progress_message"),
            retry_count: row.get("retry_count"),
            max_retries: row.get("max_retries"),
            created_at_utc: row.get("created_at_utc"),
            started_at_utc: row.get("started_at_utc"),
            completed_at_utc: row.get("completed_at_utc"),
        })
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn queue(
        &self,
        document_id: Option<Uuid>,
        job_type: JobType,
        priority: i32,
        payload: Option<JsonValue>,
    ) -> Result<Uuid> {
        let job_id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO job_queue (id, document_id, job_type, status, priority, payload, created_at_utc)
             VALUES ($1, $2, $3::job_type, 'pending'::job_status, $4, $5, $6)",
        )
        .bind(job_id)
        .bind(document_id)
        .bind(Self::job_type_to_str(job_type))
        .bind(priority)
        .bind(&payload)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(job_id)
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let now = Utc::now();

        // FOR UPDATE SKIP LOCKED lets concurrent workers claim without
        // blocking on each other's candidate rows.
        let row = sqlx::query(
            "UPDATE job_queue
             SET status = 'running'::job_status, started_at_utc = $1
             WHERE id = (
                 SELECT id FROM job_queue
                 WHERE status = 'pending'::job_status
                 ORDER BY priority DESC, created_at_utc ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING id, document_id, job_type::text, status::text, priority, payload,
                       error_message, progress_percent, progress_message, retry_count,
                       max_retries, created_at_utc, started_at_utc, completed_at_utc",
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE job_queue
             SET status = 'completed'::job_status, completed_at_utc = $1, result = $2,
                 progress_percent = 100
             WHERE id = $3",
        )
        .bind(now)
        .bind(&result)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let (retry_count, max_retries): (i32, i32) =
            sqlx::query_as("SELECT retry_count, max_retries FROM job_queue WHERE id = $1")
                .bind(job_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;

        if retry_count < max_retries {
            // Retry: reset to pending with incremented retry count
            sqlx::query(
                "UPDATE job_queue
                 SET status = 'pending'::job_status, retry_count = $1, error_message = $2,
                     started_at_utc = NULL, progress_percent = 0, progress_message = NULL
                 WHERE id = $3",
            )
            .bind(retry_count + 1)
            .bind(error)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        } else {
            sqlx::query(
                "UPDATE job_queue
                 SET status = 'failed'::job_status, completed_at_utc = $1, error_message = $2
                 WHERE id = $3",
            )
            .bind(now)
            .bind(error)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        percent: i32,
        message: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE job_queue SET progress_percent = $1, progress_message = $2 WHERE id = $3",
        )
        .bind(percent)
        .bind(message)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn pending_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_queue WHERE status = 'pending'::job_status",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_round_trip() {
        let s = PgJobRepository::job_type_to_str(JobType::ExtractText);
        assert_eq!(s, "extract_text");
        assert_eq!(
            PgJobRepository::str_to_job_type(s).unwrap(),
            JobType::ExtractText
        );
    }

    #[test]
    fn test_unknown_job_type_rejected() {
        assert!(PgJobRepository::str_to_job_type("transcode_video").is_err());
    }

    #[test]
    fn test_job_status_parsing() {
        assert_eq!(
            PgJobRepository::str_to_job_status("running").unwrap(),
            JobStatus::Running
        );
        assert!(PgJobRepository::str_to_job_status("paused").is_err());
    }
}
