//! Application configuration, loaded once at process start.
//!
//! All external settings come from the environment (a `.env` file is
//! loaded by the binary before this runs). The resulting value is
//! immutable and passed explicitly to components; nothing reads ambient
//! globals after startup.

use crate::defaults;
use crate::error::{Error, Result};

/// Background worker settings.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Whether the in-process job worker starts at all.
    pub enabled: bool,
    /// Polling interval in milliseconds when the queue is empty.
    pub poll_interval_ms: u64,
    /// Maximum number of concurrent jobs.
    pub max_concurrent: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            max_concurrent: defaults::JOB_MAX_CONCURRENT,
        }
    }
}

/// Immutable application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<String>,
    pub secret_key: String,
    pub worker: WorkerSettings,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DATABASE_URL` | `postgres://localhost/docshelf` |
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `3000` |
    /// | `UPLOAD_DIR` | `/var/lib/docshelf/uploads` |
    /// | `MAX_UPLOAD_SIZE_BYTES` | `52428800` (50 MiB) |
    /// | `ALLOWED_ORIGINS` | `http://localhost:5173` |
    /// | `SECRET_KEY` | dev placeholder |
    /// | `WORKER_ENABLED` | `true` |
    /// | `JOB_POLL_INTERVAL_MS` | `500` |
    /// | `JOB_MAX_CONCURRENT` | `4` |
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/docshelf".to_string());
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_or_default("PORT", std::env::var("PORT").ok(), defaults::SERVER_PORT)?;

        let upload_dir =
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| defaults::UPLOAD_DIR.to_string());
        let max_upload_bytes = parse_or_default(
            "MAX_UPLOAD_SIZE_BYTES",
            std::env::var("MAX_UPLOAD_SIZE_BYTES").ok(),
            defaults::MAX_UPLOAD_SIZE_BYTES,
        )?;

        let allowed_origins = parse_origins(
            &std::env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| defaults::ALLOWED_ORIGIN.to_string()),
        );

        let secret_key = std::env::var("SECRET_KEY")
            .unwrap_or_else(|_| defaults::DEV_SECRET_KEY.to_string());

        let worker = WorkerSettings {
            enabled: parse_bool(std::env::var("WORKER_ENABLED").ok().as_deref(), true),
            poll_interval_ms: parse_or_default(
                "JOB_POLL_INTERVAL_MS",
                std::env::var("JOB_POLL_INTERVAL_MS").ok(),
                defaults::JOB_POLL_INTERVAL_MS,
            )?,
            max_concurrent: parse_or_default(
                "JOB_MAX_CONCURRENT",
                std::env::var("JOB_MAX_CONCURRENT").ok(),
                defaults::JOB_MAX_CONCURRENT,
            )?
            .max(1),
        };

        Ok(Self {
            database_url,
            host,
            port,
            upload_dir,
            max_upload_bytes,
            allowed_origins,
            secret_key,
            worker,
        })
    }

    /// True when the signing key is still the local-development placeholder.
    pub fn has_default_secret(&self) -> bool {
        self.secret_key == defaults::DEV_SECRET_KEY
    }
}

/// Parse a comma-separated origin list, dropping empty entries.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse `"true"`/`"1"` as true, `"false"`/`"0"` as false, anything else
/// (including unset) as the default.
pub fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

fn parse_or_default<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| Error::Config(format!("{} is not a valid value: {:?}", name, v))),
    }
}
