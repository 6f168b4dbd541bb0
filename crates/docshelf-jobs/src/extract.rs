//! PDF text extraction using `pdftotext`/`pdfinfo` (poppler-utils).

use std::io::Write;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

use docshelf_core::defaults::{
    EXTRACTION_CMD_TIMEOUT_SECS, LARGE_PDF_PAGE_THRESHOLD, PDF_BATCH_PAGES,
};
use docshelf_core::{Error, ExtractedText, Result, TextExtractor};

/// Text extractor shelling out to `pdftotext` (poppler-utils).
///
/// For large PDFs (> 100 pages), extraction is batched in 50-page chunks
/// to bound memory usage. Each invocation is guarded by a per-command
/// timeout. Page count comes from `pdfinfo`, falling back to counting the
/// form-feed separators `pdftotext` emits between pages.
pub struct PdfTextExtractor;

/// Parse `pdfinfo` output into a JSON metadata object.
fn parse_pdfinfo(output: &str) -> JsonValue {
    let mut metadata = serde_json::Map::new();

    for line in output.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_lowercase().replace(' ', "_");
            let value = value.trim();
            if !value.is_empty() {
                // Parse page count as number
                if key == "pages" {
                    if let Ok(pages) = value.parse::<u64>() {
                        metadata.insert(key, JsonValue::Number(pages.into()));
                        continue;
                    }
                }
                metadata.insert(key, JsonValue::String(value.to_string()));
            }
        }
    }

    JsonValue::Object(metadata)
}

/// Get page count from pdfinfo metadata, defaulting to 0.
fn page_count_from_metadata(metadata: &JsonValue) -> usize {
    metadata.get("pages").and_then(|v| v.as_u64()).unwrap_or(0) as usize
}

/// Fall back to the form-feed separators `pdftotext` emits per page.
fn page_count_from_text(text: &str) -> usize {
    let form_feeds = text.matches('\u{c}').count();
    if form_feeds > 0 {
        form_feeds
    } else {
        1
    }
}

/// Run a command with a timeout, returning stdout as a string.
async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<String> {
    let output = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            Error::Extraction(format!("External command timed out after {}s", timeout_secs))
        })?
        .map_err(|e| Error::Extraction(format!("Failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Extraction(format!(
            "Command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, data: &[u8], filename: &str) -> Result<ExtractedText> {
        if data.is_empty() {
            return Err(Error::InvalidInput(
                "Cannot extract text from empty PDF data".to_string(),
            ));
        }

        // Magic byte check: the extension was validated at upload, but the
        // bytes decide what the file really is.
        match infer::get(data) {
            Some(kind) if kind.mime_type() == "application/pdf" => {}
            _ => {
                return Err(Error::InvalidInput(format!(
                    "File '{}' is not a valid PDF (missing %PDF header)",
                    filename
                )))
            }
        }

        // Write data to a temporary file (pdftotext reads from a path)
        let mut tmpfile = NamedTempFile::new()
            .map_err(|e| Error::Extraction(format!("Failed to create temp file: {}", e)))?;
        tmpfile
            .write_all(data)
            .map_err(|e| Error::Extraction(format!("Failed to write temp file: {}", e)))?;
        let tmp_path = tmpfile.path().to_string_lossy().to_string();

        // Get metadata from pdfinfo
        let pdfinfo_output = run_cmd_with_timeout(
            Command::new("pdfinfo").arg(&tmp_path),
            EXTRACTION_CMD_TIMEOUT_SECS,
        )
        .await;

        let mut metadata = match pdfinfo_output {
            Ok(output) => parse_pdfinfo(&output),
            Err(e) => {
                warn!(filename, error = %e, "pdfinfo failed, continuing without metadata");
                serde_json::json!({})
            }
        };

        // Extract text
        let pages = page_count_from_metadata(&metadata);
        let text = if pages > LARGE_PDF_PAGE_THRESHOLD {
            // Batch extraction for large PDFs
            debug!(filename, pages, "Large PDF detected, extracting in batches");
            let mut chunks = Vec::new();
            let mut start = 1usize;
            while start <= pages {
                let end = (start + PDF_BATCH_PAGES - 1).min(pages);
                let chunk = run_cmd_with_timeout(
                    Command::new("pdftotext")
                        .arg("-f")
                        .arg(start.to_string())
                        .arg("-l")
                        .arg(end.to_string())
                        .arg(&tmp_path)
                        .arg("-"),
                    EXTRACTION_CMD_TIMEOUT_SECS,
                )
                .await?;
                chunks.push(chunk);
                start = end + 1;
            }
            chunks.join("")
        } else {
            // Single extraction for small PDFs (or when page count is unknown)
            run_cmd_with_timeout(
                Command::new("pdftotext").arg(&tmp_path).arg("-"),
                EXTRACTION_CMD_TIMEOUT_SECS,
            )
            .await?
        };

        let page_count = if pages > 0 {
            pages
        } else {
            page_count_from_text(&text)
        };

        // Add char/line count
        if let Some(obj) = metadata.as_object_mut() {
            obj.insert("char_count".to_string(), JsonValue::Number(text.len().into()));
            obj.insert(
                "line_count".to_string(),
                JsonValue::Number(text.lines().count().into()),
            );
        }

        Ok(ExtractedText {
            text,
            page_count: page_count as i32,
            metadata,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match Command::new("pdftotext").arg("-v").output().await {
            Ok(output) => {
                // pdftotext -v prints version to stderr and exits with 0 or 99
                // depending on the version. Both indicate the binary exists.
                Ok(output.status.success() || output.status.code() == Some(99))
            }
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "pdf_text"
    }
}
