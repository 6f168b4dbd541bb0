//! Upload validation and safe file naming.
//!
//! Protection layers:
//! 1. Extension allow-list (`.pdf` only)
//! 2. Path-traversal rejection after base-name sanitization
//! 3. Size ceiling enforcement
//!
//! The stored on-disk name is always derived from the document UUID, never
//! from user input.

use uuid::Uuid;

use crate::defaults::ALLOWED_UPLOAD_EXTENSIONS;
use crate::error::{Error, Result};

/// Sanitize a user-supplied filename for display and storage in the
/// document record.
///
/// Strips any path components, replaces dangerous characters, and bounds
/// the length while preserving the extension.
pub fn sanitize_filename(filename: &str) -> String {
    // Remove path components
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    // Replace dangerous characters
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return String::new();
    }

    // Truncate if too long (preserve extension)
    if sanitized.len() > 255 {
        if let Some(dot_pos) = sanitized.rfind('.') {
            let ext = &sanitized[dot_pos..];
            let name = &sanitized[..255 - ext.len()];
            return format!("{}{}", name, ext);
        }
        return sanitized[..255].to_string();
    }

    sanitized.to_string()
}

/// Extract the lowercase extension, if any.
fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Validate an upload before anything touches disk or the database.
///
/// Returns the sanitized display filename on success.
///
/// Failure modes (all surfaced as client errors):
/// - empty filename after trimming
/// - extension not in the allow-list
/// - traversal sequences surviving sanitization
/// - size over the configured ceiling
pub fn validate_upload(filename: &str, size: u64, max_size: u64) -> Result<String> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("No filename provided".to_string()));
    }

    match extension(trimmed) {
        Some(ext) if ALLOWED_UPLOAD_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => {
            return Err(Error::InvalidInput(
                "Only PDF files are allowed".to_string(),
            ))
        }
    }

    let safe_name = sanitize_filename(trimmed);
    if safe_name.is_empty()
        || safe_name.contains("..")
        || safe_name.contains('/')
        || safe_name.contains('\\')
    {
        return Err(Error::InvalidInput("Invalid filename".to_string()));
    }

    if size > max_size {
        return Err(Error::FileTooLarge {
            size,
            max: max_size,
        });
    }

    Ok(safe_name)
}

/// Collision-resistant on-disk name for a document.
///
/// UUIDv7 IDs are unique across concurrent uploads, so two uploads can
/// never produce the same path, and the stored name never matches the raw
/// user-supplied name.
pub fn stored_filename(document_id: Uuid) -> String {
    format!("{}.pdf", document_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u64 = 50 * 1024 * 1024;

    #[test]
    fn test_accepts_plain_pdf() {
        assert_eq!(validate_upload("report.pdf", 10_240, MAX).unwrap(), "report.pdf");
    }

    #[test]
    fn test_accepts_uppercase_extension() {
        assert_eq!(validate_upload("REPORT.PDF", 10_240, MAX).unwrap(), "REPORT.PDF");
    }

    #[test]
    fn test_rejects_empty_filename() {
        let err = validate_upload("", 10, MAX).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = validate_upload("   ", 10, MAX).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_disallowed_extensions() {
        for name in ["notes.txt", "archive.zip", "report.pdf.exe", "pdf", "noext"] {
            let err = validate_upload(name, 10, MAX).unwrap_err();
            assert!(
                matches!(err, Error::InvalidInput(_)),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_strips_path_components() {
        assert_eq!(
            validate_upload("/tmp/uploads/report.pdf", 10, MAX).unwrap(),
            "report.pdf"
        );
        assert_eq!(
            validate_upload("C:\\Users\\me\\report.pdf", 10, MAX).unwrap(),
            "report.pdf"
        );
    }

    #[test]
    fn test_rejects_traversal_sequences() {
        // "../" collapses to the base name, but a bare dot-dot survives
        // sanitization and must be rejected.
        let err = validate_upload("..pdf....pdf", 10, MAX).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = validate_upload("evil...pdf", 10, MAX).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_traversal_path_resolves_to_base_name() {
        // A traversal prefix is stripped; the remaining base name is safe.
        assert_eq!(
            validate_upload("../../etc/report.pdf", 10, MAX).unwrap(),
            "report.pdf"
        );
    }

    #[test]
    fn test_size_boundary() {
        assert!(validate_upload("a.pdf", MAX, MAX).is_ok());
        let err = validate_upload("a.pdf", MAX + 1, MAX).unwrap_err();
        match err {
            Error::FileTooLarge { size, max } => {
                assert_eq!(size, MAX + 1);
                assert_eq!(max, MAX);
            }
            other => panic!("Expected FileTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_size_checked_after_type() {
        // An oversized non-PDF is a type error, not a size error.
        let err = validate_upload("big.txt", MAX + 1, MAX).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_sanitize_removes_path() {
        assert_eq!(sanitize_filename("/etc/passwd"), "passwd");
        assert_eq!(
            sanitize_filename("C:\\Windows\\system32.dll"),
            "system32.dll"
        );
    }

    #[test]
    fn test_sanitize_removes_dangerous_chars() {
        assert_eq!(sanitize_filename("file<>:test.pdf"), "file___test.pdf");
        assert_eq!(sanitize_filename("file|name?.pdf"), "file_name_.pdf");
    }

    #[test]
    fn test_sanitize_truncates_long_names() {
        let long_name = format!("{}.pdf", "a".repeat(300));
        let sanitized = sanitize_filename(&long_name);
        assert!(sanitized.len() <= 255);
        assert!(sanitized.ends_with(".pdf"));
    }

    #[test]
    fn test_sanitize_handles_empty() {
        assert_eq!(sanitize_filename(""), "");
        assert_eq!(sanitize_filename("   "), "");
    }

    #[test]
    fn test_stored_filename_never_matches_user_name() {
        let id = Uuid::now_v7();
        let stored = stored_filename(id);
        assert_eq!(stored, format!("{}.pdf", id));
        assert!(!stored.contains('/'));
        assert!(!stored.contains(".."));
    }

    #[test]
    fn test_stored_filenames_are_unique() {
        let a = stored_filename(Uuid::now_v7());
        let b = stored_filename(Uuid::now_v7());
        assert_ne!(a, b);
    }
}
