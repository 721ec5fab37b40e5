//! Input resolution: read a local file into an [`Upload`].
//!
//! The size guard runs on file metadata before any bytes are read, so an
//! oversized file costs one `stat`. The declared MIME type is guessed from
//! the extension, the way a browser fills `File.type`; unknown extensions get
//! an empty MIME type and fall through to plain-text decoding.

use crate::error::IngestError;
use std::path::Path;
use tracing::debug;

/// An uploaded file: bytes plus the metadata the classifier needs.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

/// Guess the declared MIME type for `file_name`.
pub fn guess_mime(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_default()
}

/// Reject sizes at or above `max_bytes`.
pub fn check_size(size: u64, max_bytes: u64) -> Result<(), IngestError> {
    if size >= max_bytes {
        return Err(IngestError::FileTooLarge {
            size,
            limit_bytes: max_bytes,
        });
    }
    Ok(())
}

/// Read a local file, enforcing the size limit first.
pub async fn read_upload(path: &Path, max_bytes: u64) -> Result<Upload, IngestError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let meta = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IngestError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => IngestError::Unreadable {
            name: file_name.clone(),
            detail: e.to_string(),
        },
    })?;
    if !meta.is_file() {
        return Err(IngestError::Unreadable {
            name: file_name,
            detail: "not a regular file".to_string(),
        });
    }
    check_size(meta.len(), max_bytes)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| IngestError::Unreadable {
            name: file_name.clone(),
            detail: e.to_string(),
        })?;

    let mime_type = guess_mime(&file_name);
    debug!(
        "Read {} ({} bytes, mime '{}')",
        file_name,
        bytes.len(),
        mime_type
    );

    Ok(Upload {
        bytes,
        file_name,
        mime_type,
    })
}
