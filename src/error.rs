//! Error types for the edgequake-notebook library.
//!
//! Errors are split by the boundary where they occur:
//!
//! * [`IngestError`] — turning one uploaded file into text failed. Each
//!   pipeline branch reports its own variant so the message tells the user
//!   which parser or engine gave up.
//!
//! * [`ModelError`] — the single grounded-answer call failed (transport,
//!   malformed JSON, missing fields). No model message is committed.
//!
//! * [`StorageError`] — the state directory could not be read or written.
//!
//! * [`NotebookError`] — everything a [`crate::notebook::Notebook`]
//!   operation can return: precondition failures plus the three above.
//!
//! Every `Display` string is a short diagnostic meant to be shown as-is next
//! to the input that caused it.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while normalising one uploaded file into source text.
#[derive(Debug, Error)]
pub enum IngestError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// File exceeds the configured size limit; nothing was parsed.
    #[error("File is too large ({size} bytes). The maximum size is {}.", human_size(*limit_bytes))]
    FileTooLarge { size: u64, limit_bytes: u64 },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The file exists but its bytes could not be read.
    #[error("Could not read file '{name}': {detail}")]
    Unreadable { name: String, detail: String },

    // ── Parser errors ─────────────────────────────────────────────────────
    /// calamine could not open the workbook.
    #[error("Spreadsheet parse failed: {detail}")]
    SpreadsheetParse { detail: String },

    /// pdfium rejected the document.
    #[error("PDF parse failed. The file may be corrupt or unsupported. ({detail})")]
    PdfParse { detail: String },

    /// A page could not be rasterised for OCR.
    #[error("PDF page {page} could not be rendered for OCR: {detail}")]
    PdfRender { page: usize, detail: String },

    /// docx-rs could not read the document.
    #[error("Word document parse failed: {detail}")]
    WordParse { detail: String },

    /// The image bytes are not a decodable image.
    #[error("Image decode failed: {detail}")]
    ImageDecode { detail: String },

    // ── Collaborator errors ───────────────────────────────────────────────
    /// The PDF engine library could not be loaded.
    #[error("PDF engine unavailable: {detail}\nSet PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium.")]
    PdfEngineUnavailable { detail: String },

    /// The OCR engine could not be started.
    #[error("OCR engine '{engine}' unavailable: {detail}")]
    OcrUnavailable { engine: String, detail: String },

    /// The OCR engine started but recognition failed.
    #[error("OCR failed: {detail}")]
    OcrFailed { detail: String },
}

/// Size limit as shown to users: MB from 1 MiB up (one decimal unless
/// exact), KB with one decimal below that, plain bytes below 1 KiB.
fn human_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} bytes")
    }
}

/// Failure reported by an [`crate::pipeline::ocr::OcrEngine`].
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    #[error("OCR engine '{engine}' unavailable: {detail}")]
    Unavailable { engine: String, detail: String },

    #[error("recognition failed: {0}")]
    Failed(String),
}

impl From<OcrError> for IngestError {
    fn from(e: OcrError) -> Self {
        match e {
            OcrError::Unavailable { engine, detail } => {
                IngestError::OcrUnavailable { engine, detail }
            }
            OcrError::Failed(detail) => IngestError::OcrFailed { detail },
        }
    }
}

/// Failure reported by a [`crate::pipeline::pdf::PdfBackend`].
#[derive(Debug, Clone, Error)]
pub enum PdfError {
    #[error("PDF engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("corrupt or unsupported PDF: {0}")]
    Corrupt(String),

    #[error("page {page}: {detail}")]
    Render { page: usize, detail: String },
}

impl From<PdfError> for IngestError {
    fn from(e: PdfError) -> Self {
        match e {
            PdfError::EngineUnavailable(detail) => IngestError::PdfEngineUnavailable { detail },
            PdfError::Corrupt(detail) => IngestError::PdfParse { detail },
            PdfError::Render { page, detail } => IngestError::PdfRender { page, detail },
        }
    }
}

/// Failure of the grounded-answer model call.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The provider call itself failed.
    #[error("No valid response from the model: {detail}\nTry rephrasing the question.")]
    Transport { detail: String },

    /// The reply was not the expected `{answer, citations}` JSON.
    #[error("The model returned a malformed answer: {detail}\nTry rephrasing the question.")]
    MalformedResponse { detail: String },
}

/// Failure reading or writing the persisted state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access state directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialise '{key}': {source}")]
    Serialise {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// All errors returned by [`crate::notebook::Notebook`] operations.
#[derive(Debug, Error)]
pub enum NotebookError {
    // ── Preconditions ─────────────────────────────────────────────────────
    #[error("Title must not be empty.")]
    EmptyTitle,

    #[error("Content must not be empty.")]
    EmptyContent,

    /// Only text content may be stored as a source.
    #[error("Source content must be text, got '{mime_type}'.")]
    NonTextContent { mime_type: String },

    #[error("Question must not be empty.")]
    EmptyQuestion,

    #[error("Cannot query without sources. Add at least one source first.")]
    NoSources,

    // ── Lookups ───────────────────────────────────────────────────────────
    #[error("No source with id '{0}'.")]
    SourceNotFound(String),

    #[error("No message with id '{0}'.")]
    MessageNotFound(String),

    #[error("No note with id '{0}'.")]
    NoteNotFound(String),

    #[error("Only model answers can be pinned (message '{0}' is a question).")]
    NotPinnable(String),

    // ── Wrapped ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl NotebookError {
    /// The short, user-facing diagnostic for this error.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }

    /// `true` for failures of the model call, which leave the question in
    /// the log so it can be asked again.
    pub fn is_model_failure(&self) -> bool {
        matches!(self, NotebookError::Model(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_too_large_mentions_limit() {
        let e = IngestError::FileTooLarge {
            size: 11 * 1024 * 1024,
            limit_bytes: 10 * 1024 * 1024,
        };
        assert!(e.to_string().contains("10 MB"), "got: {e}");
    }

    #[test]
    fn small_limits_are_not_rounded_to_zero() {
        let e = IngestError::FileTooLarge {
            size: 2048,
            limit_bytes: 512 * 1024,
        };
        assert!(e.to_string().contains("512.0 KB"), "got: {e}");
        assert_eq!(human_size(100), "100 bytes");
        assert_eq!(human_size(1536 * 1024), "1.5 MB");
    }

    #[test]
    fn ocr_unavailable_maps_to_ingest_variant() {
        let e: IngestError = OcrError::Unavailable {
            engine: "tesseract".into(),
            detail: "not on PATH".into(),
        }
        .into();
        assert!(matches!(e, IngestError::OcrUnavailable { .. }));
        assert!(e.to_string().contains("tesseract"));
    }

    #[test]
    fn corrupt_pdf_maps_to_parse_failure() {
        let e: IngestError = PdfError::Corrupt("bad xref".into()).into();
        assert!(e.to_string().starts_with("PDF parse failed"));
    }

    #[test]
    fn wrapped_errors_keep_their_message() {
        let e: NotebookError = ModelError::MalformedResponse {
            detail: "missing field `answer`".into(),
        }
        .into();
        assert!(e.is_model_failure());
        assert!(e.diagnostic().contains("missing field"));
        assert!(!NotebookError::NoSources.is_model_failure());
    }
}
