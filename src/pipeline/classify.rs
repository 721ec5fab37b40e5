//! File classification: pick the ingestion branch for an upload.
//!
//! Rules are checked in a fixed order against the file name and the declared
//! MIME type. Spreadsheets are matched by extension only, PDFs and Word
//! documents by either, images by MIME type only. Whatever is left is decoded
//! as text, so there is no "unsupported" outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Extensions offered by upload pickers.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    "txt", "md", "csv", "jpeg", "jpg", "png", "webp", "xlsx", "xls", "pdf", "doc", "docx",
];

const WORD_MIME_TYPES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// The ingestion branch for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Spreadsheet,
    Pdf,
    Word,
    Image,
    PlainText,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::Spreadsheet => "spreadsheet",
            FileKind::Pdf => "PDF",
            FileKind::Word => "Word document",
            FileKind::Image => "image",
            FileKind::PlainText => "text",
        };
        f.write_str(name)
    }
}

/// Classify an upload by name and declared MIME type.
pub fn classify(file_name: &str, mime_type: &str) -> FileKind {
    let ext = extension(file_name);
    let mime = mime_type.trim().to_ascii_lowercase();

    if matches!(ext.as_deref(), Some("xlsx" | "xls")) {
        FileKind::Spreadsheet
    } else if mime == "application/pdf" || ext.as_deref() == Some("pdf") {
        FileKind::Pdf
    } else if WORD_MIME_TYPES.contains(&mime.as_str())
        || matches!(ext.as_deref(), Some("doc" | "docx"))
    {
        FileKind::Word
    } else if mime.starts_with("image/") {
        FileKind::Image
    } else {
        FileKind::PlainText
    }
}

/// `true` if the extension is one the upload picker advertises.
pub fn is_accepted(file_name: &str) -> bool {
    extension(file_name)
        .map(|e| ACCEPTED_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

fn extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spreadsheet_by_extension_only() {
        assert_eq!(classify("Budget.XLSX", ""), FileKind::Spreadsheet);
        assert_eq!(classify("old.xls", "application/octet-stream"), FileKind::Spreadsheet);
        assert_eq!(
            classify("data.bin", "application/vnd.ms-excel"),
            FileKind::PlainText
        );
    }

    #[test]
    fn pdf_by_mime_or_extension() {
        assert_eq!(classify("scan", "application/pdf"), FileKind::Pdf);
        assert_eq!(classify("paper.PDF", ""), FileKind::Pdf);
    }

    #[test]
    fn word_by_mime_or_extension() {
        assert_eq!(classify("memo.docx", ""), FileKind::Word);
        assert_eq!(classify("memo", "application/msword"), FileKind::Word);
    }

    #[test]
    fn image_by_mime_only() {
        assert_eq!(classify("photo.png", "image/png"), FileKind::Image);
        assert_eq!(classify("photo.png", ""), FileKind::PlainText);
    }

    #[test]
    fn spreadsheet_rule_wins_over_mime() {
        assert_eq!(classify("table.xlsx", "application/pdf"), FileKind::Spreadsheet);
    }

    #[test]
    fn everything_else_is_text() {
        assert_eq!(classify("notes.md", "text/markdown"), FileKind::PlainText);
        assert_eq!(classify("README", ""), FileKind::PlainText);
    }

    #[test]
    fn accepted_extensions() {
        assert!(is_accepted("a.webp"));
        assert!(is_accepted("A.Docx"));
        assert!(!is_accepted("a.exe"));
        assert!(!is_accepted("Makefile"));
    }
}
