//! Pipeline stages for turning an uploaded file into source text.
//!
//! Each submodule implements exactly one step or one file-kind branch, so
//! every branch can be tested on its own and the PDF and OCR engines can be
//! swapped behind their traits.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ classify ──┬─▶ spreadsheet (calamine → CSV)
//! (path)   (FileKind)  ├─▶ pdf ──▶ text layer ─(too thin)─▶ render ──▶ ocr
//!                      ├─▶ word (docx-rs)
//!                      ├─▶ image ──▶ ocr
//!                      └─▶ text (UTF-8 decode)
//! ```
//!
//! 1. [`input`]       — read a local file, size guard first
//! 2. [`classify`]    — pick the branch from file name + MIME type
//! 3. [`spreadsheet`] — one CSV block per sheet
//! 4. [`pdf`]         — text layer with OCR fallback; pdfium runs in
//!    `spawn_blocking`
//! 5. [`word`]        — paragraph and table text
//! 6. [`ocr`]         — tesseract or vision-LLM engines
//! 7. [`encode`]      — PNG / base64 encoding for the OCR engines
//! 8. [`postprocess`] — deterministic cleanup of OCR text and model replies
//! 9. [`text`]        — plain-text decoding

pub mod classify;
pub mod encode;
pub mod input;
pub mod ocr;
pub mod pdf;
pub mod postprocess;
pub mod spreadsheet;
pub mod text;
pub mod word;
