//! # edgequake-notebook
//!
//! A source-grounded notebook: collect documents, ask questions, and get
//! answers that cite the passages they came from.
//!
//! ## Why this crate?
//!
//! Generic chat models answer from whatever they happen to know. Here every
//! question is sent together with the full text of the notebook's sources and
//! an instruction to answer only from them, and the model must reply with a
//! structured `{answer, citations}` object. Each citation names a source id
//! and quotes it, so every claim can be traced back.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Input     read local file, 10 MiB guard
//!  ├─ 2. Classify  spreadsheet / PDF / Word / image / text
//!  ├─ 3. Extract   calamine · pdfium text layer · docx-rs · UTF-8
//!  │               └─ scanned PDF or image → render → OCR (tesseract or VLM)
//!  ├─ 4. Store     Source appended, collection persisted as JSON
//!  └─ 5. Ask       all sources + question → grounded JSON → cited answer
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_notebook::{Notebook, NotebookConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let mut notebook = Notebook::open(NotebookConfig::default())?;
//!     notebook.ingest_path(Path::new("handbook.pdf"), None, None).await?;
//!
//!     let answer = notebook.ask("How many days of leave do I get?").await?;
//!     println!("{}", answer.text);
//!     for c in answer.citations.unwrap_or_default() {
//!         println!("  [{}] \"{}\"", c.source_title, c.quote);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `notebook` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-notebook = { version = "0.1", default-features = false }
//! ```
//!
//! ## External engines
//!
//! | Concern | Engine | Override |
//! |---------|--------|----------|
//! | PDF text + rendering | pdfium shared library | `PDFIUM_LIB_PATH` / `pdfium_library_path` |
//! | OCR (default) | `tesseract` executable | `tesseract_path` |
//! | OCR (alternative) | vision LLM via edgequake-llm | `ocr_backend(OcrBackend::Vision)` |
//! | Answers | edgequake-llm provider | `EDGEQUAKE_LLM_PROVIDER`, `EDGEQUAKE_MODEL` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod ingest;
pub mod notebook;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod query;
pub mod store;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{NotebookConfig, NotebookConfigBuilder, OcrBackend};
pub use error::{IngestError, ModelError, NotebookError, OcrError, PdfError, StorageError};
pub use ingest::{IngestedFile, Ingestor};
pub use notebook::Notebook;
pub use pipeline::classify::{is_accepted, FileKind, ACCEPTED_EXTENSIONS};
pub use pipeline::ocr::{OcrEngine, TesseractOcr, VisionOcr};
pub use pipeline::pdf::{PdfBackend, PdfiumBackend};
pub use progress::{IngestProgressCallback, IngestStatus, NoopProgressCallback, ProgressCallback};
pub use provider::{AnswerModel, GroundedRequest, LlmAnswerModel, RequestPart};
pub use query::QueryOrchestrator;
pub use store::{FileStorage, MemoryStorage, StateStorage};
pub use types::{
    ChatMessage, Citation, GroundedAnswer, Note, RawCitation, Role, Source, SourceContent,
};
