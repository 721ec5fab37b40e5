//! Progress-callback trait for ingestion events.
//!
//! Inject an [`Arc<dyn IngestProgressCallback>`] via
//! [`crate::config::NotebookConfigBuilder::progress_callback`] to receive
//! stage messages and OCR progress while a file is being ingested. These
//! events are distinct from the final result: success or failure is always
//! the `Result` returned by the ingest call.
//!
//! # Example
//!
//! ```rust
//! use edgequake_notebook::{IngestProgressCallback, NotebookConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl IngestProgressCallback for PageCounter {
//!     fn on_pdf_ocr_page(&self, page_num: usize, total_pages: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("OCR page {page_num} of {total_pages}");
//!     }
//! }
//!
//! let config = NotebookConfig::builder()
//!     .progress_callback(Arc::new(PageCounter { pages: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::classify::FileKind;
use std::fmt;
use std::sync::Arc;

/// A stage the ingestion pipeline has entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    ParsingSpreadsheet,
    ParsingPdf,
    /// Pass 1 found too little text; switching to OCR.
    ScannedPdfDetected,
    ParsingWord,
    InitialisingOcr,
    DecodingText,
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            IngestStatus::ParsingSpreadsheet => "Parsing spreadsheet…",
            IngestStatus::ParsingPdf => "Parsing PDF…",
            IngestStatus::ScannedPdfDetected => "Image-based PDF detected. Trying OCR…",
            IngestStatus::ParsingWord => "Extracting Word document text…",
            IngestStatus::InitialisingOcr => "Initialising OCR engine…",
            IngestStatus::DecodingText => "Reading text…",
        };
        f.write_str(msg)
    }
}

/// Called by the ingestion pipeline as it works through a file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait IngestProgressCallback: Send + Sync {
    /// Called once after the file has been classified.
    fn on_ingest_start(&self, file_name: &str, kind: FileKind) {
        let _ = (file_name, kind);
    }

    /// Called when the pipeline enters a new stage.
    fn on_status(&self, status: IngestStatus) {
        let _ = status;
    }

    /// Image OCR progress, 0–100.
    fn on_image_ocr_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// Called just before a PDF page is sent to OCR.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages in the document
    fn on_pdf_ocr_page(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when ingestion produced text.
    fn on_ingest_complete(&self, file_name: &str, chars: usize) {
        let _ = (file_name, chars);
    }

    /// Called with the diagnostic when ingestion failed.
    fn on_ingest_error(&self, file_name: &str, error: String) {
        let _ = (file_name, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl IngestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::NotebookConfig`].
pub type ProgressCallback = Arc<dyn IngestProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        statuses: Mutex<Vec<IngestStatus>>,
        last_percent: AtomicUsize,
    }

    impl IngestProgressCallback for Recorder {
        fn on_status(&self, status: IngestStatus) {
            self.statuses.lock().unwrap().push(status);
        }

        fn on_image_ocr_progress(&self, percent: u8) {
            self.last_percent.store(percent as usize, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_ingest_start("a.pdf", FileKind::Pdf);
        cb.on_status(IngestStatus::ParsingPdf);
        cb.on_pdf_ocr_page(1, 3);
        cb.on_ingest_complete("a.pdf", 42);
        cb.on_ingest_error("a.pdf", "boom".to_string());
    }

    #[test]
    fn recorder_receives_events() {
        let rec = Recorder::default();
        rec.on_status(IngestStatus::InitialisingOcr);
        rec.on_image_ocr_progress(40);
        rec.on_image_ocr_progress(100);
        assert_eq!(*rec.statuses.lock().unwrap(), vec![IngestStatus::InitialisingOcr]);
        assert_eq!(rec.last_percent.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn status_messages_are_human_readable() {
        assert_eq!(
            IngestStatus::ScannedPdfDetected.to_string(),
            "Image-based PDF detected. Trying OCR…"
        );
    }
}
