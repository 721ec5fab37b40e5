//! Ingestion entry points: one uploaded file → one text [`SourceContent`].
//!
//! [`Ingestor`] owns the two external collaborators (OCR engine and PDF
//! backend) and dispatches each file to its pipeline branch. It never
//! touches the notebook's stores; a failure leaves no trace beyond the
//! returned [`IngestError`] and the `on_ingest_error` progress event.

use crate::config::NotebookConfig;
use crate::error::IngestError;
use crate::pipeline::classify::{classify, FileKind};
use crate::pipeline::ocr::{build_ocr_engine, OcrEngine};
use crate::pipeline::pdf::{extract_pdf_text, PdfBackend, PdfiumBackend};
use crate::pipeline::{input, spreadsheet, text, word};
use crate::progress::{IngestProgressCallback, IngestStatus, NoopProgressCallback};
use crate::types::SourceContent;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The result of ingesting one file.
#[derive(Debug, Clone)]
pub struct IngestedFile {
    pub file_name: String,
    pub kind: FileKind,
    pub content: SourceContent,
}

/// Runs the ingestion pipeline.
pub struct Ingestor {
    config: NotebookConfig,
    ocr: Arc<dyn OcrEngine>,
    pdf: Arc<dyn PdfBackend>,
}

impl Ingestor {
    /// Build with the engines selected by `config`.
    pub fn new(config: NotebookConfig) -> Self {
        let ocr = build_ocr_engine(&config);
        let pdf = Arc::new(PdfiumBackend::new(config.pdfium_library_path.clone()));
        Self { config, ocr, pdf }
    }

    /// Build with explicit engines (tests, custom backends).
    pub fn with_engines(
        config: NotebookConfig,
        ocr: Arc<dyn OcrEngine>,
        pdf: Arc<dyn PdfBackend>,
    ) -> Self {
        Self { config, ocr, pdf }
    }

    pub fn config(&self) -> &NotebookConfig {
        &self.config
    }

    /// Read `path` and ingest it. The size guard runs before the read.
    pub async fn ingest_path(
        &self,
        path: &Path,
        progress: Option<&dyn IngestProgressCallback>,
    ) -> Result<IngestedFile, IngestError> {
        let upload = match input::read_upload(path, self.config.max_file_bytes).await {
            Ok(u) => u,
            Err(e) => {
                let name = path.display().to_string();
                self.progress(progress).on_ingest_error(&name, e.to_string());
                return Err(e);
            }
        };
        self.ingest(upload.bytes, &upload.mime_type, &upload.file_name, progress)
            .await
    }

    /// Ingest an in-memory file.
    ///
    /// `progress` overrides the callback configured on [`NotebookConfig`].
    pub async fn ingest(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        file_name: &str,
        progress: Option<&dyn IngestProgressCallback>,
    ) -> Result<IngestedFile, IngestError> {
        let cb = self.progress(progress);
        let start = Instant::now();

        let result = self.dispatch(bytes, mime_type, file_name, cb).await;
        match &result {
            Ok(file) => {
                info!(
                    "Ingested '{}' as {}: {} chars in {:?}",
                    file_name,
                    file.kind,
                    file.content.data.chars().count(),
                    start.elapsed()
                );
                cb.on_ingest_complete(file_name, file.content.data.chars().count());
            }
            Err(e) => {
                warn!("Ingestion of '{}' failed: {}", file_name, e);
                cb.on_ingest_error(file_name, e.to_string());
            }
        }
        result
    }

    fn progress<'a>(
        &'a self,
        explicit: Option<&'a dyn IngestProgressCallback>,
    ) -> &'a dyn IngestProgressCallback {
        if let Some(cb) = explicit {
            return cb;
        }
        match self.config.progress_callback.as_deref() {
            Some(cb) => cb,
            None => &NoopProgressCallback,
        }
    }

    async fn dispatch(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        file_name: &str,
        cb: &dyn IngestProgressCallback,
    ) -> Result<IngestedFile, IngestError> {
        input::check_size(bytes.len() as u64, self.config.max_file_bytes)?;

        let kind = classify(file_name, mime_type);
        debug!("Classified '{}' (mime '{}') as {}", file_name, mime_type, kind);
        cb.on_ingest_start(file_name, kind);

        let data = match kind {
            FileKind::Spreadsheet => {
                cb.on_status(IngestStatus::ParsingSpreadsheet);
                spreadsheet::flatten_workbook(&bytes)?
            }
            FileKind::Pdf => {
                extract_pdf_text(
                    Arc::from(bytes),
                    self.pdf.as_ref(),
                    self.ocr.as_ref(),
                    &self.config,
                    cb,
                )
                .await?
            }
            FileKind::Word => {
                cb.on_status(IngestStatus::ParsingWord);
                word::extract_word_text(&bytes)?
            }
            FileKind::Image => self.ocr_image(&bytes, cb).await?,
            FileKind::PlainText => {
                cb.on_status(IngestStatus::DecodingText);
                text::decode_text(&bytes)
            }
        };

        Ok(IngestedFile {
            file_name: file_name.to_string(),
            kind,
            content: SourceContent::text(data),
        })
    }

    async fn ocr_image(
        &self,
        bytes: &[u8],
        cb: &dyn IngestProgressCallback,
    ) -> Result<String, IngestError> {
        let image = image::load_from_memory(bytes).map_err(|e| IngestError::ImageDecode {
            detail: e.to_string(),
        })?;
        debug!("Decoded image {}x{}", image.width(), image.height());

        cb.on_status(IngestStatus::InitialisingOcr);
        let language = &self.config.ocr_language;
        let result = async {
            self.ocr.initialise(language).await?;
            self.ocr
                .recognize(&image, language, &|p: u8| cb.on_image_ocr_progress(p))
                .await
        }
        .await;
        self.ocr.terminate().await;

        Ok(result?.trim().to_string())
    }
}
