//! PDF text extraction with an OCR fallback.
//!
//! ## Two passes
//!
//! Pass 1 reads the embedded text layer page by page. That is fast and exact
//! for born-digital PDFs, but a scanned PDF has no text layer (or only a
//! page-number stamp), so Pass 1 alone would produce an empty or misleading
//! source.
//!
//! The decision after Pass 1 uses two numbers: whether *any* page has more
//! than `meaningful_text_threshold` non-whitespace characters, and the
//! document-wide average per page. If no page is meaningful, or the average
//! is below the threshold, Pass 1 is discarded and every page is rendered
//! and OCR'd (Pass 2). Pass 2 never runs speculatively.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is not safe to call
//! from async contexts. Each backend call moves onto tokio's blocking pool
//! so worker threads never stall on CPU-heavy rendering.

use crate::config::NotebookConfig;
use crate::error::{IngestError, PdfError};
use crate::pipeline::ocr::OcrEngine;
use crate::progress::{IngestProgressCallback, IngestStatus};
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Access to a PDF's text layer and page rasters.
#[async_trait]
pub trait PdfBackend: Send + Sync {
    /// Text of every page in order. `None` marks a page whose text could not
    /// be read; the document itself opened fine.
    async fn text_layer(&self, bytes: Arc<[u8]>) -> Result<Vec<Option<String>>, PdfError>;

    /// Rasterise one page (0-based) at `scale` × its natural size.
    async fn render_page(
        &self,
        bytes: Arc<[u8]>,
        index: usize,
        scale: f32,
    ) -> Result<DynamicImage, PdfError>;
}

/// [`PdfBackend`] backed by pdfium.
///
/// The library is located in this order: the explicit path, the
/// `PDFIUM_LIB_PATH` environment variable, the working directory, then the
/// system library search path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library_path: Option<PathBuf>,
}

impl PdfiumBackend {
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }
}

#[async_trait]
impl PdfBackend for PdfiumBackend {
    async fn text_layer(&self, bytes: Arc<[u8]>) -> Result<Vec<Option<String>>, PdfError> {
        let lib = self.library_path.clone();
        tokio::task::spawn_blocking(move || text_layer_blocking(lib.as_deref(), &bytes))
            .await
            .map_err(|e| PdfError::Corrupt(format!("text task panicked: {}", e)))?
    }

    async fn render_page(
        &self,
        bytes: Arc<[u8]>,
        index: usize,
        scale: f32,
    ) -> Result<DynamicImage, PdfError> {
        let lib = self.library_path.clone();
        tokio::task::spawn_blocking(move || {
            render_page_blocking(lib.as_deref(), &bytes, index, scale)
        })
        .await
        .map_err(|e| PdfError::Render {
            page: index + 1,
            detail: format!("render task panicked: {}", e),
        })?
    }
}

fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, PdfError> {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    if let Some(path) = configured {
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| PdfError::EngineUnavailable(format!("{}: {}", path.display(), e)));
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| PdfError::EngineUnavailable(e.to_string()))
}

fn text_layer_blocking(lib: Option<&Path>, bytes: &[u8]) -> Result<Vec<Option<String>>, PdfError> {
    let pdfium = bind_pdfium(lib)?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| PdfError::Corrupt(format!("{:?}", e)))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut out = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        match page.text() {
            Ok(text) => out.push(Some(text.all())),
            Err(e) => {
                debug!("Page {}: text layer unreadable: {:?}", idx + 1, e);
                out.push(None);
            }
        }
    }
    Ok(out)
}

fn render_page_blocking(
    lib: Option<&Path>,
    bytes: &[u8],
    index: usize,
    scale: f32,
) -> Result<DynamicImage, PdfError> {
    let pdfium = bind_pdfium(lib)?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| PdfError::Corrupt(format!("{:?}", e)))?;

    let render_err = |e: PdfiumError| PdfError::Render {
        page: index + 1,
        detail: format!("{:?}", e),
    };

    let page_index = u16::try_from(index).map_err(|_| PdfError::Render {
        page: index + 1,
        detail: "page index out of range".to_string(),
    })?;
    let page = document.pages().get(page_index).map_err(render_err)?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let image = page
        .render_with_config(&render_config)
        .map_err(render_err)?
        .as_image();

    debug!(
        "Rendered page {} → {}x{} px",
        index + 1,
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Number of non-whitespace characters in `text`.
pub fn meaningful_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Pass 1 summary used for the OCR decision.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayerStats {
    pub page_count: usize,
    pub meaningful_pages: usize,
    pub average_chars: f64,
}

impl TextLayerStats {
    pub fn compute(pages: &[Option<String>], threshold: usize) -> Self {
        let page_count = pages.len();
        let counts: Vec<usize> = pages
            .iter()
            .map(|p| p.as_deref().map(meaningful_chars).unwrap_or(0))
            .collect();
        let total: usize = counts.iter().sum();
        Self {
            page_count,
            meaningful_pages: counts.iter().filter(|&&c| c > threshold).count(),
            average_chars: if page_count == 0 {
                0.0
            } else {
                total as f64 / page_count as f64
            },
        }
    }

    /// `true` when the text layer is too thin to use.
    pub fn needs_ocr(&self, threshold: usize) -> bool {
        self.meaningful_pages == 0 || self.average_chars < threshold as f64
    }
}

/// Extract a PDF's text, falling back to OCR for scanned documents.
pub async fn extract_pdf_text(
    bytes: Arc<[u8]>,
    backend: &dyn PdfBackend,
    ocr: &dyn OcrEngine,
    config: &NotebookConfig,
    progress: &dyn IngestProgressCallback,
) -> Result<String, IngestError> {
    progress.on_status(IngestStatus::ParsingPdf);

    // ── Pass 1: text layer ───────────────────────────────────────────────
    let pages = backend.text_layer(Arc::clone(&bytes)).await?;
    let threshold = config.meaningful_text_threshold;
    let stats = TextLayerStats::compute(&pages, threshold);
    debug!(
        "Text layer: {} pages, {} meaningful, {:.1} avg chars",
        stats.page_count, stats.meaningful_pages, stats.average_chars
    );

    if !stats.needs_ocr(threshold) {
        let text: Vec<&str> = pages
            .iter()
            .enumerate()
            .filter_map(|(idx, p)| {
                if p.is_none() {
                    warn!("Skipping page {}: text could not be read", idx + 1);
                }
                p.as_deref()
            })
            .collect();
        return Ok(text.join("\n\n").trim().to_string());
    }

    // ── Pass 2: OCR ──────────────────────────────────────────────────────
    info!(
        "Image-based PDF detected ({} pages, {:.1} avg chars); running OCR",
        stats.page_count, stats.average_chars
    );
    progress.on_status(IngestStatus::ScannedPdfDetected);

    if stats.page_count == 0 {
        return Ok(String::new());
    }

    progress.on_status(IngestStatus::InitialisingOcr);
    let result = ocr_pages(bytes, stats.page_count, backend, ocr, config, progress).await;
    ocr.terminate().await;
    result
}

async fn ocr_pages(
    bytes: Arc<[u8]>,
    total: usize,
    backend: &dyn PdfBackend,
    ocr: &dyn OcrEngine,
    config: &NotebookConfig,
    progress: &dyn IngestProgressCallback,
) -> Result<String, IngestError> {
    ocr.initialise(&config.ocr_language).await?;

    let mut texts = Vec::with_capacity(total);
    for idx in 0..total {
        progress.on_pdf_ocr_page(idx + 1, total);
        let image = backend
            .render_page(Arc::clone(&bytes), idx, config.ocr_render_scale)
            .await?;
        let text = ocr
            .recognize(&image, &config.ocr_language, &|_: u8| {})
            .await?;
        debug!("OCR page {}/{}: {} chars", idx + 1, total, text.len());
        texts.push(text);
    }

    Ok(texts.join("\n\n").trim().to_string())
}
