//! OCR engines: turn a page or photo into text.
//!
//! The pipeline talks to OCR only through [`OcrEngine`]. A session is
//! `initialise` → one or more `recognize` calls → `terminate`, and the
//! pipeline always calls `terminate` once the session ends, success or not.
//!
//! Two engines ship:
//!
//! - [`TesseractOcr`] shells out to the `tesseract` CLI. Local, no network.
//! - [`VisionOcr`] asks a vision LLM to transcribe the image. Useful when
//!   tesseract is not installed or the scan is poor.

use crate::config::{NotebookConfig, OcrBackend};
use crate::error::OcrError;
use crate::pipeline::{encode, postprocess};
use crate::prompts;
use crate::provider;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use image::DynamicImage;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Progress sink for a single recognition, 0–100.
pub type OcrProgress<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// An OCR engine session.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short engine name for diagnostics.
    fn name(&self) -> &str;

    /// Prepare the engine for `language`. Errors here mean the engine is
    /// unavailable, not that recognition failed.
    async fn initialise(&self, language: &str) -> Result<(), OcrError> {
        let _ = language;
        Ok(())
    }

    /// Recognise the text in one image.
    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: OcrProgress<'_>,
    ) -> Result<String, OcrError>;

    /// Release engine resources. Called once per session.
    async fn terminate(&self) {}
}

/// Build the engine selected by `config.ocr_backend`.
pub fn build_ocr_engine(config: &NotebookConfig) -> Arc<dyn OcrEngine> {
    match config.ocr_backend {
        OcrBackend::Tesseract => Arc::new(TesseractOcr::new(config.tesseract_path.clone())),
        OcrBackend::Vision => Arc::new(VisionOcr::new(config.clone())),
    }
}

// ── Tesseract ────────────────────────────────────────────────────────────────

/// The `tesseract` command-line engine.
///
/// Progress is coarse: 0 when the process starts, 100 when it exits.
pub struct TesseractOcr {
    binary: PathBuf,
}

impl TesseractOcr {
    /// `binary` defaults to `tesseract` on `PATH`.
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| PathBuf::from("tesseract")),
        }
    }

    fn unavailable(&self, detail: impl Into<String>) -> OcrError {
        OcrError::Unavailable {
            engine: "tesseract".to_string(),
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn initialise(&self, language: &str) -> Result<(), OcrError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                self.unavailable(format!(
                    "{} ({}). Install with: apt install tesseract-ocr",
                    e,
                    self.binary.display()
                ))
            })?;
        if !output.status.success() {
            return Err(self.unavailable(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        debug!("tesseract ready for language '{}'", language);
        Ok(())
    }

    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: OcrProgress<'_>,
    ) -> Result<String, OcrError> {
        progress(0);

        let png = encode::png_bytes(image).map_err(|e| OcrError::Failed(e.to_string()))?;
        let mut tmp = tempfile::Builder::new()
            .prefix("notebook-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Failed(format!("tempfile: {e}")))?;
        tmp.write_all(&png)
            .map_err(|e| OcrError::Failed(format!("tempfile write: {e}")))?;

        let output = Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .output()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(format!("tesseract: {}", stderr.trim())));
        }

        progress(100);
        let text = String::from_utf8_lossy(&output.stdout);
        debug!("tesseract recognised {} chars", text.len());
        Ok(postprocess::clean_ocr_text(&text))
    }
}

// ── Vision LLM ───────────────────────────────────────────────────────────────

/// A vision LLM used as a transcriber.
///
/// The provider is resolved on `initialise` and reused for the session.
pub struct VisionOcr {
    config: NotebookConfig,
    provider: OnceCell<Arc<dyn LLMProvider>>,
}

impl VisionOcr {
    pub fn new(config: NotebookConfig) -> Self {
        Self {
            config,
            provider: OnceCell::new(),
        }
    }

    async fn provider(&self) -> Result<&Arc<dyn LLMProvider>, OcrError> {
        self.provider
            .get_or_try_init(|| async {
                provider::resolve_provider(&self.config).map_err(|e| OcrError::Unavailable {
                    engine: "vision".to_string(),
                    detail: e.to_string(),
                })
            })
            .await
    }
}

#[async_trait]
impl OcrEngine for VisionOcr {
    fn name(&self) -> &str {
        "vision"
    }

    async fn initialise(&self, _language: &str) -> Result<(), OcrError> {
        self.provider().await.map(|_| ())
    }

    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: OcrProgress<'_>,
    ) -> Result<String, OcrError> {
        let provider = self.provider().await?;
        progress(0);

        let image_data =
            encode::encode_image(image).map_err(|e| OcrError::Failed(e.to_string()))?;
        let messages = vec![
            ChatMessage::system(prompts::ocr_instruction(language)),
            ChatMessage::user_with_images("", vec![image_data]),
        ];
        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens: Some(self.config.max_tokens),
            ..Default::default()
        };

        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| OcrError::Failed(e.to_string()))?;

        progress(100);
        info!(
            "Vision OCR: {} output tokens, {} chars",
            response.completion_tokens,
            response.content.len()
        );
        Ok(postprocess::clean_ocr_text(&response.content))
    }
}
