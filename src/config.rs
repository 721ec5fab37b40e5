//! Configuration for ingestion, querying, and local state.
//!
//! Every knob lives in [`NotebookConfig`], built via its
//! [`NotebookConfigBuilder`]. The builder clamps numeric inputs to sane
//! ranges and `build()` rejects combinations that cannot work.

use crate::error::NotebookError;
use crate::progress::IngestProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Upload size limit: 10 MiB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Non-whitespace characters a PDF page must exceed to count as having a
/// usable text layer; also the minimum document-wide per-page average.
pub const DEFAULT_MEANINGFUL_TEXT_THRESHOLD: usize = 50;

/// Page rasterisation scale used before OCR.
pub const DEFAULT_OCR_RENDER_SCALE: f32 = 2.0;

pub const DEFAULT_UNKNOWN_SOURCE_TITLE: &str = "Unknown source";

/// Configuration for a [`crate::notebook::Notebook`].
///
/// # Example
/// ```rust
/// use edgequake_notebook::NotebookConfig;
///
/// let config = NotebookConfig::builder()
///     .answer_language("Vietnamese")
///     .meaningful_text_threshold(80)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_file_bytes, 10 * 1024 * 1024);
/// ```
#[derive(Clone)]
pub struct NotebookConfig {
    /// Directory holding the persisted collections. If None, uses
    /// `<data_dir>/edgequake-notebook`.
    pub state_dir: Option<PathBuf>,

    /// Maximum accepted upload size in bytes. Default: 10 MiB.
    pub max_file_bytes: u64,

    /// Meaningful-text threshold for the PDF OCR decision. Default: 50.
    pub meaningful_text_threshold: usize,

    /// Scale factor for rendering PDF pages before OCR. Range 1.0–4.0. Default: 2.0.
    pub ocr_render_scale: f32,

    /// Language hint passed to the OCR engine. Default: "eng".
    pub ocr_language: String,

    /// Which OCR engine handles scanned PDFs and images. Default: Tesseract.
    pub ocr_backend: OcrBackend,

    /// Explicit path to the `tesseract` executable. If None, uses `PATH`.
    pub tesseract_path: Option<PathBuf>,

    /// Explicit path to the pdfium shared library. If None, checks
    /// `PDFIUM_LIB_PATH`, the working directory, then the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// Language the model must answer in. Default: "English".
    pub answer_language: String,

    /// Title given to citations whose source no longer exists.
    pub unknown_source_title: String,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the grounded answer. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per answer. Default: 4096.
    pub max_tokens: usize,

    /// Custom grounding instruction. If None, uses the built-in one.
    pub system_prompt: Option<String>,

    /// Receives ingestion status and OCR progress events.
    pub progress_callback: Option<Arc<dyn IngestProgressCallback>>,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            state_dir: None,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            meaningful_text_threshold: DEFAULT_MEANINGFUL_TEXT_THRESHOLD,
            ocr_render_scale: DEFAULT_OCR_RENDER_SCALE,
            ocr_language: "eng".to_string(),
            ocr_backend: OcrBackend::default(),
            tesseract_path: None,
            pdfium_library_path: None,
            answer_language: "English".to_string(),
            unknown_source_title: DEFAULT_UNKNOWN_SOURCE_TITLE.to_string(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for NotebookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotebookConfig")
            .field("state_dir", &self.state_dir)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("meaningful_text_threshold", &self.meaningful_text_threshold)
            .field("ocr_render_scale", &self.ocr_render_scale)
            .field("ocr_language", &self.ocr_language)
            .field("ocr_backend", &self.ocr_backend)
            .field("answer_language", &self.answer_language)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn IngestProgressCallback>"),
            )
            .finish()
    }
}

impl NotebookConfig {
    pub fn builder() -> NotebookConfigBuilder {
        NotebookConfigBuilder {
            config: Self::default(),
        }
    }

    /// The state directory, falling back to the platform data directory.
    pub fn resolved_state_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.state_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .unwrap_or_else(std::env::temp_dir)
            .join("edgequake-notebook")
    }

    pub fn max_file_mb(&self) -> u64 {
        self.max_file_bytes / (1024 * 1024)
    }
}

/// Builder for [`NotebookConfig`].
#[derive(Debug)]
pub struct NotebookConfigBuilder {
    config: NotebookConfig,
}

impl NotebookConfigBuilder {
    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.state_dir = Some(dir.into());
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn meaningful_text_threshold(mut self, chars: usize) -> Self {
        self.config.meaningful_text_threshold = chars;
        self
    }

    pub fn ocr_render_scale(mut self, scale: f32) -> Self {
        self.config.ocr_render_scale = scale.clamp(1.0, 4.0);
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn ocr_backend(mut self, backend: OcrBackend) -> Self {
        self.config.ocr_backend = backend;
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = Some(path.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn answer_language(mut self, lang: impl Into<String>) -> Self {
        self.config.answer_language = lang.into();
        self
    }

    pub fn unknown_source_title(mut self, title: impl Into<String>) -> Self {
        self.config.unknown_source_title = title.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn IngestProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<NotebookConfig, NotebookError> {
        let c = &self.config;
        if c.max_file_bytes == 0 {
            return Err(NotebookError::InvalidConfig(
                "max_file_bytes must be > 0".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(NotebookError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.answer_language.trim().is_empty() {
            return Err(NotebookError::InvalidConfig(
                "answer language must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(NotebookError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

/// OCR engine used for scanned PDFs and images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OcrBackend {
    /// The `tesseract` command-line engine. (default)
    #[default]
    Tesseract,
    /// A vision LLM transcribes the page image.
    Vision,
}
