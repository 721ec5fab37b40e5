//! The grounded-answer model seam and its edgequake-llm implementation.
//!
//! [`AnswerModel`] is the only way the query layer reaches a model, so tests
//! substitute a scripted fake and production uses [`LlmAnswerModel`].

use crate::config::NotebookConfig;
use crate::error::ModelError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// One piece of the grounded request body, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPart {
    Text(String),
    /// Inline base64 image.
    Image { mime_type: String, data: String },
}

/// A fully assembled grounded-answer request.
#[derive(Debug, Clone)]
pub struct GroundedRequest {
    /// Grounding instruction (answer language already substituted).
    pub instruction: String,
    /// Source blocks followed by the question block.
    pub parts: Vec<RequestPart>,
    /// JSON schema the reply must satisfy.
    pub response_schema: Value,
}

impl GroundedRequest {
    /// Concatenation of all text parts, in order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                RequestPart::Text(t) => Some(t.as_str()),
                RequestPart::Image { .. } => None,
            })
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, RequestPart::Image { .. }))
            .count()
    }
}

/// Generates the raw JSON reply for a grounded request.
///
/// Implementations make exactly one call per `generate` and do not retry.
#[async_trait]
pub trait AnswerModel: Send + Sync {
    async fn generate(&self, request: &GroundedRequest) -> Result<String, ModelError>;
}

/// [`AnswerModel`] backed by an edgequake-llm provider.
///
/// The provider is resolved on each call, so a notebook can be opened and
/// sources managed without any API key configured.
pub struct LlmAnswerModel {
    config: NotebookConfig,
}

impl LlmAnswerModel {
    pub fn new(config: NotebookConfig) -> Self {
        Self { config }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
            response_format: Some("json_object".to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AnswerModel for LlmAnswerModel {
    async fn generate(&self, request: &GroundedRequest) -> Result<String, ModelError> {
        let provider = resolve_provider(&self.config)?;
        let start = Instant::now();

        let system = format!(
            "{}\n\nReply with a single JSON object matching this schema:\n{}",
            request.instruction,
            serde_json::to_string_pretty(&request.response_schema).unwrap_or_default()
        );
        let images: Vec<ImageData> = request
            .parts
            .iter()
            .filter_map(|p| match p {
                RequestPart::Image { mime_type, data } => {
                    Some(ImageData::new(data.clone(), mime_type.clone()))
                }
                RequestPart::Text(_) => None,
            })
            .collect();

        let messages = vec![
            ChatMessage::system(system),
            ChatMessage::user_with_images(request.text(), images),
        ];

        let response = provider
            .chat(&messages, Some(&self.options()))
            .await
            .map_err(|e| ModelError::Transport {
                detail: e.to_string(),
            })?;

        info!(
            "Grounded answer: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

/// Default model for a named provider.
pub fn default_model_for(provider_name: &str) -> &'static str {
    match provider_name {
        "gemini" => "gemini-2.5-flash",
        _ => "gpt-4.1-nano",
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ModelError> {
    debug!("Creating provider {} / {}", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ModelError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    both non-empty.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &NotebookConfig) -> Result<Arc<dyn LLMProvider>, ModelError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .as_deref()
            .unwrap_or_else(|| default_model_for(name));
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ModelError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GroundedRequest {
        GroundedRequest {
            instruction: "be grounded".into(),
            parts: vec![
                RequestPart::Text("A".into()),
                RequestPart::Image {
                    mime_type: "image/png".into(),
                    data: "AAAA".into(),
                },
                RequestPart::Text("B".into()),
            ],
            response_schema: crate::prompts::response_schema(),
        }
    }

    #[test]
    fn text_skips_images() {
        let r = request();
        assert_eq!(r.text(), "AB");
        assert_eq!(r.image_count(), 1);
    }

    #[test]
    fn default_models() {
        assert_eq!(default_model_for("gemini"), "gemini-2.5-flash");
        assert_eq!(default_model_for("openai"), "gpt-4.1-nano");
    }

    #[test]
    fn options_follow_config() {
        let config = NotebookConfig::builder()
            .temperature(0.3)
            .max_tokens(1024)
            .build()
            .unwrap();
        let opts = LlmAnswerModel::new(config).options();
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(1024));
        assert_eq!(opts.response_format.as_deref(), Some("json_object"));
    }
}
