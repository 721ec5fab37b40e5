//! Query orchestration: sources + question → one grounded model call.
//!
//! The whole source store is framed into the request on every question;
//! there is no retrieval step. The reply must be the `{answer, citations}`
//! JSON object, and every citation's `sourceId` is mapped back to a title
//! against the sources as they are when the answer is recorded.

use crate::config::NotebookConfig;
use crate::error::{ModelError, NotebookError};
use crate::pipeline::postprocess::strip_json_fences;
use crate::prompts;
use crate::provider::{AnswerModel, GroundedRequest, RequestPart};
use crate::types::{Citation, GroundedAnswer, RawCitation, Source};
use std::sync::Arc;
use tracing::{debug, info};

/// Builds grounded requests and interprets the replies.
pub struct QueryOrchestrator {
    model: Arc<dyn AnswerModel>,
    instruction: String,
}

impl QueryOrchestrator {
    pub fn new(model: Arc<dyn AnswerModel>, config: &NotebookConfig) -> Self {
        Self {
            model,
            instruction: prompts::grounding_instruction(
                config.system_prompt.as_deref(),
                &config.answer_language,
            ),
        }
    }

    /// Assemble the request for `question` over `sources`, in source order.
    pub fn build_request(&self, question: &str, sources: &[Source]) -> GroundedRequest {
        let mut parts = Vec::with_capacity(sources.len() + 1);
        for source in sources {
            if source.content.is_text() {
                parts.push(RequestPart::Text(prompts::text_source_block(
                    &source.id,
                    &source.title,
                    &source.content.data,
                )));
            } else if source.content.is_image() {
                parts.push(RequestPart::Text(prompts::image_source_header(
                    &source.id,
                    &source.title,
                )));
                parts.push(RequestPart::Image {
                    mime_type: source.content.mime_type.clone(),
                    data: source.content.data.clone(),
                });
                parts.push(RequestPart::Text(prompts::IMAGE_SOURCE_END.to_string()));
            } else {
                debug!(
                    "Source {} has unsupported content type '{}'; not sent",
                    source.id, source.content.mime_type
                );
            }
        }
        parts.push(RequestPart::Text(prompts::question_block(question)));

        GroundedRequest {
            instruction: self.instruction.clone(),
            parts,
            response_schema: prompts::response_schema(),
        }
    }

    /// Ask `question` over `sources`. Fails with `NoSources` before any
    /// model call when `sources` is empty.
    pub async fn query(
        &self,
        question: &str,
        sources: &[Source],
    ) -> Result<GroundedAnswer, NotebookError> {
        if sources.is_empty() {
            return Err(NotebookError::NoSources);
        }

        let request = self.build_request(question, sources);
        info!(
            "Querying model over {} sources ({} chars)",
            sources.len(),
            request.text().len()
        );
        let raw = self.model.generate(&request).await?;
        let answer = parse_answer(&raw)?;
        debug!("Model answered with {} citations", answer.citations.len());
        Ok(answer)
    }
}

/// Parse the model's JSON reply. Both `answer` and `citations` are required.
pub fn parse_answer(raw: &str) -> Result<GroundedAnswer, ModelError> {
    serde_json::from_str(strip_json_fences(raw)).map_err(|e| ModelError::MalformedResponse {
        detail: e.to_string(),
    })
}

/// Attach source titles to model citations, preserving order.
///
/// Ids not present in `sources` resolve to `placeholder`.
pub fn resolve_citations(
    citations: &[RawCitation],
    sources: &[Source],
    placeholder: &str,
) -> Vec<Citation> {
    citations
        .iter()
        .map(|c| Citation {
            source_id: c.source_id.clone(),
            source_title: sources
                .iter()
                .find(|s| s.id == c.source_id)
                .map(|s| s.title.clone())
                .unwrap_or_else(|| placeholder.to_string()),
            quote: c.quote.clone(),
        })
        .collect()
}
