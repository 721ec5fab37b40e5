//! Prompts and request fragments for the grounded-answer and OCR calls.
//!
//! Every prompt lives here so wording changes touch one file and tests can
//! inspect the exact text without a live model. Callers can override the
//! grounding instruction via [`crate::config::NotebookConfig::system_prompt`];
//! the `{language}` placeholder is substituted in either case.

use serde_json::{json, Value};

/// Grounding instruction sent ahead of the sources.
///
/// `{language}` is replaced with the configured answer language.
pub const DEFAULT_GROUNDING_PROMPT: &str = r#"You are an expert research assistant. Your task is to answer the user's question *only* from the information provided in the sources below.

1. Analyse the following sources carefully. Each source has a unique ID, a TITLE and CONTENT. Content may be text or an image.
2. Synthesise an answer to the user's question.
3. For every piece of information in your answer you MUST provide a direct quote from the source that supports it. For image sources, describe the visual element that supports your answer as the "quote".
4. If the sources do not contain the information needed to answer the question, say so explicitly and do not provide any information that is not in the sources.
5. Format your reply according to the provided JSON schema. Output ONLY the JSON object.
6. IMPORTANT: You MUST answer in {language}.

Here are the sources:"#;

/// Instruction for the vision OCR engine.
///
/// `{language}` is replaced with the configured OCR language hint.
pub const OCR_TRANSCRIBE_PROMPT: &str = r#"You are a precise OCR engine. Transcribe ALL text visible in this image exactly as written.

Rules:
- Preserve the reading order a human would use
- Keep line breaks between lines and blank lines between paragraphs
- Do NOT translate, summarise, correct, or comment
- Do NOT wrap the output in code fences
- If the image contains no text, output nothing
- Expected language (Tesseract code): {language}"#;

/// Build the grounding instruction, substituting the answer language.
pub fn grounding_instruction(custom: Option<&str>, language: &str) -> String {
    custom
        .unwrap_or(DEFAULT_GROUNDING_PROMPT)
        .replace("{language}", language)
}

/// Build the OCR instruction, substituting the language hint.
pub fn ocr_instruction(language: &str) -> String {
    OCR_TRANSCRIBE_PROMPT.replace("{language}", language)
}

/// The JSON shape the model must reply with.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "answer": {
                "type": "string",
                "description": "The detailed answer to the user's question, synthesised from the provided sources."
            },
            "citations": {
                "type": "array",
                "description": "A list of direct quotes from the sources that support the answer.",
                "items": {
                    "type": "object",
                    "properties": {
                        "sourceId": {
                            "type": "string",
                            "description": "The unique ID of the source document being cited."
                        },
                        "quote": {
                            "type": "string",
                            "description": "The exact quote from the source that was used to formulate the answer. For image sources, a description of the relevant visual elements."
                        }
                    },
                    "required": ["sourceId", "quote"]
                }
            }
        },
        "required": ["answer", "citations"]
    })
}

/// Framing block for a text source.
pub fn text_source_block(id: &str, title: &str, content: &str) -> String {
    format!("\n\n--- SOURCE START ---\nID: {id}\nTITLE: {title}\nCONTENT:\n{content}\n--- SOURCE END ---")
}

/// Header preceding an inline image source. Closed by [`IMAGE_SOURCE_END`].
pub fn image_source_header(id: &str, title: &str) -> String {
    format!(
        "\n\n--- SOURCE START ---\nID: {id}\nTITLE: {title}\nCONTENT:\n[The content of this source is the following image]"
    )
}

pub const IMAGE_SOURCE_END: &str = "\n--- SOURCE END ---";

/// Trailing block carrying the user's question.
pub fn question_block(question: &str) -> String {
    format!("\n\nUser question: \"{question}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grounding_instruction_substitutes_language() {
        let s = grounding_instruction(None, "Vietnamese");
        assert!(s.contains("You MUST answer in Vietnamese."));
        assert!(!s.contains("{language}"));
    }

    #[test]
    fn custom_instruction_also_substitutes() {
        let s = grounding_instruction(Some("Reply in {language} only."), "French");
        assert_eq!(s, "Reply in French only.");
    }

    #[test]
    fn schema_requires_answer_and_citations() {
        let schema = response_schema();
        assert_eq!(schema["required"], json!(["answer", "citations"]));
        assert_eq!(
            schema["properties"]["citations"]["items"]["required"],
            json!(["sourceId", "quote"])
        );
    }

    #[test]
    fn text_block_layout() {
        assert_eq!(
            text_source_block("source-1", "Notes", "hello"),
            "\n\n--- SOURCE START ---\nID: source-1\nTITLE: Notes\nCONTENT:\nhello\n--- SOURCE END ---"
        );
    }

    #[test]
    fn ocr_instruction_mentions_language() {
        assert!(ocr_instruction("vie").contains("vie"));
    }
}
