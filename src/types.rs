//! Persisted data model: sources, chat messages, citations, notes.
//!
//! Field names serialise in camelCase so state written by this crate has the
//! same shape as the browser notebook's local storage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalised payload of a source.
///
/// After ingestion `mime_type` is always a `text/*` type. An `image/*`
/// payload (base64 `data`) only ever exists transiently and is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContent {
    pub mime_type: String,
    pub data: String,
}

impl SourceContent {
    /// Plain-text content, the output of every ingestion branch.
    pub fn text(data: impl Into<String>) -> Self {
        Self {
            mime_type: "text/plain".to_string(),
            data: data.into(),
        }
    }

    pub fn is_text(&self) -> bool {
        self.mime_type.starts_with("text/")
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// One unit of grounding material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub content: SourceContent,
}

impl Source {
    pub fn new(title: impl Into<String>, content: SourceContent, file_name: Option<String>) -> Self {
        Self {
            id: new_id("source"),
            title: title.into(),
            file_name,
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A quoted span tying part of an answer to a source.
///
/// `source_title` is a snapshot taken when the answer was recorded, not a
/// live reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub source_id: String,
    pub source_title: String,
    pub quote: String,
}

/// A citation as returned by the model, before title resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCitation {
    pub source_id: String,
    pub quote: String,
}

/// The parsed `{answer, citations}` reply of one grounded query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundedAnswer {
    pub answer: String,
    pub citations: Vec<RawCitation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: new_id("msg"),
            role: Role::User,
            text: text.into(),
            citations: None,
        }
    }

    pub fn model(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            id: new_id("msg"),
            role: Role::Model,
            text: text.into(),
            citations: Some(citations),
        }
    }

    pub fn is_model(&self) -> bool {
        self.role == Role::Model
    }
}

/// A pinned copy of a model answer, independent of the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub content: String,
    pub source_message_id: String,
}

impl Note {
    pub fn from_message(message: &ChatMessage) -> Self {
        Self {
            id: new_id("note"),
            content: message.text.clone(),
            source_message_id: message.id.clone(),
        }
    }
}

fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}
