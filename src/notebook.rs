//! The notebook: sources, chat log and pinned notes, plus the operations
//! that change them.
//!
//! [`Notebook`] is the explicit context object for a session. It loads the
//! three collections once when opened and rewrites a collection immediately
//! after every mutation, so the state directory always reflects the last
//! completed operation. All mutation goes through `&mut self`.

use crate::config::NotebookConfig;
use crate::error::NotebookError;
use crate::ingest::Ingestor;
use crate::progress::IngestProgressCallback;
use crate::provider::{AnswerModel, LlmAnswerModel};
use crate::query::{resolve_citations, QueryOrchestrator};
use crate::store::{
    load_collection, save_collection, FileStorage, StateStorage, MESSAGES_KEY, NOTES_KEY,
    SOURCES_KEY,
};
use crate::types::{ChatMessage, Note, Source, SourceContent};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Notebook {
    config: NotebookConfig,
    storage: Arc<dyn StateStorage>,
    ingestor: Ingestor,
    query: QueryOrchestrator,
    sources: Vec<Source>,
    messages: Vec<ChatMessage>,
    notes: Vec<Note>,
}

impl Notebook {
    /// Open the notebook in `config`'s state directory with the production
    /// engines (pdfium, the configured OCR engine, an edgequake-llm model).
    pub fn open(config: NotebookConfig) -> Result<Self, NotebookError> {
        let dir = config.resolved_state_dir();
        info!("Opening notebook at {}", dir.display());
        let storage = Arc::new(FileStorage::new(dir));
        let ingestor = Ingestor::new(config.clone());
        let model = Arc::new(LlmAnswerModel::new(config.clone()));
        Self::with_parts(config, storage, ingestor, model)
    }

    /// Assemble a notebook from explicit parts and load its state.
    pub fn with_parts(
        config: NotebookConfig,
        storage: Arc<dyn StateStorage>,
        ingestor: Ingestor,
        model: Arc<dyn AnswerModel>,
    ) -> Result<Self, NotebookError> {
        let sources = load_collection(storage.as_ref(), SOURCES_KEY)?;
        let messages = load_collection(storage.as_ref(), MESSAGES_KEY)?;
        let notes = load_collection(storage.as_ref(), NOTES_KEY)?;
        let query = QueryOrchestrator::new(model, &config);

        let nb = Self {
            config,
            storage,
            ingestor,
            query,
            sources,
            messages,
            notes,
        };
        debug!(
            "Loaded {} sources, {} messages, {} notes",
            nb.sources.len(),
            nb.messages.len(),
            nb.notes.len()
        );
        Ok(nb)
    }

    pub fn config(&self) -> &NotebookConfig {
        &self.config
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Pinned notes, newest first.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    // ── Sources ──────────────────────────────────────────────────────────

    /// Append a source. Title and content must be non-blank and the content
    /// must be text.
    pub fn add_source(
        &mut self,
        title: &str,
        content: SourceContent,
        file_name: Option<String>,
    ) -> Result<Source, NotebookError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(NotebookError::EmptyTitle);
        }
        if !content.is_text() {
            return Err(NotebookError::NonTextContent {
                mime_type: content.mime_type,
            });
        }
        if content.data.trim().is_empty() {
            return Err(NotebookError::EmptyContent);
        }

        let source = Source::new(title, content, file_name);
        info!("Added source {} '{}'", source.id, source.title);
        self.sources.push(source.clone());
        self.save_sources()?;
        Ok(source)
    }

    /// Ingest an in-memory file and add it as a source.
    ///
    /// The title defaults to the file name.
    pub async fn ingest_file(
        &mut self,
        bytes: Vec<u8>,
        mime_type: &str,
        file_name: &str,
        title: Option<&str>,
        progress: Option<&dyn IngestProgressCallback>,
    ) -> Result<Source, NotebookError> {
        let file = self
            .ingestor
            .ingest(bytes, mime_type, file_name, progress)
            .await?;
        self.add_source(title.unwrap_or(&file.file_name), file.content, Some(file.file_name.clone()))
    }

    /// Read a local file, ingest it and add it as a source.
    pub async fn ingest_path(
        &mut self,
        path: &Path,
        title: Option<&str>,
        progress: Option<&dyn IngestProgressCallback>,
    ) -> Result<Source, NotebookError> {
        let file = self.ingestor.ingest_path(path, progress).await?;
        self.add_source(title.unwrap_or(&file.file_name), file.content, Some(file.file_name.clone()))
    }

    /// Remove a source. Citations already recorded keep their title.
    pub fn delete_source(&mut self, id: &str) -> Result<Source, NotebookError> {
        let idx = self
            .sources
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| NotebookError::SourceNotFound(id.to_string()))?;
        let removed = self.sources.remove(idx);
        info!("Deleted source {} '{}'", removed.id, removed.title);
        self.save_sources()?;
        Ok(removed)
    }

    // ── Chat ─────────────────────────────────────────────────────────────

    /// Ask a question over all current sources.
    ///
    /// The question is recorded before the model is called and stays in the
    /// log if the call fails. On success the model's answer is appended with
    /// its citations resolved against the current sources.
    pub async fn ask(&mut self, question: &str) -> Result<ChatMessage, NotebookError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(NotebookError::EmptyQuestion);
        }

        self.messages.push(ChatMessage::user(question));
        self.save_messages()?;

        let answer = self.query.query(question, &self.sources).await?;
        let citations = resolve_citations(
            &answer.citations,
            &self.sources,
            &self.config.unknown_source_title,
        );
        let message = ChatMessage::model(answer.answer, citations);
        self.messages.push(message.clone());
        self.save_messages()?;
        Ok(message)
    }

    /// Clear the chat log. Notes are kept.
    pub fn start_new_chat(&mut self) -> Result<(), NotebookError> {
        info!("Starting new chat ({} messages cleared)", self.messages.len());
        self.messages.clear();
        self.save_messages()
    }

    // ── Notes ────────────────────────────────────────────────────────────

    /// Pin a model answer as a note. Pinning the same message twice returns
    /// the existing note unchanged.
    pub fn pin_message(&mut self, message_id: &str) -> Result<Note, NotebookError> {
        if let Some(existing) = self.notes.iter().find(|n| n.source_message_id == message_id) {
            return Ok(existing.clone());
        }
        let message = self
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .ok_or_else(|| NotebookError::MessageNotFound(message_id.to_string()))?;
        if !message.is_model() {
            return Err(NotebookError::NotPinnable(message_id.to_string()));
        }

        let note = Note::from_message(message);
        self.notes.insert(0, note.clone());
        self.save_notes()?;
        Ok(note)
    }

    pub fn delete_note(&mut self, id: &str) -> Result<Note, NotebookError> {
        let idx = self
            .notes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| NotebookError::NoteNotFound(id.to_string()))?;
        let removed = self.notes.remove(idx);
        self.save_notes()?;
        Ok(removed)
    }

    /// `true` if `message_id` already has a note.
    pub fn is_pinned(&self, message_id: &str) -> bool {
        self.notes.iter().any(|n| n.source_message_id == message_id)
    }

    // ── Persistence ──────────────────────────────────────────────────────

    fn save_sources(&self) -> Result<(), NotebookError> {
        Ok(save_collection(self.storage.as_ref(), SOURCES_KEY, &self.sources)?)
    }

    fn save_messages(&self) -> Result<(), NotebookError> {
        Ok(save_collection(self.storage.as_ref(), MESSAGES_KEY, &self.messages)?)
    }

    fn save_notes(&self) -> Result<(), NotebookError> {
        Ok(save_collection(self.storage.as_ref(), NOTES_KEY, &self.notes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::pipeline::pdf::tests::{CountingOcr, FakePdf};
    use crate::provider::GroundedRequest;
    use crate::store::MemoryStorage;
    use crate::types::Role;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with `{answer, citations}` citing the first source in the request.
    struct EchoModel {
        fail: Mutex<bool>,
    }

    #[async_trait]
    impl AnswerModel for EchoModel {
        async fn generate(&self, request: &GroundedRequest) -> Result<String, ModelError> {
            if *self.fail.lock().unwrap() {
                return Err(ModelError::Transport {
                    detail: "503".into(),
                });
            }
            let text = request.text();
            let id = text
                .lines()
                .find_map(|l| l.strip_prefix("ID: "))
                .unwrap_or("none")
                .to_string();
            Ok(serde_json::json!({
                "answer": "Grounded answer",
                "citations": [{"sourceId": id, "quote": "evidence"}]
            })
            .to_string())
        }
    }

    fn notebook(storage: Arc<dyn StateStorage>) -> (Notebook, Arc<EchoModel>) {
        let config = NotebookConfig::default();
        let ingestor = Ingestor::with_engines(
            config.clone(),
            Arc::new(CountingOcr::default()),
            Arc::new(FakePdf::new(vec![])),
        );
        let model = Arc::new(EchoModel {
            fail: Mutex::new(false),
        });
        let nb = Notebook::with_parts(config, storage, ingestor, model.clone()).unwrap();
        (nb, model)
    }

    #[test]
    fn add_source_validates_input() {
        let (mut nb, _) = notebook(Arc::new(MemoryStorage::new()));
        assert!(matches!(
            nb.add_source("  ", SourceContent::text("x"), None),
            Err(NotebookError::EmptyTitle)
        ));
        assert!(matches!(
            nb.add_source("T", SourceContent::text(" \n\t"), None),
            Err(NotebookError::EmptyContent)
        ));
        let image = SourceContent {
            mime_type: "image/png".into(),
            data: "AAAA".into(),
        };
        assert!(matches!(
            nb.add_source("T", image, None),
            Err(NotebookError::NonTextContent { .. })
        ));
        assert!(nb.sources().is_empty());
    }

    #[tokio::test]
    async fn ask_appends_question_and_cited_answer() {
        let (mut nb, _) = notebook(Arc::new(MemoryStorage::new()));
        let src = nb
            .add_source("Handbook", SourceContent::text("Leave is 12 days."), None)
            .unwrap();

        let answer = nb.ask("  How much leave?  ").await.unwrap();

        assert_eq!(nb.messages().len(), 2);
        assert_eq!(nb.messages()[0].role, Role::User);
        assert_eq!(nb.messages()[0].text, "How much leave?");
        let cites = answer.citations.unwrap();
        assert_eq!(cites[0].source_id, src.id);
        assert_eq!(cites[0].source_title, "Handbook");
    }

    #[tokio::test]
    async fn ask_without_sources_keeps_question_only() {
        let (mut nb, _) = notebook(Arc::new(MemoryStorage::new()));
        let err = nb.ask("anything?").await.unwrap_err();
        assert!(matches!(err, NotebookError::NoSources));
        assert_eq!(nb.messages().len(), 1);
        assert_eq!(nb.messages()[0].role, Role::User);
    }

    #[tokio::test]
    async fn failed_model_call_commits_no_model_message() {
        let (mut nb, model) = notebook(Arc::new(MemoryStorage::new()));
        nb.add_source("A", SourceContent::text("alpha"), None).unwrap();
        *model.fail.lock().unwrap() = true;

        let err = nb.ask("q").await.unwrap_err();
        assert!(err.is_model_failure());
        assert!(nb.messages().iter().all(|m| m.role == Role::User));
    }

    #[tokio::test]
    async fn pin_is_idempotent_and_newest_first() {
        let (mut nb, _) = notebook(Arc::new(MemoryStorage::new()));
        nb.add_source("A", SourceContent::text("alpha"), None).unwrap();
        let first = nb.ask("one").await.unwrap();
        let second = nb.ask("two").await.unwrap();

        let n1 = nb.pin_message(&first.id).unwrap();
        let n2 = nb.pin_message(&second.id).unwrap();
        let again = nb.pin_message(&first.id).unwrap();

        assert_eq!(again, n1);
        assert_eq!(nb.notes().len(), 2);
        assert_eq!(nb.notes()[0], n2);
        assert!(nb.is_pinned(&first.id));
    }

    #[tokio::test]
    async fn questions_cannot_be_pinned() {
        let (mut nb, _) = notebook(Arc::new(MemoryStorage::new()));
        nb.add_source("A", SourceContent::text("alpha"), None).unwrap();
        nb.ask("one").await.unwrap();
        let question_id = nb.messages()[0].id.clone();
        assert!(matches!(
            nb.pin_message(&question_id),
            Err(NotebookError::NotPinnable(_))
        ));
        assert!(matches!(
            nb.pin_message("msg-missing"),
            Err(NotebookError::MessageNotFound(_))
        ));
    }

    #[tokio::test]
    async fn new_chat_keeps_notes() {
        let (mut nb, _) = notebook(Arc::new(MemoryStorage::new()));
        nb.add_source("A", SourceContent::text("alpha"), None).unwrap();
        let answer = nb.ask("one").await.unwrap();
        nb.pin_message(&answer.id).unwrap();

        nb.start_new_chat().unwrap();

        assert!(nb.messages().is_empty());
        assert_eq!(nb.notes().len(), 1);
        assert_eq!(nb.notes()[0].content, "Grounded answer");
    }

    #[tokio::test]
    async fn deleted_source_keeps_recorded_citation_title() {
        let (mut nb, _) = notebook(Arc::new(MemoryStorage::new()));
        let src = nb.add_source("Doc", SourceContent::text("alpha"), None).unwrap();
        nb.ask("q").await.unwrap();

        nb.delete_source(&src.id).unwrap();

        let cites = nb.messages()[1].citations.clone().unwrap();
        assert_eq!(cites[0].source_title, "Doc");
        assert!(matches!(
            nb.delete_source(&src.id),
            Err(NotebookError::SourceNotFound(_))
        ));
    }

    #[test]
    fn state_survives_reopen() {
        let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());
        {
            let (mut nb, _) = notebook(storage.clone());
            nb.add_source("Kept", SourceContent::text("body"), Some("k.txt".into()))
                .unwrap();
        }
        let (nb, _) = notebook(storage);
        assert_eq!(nb.sources().len(), 1);
        assert_eq!(nb.sources()[0].file_name.as_deref(), Some("k.txt"));
    }

    #[tokio::test]
    async fn ingest_file_titles_by_file_name() {
        let (mut nb, _) = notebook(Arc::new(MemoryStorage::new()));
        let src = nb
            .ingest_file(b"plain body".to_vec(), "text/plain", "memo.txt", None, None)
            .await
            .unwrap();
        assert_eq!(src.title, "memo.txt");
        assert_eq!(src.content.data, "plain body");

        let err = nb
            .ingest_file(b"   ".to_vec(), "text/plain", "blank.txt", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, NotebookError::EmptyContent));
        assert_eq!(nb.sources().len(), 1);
    }
}
