//! Integration tests for the notebook lifecycle.
//!
//! The PDF backend, OCR engine and answer model are replaced by scripted
//! fakes with call counters; state lives in a temporary directory so every
//! test also exercises the on-disk JSON round trip.

use async_trait::async_trait;
use edgequake_notebook::error::{IngestError, ModelError, NotebookError, OcrError, PdfError};
use edgequake_notebook::pipeline::ocr::OcrProgress;
use edgequake_notebook::{
    AnswerModel, FileStorage, GroundedRequest, Ingestor, Notebook, NotebookConfig, OcrEngine,
    PdfBackend, Role, SourceContent,
};
use image::DynamicImage;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

struct ScriptedPdf {
    pages: Vec<Option<String>>,
    renders: AtomicUsize,
}

impl ScriptedPdf {
    fn new(pages: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.iter().map(|p| Some(p.to_string())).collect(),
            renders: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PdfBackend for ScriptedPdf {
    async fn text_layer(&self, _bytes: Arc<[u8]>) -> Result<Vec<Option<String>>, PdfError> {
        Ok(self.pages.clone())
    }

    async fn render_page(
        &self,
        _bytes: Arc<[u8]>,
        index: usize,
        _scale: f32,
    ) -> Result<DynamicImage, PdfError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            1,
            1,
            image::Luma([index as u8]),
        )))
    }
}

#[derive(Default)]
struct EchoOcr {
    calls: AtomicUsize,
}

#[async_trait]
impl OcrEngine for EchoOcr {
    fn name(&self) -> &str {
        "echo"
    }

    async fn recognize(
        &self,
        image: &DynamicImage,
        _language: &str,
        progress: OcrProgress<'_>,
    ) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        progress(100);
        let idx = image.to_luma8().get_pixel(0, 0)[0];
        Ok(format!("scanned page {}", idx + 1))
    }
}

/// Replies with a fixed JSON body; `{first}` is replaced by the first
/// source id found in the request.
struct ScriptedModel {
    reply: Mutex<String>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply.to_string()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AnswerModel for ScriptedModel {
    async fn generate(&self, request: &GroundedRequest) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = request.text();
        let first = text
            .lines()
            .find_map(|l| l.strip_prefix("ID: "))
            .unwrap_or_default()
            .to_string();
        Ok(self.reply.lock().unwrap().replace("{first}", &first))
    }
}

const CITING_REPLY: &str =
    r#"{"answer": "Twelve days.", "citations": [{"sourceId": "{first}", "quote": "12 days"}]}"#;

struct Harness {
    dir: tempfile::TempDir,
    pdf: Arc<ScriptedPdf>,
    ocr: Arc<EchoOcr>,
    model: Arc<ScriptedModel>,
}

impl Harness {
    fn new(pdf_pages: &[&str], reply: &str) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            pdf: ScriptedPdf::new(pdf_pages),
            ocr: Arc::new(EchoOcr::default()),
            model: ScriptedModel::new(reply),
        }
    }

    fn open(&self) -> Notebook {
        let config = NotebookConfig::builder()
            .state_dir(self.dir.path())
            .build()
            .unwrap();
        let ingestor = Ingestor::with_engines(
            config.clone(),
            self.ocr.clone() as Arc<dyn OcrEngine>,
            self.pdf.clone() as Arc<dyn PdfBackend>,
        );
        Notebook::with_parts(
            config,
            Arc::new(FileStorage::new(self.dir.path())),
            ingestor,
            self.model.clone() as Arc<dyn AnswerModel>,
        )
        .unwrap()
    }

    fn write_file(&self, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }
}

fn long_page(word: &str) -> String {
    std::iter::repeat(word).take(30).collect::<Vec<_>>().join(" ")
}

// ── Ingestion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn plain_text_file_is_stored_verbatim() {
    let h = Harness::new(&[], CITING_REPLY);
    let mut nb = h.open();
    let body = "# Leave policy\r\n\nStaff get 12 days.\n  indented line\n";
    let path = h.write_file("policy.md", body.as_bytes());

    let source = nb.ingest_path(&path, None, None).await.unwrap();

    assert_eq!(source.title, "policy.md");
    assert_eq!(source.file_name.as_deref(), Some("policy.md"));
    assert_eq!(source.content.data, body);
    assert!(source.content.is_text());
}

#[tokio::test]
async fn file_at_size_limit_is_rejected_without_a_source() {
    let h = Harness::new(&[], CITING_REPLY);
    let mut nb = h.open();
    let path = h.write_file("big.txt", &vec![b'a'; 10 * 1024 * 1024]);

    let err = nb.ingest_path(&path, None, None).await.unwrap_err();

    assert!(matches!(
        err,
        NotebookError::Ingest(IngestError::FileTooLarge { .. })
    ));
    assert!(err.diagnostic().contains("10"));
    assert!(nb.sources().is_empty());
    assert!(h.open().sources().is_empty());
}

#[tokio::test]
async fn digital_pdf_never_calls_ocr() {
    let p1 = long_page("alpha");
    let p2 = long_page("beta");
    let h = Harness::new(&[&p1, &p2], CITING_REPLY);
    let mut nb = h.open();
    let path = h.write_file("report.pdf", b"%PDF-1.7");

    let source = nb.ingest_path(&path, Some("Report"), None).await.unwrap();

    assert_eq!(source.title, "Report");
    assert_eq!(source.content.data, format!("{p1}\n\n{p2}"));
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.pdf.renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scanned_pdf_is_ocrd_once_per_page_in_order() {
    let h = Harness::new(&["", " \n ", ""], CITING_REPLY);
    let mut nb = h.open();
    let path = h.write_file("scan.pdf", b"%PDF-1.4");

    let source = nb.ingest_path(&path, None, None).await.unwrap();

    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        source.content.data,
        "scanned page 1\n\nscanned page 2\n\nscanned page 3"
    );
}

#[tokio::test]
async fn missing_file_reports_not_found() {
    let h = Harness::new(&[], CITING_REPLY);
    let mut nb = h.open();
    let err = nb
        .ingest_path(Path::new("/definitely/not/here.txt"), None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NotebookError::Ingest(IngestError::FileNotFound { .. })
    ));
}

// ── Questions and citations ──────────────────────────────────────────────────

#[tokio::test]
async fn empty_store_fails_before_any_model_call() {
    let h = Harness::new(&[], CITING_REPLY);
    let mut nb = h.open();

    let err = nb.ask("How much leave?").await.unwrap_err();

    assert!(matches!(err, NotebookError::NoSources));
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn citation_titles_resolve_and_survive_reload() {
    let h = Harness::new(&[], CITING_REPLY);
    {
        let mut nb = h.open();
        nb.add_source("Doc A", SourceContent::text("Leave is 12 days."), None)
            .unwrap();
        let answer = nb.ask("How much leave?").await.unwrap();
        let cites = answer.citations.as_ref().unwrap();
        assert_eq!(cites[0].source_title, "Doc A");
        assert_eq!(cites[0].quote, "12 days");
    }

    let nb = h.open();
    assert_eq!(nb.messages().len(), 2);
    assert_eq!(nb.messages()[0].role, Role::User);
    let cites = nb.messages()[1].citations.as_ref().unwrap();
    assert_eq!(cites[0].source_title, "Doc A");
}

#[tokio::test]
async fn citation_of_vanished_source_gets_placeholder() {
    let h = Harness::new(
        &[],
        r#"{"answer": "From an old source.", "citations": [{"sourceId": "source-deleted", "quote": "gone"}]}"#,
    );
    let mut nb = h.open();
    nb.add_source("Doc A", SourceContent::text("alpha"), None)
        .unwrap();

    let answer = nb.ask("?").await.unwrap();

    let cites = answer.citations.unwrap();
    assert_eq!(cites[0].source_id, "source-deleted");
    assert_eq!(cites[0].source_title, nb.config().unknown_source_title);
}

#[tokio::test]
async fn malformed_reply_leaves_only_the_question() {
    let h = Harness::new(&[], "Sorry, I cannot produce JSON today.");
    let mut nb = h.open();
    nb.add_source("Doc A", SourceContent::text("alpha"), None)
        .unwrap();

    let err = nb.ask("?").await.unwrap_err();

    assert!(err.is_model_failure());
    assert_eq!(nb.messages().len(), 1);
    assert_eq!(h.open().messages().len(), 1);
}

// ── Notes ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pinning_twice_yields_one_note_and_deleting_spares_others() {
    let h = Harness::new(&[], CITING_REPLY);
    let mut nb = h.open();
    nb.add_source("Doc A", SourceContent::text("alpha"), None)
        .unwrap();
    let a1 = nb.ask("first?").await.unwrap();
    let a2 = nb.ask("second?").await.unwrap();

    let n1 = nb.pin_message(&a1.id).unwrap();
    nb.pin_message(&a1.id).unwrap();
    let n2 = nb.pin_message(&a2.id).unwrap();
    assert_eq!(nb.notes().len(), 2);

    nb.delete_note(&n1.id).unwrap();

    let reopened = h.open();
    assert_eq!(reopened.notes().len(), 1);
    assert_eq!(reopened.notes()[0].id, n2.id);
    assert_eq!(reopened.messages().len(), 4);
    assert!(reopened.messages().iter().any(|m| m.id == a1.id));
}

#[tokio::test]
async fn new_chat_clears_messages_but_not_notes_or_sources() {
    let h = Harness::new(&[], CITING_REPLY);
    let mut nb = h.open();
    nb.add_source("Doc A", SourceContent::text("alpha"), None)
        .unwrap();
    let answer = nb.ask("q?").await.unwrap();
    nb.pin_message(&answer.id).unwrap();

    nb.start_new_chat().unwrap();

    let reopened = h.open();
    assert!(reopened.messages().is_empty());
    assert_eq!(reopened.notes().len(), 1);
    assert_eq!(reopened.sources().len(), 1);
}

#[tokio::test]
async fn corrupt_state_file_starts_empty() {
    let h = Harness::new(&[], CITING_REPLY);
    std::fs::write(h.dir.path().join("ai-notebook-notes.json"), "{broken").unwrap();

    let nb = h.open();

    assert!(nb.notes().is_empty());
}

#[tokio::test]
async fn non_utf8_state_file_starts_empty() {
    let h = Harness::new(&[], CITING_REPLY);
    std::fs::write(h.dir.path().join("ai-notebook-notes.json"), b"\xff\xfe[garbage").unwrap();

    let mut nb = h.open();
    assert!(nb.notes().is_empty());

    nb.add_source("Doc A", SourceContent::text("alpha"), None)
        .unwrap();
    assert_eq!(h.open().sources().len(), 1);
}
