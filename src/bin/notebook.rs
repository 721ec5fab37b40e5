//! CLI binary for edgequake-notebook.
//!
//! A thin shim over the library crate: flags map onto `NotebookConfig`,
//! each subcommand is one `Notebook` operation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgequake_notebook::{
    is_accepted, ChatMessage, FileKind, IngestProgressCallback, IngestStatus, Ingestor, Notebook,
    NotebookConfig, OcrBackend, Role, ACCEPTED_EXTENSIONS,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while a file is parsed; switches to a bar for OCR.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
}

impl CliProgressCallback {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Reading");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self {
            bar,
            started: Instant::now(),
        }
    }

    fn activate_bar(&self, total: u64, unit: &str) {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {unit}  ⏱ {{elapsed_precise}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        if self.bar.length() != Some(total) {
            self.bar.set_length(total);
            self.bar.set_style(style);
            self.bar.set_prefix("OCR");
            self.bar.reset_eta();
        }
    }
}

impl IngestProgressCallback for CliProgressCallback {
    fn on_ingest_start(&self, file_name: &str, kind: FileKind) {
        self.bar.set_prefix(kind.to_string());
        self.bar.set_message(file_name.to_string());
    }

    fn on_status(&self, status: IngestStatus) {
        if status == IngestStatus::ScannedPdfDetected {
            self.bar.println(format!("  {} {}", cyan("◆"), status));
        }
        self.bar.set_message(status.to_string());
    }

    fn on_image_ocr_progress(&self, percent: u8) {
        self.activate_bar(100, "%");
        self.bar.set_position(u64::from(percent));
    }

    fn on_pdf_ocr_page(&self, page_num: usize, total_pages: usize) {
        self.activate_bar(total_pages as u64, "pages");
        self.bar.set_position(page_num.saturating_sub(1) as u64);
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_ingest_complete(&self, file_name: &str, chars: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "  {} {}  {}  {}",
            green("✓"),
            file_name,
            dim(&format!("{chars} chars")),
            dim(&format!("{:.1}s", self.started.elapsed().as_secs_f64())),
        );
    }

    fn on_ingest_error(&self, file_name: &str, error: String) {
        self.bar.finish_and_clear();
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error
        };
        eprintln!("  {} {}  {}", red("✗"), file_name, red(&msg));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Add documents (text, Markdown, CSV, PDF, Word, Excel, images)
  notebook add handbook.pdf budget.xlsx scan.png

  # Paste a note as a source (reads stdin when TEXT is omitted)
  notebook paste --title "Meeting notes" "We agreed to ship on Friday."

  # Ask a grounded question
  notebook ask "When do we ship?"

  # Pin the latest answer, list notes
  notebook pin last
  notebook notes

  # Extract text without adding a source
  notebook extract scan.pdf

  # OCR with a vision model instead of tesseract
  notebook --ocr-backend vision add scan.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  NOTEBOOK_STATE_DIR      Where sources, chat and notes are stored

SETUP:
  1. Set API key:     export GEMINI_API_KEY=...
  2. Install OCR:     apt install tesseract-ocr   (or use --ocr-backend vision)
  3. Add sources:     notebook add document.pdf
"#;

/// Ask cited questions over your own documents.
#[derive(Parser, Debug)]
#[command(
    name = "notebook",
    version,
    about = "Ask cited questions over your own documents",
    long_about = "A source-grounded notebook. Add documents (text, PDF, Word, Excel, images), \
then ask questions: answers come only from your sources and cite the passages they rely on. \
Scanned PDFs and images are read with OCR.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding sources, chat history and notes.
    #[arg(long, global = true, env = "NOTEBOOK_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// LLM provider: openai, anthropic, gemini, ollama.
    #[arg(long, global = true, env = "NOTEBOOK_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (e.g. gemini-2.5-flash, gpt-4.1-nano).
    #[arg(long, global = true, env = "NOTEBOOK_MODEL")]
    model: Option<String>,

    /// Language answers must be written in.
    #[arg(long, global = true, env = "NOTEBOOK_LANGUAGE", default_value = "English")]
    language: String,

    /// Path to a text file containing a custom grounding instruction.
    #[arg(long, global = true, env = "NOTEBOOK_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// OCR engine for scanned PDFs and images.
    #[arg(long, global = true, env = "NOTEBOOK_OCR_BACKEND", value_enum, default_value = "tesseract")]
    ocr_backend: OcrArg,

    /// OCR language hint (tesseract language code).
    #[arg(long, global = true, env = "NOTEBOOK_OCR_LANGUAGE", default_value = "eng")]
    ocr_language: String,

    /// Path to the tesseract executable.
    #[arg(long, global = true, env = "NOTEBOOK_TESSERACT")]
    tesseract: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium: Option<PathBuf>,

    /// Minimum non-whitespace characters per page before a PDF counts as text.
    #[arg(long, global = true, env = "NOTEBOOK_TEXT_THRESHOLD", default_value_t = 50)]
    text_threshold: usize,

    /// Output JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Disable progress bars.
    #[arg(long, global = true, env = "NOTEBOOK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "NOTEBOOK_VERBOSE")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest files and add them as sources.
    Add {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Source title (single file only). Defaults to the file name.
        #[arg(long)]
        title: Option<String>,
    },
    /// Add pasted text as a source.
    Paste {
        #[arg(long)]
        title: String,
        /// Source text. Read from stdin when omitted.
        text: Option<String>,
    },
    /// List sources.
    Sources,
    /// Delete a source.
    Remove { id: String },
    /// Ask a question over all sources.
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Show the chat log.
    History,
    /// Clear the chat log (notes are kept).
    NewChat,
    /// Pin an answer as a note. `last` pins the latest answer.
    Pin { message_id: String },
    /// List pinned notes.
    Notes,
    /// Delete a pinned note.
    Unpin { note_id: String },
    /// Print the text extracted from a file without adding it.
    Extract { file: PathBuf },
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OcrArg {
    Tesseract,
    Vision,
}

impl From<OcrArg> for OcrBackend {
    fn from(v: OcrArg) -> Self {
        match v {
            OcrArg::Tesseract => OcrBackend::Tesseract,
            OcrArg::Vision => OcrBackend::Vision,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar covers ingestion feedback, so keep library logs quiet
    // while it is shown.
    let show_progress = !cli.no_progress && !cli.json && io::stderr().is_terminal();
    let filter = if cli.verbose {
        "debug"
    } else if show_progress {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;
    let mut notebook = Notebook::open(config).context("Failed to open notebook")?;

    match cli.command {
        Command::Add { files, title } => {
            if title.is_some() && files.len() > 1 {
                anyhow::bail!("--title can only be used with a single file");
            }
            let mut failed = 0usize;
            for path in &files {
                warn_if_unaccepted(path);
                let cb = show_progress.then(CliProgressCallback::new);
                let result = notebook
                    .ingest_path(
                        path,
                        title.as_deref(),
                        cb.as_ref().map(|c| c as &dyn IngestProgressCallback),
                    )
                    .await;
                match result {
                    Ok(source) => {
                        if cli.json {
                            println!("{}", serde_json::to_string(&source)?);
                        } else {
                            println!("{} {}  {}", green("+"), bold(&source.title), dim(&source.id));
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        if cb.is_none() {
                            eprintln!("{} {}: {}", red("✗"), path.display(), e.diagnostic());
                        }
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} of {} files could not be added", files.len());
            }
        }

        Command::Paste { title, text } => {
            let text = match text {
                Some(t) => t,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read source text from stdin")?;
                    buf
                }
            };
            let source = notebook
                .add_source(&title, edgequake_notebook::SourceContent::text(text.trim()), None)
                .context("Could not add source")?;
            println!("{} {}  {}", green("+"), bold(&source.title), dim(&source.id));
        }

        Command::Sources => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(notebook.sources())?);
            } else if notebook.sources().is_empty() {
                eprintln!("{}", dim("No sources yet. Add one with `notebook add <file>`."));
            } else {
                for s in notebook.sources() {
                    println!(
                        "{}  {}  {}",
                        dim(&s.id),
                        bold(&s.title),
                        dim(&format!("{} chars", s.content.data.chars().count())),
                    );
                }
            }
        }

        Command::Remove { id } => {
            let removed = notebook.delete_source(&id).context("Could not remove source")?;
            println!("{} {}", red("-"), removed.title);
        }

        Command::Ask { question } => {
            let question = question.join(" ");
            let spinner = show_progress.then(|| {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("{spinner:.cyan} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner())
                        .tick_strings(TICKS),
                );
                bar.set_message(format!(
                    "Reading {} sources…",
                    notebook.sources().len()
                ));
                bar.enable_steady_tick(Duration::from_millis(80));
                bar
            });
            let result = notebook.ask(&question).await;
            if let Some(bar) = spinner {
                bar.finish_and_clear();
            }
            let answer = result.map_err(|e| anyhow::anyhow!(e.diagnostic()))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                print_message(&answer)?;
            }
        }

        Command::History => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(notebook.messages())?);
            } else {
                for m in notebook.messages() {
                    print_message(m)?;
                }
            }
        }

        Command::NewChat => {
            let cleared = notebook.messages().len();
            notebook.start_new_chat()?;
            eprintln!("{} Cleared {cleared} messages", green("✔"));
        }

        Command::Pin { message_id } => {
            let id = if message_id == "last" {
                notebook
                    .messages()
                    .iter()
                    .rev()
                    .find(|m| m.is_model())
                    .map(|m| m.id.clone())
                    .context("No answers to pin yet")?
            } else {
                message_id
            };
            let note = notebook.pin_message(&id).context("Could not pin message")?;
            println!("{} {}", cyan("📌"), dim(&note.id));
        }

        Command::Notes => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(notebook.notes())?);
            } else {
                for n in notebook.notes() {
                    println!("{}\n{}\n", dim(&n.id), n.content);
                }
            }
        }

        Command::Unpin { note_id } => {
            notebook.delete_note(&note_id).context("Could not delete note")?;
            println!("{} {}", red("-"), note_id);
        }

        Command::Extract { file } => {
            extract(&file, notebook.config().clone(), show_progress).await?;
        }
    }

    Ok(())
}

/// Map CLI args to `NotebookConfig`.
async fn build_config(cli: &Cli) -> Result<NotebookConfig> {
    let mut builder = NotebookConfig::builder()
        .answer_language(&cli.language)
        .ocr_backend(cli.ocr_backend.clone().into())
        .ocr_language(&cli.ocr_language)
        .meaningful_text_threshold(cli.text_threshold);

    if let Some(ref dir) = cli.state_dir {
        builder = builder.state_dir(dir);
    }
    if let Some(ref p) = cli.provider {
        builder = builder.provider_name(p);
    }
    if let Some(ref m) = cli.model {
        builder = builder.model(m);
    }
    if let Some(ref t) = cli.tesseract {
        builder = builder.tesseract_path(t);
    }
    if let Some(ref p) = cli.pdfium {
        builder = builder.pdfium_library_path(p);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

async fn extract(path: &std::path::Path, config: NotebookConfig, show_progress: bool) -> Result<()> {
    warn_if_unaccepted(path);
    let ingestor = Ingestor::new(config);
    let cb = show_progress.then(CliProgressCallback::new);
    let file = ingestor
        .ingest_path(path, cb.as_ref().map(|c| c as &dyn IngestProgressCallback))
        .await
        .with_context(|| format!("Failed to extract {}", path.display()))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(file.content.data.as_bytes())
        .context("Failed to write to stdout")?;
    if !file.content.data.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

fn warn_if_unaccepted(path: &std::path::Path) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !is_accepted(&name) {
        eprintln!(
            "{} {} is not one of .{}; it will be read as text",
            cyan("⚠"),
            name,
            ACCEPTED_EXTENSIONS.join(" .")
        );
    }
}

fn print_message(m: &ChatMessage) -> Result<()> {
    let mut out = io::stdout().lock();
    match m.role {
        Role::User => writeln!(out, "{} {}", bold("You:"), m.text)?,
        Role::Model => {
            writeln!(out, "{}\n{}", bold("Notebook:"), m.text)?;
            for (i, c) in m.citations.iter().flatten().enumerate() {
                writeln!(
                    out,
                    "  {} {}  {}",
                    cyan(&format!("[{}]", i + 1)),
                    bold(&c.source_title),
                    dim(&format!("\"{}\"", c.quote)),
                )?;
            }
            writeln!(out, "  {}", dim(&m.id))?;
        }
    }
    writeln!(out)?;
    Ok(())
}
