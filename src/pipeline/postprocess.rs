//! Post-processing: deterministic cleanup of OCR output and model replies.
//!
//! Two entry points:
//!
//! - [`clean_ocr_text`] tidies text recognised from a page image before it
//!   becomes part of a source. Tesseract emits form feeds between pages,
//!   trailing spaces on most lines, and long runs of blank lines where the
//!   layout had whitespace. Vision models add their own quirks (fences,
//!   zero-width characters).
//! - [`strip_json_fences`] unwraps a grounded-answer reply that arrived in a
//!   ```` ```json ```` fence despite the prompt asking for bare JSON.
//!
//! ## Rule Order
//!
//! Line endings are normalised before any per-line rule, and fences are
//! stripped before trimming so the fence regex sees the raw reply.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean recognised text from an OCR engine.
///
/// Rules (applied in order):
/// 1. Strip an outer code fence (vision models sometimes add one)
/// 2. Normalise line endings (CRLF / CR / form feed → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive blank lines down to 1
/// 6. Trim the whole text
pub fn clean_ocr_text(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

/// Return the JSON body of a model reply, without a surrounding code fence.
pub fn strip_json_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_JSON_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim(),
        None => trimmed,
    }
}

// ── Rule 1: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:text|plaintext|markdown)?\r?\n(.*)\r?\n```\s*$").unwrap());

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?\s*(.*?)\s*```$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCE.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
