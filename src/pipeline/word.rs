//! Word document text extraction via docx-rs.
//!
//! Body paragraphs become one line each. Tables are emitted row by row with
//! cells separated by tabs, so tabular content survives as readable text.
//! Formatting, images, headers and footers are dropped.
//!
//! Legacy binary `.doc` files are not OOXML; docx-rs rejects them and they
//! surface as a Word parse failure.

use crate::error::IngestError;
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};
use tracing::debug;

/// Extract the raw text of a `.docx` document.
pub fn extract_word_text(bytes: &[u8]) -> Result<String, IngestError> {
    let doc = docx_rs::read_docx(bytes).map_err(|e| IngestError::WordParse {
        detail: e.to_string(),
    })?;

    let mut lines = Vec::new();
    for child in &doc.document.children {
        match child {
            DocumentChild::Paragraph(p) => lines.push(paragraph_text(p)),
            DocumentChild::Table(t) => table_lines(t, &mut lines),
            _ => {}
        }
    }
    debug!("Word document: {} lines", lines.len());

    Ok(lines.join("\n").trim().to_string())
}

fn paragraph_text(p: &Paragraph) -> String {
    let mut out = String::new();
    push_paragraph_children(&p.children, &mut out);
    out
}

fn push_paragraph_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push('\t'),
                        RunChild::Break(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_paragraph_children(&link.children, out),
            _ => {}
        }
    }
}

#[allow(irrefutable_let_patterns)]
fn table_lines(table: &Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row else {
            continue;
        };
        let mut cells = Vec::new();
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            let text: Vec<String> = cell
                .children
                .iter()
                .filter_map(|c| match c {
                    TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                    _ => None,
                })
                .collect();
            cells.push(text.join(" "));
        }
        lines.push(cells.join("\t"));
    }
}
