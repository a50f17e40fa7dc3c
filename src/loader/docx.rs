//! Word document text: paragraphs first, then table cells.
use std::path::Path;

use anyhow::{Context, Result};
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};
use tracing::warn;

/// Extract text from a `.docx`. A file that cannot be parsed yields `""`.
pub fn extract_text(path: &Path) -> String {
    match read(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to read DOCX {}: {e:#}", path.display());
            String::new()
        }
    }
}

fn read(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let docx = docx_rs::read_docx(&bytes).map_err(|e| anyhow::anyhow!("invalid docx: {e}"))?;

    let mut paragraphs = Vec::new();
    let mut tables = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => paragraphs.push(paragraph_text(p)),
            DocumentChild::Table(t) => table_lines(t, &mut tables),
            _ => {}
        }
    }

    paragraphs.extend(tables);
    Ok(paragraphs.join("\n"))
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                match rc {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    _ => {}
                }
            }
        }
    }
    text
}

/// One line per row, cells separated by tabs. Nested tables are flattened.
#[allow(irrefutable_let_patterns)]
fn table_lines(table: &Table, out: &mut Vec<String>) {
    for child in &table.rows {
        let TableChild::TableRow(row) = child else {
            continue;
        };
        let mut cells = Vec::new();
        for cell_child in &row.cells {
            let TableRowChild::TableCell(cell) = cell_child else {
                continue;
            };
            let mut parts = Vec::new();
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(p) => parts.push(paragraph_text(p)),
                    TableCellContent::Table(nested) => table_lines(nested, out),
                    _ => {}
                }
            }
            cells.push(parts.join(" "));
        }
        out.push(cells.join("\t"));
    }
}
