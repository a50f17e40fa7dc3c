//! PDF text extraction with per-page OCR fallback.
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::ocr::OcrEngine;

/// Text of every page in order, one line break between pages.
///
/// Pages whose embedded text is blank are OCR'd instead. An OCR failure
/// leaves that page empty.
pub fn extract_text(path: &Path, ocr: &dyn OcrEngine) -> Result<String> {
    let doc = lopdf::Document::load(path)
        .with_context(|| format!("failed to parse PDF {}", path.display()))?;

    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys().copied() {
        let text = doc.extract_text(&[page_number]).unwrap_or_else(|e| {
            debug!("No text layer on page {page_number} of {}: {e}", path.display());
            String::new()
        });

        if !text.trim().is_empty() {
            pages.push(text);
            continue;
        }

        match ocr.ocr_pdf_page(path, page_number) {
            Ok(text) => pages.push(text),
            Err(e) => {
                warn!("OCR failed on page {page_number} of {}: {e:#}", path.display());
                pages.push(String::new());
            }
        }
    }

    Ok(pages.join("\n"))
}
