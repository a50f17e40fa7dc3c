//! Turns a directory of mixed-format files into normalized documents.
//!
//! Extraction never fails a run: any per-file error is logged and that file
//! contributes empty text.
pub mod docx;
pub mod ocr;
pub mod pdf;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use pulldown_cmark::{Event, Parser, TagEnd};
use tracing::{debug, warn};

use crate::config::LoaderConfig;
use crate::models::Document;

pub use ocr::{OcrEngine, TesseractCli};

pub struct Loader {
    extensions: Vec<String>,
    ocr: Box<dyn OcrEngine>,
}

/// Lowercase with a leading dot.
fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

impl Loader {
    /// Loader using the `tesseract` command line for OCR.
    #[must_use]
    pub fn new(cfg: &LoaderConfig) -> Self {
        Self::with_ocr(&cfg.extensions, Box::new(TesseractCli::default()))
    }

    #[must_use]
    pub fn with_ocr<S: AsRef<str>>(extensions: &[S], ocr: Box<dyn OcrEngine>) -> Self {
        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = normalize_extension(ext.as_ref());
            if ext.len() > 1 && !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        Self {
            extensions: normalized,
            ocr,
        }
    }

    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn glob_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for ext in &self.extensions {
            let glob = GlobBuilder::new(&format!("**/*{ext}"))
                .case_insensitive(true)
                .literal_separator(false)
                .build()
                .with_context(|| format!("invalid extension pattern: {ext}"))?;
            builder.add(glob);
        }
        builder.build().context("failed to build extension matcher")
    }

    /// Recursively list matching files, grouped by extension in configured
    /// order and sorted by path within each group.
    pub fn list_input_files(&self, input_dir: &Path) -> Result<Vec<PathBuf>> {
        let globs = self.glob_set()?;
        let mut groups: Vec<Vec<PathBuf>> = vec![Vec::new(); self.extensions.len()];

        if !input_dir.exists() {
            warn!("Input directory {} does not exist", input_dir.display());
            return Ok(Vec::new());
        }

        let walker = WalkBuilder::new(input_dir).standard_filters(false).build();
        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(input_dir) else {
                continue;
            };
            if let Some(group) = globs.matches(relative).into_iter().min() {
                groups[group].push(path.to_path_buf());
            }
        }

        let files: Vec<PathBuf> = groups
            .into_iter()
            .flat_map(|mut g| {
                g.sort();
                g
            })
            .collect();
        debug!("Found {} input files in {}", files.len(), input_dir.display());
        Ok(files)
    }

    /// Extract and normalize one file. Failures give empty text.
    pub fn load(&self, path: &Path) -> Document {
        let text = match self.extract(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to extract {}: {e:#}", path.display());
                String::new()
            }
        };
        Document {
            source: path.to_string_lossy().replace('\\', "/"),
            text,
        }
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "txt" => read_txt(path),
            "pdf" => pdf::extract_text(path, self.ocr.as_ref()),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" => self.ocr.ocr_image(path),
            "docx" => Ok(docx::extract_text(path)),
            "md" | "markdown" => read_markdown(path),
            "xlsx" | "xls" | "ods" => read_spreadsheet(path),
            _ => Ok(String::new()),
        }
    }
}

/// Decode as UTF-8, dropping undecodable bytes.
fn read_txt(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).replace('\u{FFFD}', ""))
}

/// Markdown rendered as plain text, one line per block.
fn read_markdown(path: &Path) -> Result<String> {
    let source = read_txt(path)?;
    let mut out = String::new();
    for event in Parser::new(&source) {
        match event {
            Event::Text(t) | Event::Code(t) => out.push_str(&t),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
            ) => out.push('\n'),
            _ => {}
        }
    }
    Ok(out)
}

/// Every sheet's rows as tab-separated lines.
fn read_spreadsheet(path: &Path) -> Result<String> {
    use calamine::{Reader, open_workbook_auto};

    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;
    let mut lines = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("failed to read sheet {name}"))?;
        for row in range.rows() {
            let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
            if cells.iter().any(|c| !c.trim().is_empty()) {
                lines.push(cells.join("\t"));
            }
        }
    }
    Ok(lines.join("\n"))
}
