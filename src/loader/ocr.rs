//! OCR collaborator used for images and text-less PDF pages.
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tracing::debug;

/// Recognizes text in images and rasterized PDF pages.
pub trait OcrEngine: Send + Sync {
    fn ocr_image(&self, path: &Path) -> Result<String>;

    /// OCR one page, numbered from 1.
    fn ocr_pdf_page(&self, path: &Path, page: u32) -> Result<String>;
}

/// OCR through the `tesseract` and `pdftoppm` command line tools.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    pub tesseract: String,
    pub pdftoppm: String,
    pub dpi: u32,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            tesseract: "tesseract".into(),
            pdftoppm: "pdftoppm".into(),
            dpi: 200,
        }
    }
}

impl TesseractCli {
    fn run_tesseract(&self, input: &str, stdin_bytes: Option<&[u8]>) -> Result<String> {
        let mut child = Command::new(&self.tesseract)
            .arg(input)
            .arg("stdout")
            .stdin(if stdin_bytes.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start {}", self.tesseract))?;

        if let Some(bytes) = stdin_bytes {
            let mut stdin = child.stdin.take().context("tesseract stdin unavailable")?;
            stdin.write_all(bytes).context("failed to pipe image to tesseract")?;
        }

        let output = child.wait_with_output().context("tesseract did not finish")?;
        if !output.status.success() {
            bail!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractCli {
    fn ocr_image(&self, path: &Path) -> Result<String> {
        debug!("OCR image {}", path.display());
        self.run_tesseract(&path.to_string_lossy(), None)
    }

    fn ocr_pdf_page(&self, path: &Path, page: u32) -> Result<String> {
        debug!("OCR page {page} of {}", path.display());
        let page = page.to_string();
        let raster = Command::new(&self.pdftoppm)
            .args(["-png", "-singlefile", "-r", &self.dpi.to_string()])
            .args(["-f", &page, "-l", &page])
            .arg(path)
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to start {}", self.pdftoppm))?;

        if !raster.status.success() || raster.stdout.is_empty() {
            bail!(
                "pdftoppm failed on page {page}: {}",
                String::from_utf8_lossy(&raster.stderr).trim()
            );
        }
        self.run_tesseract("stdin", Some(&raster.stdout))
    }
}
