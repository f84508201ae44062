use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use image::{GrayImage, ImageFormat};

/// Turns a preprocessed frame into text. An empty string means no text.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;
    fn recognize(&self, image: &GrayImage) -> Result<String>;
}

/// Runs the `tesseract` command line tool on a temporary PNG.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: PathBuf,
    language: String,
}

impl TesseractCli {
    pub fn new(program: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &GrayImage) -> Result<String> {
        let input = tempfile::Builder::new()
            .prefix("ocr-")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(input.path(), ImageFormat::Png)
            .context("Failed to write OCR input image")?;

        let output = Command::new(&self.program)
            .arg(input.path())
            .arg("stdout")
            .args(["--oem", "1", "--psm", "6", "-l", &self.language])
            .output()
            .with_context(|| format!("Failed to run {}", self.program.display()))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
