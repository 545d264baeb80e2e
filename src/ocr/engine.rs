use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;
use crate::error::ScanError;

/// A text recognition engine.
///
/// `set_image` must be called before each `get_text`.
pub trait OcrEngine: Send {
    /// Prepares the engine for the given language.
    fn initialize(&mut self, language_id: &str) -> Result<()>;

    /// Sets the image recognized by the next `get_text` call.
    fn set_image(&mut self, img: &RgbImage) -> Result<()>;

    /// Recognizes the current image and returns its text.
    fn get_text(&mut self) -> Result<String>;
}

/// Runs the Tesseract command-line tool on a temporary PNG.
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: PathBuf,
    language_id: Option<String>,
    image: Option<NamedTempFile>,
}

impl TesseractEngine {
    pub fn new(paths: TesseractPaths) -> Self {
        Self {
            executable: paths.executable,
            tessdata: paths.tessdata,
            language_id: None,
            image: None,
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn initialize(&mut self, language_id: &str) -> Result<()> {
        let data = self.tessdata.join(format!("{}.traineddata", language_id));
        if !data.exists() {
            return Err(anyhow!("Language data missing: {}", data.display()));
        }
        self.language_id = Some(language_id.to_string());
        Ok(())
    }

    fn set_image(&mut self, img: &RgbImage) -> Result<()> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())
            .context("Failed to write OCR input image")?;
        self.image = Some(temp_input);
        Ok(())
    }

    fn get_text(&mut self) -> Result<String> {
        let language_id = self
            .language_id
            .as_deref()
            .ok_or_else(|| anyhow!("Tesseract engine not initialized"))?;
        // Consumed so a stale image is never recognized twice
        let input = self
            .image
            .take()
            .ok_or_else(|| anyhow!("No image set before get_text"))?;

        let output = Command::new(&self.executable)
            .arg(input.path())
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&self.tessdata)
            .arg("-l")
            .arg(language_id)
            .arg("--psm")
            .arg("6") // Assume single uniform block of text
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScanError::OcrEngine(stderr.trim().to_string()).into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn engine(tessdata: PathBuf) -> TesseractEngine {
        TesseractEngine::new(TesseractPaths {
            executable: PathBuf::from("tesseract-not-installed"),
            tessdata,
        })
    }

    #[test]
    fn test_initialize_requires_language_data() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("eng.traineddata"), b"data").unwrap();

        let mut engine = engine(dir.path().to_path_buf());
        assert!(engine.initialize("kor").is_err());
        assert!(engine.initialize("eng").is_ok());
    }

    #[test]
    fn test_get_text_requires_image() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("eng.traineddata"), b"data").unwrap();

        let mut engine = engine(dir.path().to_path_buf());
        engine.initialize("eng").unwrap();
        let err = engine.get_text().unwrap_err();
        assert!(err.to_string().contains("No image set"));
    }

    #[test]
    fn test_get_text_requires_initialize() {
        let mut engine = engine(PathBuf::from("."));
        engine.set_image(&RgbImage::new(4, 4)).unwrap();
        let err = engine.get_text().unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }
}
