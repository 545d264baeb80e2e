//! Capture source backed by a still image, used for offline scans.

use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::Path;

use super::buffer::{CaptureSource, PixelFormat, SourceFrame};

/// Serves the same image on every cycle.
pub struct ImageFileSource {
    width: u32,
    height: u32,
    /// RGBA rows, bottom-up
    data: Vec<u8>,
}

impl ImageFileSource {
    pub fn open(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("Failed to open replay image {}", path.display()))?
            .to_rgba8();
        crate::log(&format!(
            "Replay image loaded: {} ({}x{})",
            path.display(),
            img.width(),
            img.height()
        ));
        Ok(Self::from_image(&img))
    }

    pub fn from_image(img: &RgbaImage) -> Self {
        let row_len = img.width() as usize * 4;
        let mut data = Vec::with_capacity(img.as_raw().len());
        for row in img.as_raw().chunks_exact(row_len.max(1)).rev() {
            data.extend_from_slice(row);
        }
        Self {
            width: img.width(),
            height: img.height(),
            data,
        }
    }
}

impl CaptureSource for ImageFileSource {
    fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    fn frame(&mut self) -> Option<SourceFrame<'_>> {
        Some(SourceFrame {
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgba8,
            data: &self.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::buffer::CaptureBufferManager;
    use image::Rgba;
    use tempfile::tempdir;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(5, 3, |x, y| Rgba([x as u8 * 10, y as u8 * 20, 7, 255]))
    }

    #[test]
    fn test_round_trip_through_manager() {
        let img = sample();
        let mut source = ImageFileSource::from_image(&img);
        let mut manager = CaptureBufferManager::new();

        let oriented = manager.update(&mut source).unwrap();
        assert_eq!(oriented, img);
    }

    #[test]
    fn test_open_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        sample().save(&path).unwrap();

        let mut source = ImageFileSource::open(&path).unwrap();
        assert!(source.is_ready());
        let frame = source.frame().unwrap();
        assert_eq!((frame.width, frame.height), (5, 3));
        // First stored row is the bottom row of the image
        assert_eq!(&frame.data[..4], &[0, 40, 7, 255]);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        assert!(ImageFileSource::open(&dir.path().join("missing.png")).is_err());
    }
}
