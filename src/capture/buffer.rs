//! Owned frame buffer fed by a capture source.
//!
//! Sources deliver 4-byte pixels with rows bottom-up. The manager copies each
//! frame into storage it owns, reusing the allocation while the dimensions stay
//! the same, and hands out a top-down RGBA copy.

use image::RgbaImage;

use crate::error::ScanError;

/// Byte order of one 4-byte pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    Bgra8,
}

/// A frame borrowed from a capture source. Rows are ordered bottom-up.
#[derive(Clone, Copy, Debug)]
pub struct SourceFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: &'a [u8],
}

/// Something that can produce frames of an external window.
pub trait CaptureSource: Send {
    /// True once the source can deliver frames.
    fn is_ready(&self) -> bool;

    /// Returns the latest frame, or None when no frame is available.
    fn frame(&mut self) -> Option<SourceFrame<'_>>;
}

/// Most recent frame copied out of the source, still bottom-up.
#[derive(Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

impl RawFrame {
    fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    /// Produces a top-down RGBA image. Row `y` of the output is row
    /// `height - 1 - y` of the stored frame.
    fn to_oriented_rgba(&self) -> RgbaImage {
        let row_len = self.width as usize * 4;
        let mut out = vec![0u8; self.pixels.len()];

        for (dst_row, src_row) in out
            .chunks_exact_mut(row_len)
            .zip(self.pixels.chunks_exact(row_len).rev())
        {
            dst_row.copy_from_slice(src_row);
            if self.format == PixelFormat::Bgra8 {
                for px in dst_row.chunks_exact_mut(4) {
                    px.swap(0, 2);
                }
            }
        }

        // Length is width * height * 4 by construction
        RgbaImage::from_raw(self.width, self.height, out)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}

/// Owns the frame buffer across scan cycles.
#[derive(Debug, Default)]
pub struct CaptureBufferManager {
    frame: Option<RawFrame>,
    allocations: usize,
}

impl CaptureBufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the source's current frame into the owned buffer and returns an
    /// oriented RGBA copy of it.
    ///
    /// The buffer is reallocated only when none exists yet or the source's
    /// width or height changed.
    pub fn update(&mut self, source: &mut dyn CaptureSource) -> Result<RgbaImage, ScanError> {
        if !source.is_ready() {
            return Err(ScanError::SourceUnavailable("source not ready".to_string()));
        }
        let frame = source
            .frame()
            .ok_or_else(|| ScanError::SourceUnavailable("no frame available".to_string()))?;

        if frame.width == 0 || frame.height == 0 {
            return Err(ScanError::SourceUnavailable(format!(
                "empty frame {}x{}",
                frame.width, frame.height
            )));
        }

        let len = RawFrame::byte_len(frame.width, frame.height);
        if frame.data.len() < len {
            return Err(ScanError::SourceUnavailable(format!(
                "frame {}x{} has {} bytes, expected {}",
                frame.width,
                frame.height,
                frame.data.len(),
                len
            )));
        }

        let reuse = matches!(
            &self.frame,
            Some(raw) if raw.width == frame.width && raw.height == frame.height
        );
        if !reuse {
            self.frame = Some(RawFrame {
                width: frame.width,
                height: frame.height,
                format: frame.format,
                pixels: vec![0u8; len],
            });
            self.allocations += 1;
        }

        let raw = self
            .frame
            .as_mut()
            .ok_or_else(|| ScanError::SourceUnavailable("frame buffer missing".to_string()))?;
        raw.format = frame.format;
        raw.pixels.copy_from_slice(&frame.data[..len]);

        Ok(raw.to_oriented_rgba())
    }

    /// The stored frame, if any cycle has completed a copy.
    pub fn frame(&self) -> Option<&RawFrame> {
        self.frame.as_ref()
    }

    /// Number of times the frame buffer has been allocated.
    pub fn allocation_count(&self) -> usize {
        self.allocations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct FakeSource {
        ready: bool,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    }

    impl FakeSource {
        /// Rows are stored bottom-up: the first row of `data` is the bottom row.
        fn new(width: u32, height: u32, format: PixelFormat) -> Self {
            let mut data = Vec::new();
            for row in 0..height {
                for x in 0..width {
                    data.extend_from_slice(&[x as u8, row as u8, 100, 255]);
                }
            }
            Self {
                ready: true,
                width,
                height,
                format,
                data,
            }
        }
    }

    impl CaptureSource for FakeSource {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn frame(&mut self) -> Option<SourceFrame<'_>> {
            Some(SourceFrame {
                width: self.width,
                height: self.height,
                format: self.format,
                data: &self.data,
            })
        }
    }

    #[test]
    fn test_equal_size_updates_reuse_storage() {
        let mut manager = CaptureBufferManager::new();
        let mut source = FakeSource::new(8, 4, PixelFormat::Rgba8);

        manager.update(&mut source).unwrap();
        let ptr = manager.frame().unwrap().pixels.as_ptr();

        source.data[0] = 42;
        manager.update(&mut source).unwrap();
        manager.update(&mut source).unwrap();

        assert_eq!(manager.allocation_count(), 1);
        assert_eq!(manager.frame().unwrap().pixels.as_ptr(), ptr);
        assert_eq!(manager.frame().unwrap().pixels[0], 42);
    }

    #[test]
    fn test_reused_storage_returns_new_oriented_frame() {
        let mut manager = CaptureBufferManager::new();
        let mut source = FakeSource::new(8, 4, PixelFormat::Rgba8);

        let first = manager.update(&mut source).unwrap();

        // Bottom row, first pixel
        source.data[..4].copy_from_slice(&[7, 7, 7, 255]);
        // Top row, first pixel
        let top = 3 * 8 * 4;
        source.data[top..top + 4].copy_from_slice(&[9, 9, 9, 255]);
        let second = manager.update(&mut source).unwrap();

        assert_eq!(manager.allocation_count(), 1);
        assert_eq!(*second.get_pixel(0, 3), Rgba([7, 7, 7, 255]));
        assert_eq!(*second.get_pixel(0, 0), Rgba([9, 9, 9, 255]));
        // Untouched pixels are still flipped
        assert_eq!(*second.get_pixel(5, 1), Rgba([5, 2, 100, 255]));
        // The earlier result is an independent copy
        assert_eq!(*first.get_pixel(0, 3), Rgba([0, 0, 100, 255]));
        assert_eq!(*first.get_pixel(0, 0), Rgba([0, 3, 100, 255]));
    }

    #[test]
    fn test_size_change_reallocates_once() {
        let mut manager = CaptureBufferManager::new();
        let mut small = FakeSource::new(4, 4, PixelFormat::Rgba8);
        let mut large = FakeSource::new(6, 5, PixelFormat::Rgba8);

        manager.update(&mut small).unwrap();
        assert_eq!(manager.allocation_count(), 1);

        manager.update(&mut large).unwrap();
        assert_eq!(manager.allocation_count(), 2);
        let frame = manager.frame().unwrap();
        assert_eq!((frame.width, frame.height), (6, 5));
        assert_eq!(frame.pixels.len(), 6 * 5 * 4);

        manager.update(&mut large).unwrap();
        assert_eq!(manager.allocation_count(), 2);
    }

    #[test]
    fn test_output_is_flipped() {
        let mut manager = CaptureBufferManager::new();
        let mut source = FakeSource::new(3, 4, PixelFormat::Rgba8);

        let img = manager.update(&mut source).unwrap();
        assert_eq!(img.dimensions(), (3, 4));
        // Source row 0 is the bottom row
        assert_eq!(*img.get_pixel(2, 3), Rgba([2, 0, 100, 255]));
        assert_eq!(*img.get_pixel(1, 0), Rgba([1, 3, 100, 255]));
    }

    #[test]
    fn test_bgra_is_swizzled() {
        let mut manager = CaptureBufferManager::new();
        let mut source = FakeSource::new(2, 2, PixelFormat::Bgra8);

        let img = manager.update(&mut source).unwrap();
        // Stored as B=x, G=row, R=100
        assert_eq!(*img.get_pixel(1, 1), Rgba([100, 0, 1, 255]));
        // The stored frame keeps the source byte order
        assert_eq!(manager.frame().unwrap().format, PixelFormat::Bgra8);
    }

    #[test]
    fn test_unavailable_sources() {
        let mut manager = CaptureBufferManager::new();

        let mut not_ready = FakeSource::new(2, 2, PixelFormat::Rgba8);
        not_ready.ready = false;
        assert!(matches!(
            manager.update(&mut not_ready),
            Err(ScanError::SourceUnavailable(_))
        ));

        let mut empty = FakeSource::new(0, 3, PixelFormat::Rgba8);
        assert!(matches!(
            manager.update(&mut empty),
            Err(ScanError::SourceUnavailable(_))
        ));

        let mut short = FakeSource::new(4, 4, PixelFormat::Rgba8);
        short.data.truncate(10);
        assert!(matches!(
            manager.update(&mut short),
            Err(ScanError::SourceUnavailable(_))
        ));

        assert!(manager.frame().is_none());
        assert_eq!(manager.allocation_count(), 0);
    }

    #[test]
    fn test_extra_bytes_are_ignored() {
        let mut manager = CaptureBufferManager::new();
        let mut source = FakeSource::new(2, 2, PixelFormat::Rgba8);
        source.data.extend_from_slice(&[9; 16]);

        manager.update(&mut source).unwrap();
        assert_eq!(manager.frame().unwrap().pixels.len(), 16);
    }
}
