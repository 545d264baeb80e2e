//! Error taxonomy of the scan pipeline.
//!
//! Only structural failures are represented here. Unparseable OCR text is not
//! an error: the parser degrades to partial results instead.

/// Errors raised by the capture, image, and OCR stages of a scan cycle.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The capture source has no ready buffer. The cycle is skipped.
    #[error("capture source unavailable: {0}")]
    SourceUnavailable(String),

    /// Two images that must share dimensions do not.
    #[error("image dimensions must match: {left_width}x{left_height} vs {right_width}x{right_height}")]
    DimensionMismatch {
        left_width: u32,
        left_height: u32,
        right_width: u32,
        right_height: u32,
    },

    /// The OCR engine failed to produce text.
    #[error("OCR engine failure: {0}")]
    OcrEngine(String),
}

impl ScanError {
    /// Returns true for conditions that skip a cycle without being reported.
    pub fn is_skippable(&self) -> bool {
        matches!(self, ScanError::SourceUnavailable(_))
    }
}
