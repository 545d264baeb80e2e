//! Frame capture: the owned frame buffer and the sources that feed it.
//!
//! - `buffer`: `CaptureSource` trait and `CaptureBufferManager`
//! - `replay`: still-image source, available everywhere
//! - `screenshot` / `window`: live window capture (Windows only)

pub mod buffer;
pub mod replay;
#[cfg(windows)]
pub mod screenshot;
#[cfg(windows)]
pub mod window;

pub use buffer::{CaptureBufferManager, CaptureSource};
pub use replay::ImageFileSource;
#[cfg(windows)]
pub use screenshot::WindowCaptureSource;
