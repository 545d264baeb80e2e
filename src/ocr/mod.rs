pub mod engine;
pub mod preprocess;
pub mod setup;

pub use engine::{OcrEngine, TesseractEngine};
pub use setup::ensure_tesseract;

use anyhow::{Context, Result};
use image::{RgbaImage, RgbImage};
use std::path::{Path, PathBuf};

use crate::config::{RegionRect, ScanConfig, REFERENCE_HEIGHT, REFERENCE_WIDTH};
use preprocess::{alpha_contrast, black_mask, crop, multiply_blend, rescale, to_three_channel};

/// Intermediate images of one scan cycle.
#[derive(Clone, Debug)]
pub struct RegionImages {
    /// Main stat region after the inverted black mask
    pub main_mask: RgbImage,
    /// Sub stat region after the inverted black mask
    pub sub_mask: RgbaImage,
    /// Sub stat region after the alpha contrast mask
    pub sub_stencil: RgbaImage,
    /// `sub_mask` multiplied by `sub_stencil`
    pub sub_blended: RgbImage,
}

fn crop_rect(img: &RgbaImage, rect: &RegionRect) -> RgbaImage {
    let (x, y, w, h) = rect.to_relative();
    crop(img, x, y, w, h)
}

/// Rescales an oriented frame to the reference resolution and produces the
/// OCR input images of both regions.
pub fn extract_regions(frame: &RgbaImage, config: &ScanConfig) -> Result<RegionImages> {
    let reference = rescale(frame, REFERENCE_WIDTH, REFERENCE_HEIGHT);

    let main = crop_rect(&reference, &config.main_stat_region);
    let main_mask = to_three_channel(&black_mask(&main, config.black_threshold, true));

    let sub = crop_rect(&reference, &config.sub_stats_region);
    let sub_mask = black_mask(&sub, config.black_threshold, true);
    let sub_stencil = alpha_contrast(&sub, config.alpha_threshold);
    let sub_blended = to_three_channel(&multiply_blend(&sub_mask, &sub_stencil)?);

    Ok(RegionImages {
        main_mask,
        sub_mask,
        sub_stencil,
        sub_blended,
    })
}

/// Runs one recognition pass. Engine failures are logged and read as no text.
fn recognize(engine: &mut dyn OcrEngine, img: &RgbImage, label: &str) -> String {
    let result = engine
        .set_image(img)
        .and_then(|_| engine.get_text());
    match result {
        Ok(text) => text,
        Err(e) => {
            crate::log(&format!("OCR failed on {} region: {:#}", label, e));
            String::new()
        }
    }
}

/// Recognizes both regions. The main stat text is trimmed and terminated by a
/// newline, followed by the sub stat text.
pub fn recognize_regions(engine: &mut dyn OcrEngine, regions: &RegionImages) -> String {
    let main_text = recognize(engine, &regions.main_mask, "main stat");
    let sub_text = recognize(engine, &regions.sub_blended, "sub stats");

    let mut text = String::with_capacity(main_text.len() + sub_text.len() + 1);
    text.push_str(main_text.trim());
    text.push('\n');
    text.push_str(&sub_text);
    text
}

/// Writes the region images of one cycle as PNG files prefixed with `prefix`.
pub fn save_debug_images(regions: &RegionImages, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let paths = [
        dir.join(format!("{}_main_mask.png", prefix)),
        dir.join(format!("{}_sub_mask.png", prefix)),
        dir.join(format!("{}_sub_stencil.png", prefix)),
        dir.join(format!("{}_sub_blended.png", prefix)),
    ];

    regions.main_mask.save(&paths[0])
        .with_context(|| format!("Failed to save {}", paths[0].display()))?;
    regions.sub_mask.save(&paths[1])
        .with_context(|| format!("Failed to save {}", paths[1].display()))?;
    regions.sub_stencil.save(&paths[2])
        .with_context(|| format!("Failed to save {}", paths[2].display()))?;
    regions.sub_blended.save(&paths[3])
        .with_context(|| format!("Failed to save {}", paths[3].display()))?;

    Ok(paths.to_vec())
}
