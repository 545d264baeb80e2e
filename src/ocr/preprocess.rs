use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage, RgbImage};

use crate::error::ScanError;

const OPAQUE: u8 = 255;
const BLACK: Rgba<u8> = Rgba([0, 0, 0, OPAQUE]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, OPAQUE]);

/// Resamples the image to `width` x `height` with a bilinear (triangle) filter.
pub fn rescale(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Triangle)
}

/// Crops a sub-region given as fractions of the image size.
///
/// `x` and `y` are clamped to [0, 1], `width` to [0, 1 - x] and `height` to
/// [0, 1 - y]. Pixel bounds are rounded to the nearest pixel.
pub fn crop(img: &RgbaImage, x: f32, y: f32, width: f32, height: f32) -> RgbaImage {
    let (w, h) = img.dimensions();

    let x = x.clamp(0.0, 1.0);
    let y = y.clamp(0.0, 1.0);
    let width = width.clamp(0.0, 1.0 - x);
    let height = height.clamp(0.0, 1.0 - y);

    let x0 = ((x * w as f32).round() as u32).min(w);
    let y0 = ((y * h as f32).round() as u32).min(h);
    let rw = ((width * w as f32).round() as u32).min(w - x0);
    let rh = ((height * h as f32).round() as u32).min(h - y0);

    imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// Converts the image to opaque black and white.
///
/// A pixel counts as black when each of R, G and B, normalized to [0, 1], is
/// below `threshold`. The output pixel is black when `is_black XOR invert`.
/// Input alpha is ignored.
pub fn black_mask(img: &RgbaImage, threshold: f32, invert: bool) -> RgbaImage {
    RgbaImage::from_fn(img.width(), img.height(), |x, y| {
        let pixel = img.get_pixel(x, y);
        let is_black = pixel.0[..3]
            .iter()
            .all(|&c| (c as f32 / 255.0) < threshold);

        if is_black ^ invert { BLACK } else { WHITE }
    })
}

/// Opaque white where `alpha / 255 >= threshold`, opaque black elsewhere.
pub fn alpha_contrast(img: &RgbaImage, threshold: f32) -> RgbaImage {
    RgbaImage::from_fn(img.width(), img.height(), |x, y| {
        let alpha = img.get_pixel(x, y)[3] as f32 / 255.0;
        if alpha >= threshold { WHITE } else { BLACK }
    })
}

/// Multiplies every channel of `a` and `b` in normalized space.
pub fn multiply_blend(a: &RgbaImage, b: &RgbaImage) -> Result<RgbaImage, ScanError> {
    if a.dimensions() != b.dimensions() {
        return Err(ScanError::DimensionMismatch {
            left_width: a.width(),
            left_height: a.height(),
            right_width: b.width(),
            right_height: b.height(),
        });
    }

    let mut output = RgbaImage::new(a.width(), a.height());
    for ((out, pa), pb) in output.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        for c in 0..4 {
            out[c] = multiply_channel(pa[c], pb[c]);
        }
    }
    Ok(output)
}

/// `a * b / 255`, rounded. Symmetric in its arguments.
fn multiply_channel(a: u8, b: u8) -> u8 {
    ((a as u32 * b as u32 + 127) / 255) as u8
}

/// Drops the alpha channel.
pub fn to_three_channel(img: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        image::Rgb([p[0], p[1], p[2]])
    })
}
