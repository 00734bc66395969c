//! Local trim of fully-transparent borders.
//!
//! Runs after background removal. The operation is deterministic and
//! idempotent: trimming an already-trimmed image returns identical pixels.

use std::io::Cursor;

use image::{GenericImageView, ImageFormat};

/// Errors from decoding or re-encoding an image during trim.
#[derive(Debug, thiserror::Error)]
pub enum TrimError {
    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("Image is fully transparent; nothing left after trim")]
    FullyTransparent,
}

/// A trimmed PNG and its dimensions.
#[derive(Debug, Clone)]
pub struct TrimmedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Whether any border was actually removed.
    pub trimmed: bool,
}

/// Remove fully-transparent rows and columns from the image border and
/// re-encode as PNG.
pub fn trim_transparent(bytes: &[u8]) -> Result<TrimmedImage, TrimError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in rgba.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            }
        });
    }

    let (min_x, min_y, max_x, max_y) = bounds.ok_or(TrimError::FullyTransparent)?;
    let crop_w = max_x - min_x + 1;
    let crop_h = max_y - min_y + 1;
    let trimmed = crop_w != width || crop_h != height;

    let cropped = image::imageops::crop_imm(&rgba, min_x, min_y, crop_w, crop_h).to_image();

    let mut out = Cursor::new(Vec::new());
    cropped.write_to(&mut out, ImageFormat::Png)?;

    Ok(TrimmedImage {
        png: out.into_inner(),
        width: crop_w,
        height: crop_h,
        trimmed,
    })
}

/// Read pixel dimensions from encoded image bytes.
pub fn dimensions(bytes: &[u8]) -> Result<(u32, u32), TrimError> {
    Ok(image::load_from_memory(bytes)?.dimensions())
}
