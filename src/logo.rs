//! Company logos received as base64
//!
//! A bad logo never fails a report: it is logged and the cover simply has no
//! logo.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbaImage};
use tracing::warn;

use crate::error::Result;
use crate::picture::Picture;

/// Height every logo is scaled to before stacking
pub const COMPOSITE_LOGO_HEIGHT: u32 = 120;

/// Strip an optional `data:image/...;base64,` prefix and decode
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => encoded,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| crate::Error::InvalidPayload(format!("invalid base64 image: {}", e)))
}

/// Decode a single logo; `None` when absent or unreadable
pub fn decode_logo(encoded: Option<&str>) -> Option<Picture> {
    let encoded = encoded.map(str::trim).filter(|s| !s.is_empty())?;
    match decode_base64(encoded).and_then(|bytes| Picture::decode(&bytes)) {
        Ok(picture) => Some(picture),
        Err(e) => {
            warn!("Ignoring logo: {}", e);
            None
        }
    }
}

/// Stack several logos vertically on a transparent canvas
///
/// Each logo is resized to `target_height` keeping its aspect ratio and
/// centred horizontally. Unreadable logos are skipped.
pub fn composite_logos(encoded: &[String], target_height: u32) -> Option<Picture> {
    let logos: Vec<DynamicImage> = encoded
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let decoded = decode_base64(item)
                .and_then(|bytes| image::load_from_memory(&bytes).map_err(Into::into));
            match decoded {
                Ok(image) => Some(resize_to_height(&image, target_height)),
                Err(e) => {
                    warn!("Skipping logo #{}: {}", i + 1, e);
                    None
                }
            }
        })
        .collect();

    if logos.is_empty() {
        return None;
    }

    let canvas = stack_vertically(&logos);
    match Picture::from_image(&DynamicImage::ImageRgba8(canvas)) {
        Ok(picture) => Some(picture),
        Err(e) => {
            warn!("Could not encode composite logo: {}", e);
            None
        }
    }
}

fn resize_to_height(image: &DynamicImage, target_height: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if height == 0 || target_height == 0 {
        return image.clone();
    }
    let new_width = ((width as u64 * target_height as u64) / height as u64).max(1) as u32;
    image.resize_exact(new_width, target_height, FilterType::Lanczos3)
}

fn stack_vertically(logos: &[DynamicImage]) -> RgbaImage {
    let width = logos.iter().map(|l| l.width()).max().unwrap_or(1);
    let height = logos.iter().map(|l| l.height()).sum::<u32>().max(1);
    let mut canvas = RgbaImage::new(width, height);

    let mut y: i64 = 0;
    for logo in logos {
        let x = (width - logo.width()) as i64 / 2;
        imageops::overlay(&mut canvas, &logo.to_rgba8(), x, y);
        y += logo.height() as i64;
    }
    canvas
}
