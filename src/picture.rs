//! PNG images ready to be embedded in a slide

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use crate::error::Result;

/// An encoded PNG and its pixel size
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Picture {
    /// Encode an in-memory image as PNG
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        let (width, height) = image.dimensions();
        Ok(Self { png, width, height })
    }

    /// Decode any supported image format and re-encode it as PNG
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?;
        Self::from_image(&image)
    }
}
