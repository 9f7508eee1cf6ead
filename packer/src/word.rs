use image::{GrayImage, RgbaImage};

use crate::geom::effective_height;

/// A rendered word: glyph bitmap plus its mask, both already rotated.
#[derive(Clone, Debug)]
pub struct WordImage {
    pub text: String,
    pub glyph: RgbaImage,
    pub mask: GrayImage,
    /// Rotation applied to both bitmaps, in degrees.
    pub angle: f32,
    pub font_size: u32,
}

impl WordImage {
    pub fn width(&self) -> u32 {
        self.glyph.width()
    }

    pub fn height(&self) -> u32 {
        self.glyph.height()
    }

    pub fn effective_height(&self) -> u32 {
        effective_height(self.height(), self.width(), self.angle)
    }
}
