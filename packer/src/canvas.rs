use image::{GrayImage, Luma, Rgba, RgbaImage, imageops::FilterType};

use crate::{
    geom::{Point, Shape},
    word::WordImage,
};

/// Glyph alpha is multiplied by this before compositing.
pub const CONTRAST_GAIN: u16 = 3;

/// Working surface: the composed picture and its segmentation mask.
#[derive(Clone, Debug)]
pub struct Canvas {
    image: RgbaImage,
    mask: GrayImage,
}

impl Canvas {
    /// Starts from `background` stretched to `shape` and an all-zero mask.
    pub fn new(background: &RgbaImage, shape: Shape) -> Self {
        let image = if background.width() == 0 || background.height() == 0 {
            RgbaImage::from_pixel(shape.width, shape.height, Rgba([0, 0, 0, 255]))
        } else if background.dimensions() == (shape.width, shape.height) {
            background.clone()
        } else {
            image::imageops::resize(background, shape.width, shape.height, FilterType::Triangle)
        };
        let mask = GrayImage::new(shape.width, shape.height);
        Self { image, mask }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Composites `word` with its upper-left corner at row `at.x`, column `at.y`.
    /// Pixels falling outside the canvas are clipped.
    pub fn paste_word(&mut self, word: &WordImage, at: Point) {
        let (cw, ch) = self.image.dimensions();

        for (gx, gy, px) in word.glyph.enumerate_pixels() {
            let (tx, ty) = (at.y + gx, at.x + gy);
            if tx >= cw || ty >= ch {
                continue;
            }
            let alpha = (u16::from(px[3]) * CONTRAST_GAIN).min(255);
            if alpha == 0 {
                continue;
            }
            let dst = self.image.get_pixel_mut(tx, ty);
            for c in 0..4 {
                let src = if c == 3 { 255 } else { px[c] };
                dst[c] = blend(src, dst[c], alpha);
            }
        }

        for (mx, my, m) in word.mask.enumerate_pixels() {
            let (tx, ty) = (at.y + mx, at.x + my);
            if tx >= cw || ty >= ch {
                continue;
            }
            let Luma([value]) = *m;
            let dst = self.mask.get_pixel_mut(tx, ty);
            dst[0] = blend(value, dst[0], u16::from(value));
        }
    }

    pub fn into_parts(self) -> (RgbaImage, GrayImage) {
        (self.image, self.mask)
    }
}

/// `src * a + dst * (1 - a)` with `a` in 0..=255.
fn blend(src: u8, dst: u8, alpha: u16) -> u8 {
    let v = u32::from(src) * u32::from(alpha) + u32::from(dst) * u32::from(255 - alpha);
    ((v + 127) / 255) as u8
}
