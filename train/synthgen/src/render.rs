use std::path::PathBuf;

use ab_glyph::{Font, PxScale, ScaleFont, point};
use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgba, RgbaImage};
use imageproc::{
    definitions::{Clamp, Image},
    filter::gaussian_blur_f32,
    geometric_transformations::{Interpolation, Projection, warp, warp_into},
    pixelops::weighted_sum,
};

use crate::{
    color::Color,
    error::RenderError,
    fonts::{FontCache, FontFace},
    shape::{ShapedLine, shape_lines},
};
use packer::WordImage;

const STROKE_WIDTH: i32 = 1;
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Everything about a word's appearance except its text.
#[derive(Clone, Debug)]
pub struct GlyphStyle {
    pub font_path: PathBuf,
    pub font_size: u32,
    pub color: Color,
    pub mask_fill: u8,
    /// Counter-clockwise, in degrees.
    pub rotation: i32,
    pub perspective: bool,
    pub blur_sigma: f32,
}

/// Turns one word into a glyph bitmap and mask.
pub trait Rasterize: Sync {
    fn rasterize(&self, word: &str, style: &GlyphStyle) -> Result<WordImage, RenderError>;
}

/// Rasterizer backed by TrueType/OpenType files through [`FontCache`].
#[derive(Clone, Copy, Debug, Default)]
pub struct GlyphRenderer;

impl Rasterize for GlyphRenderer {
    fn rasterize(&self, word: &str, style: &GlyphStyle) -> Result<WordImage, RenderError> {
        if word.trim().is_empty() {
            return Err(RenderError::EmptyWord);
        }
        let face = FontCache::global().get(&style.font_path)?;
        render_word(&face, word, style)
    }
}

/// Shapes and draws `text` centered with a dark outline, padded by a quarter
/// of the font size, then applies the optional blur, perspective and
/// rotation. The mask covers the same padded box and goes through the same
/// warps.
pub fn render_word(face: &FontFace, text: &str, style: &GlyphStyle) -> Result<WordImage, RenderError> {
    if text.trim().is_empty() {
        return Err(RenderError::EmptyWord);
    }

    let font = face.outlines()?;
    let scale = PxScale::from(style.font_size as f32);
    let scaled = font.as_scaled(scale);
    let pitch = (scaled.height() + scaled.line_gap()).ceil().max(1.0) as u32;
    let line_height = scaled.height().ceil().max(1.0) as u32;

    let lines: Vec<&str> = text.lines().collect();
    let shaped = shape_lines(face, scale, &lines)?;
    let box_w = shaped.iter().map(ShapedLine::width).max().unwrap_or(0);
    let box_h = pitch * (lines.len() as u32 - 1) + line_height;
    if box_w == 0 {
        return Err(RenderError::EmptyWord);
    }

    let pad = style.font_size / 4;
    let mut glyph = RgbaImage::from_pixel(box_w + pad, box_h + pad, CLEAR);
    let fill = style.color.rgb().to_rgba();
    let stroke = Color::STROKE.rgb().to_rgba();

    for (i, line) in shaped.iter().enumerate() {
        let x = (pad / 2 + (box_w - line.width()) / 2) as f32;
        let baseline = (pad / 2 + i as u32 * pitch) as f32 + scaled.ascent();
        for dx in -STROKE_WIDTH..=STROKE_WIDTH {
            for dy in -STROKE_WIDTH..=STROKE_WIDTH {
                if dx != 0 || dy != 0 {
                    let origin = (x + dx as f32, baseline + dy as f32);
                    draw_line(&mut glyph, &font, line, origin, stroke);
                }
            }
        }
        draw_line(&mut glyph, &font, line, (x, baseline), fill);
    }

    let mask = GrayImage::from_pixel(glyph.width(), glyph.height(), Luma([style.mask_fill]));
    let (glyph, mask) = apply_effects(glyph, mask, style);

    Ok(WordImage {
        text: text.to_string(),
        glyph,
        mask,
        angle: style.rotation as f32,
        font_size: style.font_size,
    })
}

/// Blends the outlines of `line` into `canvas` with the pen at `origin`.
fn draw_line<F: Font>(
    canvas: &mut RgbaImage,
    font: &F,
    line: &ShapedLine,
    origin: (f32, f32),
    color: Rgba<u8>,
) {
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);
    for glyph in &line.glyphs {
        let mut glyph = glyph.clone();
        glyph.position = point(origin.0 + glyph.position.x, origin.1 + glyph.position.y);
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let x = bounds.min.x as i32 + gx as i32;
            let y = bounds.min.y as i32 + gy as i32;
            if x < 0 || y < 0 || x >= width || y >= height {
                return;
            }
            let coverage = coverage.clamp(0.0, 1.0);
            let pixel = canvas.get_pixel_mut(x as u32, y as u32);
            *pixel = weighted_sum(*pixel, color, 1.0 - coverage, coverage);
        });
    }
}

/// Blur touches the glyph only; perspective and rotation move glyph and
/// mask together so they keep the same size.
fn apply_effects(
    mut glyph: RgbaImage,
    mut mask: GrayImage,
    style: &GlyphStyle,
) -> (RgbaImage, GrayImage) {
    if style.blur_sigma > 0.0 {
        glyph = gaussian_blur_f32(&glyph, style.blur_sigma);
    }
    if style.perspective {
        if let Some(projection) = keystone(glyph.width(), glyph.height()) {
            glyph = warp(&glyph, &projection, Interpolation::Bilinear, CLEAR);
            mask = warp(&mask, &projection, Interpolation::Bilinear, Luma([0]));
        }
    }
    if style.rotation != 0 {
        let degrees = style.rotation as f32;
        glyph = rotate_expand(&glyph, degrees, Interpolation::Nearest, CLEAR);
        mask = rotate_expand(&mask, degrees, Interpolation::Bicubic, Luma([0]));
    }
    (glyph, mask)
}

/// Pulls the bottom edge in to 20%..80% of the width.
fn keystone(width: u32, height: u32) -> Option<Projection> {
    let (w, h) = (width as f32, height as f32);
    Projection::from_control_points(
        [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)],
        [(0.0, 0.0), (w, 0.0), (w * 0.8, h), (w * 0.2, h)],
    )
}

/// Rotates counter-clockwise about the center, growing the bitmap so no
/// corner is clipped.
pub fn rotate_expand<P>(image: &Image<P>, degrees: f32, interpolation: Interpolation, default: P) -> Image<P>
where
    P: Pixel + Send + Sync,
    <P as Pixel>::Subpixel: Send + Sync + Into<f32> + Clamp<f32>,
{
    let (w, h) = (image.width() as f32, image.height() as f32);
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let out_w = (w * cos.abs() + h * sin.abs()).ceil().max(1.0) as u32;
    let out_h = (w * sin.abs() + h * cos.abs()).ceil().max(1.0) as u32;

    let projection = Projection::translate(out_w as f32 / 2.0, out_h as f32 / 2.0)
        * Projection::rotate(-theta)
        * Projection::translate(-w / 2.0, -h / 2.0);

    let mut out = ImageBuffer::from_pixel(out_w, out_h, default);
    warp_into(image, &projection, interpolation, default, &mut out);
    out
}

/// Looks for a font usable in tests.
#[cfg(test)]
pub(crate) fn test_font() -> Option<PathBuf> {
    let candidates = [
        "/usr/share/fonts/truetype/noto/NotoSansSinhala-Regular.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/Library/Fonts/Arial Unicode.ttf",
    ];
    std::env::var_os("SYNTHGEN_TEST_FONT")
        .map(PathBuf::from)
        .into_iter()
        .chain(candidates.iter().map(PathBuf::from))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn style(font_path: PathBuf) -> GlyphStyle {
        GlyphStyle {
            font_path,
            font_size: 32,
            color: Color(Rgb([200, 30, 30])),
            mask_fill: 255,
            rotation: 0,
            perspective: false,
            blur_sigma: 0.0,
        }
    }

    #[test]
    fn empty_word_fails_before_font_lookup() {
        let err = GlyphRenderer
            .rasterize("  ", &style(PathBuf::from("/nonexistent.ttf")))
            .unwrap_err();
        assert!(matches!(err, RenderError::EmptyWord));
    }

    #[test]
    fn bad_font_path_is_reported() {
        let err = GlyphRenderer
            .rasterize("word", &style(PathBuf::from("/nonexistent.ttf")))
            .unwrap_err();
        assert!(matches!(err, RenderError::FontRead { .. }));
    }

    #[test]
    fn rotation_expands_bounds() {
        let img = GrayImage::from_pixel(40, 10, Luma([255]));
        let out = rotate_expand(&img, 30.0, Interpolation::Bicubic, Luma([0]));
        // 40 cos30 + 10 sin30 = 39.6, 40 sin30 + 10 cos30 = 28.7
        assert_eq!(out.dimensions(), (40, 29));
        assert_eq!(out.get_pixel(20, 14)[0], 255);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn quarter_turn_swaps_sides() {
        let img = RgbaImage::from_pixel(30, 12, Rgba([1, 2, 3, 255]));
        let out = rotate_expand(&img, 90.0, Interpolation::Nearest, CLEAR);
        let (w, h) = out.dimensions();
        assert!((12..=13).contains(&w) && (30..=31).contains(&h));
    }

    #[test]
    fn keystone_keeps_top_edge() {
        let p = keystone(100, 40).unwrap();
        let (x, y) = p * (100.0, 0.0);
        assert!((x - 100.0).abs() < 1e-3 && y.abs() < 1e-3);
        let (x, _) = p * (0.0, 40.0);
        assert!((x - 20.0).abs() < 1e-3);
    }

    #[test]
    fn blur_and_perspective_keep_glyph_and_mask_aligned() {
        let glyph = RgbaImage::from_pixel(100, 40, Rgba([200, 30, 30, 255]));
        let mask = GrayImage::from_pixel(100, 40, Luma([255]));
        let s = GlyphStyle {
            perspective: true,
            blur_sigma: 1.5,
            ..style(PathBuf::new())
        };
        let (glyph, mask) = apply_effects(glyph, mask, &s);

        assert_eq!(glyph.dimensions(), (100, 40));
        assert_eq!(mask.dimensions(), glyph.dimensions());
        // the keystone pulls the bottom corners in, for the mask as well
        assert_eq!(mask.get_pixel(0, 39)[0], 0);
        assert_eq!(mask.get_pixel(99, 39)[0], 0);
        assert_eq!(glyph.get_pixel(0, 39)[3], 0);
        assert!(mask.get_pixel(50, 20)[0] > 250);
        assert!(glyph.get_pixel(50, 20)[3] > 200);
    }

    #[test]
    fn rotation_after_perspective_keeps_sizes_equal() {
        let glyph = RgbaImage::from_pixel(60, 20, Rgba([0, 0, 0, 255]));
        let mask = GrayImage::from_pixel(60, 20, Luma([255]));
        let s = GlyphStyle {
            perspective: true,
            rotation: -20,
            ..style(PathBuf::new())
        };
        let (glyph, mask) = apply_effects(glyph, mask, &s);
        assert_eq!(glyph.dimensions(), mask.dimensions());
        assert!(glyph.height() > 20);
    }

    #[test]
    fn renders_padded_word_with_mask() {
        let Some(path) = test_font() else {
            eprintln!("no test font found, skipping");
            return;
        };
        let face = FontCache::global().get(&path).unwrap();
        let s = style(path);
        let word = render_word(&face, "Hello", &s).unwrap();

        assert_eq!(word.glyph.dimensions(), word.mask.dimensions());
        assert!(word.width() > 8 + 32 / 4);
        assert!(word.mask.pixels().all(|p| p[0] == 255));
        assert!(word.glyph.pixels().any(|p| p[3] > 0));
        assert_eq!(word.angle, 0.0);
        // the padding row at the top stays clear
        assert!((0..word.width()).all(|x| word.glyph.get_pixel(x, 0)[3] == 0));
    }

    #[test]
    fn rotated_word_grows() {
        let Some(path) = test_font() else {
            return;
        };
        let face = FontCache::global().get(&path).unwrap();
        let flat = render_word(&face, "rotate", &style(path.clone())).unwrap();
        let tilted = render_word(
            &face,
            "rotate",
            &GlyphStyle {
                rotation: 12,
                ..style(path)
            },
        )
        .unwrap();

        assert!(tilted.height() > flat.height());
        assert_eq!(tilted.glyph.dimensions(), tilted.mask.dimensions());
        assert!(tilted.effective_height() >= tilted.height());
    }

    #[test]
    fn shaped_width_sets_the_box() {
        let Some(path) = test_font() else {
            return;
        };
        let face = FontCache::global().get(&path).unwrap();
        let s = style(path);
        let shaped = shape_lines(&face, PxScale::from(32.0), &["Sinhala"]).unwrap();
        let word = render_word(&face, "Sinhala", &s).unwrap();
        assert_eq!(word.width(), shaped[0].width() + 32 / 4);
    }

    #[test]
    fn multiline_text_stacks_lines() {
        let Some(path) = test_font() else {
            return;
        };
        let face = FontCache::global().get(&path).unwrap();
        let one = render_word(&face, "ab", &style(path.clone())).unwrap();
        let two = render_word(&face, "ab\nab", &style(path)).unwrap();
        assert!(two.height() > one.height());
        assert_eq!(two.width(), one.width());
    }
}
