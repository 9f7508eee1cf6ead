//! Text shaping through the font's own OpenType tables.
//!
//! Sinhala is not drawable one code point at a time: prebase vowel signs
//! move in front of their consonant, al-lakuna and ZWJ sequences become
//! conjunct glyphs, and marks are positioned against their base.

use ab_glyph::{Font, Glyph, GlyphId, PxScale, ScaleFont, point};
use harfrust::{ShaperData, UnicodeBuffer};

use crate::{error::RenderError, fonts::FontFace};

/// One line of glyphs in visual order. Positions are pixels from the pen
/// start on the baseline, y growing downwards.
#[derive(Clone, Debug, Default)]
pub struct ShapedLine {
    pub glyphs: Vec<Glyph>,
    pub advance: f32,
}

impl ShapedLine {
    pub fn width(&self) -> u32 {
        self.advance.ceil().max(0.0) as u32
    }
}

/// Shapes every line of `lines` with one shaper built for `face`.
pub fn shape_lines(
    face: &FontFace,
    scale: PxScale,
    lines: &[&str],
) -> Result<Vec<ShapedLine>, RenderError> {
    let tables = face.tables()?;
    // ab_glyph scales against ascent - descent, so font units go through the
    // same factor to keep shaped advances and outlines in step
    let px = face.outlines()?.as_scaled(scale).h_scale_factor();

    let data = ShaperData::new(&tables);
    let shaper = data.shaper(&tables).point_size(Some(scale.y)).build();

    let shaped = lines
        .iter()
        .map(|line| {
            let mut buffer = UnicodeBuffer::new();
            buffer.push_str(line);
            buffer.guess_segment_properties();
            let output = shaper.shape(buffer, &[]);

            let mut pen = 0.0;
            let glyphs = output
                .glyph_infos()
                .iter()
                .zip(output.glyph_positions())
                .map(|(info, pos)| {
                    let at = point(
                        pen + pos.x_offset as f32 * px,
                        -(pos.y_offset as f32 * px),
                    );
                    pen += pos.x_advance as f32 * px;
                    GlyphId(info.glyph_id as u16).with_scale_and_position(scale, at)
                })
                .collect();
            ShapedLine {
                glyphs,
                advance: pen,
            }
        })
        .collect();
    Ok(shaped)
}
