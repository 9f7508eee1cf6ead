use image::{GrayImage, RgbaImage};
use rand::Rng;
use thiserror::Error;

use crate::{
    canvas::Canvas,
    geom::{Point, Shape},
    label::LabelRecord,
    word::WordImage,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackError {
    #[error("canvas shape {height}x{width} has an empty side")]
    InvalidShape { height: u32, width: u32 },
}

/// Tallest footprint seen in the current row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowExtent {
    #[default]
    Unset,
    Pixels(u32),
}

impl RowExtent {
    fn grow(&mut self, height: u32) {
        *self = match *self {
            RowExtent::Unset => RowExtent::Pixels(height),
            RowExtent::Pixels(h) => RowExtent::Pixels(h.max(height)),
        };
    }

    fn take(&mut self) -> u32 {
        match std::mem::take(self) {
            RowExtent::Unset => 0,
            RowExtent::Pixels(h) => h,
        }
    }
}

/// Why placement stopped before the words ran out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FullReason {
    /// The next word would reach the bottom of the canvas.
    RowEnd,
    /// After wrapping, the word still does not fit in the remaining space.
    NoFit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackState {
    Placing,
    Full(FullReason),
}

/// How a finished packing pass ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackEnd {
    WordsExhausted,
    CanvasFull { reason: FullReason, dropped: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Placed { at: Point, wrapped: bool },
    Dropped,
}

/// Caller-supplied layout knobs. Unset values are drawn at random.
#[derive(Clone, Copy, Debug)]
pub struct PackOptions {
    pub shape: Shape,
    pub start: Option<Point>,
    pub word_spacing: Option<u32>,
    pub line_spacing: Option<u32>,
}

impl PackOptions {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            start: None,
            word_spacing: None,
            line_spacing: None,
        }
    }

    /// Fixes every unset knob. Random starts land in the top-left fifth of
    /// the canvas; random spacings are below a fifth of the matching side.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Layout, PackError> {
        let Shape { height, width } = self.shape;
        if self.shape.is_empty() {
            return Err(PackError::InvalidShape { height, width });
        }
        let start = match self.start {
            Some(p) => p,
            None => Point::new(below(rng, height / 5), below(rng, width / 5)),
        };
        let word_spacing = self
            .word_spacing
            .unwrap_or_else(|| below(rng, width / 5));
        let line_spacing = self
            .line_spacing
            .unwrap_or_else(|| below(rng, height / 5));
        Ok(Layout {
            shape: self.shape,
            start,
            word_spacing,
            line_spacing,
        })
    }
}

fn below<R: Rng + ?Sized>(rng: &mut R, bound: u32) -> u32 {
    if bound == 0 { 0 } else { rng.random_range(0..bound) }
}

/// Fully resolved layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub shape: Shape,
    pub start: Point,
    pub word_spacing: u32,
    pub line_spacing: u32,
}

#[derive(Clone, Copy, Debug)]
struct Cursor {
    x: u32,
    y: u32,
    row: RowExtent,
}

/// Result of a packing pass.
#[derive(Clone, Debug)]
pub struct Packed {
    pub image: RgbaImage,
    pub mask: GrayImage,
    pub labels: Vec<LabelRecord>,
    pub end: PackEnd,
}

/// Shelf packer: one pass, input order, no backtracking.
///
/// Once a word fails to fit the packer is [`PackState::Full`] and every
/// later word is dropped.
pub struct Packer {
    canvas: Canvas,
    layout: Layout,
    cursor: Cursor,
    labels: Vec<LabelRecord>,
    state: PackState,
    dropped: usize,
}

impl Packer {
    pub fn new(background: &RgbaImage, layout: Layout) -> Self {
        Self {
            canvas: Canvas::new(background, layout.shape),
            cursor: Cursor {
                x: layout.start.x,
                y: layout.start.y,
                row: RowExtent::Unset,
            },
            layout,
            labels: Vec::new(),
            state: PackState::Placing,
            dropped: 0,
        }
    }

    pub fn state(&self) -> PackState {
        self.state
    }

    pub fn labels(&self) -> &[LabelRecord] {
        &self.labels
    }

    pub fn place(&mut self, word: &WordImage) -> Placement {
        if let PackState::Full(_) = self.state {
            self.dropped += 1;
            return Placement::Dropped;
        }

        let Shape { height, width } = self.layout.shape;
        let word_w = word.width();
        let word_h = word.effective_height();
        let mut cur = self.cursor;

        if cur.x.saturating_add(word_h) >= height {
            return self.stop(FullReason::RowEnd);
        }

        let wrapped = cur.y.saturating_add(word_w) >= width;
        if wrapped {
            cur.x = cur
                .x
                .saturating_add(cur.row.take())
                .saturating_add(self.layout.line_spacing);
            cur.y = self.layout.start.y;
        }

        if cur.x >= height || cur.y >= width || height - cur.x < word_h || width - cur.y < word_w {
            return self.stop(FullReason::NoFit);
        }

        let at = Point::new(cur.x, cur.y);
        self.canvas.paste_word(word, at);
        self.labels.push(LabelRecord {
            text: word.text.clone(),
            x: at.y,
            y: at.x,
            width: word_w,
            height: word_h,
            font_size: word.font_size,
        });

        cur.y = cur
            .y
            .saturating_add(word_w)
            .saturating_add(self.layout.word_spacing);
        cur.row.grow(word_h);
        self.cursor = cur;

        Placement::Placed { at, wrapped }
    }

    fn stop(&mut self, reason: FullReason) -> Placement {
        self.state = PackState::Full(reason);
        self.dropped += 1;
        Placement::Dropped
    }

    pub fn finish(self) -> Packed {
        let end = match self.state {
            PackState::Placing => PackEnd::WordsExhausted,
            PackState::Full(reason) => PackEnd::CanvasFull {
                reason,
                dropped: self.dropped,
            },
        };
        let (image, mask) = self.canvas.into_parts();
        Packed {
            image,
            mask,
            labels: self.labels,
            end,
        }
    }
}

/// Lays `words` out on `background` resized to `options.shape`.
pub fn pack<R: Rng + ?Sized>(
    words: &[WordImage],
    background: &RgbaImage,
    options: &PackOptions,
    rng: &mut R,
) -> Result<Packed, PackError> {
    let layout = options.resolve(rng)?;
    let mut packer = Packer::new(background, layout);
    for word in words {
        packer.place(word);
    }
    Ok(packer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};

    fn block(text: &str, w: u32, h: u32) -> WordImage {
        WordImage {
            text: text.into(),
            glyph: RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255])),
            mask: GrayImage::from_pixel(w, h, Luma([255])),
            angle: 0.0,
            font_size: 24,
        }
    }

    fn fixed(shape: Shape, start: Point, word: u32, line: u32) -> PackOptions {
        PackOptions {
            shape,
            start: Some(start),
            word_spacing: Some(word),
            line_spacing: Some(line),
        }
    }

    fn white(shape: Shape) -> RgbaImage {
        RgbaImage::from_pixel(shape.width, shape.height, Rgba([255, 255, 255, 255]))
    }

    fn run(words: &[WordImage], opts: &PackOptions) -> Packed {
        let mut rng = SmallRng::seed_from_u64(7);
        pack(words, &white(opts.shape), opts, &mut rng).unwrap()
    }

    #[test]
    fn two_short_words_share_a_row() {
        let shape = Shape::new(100, 100);
        let words = [block("A", 14, 20), block("B", 12, 20)];
        let packed = run(&words, &fixed(shape, Point::new(0, 0), 5, 5));

        assert_eq!(packed.end, PackEnd::WordsExhausted);
        assert_eq!(packed.labels.len(), 2);
        // labels report the column as `x` and the row as `y`
        assert_eq!(packed.labels[0].x, 0);
        assert_eq!(packed.labels[1].x, 14 + 5);
        assert!(packed.labels.iter().all(|l| l.y == 0));
        assert_eq!(packed.labels[1].text, "B");
        assert_eq!(packed.labels[1].font_size, 24);
    }

    #[test]
    fn too_wide_word_ends_packing() {
        let shape = Shape::new(100, 100);
        let words = [block("wide", 120, 20), block("b", 10, 20), block("c", 10, 20)];
        let packed = run(&words, &fixed(shape, Point::new(0, 0), 5, 5));

        assert!(packed.labels.is_empty());
        assert_eq!(
            packed.end,
            PackEnd::CanvasFull {
                reason: FullReason::NoFit,
                dropped: 3
            }
        );
    }

    #[test]
    fn wraps_to_next_row() {
        let shape = Shape::new(100, 100);
        let words = [block("a", 40, 10), block("b", 40, 16), block("c", 40, 12)];
        let layout = fixed(shape, Point::new(3, 2), 4, 6).resolve(&mut SmallRng::seed_from_u64(0));
        let mut packer = Packer::new(&white(shape), layout.unwrap());

        assert_eq!(
            packer.place(&words[0]),
            Placement::Placed { at: Point::new(3, 2), wrapped: false }
        );
        assert_eq!(
            packer.place(&words[1]),
            Placement::Placed { at: Point::new(3, 46), wrapped: false }
        );
        // 46 + 40 + 4 = 90, 90 + 40 >= 100 -> wrap by tallest (16) + line spacing (6)
        assert_eq!(
            packer.place(&words[2]),
            Placement::Placed { at: Point::new(25, 2), wrapped: true }
        );
        assert_eq!(packer.state(), PackState::Placing);
    }

    #[test]
    fn bottom_edge_stops_and_drops_rest() {
        let shape = Shape::new(50, 100);
        let words = [block("a", 10, 20), block("tall", 10, 45), block("c", 10, 5)];
        let packed = run(&words, &fixed(shape, Point::new(10, 0), 0, 0));

        // 10 + 45 reaches the bottom edge
        assert_eq!(packed.labels.len(), 1);
        assert_eq!(
            packed.end,
            PackEnd::CanvasFull {
                reason: FullReason::RowEnd,
                dropped: 2
            }
        );
    }

    #[test]
    fn wrapped_word_without_room_below_is_dropped() {
        let shape = Shape::new(50, 60);
        let words: Vec<_> = (0..6).map(|i| block(&i.to_string(), 50, 20)).collect();
        let packed = run(&words, &fixed(shape, Point::new(0, 0), 0, 0));

        // rows at 0 and 20; a third row at 40 leaves only 10px
        assert_eq!(packed.labels.len(), 2);
        assert_eq!(packed.labels[1].y, 20);
        assert_eq!(
            packed.end,
            PackEnd::CanvasFull {
                reason: FullReason::NoFit,
                dropped: 4
            }
        );
    }

    #[test]
    fn rotated_word_uses_effective_height() {
        let shape = Shape::new(200, 200);
        let mut word = block("r", 60, 20);
        word.angle = 10.0;
        let expected = word.effective_height();
        let packed = run(&[word], &fixed(shape, Point::new(0, 0), 0, 0));

        assert_eq!(packed.labels[0].height, expected);
        assert!(expected > 20);
    }

    #[test]
    fn random_layout_stays_in_top_left_fifth() {
        let shape = Shape::new(500, 250);
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..100 {
            let layout = PackOptions::new(shape).resolve(&mut rng).unwrap();
            assert!(layout.start.x < 100 && layout.start.y < 50);
            assert!(layout.word_spacing < 50 && layout.line_spacing < 100);
        }
    }

    #[test]
    fn empty_shape_is_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let err = PackOptions::new(Shape::new(0, 10)).resolve(&mut rng).unwrap_err();
        assert_eq!(err, PackError::InvalidShape { height: 0, width: 10 });
    }

    #[test]
    fn placed_boxes_are_marked_in_mask() {
        let shape = Shape::new(120, 120);
        let words: Vec<_> = (1..9).map(|i| block("w", 10 + i * 3, 8 + i)).collect();
        let packed = run(&words, &fixed(shape, Point::new(4, 4), 3, 3));

        for l in &packed.labels {
            for col in l.x..l.x + l.width {
                for row in l.y..l.y + l.height {
                    assert_eq!(packed.mask.get_pixel(col, row)[0], 255);
                    assert_eq!(*packed.image.get_pixel(col, row), Rgba([0, 0, 0, 255]));
                }
            }
        }
    }

    fn words_strategy() -> impl Strategy<Value = Vec<(u32, u32)>> {
        prop::collection::vec((1u32..90, 1u32..40), 0..40)
    }

    proptest! {
        #[test]
        fn placements_stay_inside_canvas(
            sizes in words_strategy(),
            height in 20u32..300,
            width in 20u32..300,
            sx in 0u32..60,
            sy in 0u32..60,
            ws in 0u32..20,
            ls in 0u32..20,
            angle in prop::sample::select(vec![0.0f32, 5.0, -8.0, 15.0]),
        ) {
            let shape = Shape::new(height, width);
            let words: Vec<_> = sizes
                .iter()
                .map(|&(w, h)| {
                    let mut b = block("p", w, h);
                    b.angle = angle;
                    b
                })
                .collect();
            let packed = run(&words, &fixed(shape, Point::new(sx, sy), ws, ls));

            prop_assert!(packed.labels.len() <= words.len());
            for l in &packed.labels {
                prop_assert!(l.x < width && l.y < height);
                prop_assert!(l.x + l.width <= width);
                prop_assert!(l.y + l.height <= height);
            }
            match packed.end {
                PackEnd::WordsExhausted => prop_assert_eq!(packed.labels.len(), words.len()),
                PackEnd::CanvasFull { dropped, .. } => {
                    prop_assert_eq!(packed.labels.len() + dropped, words.len())
                }
            }
        }

        #[test]
        fn rows_advance_monotonically(
            sizes in words_strategy(),
            sy in 0u32..30,
            ws in 0u32..10,
            ls in 0u32..10,
        ) {
            let shape = Shape::new(400, 240);
            let layout = fixed(shape, Point::new(0, sy), ws, ls)
                .resolve(&mut SmallRng::seed_from_u64(3))
                .unwrap();
            let mut packer = Packer::new(&white(shape), layout);
            let mut prev: Option<Point> = None;

            for &(w, h) in &sizes {
                match packer.place(&block("m", w, h)) {
                    Placement::Placed { at, wrapped } => {
                        if let Some(p) = prev {
                            if wrapped {
                                prop_assert!(at.x > p.x);
                                prop_assert_eq!(at.y, sy);
                            } else {
                                prop_assert_eq!(at.x, p.x);
                                prop_assert!(at.y > p.y);
                            }
                        }
                        prev = Some(at);
                    }
                    Placement::Dropped => {
                        prop_assert!(matches!(packer.state(), PackState::Full(_)));
                    }
                }
            }
        }

        #[test]
        fn roomy_canvas_places_every_word(sizes in prop::collection::vec((1u32..20, 1u32..20), 0..10)) {
            let shape = Shape::new(1000, 1000);
            let words: Vec<_> = sizes.iter().map(|&(w, h)| block("x", w, h)).collect();
            let packed = run(&words, &fixed(shape, Point::new(0, 0), 2, 2));
            prop_assert_eq!(packed.labels.len(), words.len());
            prop_assert_eq!(packed.end, PackEnd::WordsExhausted);
        }
    }
}
