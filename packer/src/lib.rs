//! Greedy row packing of rendered word bitmaps onto a fixed-size canvas.
//!
//! Words are placed in reading order along a row until the next one no
//! longer fits, then the cursor wraps to a new row. Every placed word yields
//! a [`LabelRecord`] and is composited into both the canvas image and the
//! segmentation mask.

pub mod canvas;
pub mod geom;
pub mod label;
pub mod packer;
pub mod word;

pub use canvas::Canvas;
pub use geom::{MAX_TILT_DEGREES, Point, Shape, effective_height};
pub use label::LabelRecord;
pub use packer::{
    FullReason, Layout, PackEnd, PackError, PackOptions, PackState, Packed, Packer, Placement,
    RowExtent, pack,
};
pub use word::WordImage;
