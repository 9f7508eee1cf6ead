use serde::{Deserialize, Serialize};

/// Bounding box of one placed word.
///
/// `x` is the column and `y` the row of the upper-left corner, which is the
/// transpose of the packer's cursor naming. Downstream training code reads
/// this layout, so keep it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub text: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub font_size: u32,
}
