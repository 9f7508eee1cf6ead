use serde::{Deserialize, Serialize};

/// Canvas size in pixels, height first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub height: u32,
    pub width: u32,
}

impl Shape {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }
}

/// Cursor position. `x` runs down the rows, `y` runs along a row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Steepest tilt, either way, for which [`effective_height`] still covers
/// the rotated bitmap. Past 60° the footprint comes out shorter than the
/// bitmap and rows start to overlap.
pub const MAX_TILT_DEGREES: u32 = 60;

/// Row-axis footprint of a word bitmap rotated by `angle_deg`.
///
/// A rotated box reaches further down the rows than its raw height, by
/// `(h / tan|θ| + w) * sin|θ|`. Unrotated bitmaps keep their height.
/// Only meaningful up to [`MAX_TILT_DEGREES`].
pub fn effective_height(height: u32, width: u32, angle_deg: f32) -> u32 {
    let theta = f64::from(angle_deg).abs().to_radians();
    if theta == 0.0 {
        return height;
    }
    let reach = f64::from(height) / theta.tan() + f64::from(width);
    (reach * theta.sin()).ceil() as u32
}
