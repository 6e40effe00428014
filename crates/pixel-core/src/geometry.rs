//! Canvas Geometry
//!
//! Coordinate math shared by the resize, crop and extend tools:
//! - scale factors that fit or fill a target box while keeping aspect ratio
//! - aspect-locked dimension editing and area-preserving presets
//! - mapping an on-screen crop rectangle back into source image space
//! - directional canvas growth for generative extension

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Smallest canvas edge accepted by a resize
pub const MIN_CANVAS_EDGE: u32 = 100;

/// Largest canvas edge accepted by a resize
pub const MAX_CANVAS_EDGE: u32 = 5000;

/// Padding kept free around the canvas inside the editor viewport
pub const VIEWPORT_PADDING: f64 = 40.0;

/// Fraction of the image bounds the initial crop rectangle is inset by
pub const CROP_INSET: f64 = 0.1;

/// Geometry validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Canvas edge outside the accepted range
    #[error("dimension {value} outside {min}..={max}")]
    DimensionOutOfRange {
        /// Rejected value
        value: u32,
        /// Minimum edge
        min: u32,
        /// Maximum edge
        max: u32,
    },

    /// Zero-sized input where a ratio is required
    #[error("degenerate size: {0}")]
    Degenerate(String),
}

/// Pixel dimensions of a canvas or image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Size {
    /// Create a new size
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height.max(1))
    }

    /// Total pixel area
    #[must_use]
    pub fn area(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }

    /// Check if either edge is zero
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned rectangle in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub left: f64,
    /// Top edge
    pub top: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Right edge
    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Centre point
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Shrink by a fraction of the size on every side
    #[must_use]
    pub fn inset_fraction(&self, fraction: f64) -> Self {
        Self {
            left: self.left + self.width * fraction,
            top: self.top + self.height * fraction,
            width: self.width * (1.0 - 2.0 * fraction),
            height: self.height * (1.0 - 2.0 * fraction),
        }
    }

    /// Keep the width and derive the height from an aspect ratio
    #[must_use]
    pub fn with_aspect_ratio(&self, ratio: f64) -> Self {
        if ratio <= 0.0 || !ratio.is_finite() {
            return *self;
        }
        Self {
            height: self.width / ratio,
            ..*self
        }
    }

    /// Check if `other` lies entirely within this rectangle
    #[must_use]
    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Scale factor that fits `src` inside `target`
#[must_use]
pub fn fit_scale(src: (f64, f64), target: (f64, f64)) -> f64 {
    (target.0 / src.0).min(target.1 / src.1)
}

/// Scale factor that makes `src` cover `target`
#[must_use]
pub fn fill_scale(src: (f64, f64), target: (f64, f64)) -> f64 {
    (target.0 / src.0).max(target.1 / src.1)
}

/// Zoom that shows the whole canvas inside the editor container, never enlarging
#[must_use]
pub fn viewport_scale(container: (f64, f64), canvas: Size) -> f64 {
    if canvas.is_empty() {
        return 1.0;
    }
    let available = (
        (container.0 - VIEWPORT_PADDING).max(0.0),
        (container.1 - VIEWPORT_PADDING).max(0.0),
    );
    fit_scale(
        (f64::from(canvas.width), f64::from(canvas.height)),
        available,
    )
    .min(1.0)
}

/// Uniform scale used when an image is first placed on a canvas.
///
/// Images wider than the canvas (by aspect) are fitted by width, all others
/// by height.
#[must_use]
pub fn placement_scale(image: Size, canvas: Size) -> f64 {
    if image.is_empty() {
        return 1.0;
    }
    if image.aspect_ratio() > canvas.aspect_ratio() {
        f64::from(canvas.width) / f64::from(image.width)
    } else {
        f64::from(canvas.height) / f64::from(image.height)
    }
}

/// Uniform scale for a background image that must cover the whole canvas
#[must_use]
pub fn cover_scale(image: Size, canvas: Size) -> f64 {
    if image.is_empty() {
        return 1.0;
    }
    fill_scale(
        (f64::from(image.width), f64::from(image.height)),
        (f64::from(canvas.width), f64::from(canvas.height)),
    )
}

/// Height that keeps `original`'s aspect ratio for a new width
#[must_use]
pub fn height_for_width(width: u32, original: Size) -> u32 {
    if original.width == 0 {
        return 0;
    }
    let ratio = f64::from(original.height) / f64::from(original.width);
    (f64::from(width) * ratio).round() as u32
}

/// Width that keeps `original`'s aspect ratio for a new height
#[must_use]
pub fn width_for_height(height: u32, original: Size) -> u32 {
    if original.height == 0 {
        return 0;
    }
    let ratio = f64::from(original.width) / f64::from(original.height);
    (f64::from(height) * ratio).round() as u32
}

/// Size for an aspect-locked edit of one edge; the width wins when both are given
#[must_use]
pub fn aspect_locked(original: Size, width: Option<u32>, height: Option<u32>) -> Option<Size> {
    match (width, height) {
        (Some(width), _) => Some(Size::new(width, height_for_width(width, original))),
        (None, Some(height)) => Some(Size::new(width_for_height(height, original), height)),
        (None, None) => None,
    }
}

/// Named aspect ratio offered by the resize panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AspectPreset {
    /// Display name
    pub name: &'static str,
    /// Ratio as width:height
    pub ratio: (u32, u32),
    /// Short label
    pub label: &'static str,
}

impl AspectPreset {
    /// Look up a resize preset by name or label, ignoring case
    #[must_use]
    pub fn find(name: &str) -> Option<&'static AspectPreset> {
        RESIZE_PRESETS
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name) || p.label.eq_ignore_ascii_case(name))
    }

    /// Dimensions with this ratio and the same pixel area as `original`
    #[must_use]
    pub fn dimensions_for(&self, original: Size) -> Size {
        let aspect = f64::from(self.ratio.0) / f64::from(self.ratio.1);
        let height = (original.area() / aspect).sqrt();
        let width = height * aspect;
        Size::new(width.round() as u32, height.round() as u32)
    }
}

/// Resize presets
pub const RESIZE_PRESETS: [AspectPreset; 6] = [
    AspectPreset {
        name: "Instagram Story",
        ratio: (9, 16),
        label: "9:16",
    },
    AspectPreset {
        name: "Instagram Post",
        ratio: (1, 1),
        label: "1:1",
    },
    AspectPreset {
        name: "Youtube Thumbnail",
        ratio: (16, 9),
        label: "16:9",
    },
    AspectPreset {
        name: "Portrait",
        ratio: (2, 3),
        label: "2:3",
    },
    AspectPreset {
        name: "Facebook Cover",
        ratio: (851, 315),
        label: "2.7:1",
    },
    AspectPreset {
        name: "Twitter Header",
        ratio: (3, 1),
        label: "3:1",
    },
];

/// Crop ratio choice; `ratio` is `None` for freeform
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropPreset {
    /// Display name
    pub label: &'static str,
    /// Width over height
    pub ratio: Option<f64>,
}

impl CropPreset {
    /// Look up a crop preset by label, ignoring case
    #[must_use]
    pub fn find(label: &str) -> Option<&'static CropPreset> {
        CROP_PRESETS
            .iter()
            .find(|p| p.label.eq_ignore_ascii_case(label))
    }
}

/// Crop presets
pub const CROP_PRESETS: [CropPreset; 5] = [
    CropPreset {
        label: "Freeform",
        ratio: None,
    },
    CropPreset {
        label: "Square",
        ratio: Some(1.0),
    },
    CropPreset {
        label: "Widescreen",
        ratio: Some(16.0 / 9.0),
    },
    CropPreset {
        label: "Portrait",
        ratio: Some(4.0 / 5.0),
    },
    CropPreset {
        label: "Story",
        ratio: Some(9.0 / 16.0),
    },
];

/// Validated canvas resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResizePlan {
    /// Current canvas size
    pub from: Size,
    /// Requested canvas size
    pub to: Size,
}

impl ResizePlan {
    /// Validate a resize request
    pub fn new(from: Size, to: Size) -> Result<Self, GeometryError> {
        for value in [to.width, to.height] {
            if !(MIN_CANVAS_EDGE..=MAX_CANVAS_EDGE).contains(&value) {
                return Err(GeometryError::DimensionOutOfRange {
                    value,
                    min: MIN_CANVAS_EDGE,
                    max: MAX_CANVAS_EDGE,
                });
            }
        }
        Ok(Self { from, to })
    }

    /// Check if the request leaves the canvas unchanged
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// Check if either edge grows (otherwise the canvas is cropped)
    #[must_use]
    pub fn expands(&self) -> bool {
        self.to.width > self.from.width || self.to.height > self.from.height
    }
}

/// Crop window in the source image's unscaled pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    /// Left offset into the source image
    pub x: f64,
    /// Top offset into the source image
    pub y: f64,
    /// Width of the crop window
    pub width: f64,
    /// Height of the crop window
    pub height: f64,
}

/// Initial crop rectangle for an image's on-screen bounds
#[must_use]
pub fn initial_crop_rect(image_bounds: &Rect) -> Rect {
    image_bounds.inset_fraction(CROP_INSET)
}

/// Translate an on-screen crop rectangle into source image coordinates.
///
/// `scale` is the image's current (x, y) scale; zero scales count as 1.
#[must_use]
pub fn map_crop(crop: &Rect, image_bounds: &Rect, scale: (f64, f64)) -> CropRegion {
    let x = (crop.left - image_bounds.left).max(0.0);
    let y = (crop.top - image_bounds.top).max(0.0);
    let width = crop.width.min(image_bounds.width - x).max(0.0);
    let height = crop.height.min(image_bounds.height - y).max(0.0);

    let scale_x = if scale.0 == 0.0 { 1.0 } else { scale.0 };
    let scale_y = if scale.1 == 0.0 { 1.0 } else { scale.1 };

    CropRegion {
        x: x / scale_x,
        y: y / scale_y,
        width: width / scale_x,
        height: height / scale_y,
    }
}

/// Side of the image a generative extension grows towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Grow upwards
    Top,
    /// Grow downwards
    Bottom,
    /// Grow to the left
    Left,
    /// Grow to the right
    Right,
}

impl Direction {
    /// Check if the extension changes the width
    #[must_use]
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Focus token anchoring the original content on the opposite side
    #[must_use]
    pub fn focus_token(&self) -> &'static str {
        match self {
            Self::Left => "fo-right",
            Self::Right => "fo-left",
            Self::Top => "fo-bottom",
            Self::Bottom => "fo-top",
        }
    }
}

/// Dimensions after extending an image's scaled size in one direction
#[must_use]
pub fn extended_size(scaled: (f64, f64), direction: Direction, amount: u32) -> Size {
    let grow = f64::from(amount);
    let (dw, dh) = if direction.is_horizontal() {
        (grow, 0.0)
    } else {
        (0.0, grow)
    };
    Size::new(
        (scaled.0 + dw).round() as u32,
        (scaled.1 + dh).round() as u32,
    )
}

/// Scale that fits an extended image back onto the project canvas, never enlarging
#[must_use]
pub fn extension_fit_scale(extended: Size, canvas: Size) -> f64 {
    fit_scale(
        (
            f64::from(extended.width.max(1)),
            f64::from(extended.height.max(1)),
        ),
        (f64::from(canvas.width), f64::from(canvas.height)),
    )
    .min(1.0)
}

#[cfg(test)]
mod tests;
