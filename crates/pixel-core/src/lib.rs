//! Pixel Core - Editor Rules and Geometry
//!
//! This crate holds the pure, side-effect free parts of the Pixel editor:
//! - Access: plan tiers, the tool access table and quota checks
//! - Geometry: resize, crop, extend and viewport coordinate math
//! - Adjust: the filter adjustment table and per-project adjustment values
//!
//! Nothing in here touches the network, the clock or the database. The
//! stateful pieces (history, autosave, storage) live in `pixel-canvas`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod adjust;
pub mod geometry;

pub use access::{AccessDenial, Plan, PlanAccess, PlanLimits, ToolId};
pub use adjust::{AdjustmentValues, FilterConfig, FilterKey, FILTER_CONFIGS};
pub use geometry::{
    aspect_locked, AspectPreset, CropPreset, CropRegion, Direction, GeometryError, Rect, ResizePlan, Size,
    CROP_PRESETS, RESIZE_PRESETS,
};
