//! Pixel Media - Images Outside the Canvas
//!
//! This crate talks to everything that produces image bytes or URLs:
//! - Transform: image CDN transform URLs (background removal, generative fill)
//! - Stock: stock photo search and the mandatory download ping
//! - Upload: storing uploaded images and probing their dimensions
//! - Error: Error types for media operations

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod stock;
pub mod transform;
pub mod upload;

pub use error::{Error, Result};
pub use stock::{StockPhoto, StockPhotoClient, StockSearch, StockSettings};
pub use transform::{has_background_removal, TransformUrl, Transformer};
pub use upload::{MediaSettings, MediaStore, StoredMedia, UploadResponse};
