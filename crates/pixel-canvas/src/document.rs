//! Canvas Document Types
//!
//! The canvas document is the serialized object graph of one editing
//! session. Only the fields the backend reasons about (dimensions, object
//! list, background) are typed; everything else the canvas library writes is
//! carried through untouched.

use async_trait::async_trait;
use pixel_core::geometry::{cover_scale, placement_scale, CropRegion, Rect, Size};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Background colour of a fresh canvas
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

/// Serialized canvas state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasDocument {
    /// Logical canvas width
    #[serde(default)]
    pub width: u32,

    /// Logical canvas height
    #[serde(default)]
    pub height: u32,

    /// Background colour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,

    /// Drawable objects in stacking order
    #[serde(default)]
    pub objects: Vec<serde_json::Value>,

    /// Fields owned by the canvas library
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CanvasDocument {
    /// Create an empty document of the given size
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            width: size.width,
            height: size.height,
            background: Some(DEFAULT_BACKGROUND.to_string()),
            objects: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Build from a stored canvas state, falling back to the project size.
    ///
    /// Stored states may be the empty object a project starts with.
    pub fn from_state(state: &serde_json::Value, fallback: Size) -> Result<Self> {
        let mut document = if state.is_null() {
            Self::new(fallback)
        } else {
            serde_json::from_value::<Self>(state.clone())?
        };
        if document.width == 0 || document.height == 0 {
            document.set_size(fallback);
        }
        Ok(document)
    }

    /// Parse a snapshot string
    pub fn from_snapshot(snapshot: &str) -> Result<Self> {
        serde_json::from_str(snapshot).map_err(|e| Error::Restore(e.to_string()))
    }

    /// Serialize to a snapshot string
    pub fn to_snapshot(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to a JSON value for storage
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Canvas dimensions
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Change the canvas dimensions; objects keep their size and position
    pub fn set_size(&mut self, size: Size) {
        self.width = size.width;
        self.height = size.height;
    }

    /// Get the number of objects
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// First image object, which the tools treat as the main image
    #[must_use]
    pub fn main_image(&self) -> Option<&serde_json::Value> {
        self.objects
            .iter()
            .find(|obj| obj.get("type").and_then(|t| t.as_str()) == Some("image"))
    }

    /// Source URL of the main image
    #[must_use]
    pub fn main_image_src(&self) -> Option<&str> {
        self.main_image()
            .and_then(|img| img.get("src"))
            .and_then(|src| src.as_str())
    }

    fn main_image_mut(&mut self) -> Option<&mut serde_json::Map<String, Value>> {
        self.objects
            .iter_mut()
            .find(|obj| obj.get("type").and_then(|t| t.as_str()) == Some("image"))
            .and_then(Value::as_object_mut)
    }

    /// Put the project image on a canvas that has none.
    ///
    /// The image is centred and scaled to fit; returns whether it was added.
    pub fn place_main_image(&mut self, src: &str, natural: Size) -> bool {
        if self.main_image().is_some() || src.is_empty() || natural.is_empty() {
            return false;
        }
        let scale = placement_scale(natural, self.size());
        let image = centered_image(src, natural, scale, self.size());
        self.objects.insert(0, image);
        true
    }

    /// Cover the whole canvas with a background image; returns its scale
    pub fn set_background_image(&mut self, src: &str, natural: Size) -> f64 {
        let scale = cover_scale(natural, self.size());
        let image = centered_image(src, natural, scale, self.size());
        self.extra.insert("backgroundImage".to_string(), image);
        scale
    }

    /// Point the main image at a new source; false when there is no image
    pub fn set_main_image_src(&mut self, src: &str) -> bool {
        match self.main_image_mut() {
            Some(image) => {
                image.insert("src".to_string(), json!(src));
                true
            }
            None => false,
        }
    }

    /// On-canvas bounds of the main image with its (x, y) scale
    #[must_use]
    pub fn main_image_bounds(&self) -> Option<(Rect, (f64, f64))> {
        let image = self.main_image()?;
        let number = |key: &str, default: f64| {
            image.get(key).and_then(Value::as_f64).unwrap_or(default)
        };
        let scale = (number("scaleX", 1.0), number("scaleY", 1.0));
        let width = number("width", 0.0) * scale.0;
        let height = number("height", 0.0) * scale.1;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }

        let origin_x = image.get("originX").and_then(Value::as_str);
        let origin_y = image.get("originY").and_then(Value::as_str);
        let left = match origin_x.unwrap_or_default() {
            "center" => number("left", 0.0) - width / 2.0,
            "right" => number("left", 0.0) - width,
            _ => number("left", 0.0),
        };
        let top = match origin_y.unwrap_or_default() {
            "center" => number("top", 0.0) - height / 2.0,
            "bottom" => number("top", 0.0) - height,
            _ => number("top", 0.0),
        };
        Some((Rect::new(left, top, width, height), scale))
    }

    /// Crop the main image to a region of its source pixels.
    ///
    /// Offsets add to any earlier crop. The image keeps its scale and stays
    /// where the cropped area was on the canvas.
    pub fn crop_main_image(&mut self, region: &CropRegion) -> bool {
        let Some((bounds, scale)) = self.main_image_bounds() else {
            return false;
        };
        let Some(image) = self.main_image_mut() else {
            return false;
        };

        let offset = |key: &str| image.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        let crop_x = offset("cropX") + region.x;
        let crop_y = offset("cropY") + region.y;

        image.insert("cropX".to_string(), json!(crop_x));
        image.insert("cropY".to_string(), json!(crop_y));
        image.insert("width".to_string(), json!(region.width));
        image.insert("height".to_string(), json!(region.height));
        image.insert("originX".to_string(), json!("left"));
        image.insert("originY".to_string(), json!("top"));
        image.insert("left".to_string(), json!(bounds.left + region.x * scale.0));
        image.insert("top".to_string(), json!(bounds.top + region.y * scale.1));
        true
    }

    /// Filter list on the main image
    #[must_use]
    pub fn main_image_filters(&self) -> Vec<Value> {
        self.main_image()
            .and_then(|img| img.get("filters"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the main image's filter list; false when there is no image
    pub fn set_main_image_filters(&mut self, filters: Vec<Value>) -> bool {
        match self.main_image_mut() {
            Some(image) => {
                image.insert("filters".to_string(), Value::Array(filters));
                true
            }
            None => false,
        }
    }
}

fn centered_image(src: &str, natural: Size, scale: f64, canvas: Size) -> Value {
    json!({
        "type": "image",
        "src": src,
        "width": natural.width,
        "height": natural.height,
        "scaleX": scale,
        "scaleY": scale,
        "left": f64::from(canvas.width) / 2.0,
        "top": f64::from(canvas.height) / 2.0,
        "originX": "center",
        "originY": "center",
    })
}

/// Rewrite the `width`/`height` of a stored canvas state.
///
/// Non-object states are replaced by an empty document of that size.
#[must_use]
pub fn with_dimensions(state: serde_json::Value, size: Size) -> serde_json::Value {
    match state {
        serde_json::Value::Object(mut map) => {
            map.insert("width".to_string(), json!(size.width));
            map.insert("height".to_string(), json!(size.height));
            Value::Object(map)
        }
        _ => json!({ "width": size.width, "height": size.height }),
    }
}

/// The canvas a session edits.
///
/// Loading a snapshot is asynchronous because the canvas library decodes
/// images while it rebuilds the object graph.
#[async_trait]
pub trait CanvasSurface: Send + Sync {
    /// Serialize the current object graph
    async fn snapshot(&self) -> Result<String>;

    /// Replace the object graph with a snapshot
    async fn load_snapshot(&self, snapshot: &str) -> Result<()>;
}

/// In-memory surface holding a parsed canvas document
#[derive(Debug)]
pub struct DocumentSurface {
    document: RwLock<CanvasDocument>,
}

impl DocumentSurface {
    /// Create a surface around a document
    #[must_use]
    pub fn new(document: CanvasDocument) -> Self {
        Self {
            document: RwLock::new(document),
        }
    }

    /// Current document
    pub async fn document(&self) -> CanvasDocument {
        self.document.read().await.clone()
    }

    /// Replace the document
    pub async fn replace(&self, document: CanvasDocument) {
        *self.document.write().await = document;
    }

    /// Mutate the document in place
    pub async fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CanvasDocument) -> R,
    {
        let mut document = self.document.write().await;
        f(&mut document)
    }
}

#[async_trait]
impl CanvasSurface for DocumentSurface {
    async fn snapshot(&self) -> Result<String> {
        self.document.read().await.to_snapshot()
    }

    async fn load_snapshot(&self, snapshot: &str) -> Result<()> {
        let document = CanvasDocument::from_snapshot(snapshot)?;
        self.replace(document).await;
        Ok(())
    }
}
