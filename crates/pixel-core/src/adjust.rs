//! Filter adjustments
//!
//! Slider table for the adjust tool and the per-project values persisted so
//! sliders restore on reload. Values are stored in slider units and
//! converted to the canvas filter parameter on demand.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Adjustable filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    /// Brightness
    Brightness,
    /// Contrast
    Contrast,
    /// Saturation
    Saturation,
    /// Vibrance
    Vibrance,
    /// Blur
    Blur,
    /// Hue rotation (degrees)
    Hue,
}

/// How slider units turn into the filter parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterTransform {
    /// value / 100
    Percent,
    /// degrees to radians
    Radians,
}

/// Slider definition for one filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterConfig {
    /// Filter key
    pub key: FilterKey,
    /// Slider label
    pub label: &'static str,
    /// Slider minimum
    pub min: i32,
    /// Slider maximum
    pub max: i32,
    /// Neutral value
    pub default_value: i32,
    /// Canvas filter parameter name
    pub value_key: &'static str,
    /// Unit conversion
    pub transform: FilterTransform,
}

impl FilterConfig {
    /// Clamp a slider value into range
    #[must_use]
    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }

    /// Convert a slider value into the canvas filter parameter
    #[must_use]
    pub fn to_param(&self, value: i32) -> f64 {
        match self.transform {
            FilterTransform::Percent => f64::from(value) / 100.0,
            FilterTransform::Radians => f64::from(value) * (PI / 180.0),
        }
    }

    /// Convert a canvas filter parameter back into slider units
    #[must_use]
    pub fn from_param(&self, param: f64) -> i32 {
        let value = match self.transform {
            FilterTransform::Percent => param * 100.0,
            FilterTransform::Radians => param * (180.0 / PI),
        };
        self.clamp(value.round() as i32)
    }
}

/// Filter table in panel order
pub const FILTER_CONFIGS: [FilterConfig; 6] = [
    FilterConfig {
        key: FilterKey::Brightness,
        label: "Brightness",
        min: -100,
        max: 100,
        default_value: 0,
        value_key: "brightness",
        transform: FilterTransform::Percent,
    },
    FilterConfig {
        key: FilterKey::Contrast,
        label: "Contrast",
        min: -100,
        max: 100,
        default_value: 0,
        value_key: "contrast",
        transform: FilterTransform::Percent,
    },
    FilterConfig {
        key: FilterKey::Saturation,
        label: "Saturation",
        min: -100,
        max: 100,
        default_value: 0,
        value_key: "saturation",
        transform: FilterTransform::Percent,
    },
    FilterConfig {
        key: FilterKey::Vibrance,
        label: "Vibrance",
        min: -100,
        max: 100,
        default_value: 0,
        value_key: "vibrance",
        transform: FilterTransform::Percent,
    },
    FilterConfig {
        key: FilterKey::Blur,
        label: "Blur",
        min: 0,
        max: 100,
        default_value: 0,
        value_key: "blur",
        transform: FilterTransform::Percent,
    },
    FilterConfig {
        key: FilterKey::Hue,
        label: "Hue",
        min: -180,
        max: 180,
        default_value: 0,
        value_key: "rotation",
        transform: FilterTransform::Radians,
    },
];

impl FilterKey {
    /// Slider definition for this filter
    #[must_use]
    pub fn config(&self) -> &'static FilterConfig {
        match self {
            Self::Brightness => &FILTER_CONFIGS[0],
            Self::Contrast => &FILTER_CONFIGS[1],
            Self::Saturation => &FILTER_CONFIGS[2],
            Self::Vibrance => &FILTER_CONFIGS[3],
            Self::Blur => &FILTER_CONFIGS[4],
            Self::Hue => &FILTER_CONFIGS[5],
        }
    }
}

/// Adjustment slider values for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdjustmentValues(BTreeMap<FilterKey, i32>);

impl Default for AdjustmentValues {
    fn default() -> Self {
        Self(
            FILTER_CONFIGS
                .iter()
                .map(|c| (c.key, c.default_value))
                .collect(),
        )
    }
}

impl AdjustmentValues {
    /// Value for a filter, falling back to its neutral value
    #[must_use]
    pub fn get(&self, key: FilterKey) -> i32 {
        self.0
            .get(&key)
            .copied()
            .unwrap_or(key.config().default_value)
    }

    /// Set a value, clamped to the filter's range
    pub fn set(&mut self, key: FilterKey, value: i32) {
        self.0.insert(key, key.config().clamp(value));
    }

    /// Clamp every value and fill in missing filters
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut out = Self::default();
        for (key, value) in self.0 {
            out.set(key, value);
        }
        out
    }

    /// Check if every filter is neutral
    #[must_use]
    pub fn is_default(&self) -> bool {
        FILTER_CONFIGS
            .iter()
            .all(|c| self.get(c.key) == c.default_value)
    }

    /// Canvas filter list for the non-neutral values, in panel order.
    ///
    /// Each entry is `{"type": <key>, <value_key>: <param>}`.
    #[must_use]
    pub fn to_filters(&self) -> Vec<serde_json::Value> {
        FILTER_CONFIGS
            .iter()
            .filter(|c| self.get(c.key) != c.default_value)
            .map(|c| {
                let mut filter = serde_json::Map::new();
                filter.insert("type".to_string(), serde_json::json!(c.key));
                filter.insert(
                    c.value_key.to_string(),
                    serde_json::json!(c.to_param(self.get(c.key))),
                );
                serde_json::Value::Object(filter)
            })
            .collect()
    }

    /// Recover slider values from a canvas filter list, ignoring unknown entries
    #[must_use]
    pub fn from_filters(filters: &[serde_json::Value]) -> Self {
        let mut values = Self::default();
        for filter in filters {
            let key = filter
                .get("type")
                .and_then(|t| serde_json::from_value::<FilterKey>(t.clone()).ok());
            let Some(key) = key else { continue };
            let config = key.config();
            if let Some(param) = filter.get(config.value_key).and_then(|v| v.as_f64()) {
                values.set(key, config.from_param(param));
            }
        }
        values
    }
}
