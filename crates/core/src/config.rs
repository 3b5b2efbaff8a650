use serde::{Deserialize, Serialize};

/// Timeline geometry and defaults. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Height of the tick ruler in pixels.
    pub ruler_height: f64,
    /// Initial zoom; 1.0 is 100 px per second.
    pub scale: f64,
    /// Vertical offset of subtitle bands within the band strip.
    pub band_top: f64,
    pub band_height: f64,
    /// Width of the left/right drag handles.
    pub handle_width: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            ruler_height: 65.0,
            scale: 1.0,
            band_top: 4.0,
            band_height: 40.0,
            handle_width: 8.0,
        }
    }
}

impl TimelineConfig {
    /// Parse a JSON object. Arrays would otherwise fill fields by position.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "timeline config must be a JSON object",
            ));
        }
        serde_json::from_value(value)
    }
}
