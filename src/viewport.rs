use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Layout viewport in CSS pixels. The default is a small-form-factor phone so
/// layout-dependent decisions are reproducible between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 375,
            height: 812,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewportParseError {
    #[error("Invalid viewport '{0}': expected WIDTHxHEIGHT (e.g., 375x812)")]
    Malformed(String),
    #[error("Invalid viewport {axis} '{value}': expected a positive number of CSS pixels")]
    Dimension { axis: &'static str, value: String },
}

fn dimension(axis: &'static str, raw: &str) -> Result<u32, ViewportParseError> {
    let invalid = || ViewportParseError::Dimension {
        axis,
        value: raw.trim().to_string(),
    };
    match raw.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(px) => Ok(px),
    }
}

impl FromStr for Viewport {
    type Err = ViewportParseError;

    /// Accepts `375x812` and `375X812`, with optional spaces around either side.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| ViewportParseError::Malformed(s.to_string()))?;
        Ok(Viewport {
            width: dimension("width", w)?,
            height: dimension("height", h)?,
        })
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Emulated device handed to the browser context for every render pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub viewport: Viewport,
    pub device_scale_factor: f64,
    pub is_mobile: bool,
    pub has_touch: bool,
}

impl DeviceProfile {
    /// Phone-like profile: mobile meta-viewport handling and touch input on.
    pub fn mobile(viewport: Viewport, device_scale_factor: f64) -> Self {
        Self {
            viewport,
            device_scale_factor,
            is_mobile: true,
            has_touch: true,
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::mobile(Viewport::default(), 2.0)
    }
}
