//! Canvas configuration.
//!
//! Hosts usually hand the configuration over as JSON (`{"width": 300,
//! "localRefresh": true}`), so keys are camelCase and every field has a
//! default. Validation happens here, once, so the draw loop never sees a
//! nonsensical size.

use crate::error::CanvasError;
use crate::geometry::Viewport;
use serde::{Deserialize, Serialize};

/// Which drawing-context semantics the host provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Renderer {
    /// A regular persistent 2D context (browser `<canvas>`, offscreen buffer).
    #[default]
    #[serde(alias = "canvas")]
    Standard,
    /// A restricted context without persistent canvas semantics (mini-program
    /// style): calls are buffered until an explicit flush per frame.
    #[serde(alias = "mini")]
    ConstrainedPlatform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasConfig {
    /// Logical width in CSS pixels.
    pub width: f64,
    /// Logical height in CSS pixels.
    pub height: f64,
    pub renderer: Renderer,
    /// Schedule a redraw automatically whenever the scene changes.
    pub auto_draw: bool,
    /// Redraw only the region touched by changed elements.
    pub local_refresh: bool,
    /// Clip refresh regions to the viewport.
    pub clip_view: bool,
    /// Resolve hit tests through the pixel-encoded index.
    pub quick_hit: bool,
    /// Overrides the host's device pixel ratio.
    pub pixel_ratio: Option<f64>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            renderer: Renderer::Standard,
            auto_draw: true,
            local_refresh: false,
            clip_view: true,
            quick_hit: false,
            pixel_ratio: None,
        }
    }
}

impl CanvasConfig {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration object.
    pub fn from_json(json: &str) -> Result<Self, CanvasError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CanvasError> {
        validate_size(self.width, self.height)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }
}

/// Largest logical width or height, matching the browsers' canvas limit.
pub const MAX_DIMENSION: f64 = 32_767.0;

/// Reject negative, non-finite or oversized logical sizes. Zero is allowed:
/// an empty canvas is valid, it just never paints anything.
pub fn validate_size(width: f64, height: f64) -> Result<(), CanvasError> {
    for (name, value) in [("width", width), ("height", height)] {
        if !value.is_finite() {
            return Err(CanvasError::InvalidConfig(format!("{name} must be finite, got {value}")));
        }
        if value < 0.0 {
            return Err(CanvasError::InvalidConfig(format!(
                "{name} must not be negative, got {value}"
            )));
        }
        if value > MAX_DIMENSION {
            return Err(CanvasError::InvalidConfig(format!(
                "{name} must be at most {MAX_DIMENSION}, got {value}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_documented_values() {
        let config = CanvasConfig::default();
        assert!(config.auto_draw);
        assert!(!config.local_refresh);
        assert!(config.clip_view);
        assert!(!config.quick_hit);
        assert_eq!(config.renderer, Renderer::Standard);
        assert_eq!(config.pixel_ratio, None);
    }

    #[test]
    fn parses_camel_case_json() {
        let config = CanvasConfig::from_json(
            r#"{"width": 300, "height": 150, "localRefresh": true, "quickHit": true,
                "renderer": "mini", "pixelRatio": 1.5}"#,
        )
        .unwrap();
        assert_eq!(config.width, 300.0);
        assert_eq!(config.height, 150.0);
        assert!(config.local_refresh);
        assert!(config.quick_hit);
        assert!(config.auto_draw);
        assert_eq!(config.renderer, Renderer::ConstrainedPlatform);
        assert_eq!(config.pixel_ratio, Some(1.5));
    }

    #[test]
    fn rejects_negative_size() {
        let err = CanvasConfig::from_json(r#"{"width": -1}"#).unwrap_err();
        assert!(matches!(err, CanvasError::InvalidConfig(_)), "{err}");
        assert!(CanvasConfig::new(0.0, 0.0).validate().is_ok());
        assert!(CanvasConfig::new(f64::NAN, 10.0).validate().is_err());
    }

    #[test]
    fn rejects_oversized_canvas() {
        assert!(CanvasConfig::new(MAX_DIMENSION, MAX_DIMENSION).validate().is_ok());
        let err = CanvasConfig::new(1e10, 1e10).validate().unwrap_err();
        assert!(matches!(err, CanvasError::InvalidConfig(_)), "{err}");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = CanvasConfig::from_json("{width: }").unwrap_err();
        assert!(matches!(err, CanvasError::ConfigParse(_)));
    }
}
