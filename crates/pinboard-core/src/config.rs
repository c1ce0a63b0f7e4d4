//! Tunable constants for the scene, view, routing and auto-save behaviour.
//!
//! Every field has a default, so a partial JSON object is a valid config:
//!
//! ```
//! use pinboard_core::config::BoardConfig;
//!
//! let config = BoardConfig::from_json(r#"{ "view": { "max_zoom": 4.0 } }"#).unwrap();
//! assert_eq!(config.view.max_zoom, 4.0);
//! assert_eq!(config.view.min_zoom, 0.1);
//! ```

use serde::{Deserialize, Serialize};

/// Scene sizing and expansion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Side length of the initial square scene rect, centred on the origin.
    pub initial_size: f64,
    /// Distance from a scene edge that triggers expansion.
    pub expansion_threshold: f64,
    /// How far an edge is pushed out past the entity that triggered it.
    pub expansion_amount: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            initial_size: 10_000.0,
            expansion_threshold: 1_000.0,
            expansion_amount: 5_000.0,
        }
    }
}

/// Zoom limits and fit-to-content margins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Multiplier applied by a single zoom-in / zoom-out step.
    pub zoom_step: f64,
    /// Fit-to-content margin as a fraction of the larger content side.
    pub fit_margin_ratio: f64,
    pub fit_margin_min: f64,
    pub fit_margin_max: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 10.0,
            zoom_step: 1.2,
            fit_margin_ratio: 0.1,
            fit_margin_min: 20.0,
            fit_margin_max: 100.0,
        }
    }
}

impl ViewConfig {
    /// `(min, max)` zoom, ordered even if the config swaps them.
    pub fn zoom_range(&self) -> (f64, f64) {
        if self.min_zoom <= self.max_zoom {
            (self.min_zoom, self.max_zoom)
        } else {
            (self.max_zoom, self.min_zoom)
        }
    }
}

/// Connection hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Minimum width of the selectable band around a connection.
    pub min_hit_width: f64,
    /// Added to the line width before comparing with `min_hit_width`.
    pub hit_padding: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            min_hit_width: 8.0,
            hit_padding: 4.0,
        }
    }
}

/// Deferred save cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    pub interval_secs: u64,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

/// Top-level configuration for a board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub scene: SceneConfig,
    pub view: ViewConfig,
    pub routing: RoutingConfig,
    pub autosave: AutoSaveConfig,
}

impl BoardConfig {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the configuration to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
