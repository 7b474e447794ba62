//! # Grabber Configuration
//!
//! Configuration shared by the `fgrab` CLI and the library: sensor geometry,
//! rectangular output size, pacing and the names of the three outputs.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Default | Description |
//! |-----------|------|---------|-------------|
//! | `width` / `height` | `u32` | 640 / 480 | Source (Cartesian) frame size |
//! | `out_width` / `out_height` | `Option<u32>` | source size | Rectangular output size |
//! | `eccentricities` | `u32` | 156 | Log-polar rings, positive multiple of 6 |
//! | `angles` | `u32` | 252 | Angular sectors per ring |
//! | `fovea` | `u32` | 128 | Fovea side, at most the short source side |
//! | `overlap` | `f64` | 1.0 | Receptive-field size multiplier, at least 1.0 |
//! | `framerate` | `f64` | 0.0 | Cycle rate in Hz, 0 runs as fast as the source allows |
//! | `name` | `String` | `/grabber` | Base output name |
//! | `inverse` | `bool` | false | Also build the log-polar → Cartesian table at open |
//!
//! ## Examples
//!
//! ```rust
//! use foveal_grabber::config::GrabberConfig;
//!
//! let config = GrabberConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.logpolar_name(), "/grabber/logpolar");
//!
//! let geometry = config.geometry()?;
//! assert_eq!(geometry.eccentricities(), 156);
//! # Ok::<(), foveal_grabber::error::GrabberError>(())
//! ```

use std::path::Path;

use lp_map::geometry::{
    DEFAULT_ANGLES, DEFAULT_ECCENTRICITIES, DEFAULT_FOVEA, DEFAULT_OVERLAP, REFERENCE_SOURCE,
};
use lp_map::{SensorGeometry, Size};
use serde::{Deserialize, Serialize};

use crate::error::{GrabberError, GrabberResult};

/// Configuration structure for a grabber instance.
///
/// Every field has a default, so a JSON file only needs the values it
/// overrides.
///
/// ```rust
/// use foveal_grabber::config::GrabberConfig;
///
/// let config: GrabberConfig = serde_json::from_str(r#"{ "fovea": 64, "overlap": 2.0 }"#).unwrap();
/// assert_eq!(config.fovea, 64);
/// assert_eq!(config.width, 640);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabberConfig {
    /// Source frame width in pixels.
    pub width: u32,
    /// Source frame height in pixels.
    pub height: u32,
    /// Rectangular output width; `None` keeps the source width.
    pub out_width: Option<u32>,
    /// Rectangular output height; `None` keeps the source height.
    pub out_height: Option<u32>,
    pub eccentricities: u32,
    pub angles: u32,
    pub fovea: u32,
    pub overlap: f64,
    /// Target cycles per second. `0.0` disables pacing.
    pub framerate: f64,
    /// Base name of the rectangular output; the other two derive from it.
    pub name: String,
    /// Build the inverse table when the grabber opens.
    pub inverse: bool,
}

impl Default for GrabberConfig {
    fn default() -> Self {
        Self {
            width: REFERENCE_SOURCE.w,
            height: REFERENCE_SOURCE.h,
            out_width: None,
            out_height: None,
            eccentricities: DEFAULT_ECCENTRICITIES,
            angles: DEFAULT_ANGLES,
            fovea: DEFAULT_FOVEA,
            overlap: DEFAULT_OVERLAP,
            framerate: 0.0,
            name: "/grabber".to_string(),
            inverse: false,
        }
    }
}

impl GrabberConfig {
    /// Load a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> GrabberResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GrabberError::io("read config", e).with_path(path.display().to_string())
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            GrabberError::from(e).with_context(format!("parsing {}", path.display()))
        })?;
        Ok(config)
    }

    pub fn source_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Rectangular output size, falling back to the source size per axis.
    pub fn rect_size(&self) -> Size {
        Size::new(
            self.out_width.unwrap_or(self.width),
            self.out_height.unwrap_or(self.height),
        )
    }

    pub fn rect_name(&self) -> &str {
        &self.name
    }

    pub fn logpolar_name(&self) -> String {
        format!("{}/logpolar", self.name)
    }

    pub fn fovea_name(&self) -> String {
        format!("{}/fovea", self.name)
    }

    /// Validates the configuration parameters.
    ///
    /// Geometry checks are delegated to [`SensorGeometry::new`] so both
    /// layers agree on what is valid.
    pub fn validate(&self) -> GrabberResult<()> {
        if !self.framerate.is_finite() || self.framerate < 0.0 {
            return Err(GrabberError::config(
                "framerate",
                self.framerate.to_string(),
                "must be a finite, non-negative rate",
            ));
        }
        if self.name.is_empty() {
            return Err(GrabberError::config("name", "", "must not be empty"));
        }
        self.geometry().map(|_| ())
    }

    /// Build the validated sensor geometry.
    pub fn geometry(&self) -> GrabberResult<SensorGeometry> {
        SensorGeometry::new(
            self.source_size(),
            self.eccentricities,
            self.angles,
            self.fovea,
            self.overlap,
        )
        .map_err(|e| self.geometry_error(e))
    }

    fn geometry_error(&self, error: lp_map::MapError) -> GrabberError {
        match error {
            lp_map::MapError::Configuration { field, reason } => {
                let value = match field {
                    "eccentricities" => self.eccentricities.to_string(),
                    "angles" => self.angles.to_string(),
                    "fovea" => self.fovea.to_string(),
                    "overlap" => self.overlap.to_string(),
                    "source" => self.source_size().to_string(),
                    _ => String::new(),
                };
                GrabberError::config(field, value, reason)
            }
            other => other.into(),
        }
    }
}
