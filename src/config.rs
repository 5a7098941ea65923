//! Session configuration.
//!
//! A [`SessionConfig`] collects the knobs a selection session and its export
//! use. It is read from a JSON file where every field is optional:
//!
//! ```json
//! {
//!     "angle_tolerance_deg": 20.0,
//!     "format": "binary",
//!     "palette": ["#ff0000", "green", "#0000ff"]
//! }
//! ```
//!
//! Command-line flags are applied on top of the loaded values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algo::{AdjacencyOptions, DEFAULT_WELD_TOLERANCE};
use crate::error::{CarveError, Result};
use crate::io::{ExportOptions, StlFormat};
use crate::selection::{Color, GroupStore, DEFAULT_ANGLE_TOLERANCE, DEFAULT_MESH_COLOR, DEFAULT_PALETTE};

/// Smallest non-zero weld tolerance a config may ask for.
pub const MIN_WELD_TOLERANCE: f64 = 1e-12;

/// Settings for one session.
///
/// # Example
///
/// ```
/// use stlcarve::config::SessionConfig;
///
/// let config: SessionConfig = serde_json::from_str(r#"{ "only_selected": true }"#).unwrap();
/// assert!(config.only_selected);
/// assert_eq!(config.angle_tolerance_deg, 30.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Region-growing angle tolerance in degrees.
    pub angle_tolerance_deg: f64,

    /// Distance under which vertices count as coincident.
    pub weld_tolerance: f64,

    /// Drop unassigned faces on export.
    pub only_selected: bool,

    /// STL flavour for export.
    pub format: StlFormat,

    /// Group colors, handed out in order.
    pub palette: Vec<Color>,

    /// Color of unassigned faces.
    pub mesh_color: Color,

    /// Solid name for unassigned faces.
    pub unassigned_name: String,

    /// Solid name prefix for groups.
    pub group_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            angle_tolerance_deg: DEFAULT_ANGLE_TOLERANCE,
            weld_tolerance: DEFAULT_WELD_TOLERANCE,
            only_selected: false,
            format: StlFormat::Ascii,
            palette: DEFAULT_PALETTE.to_vec(),
            mesh_color: DEFAULT_MESH_COLOR,
            unassigned_name: "unassigned".to_string(),
            group_prefix: "group".to_string(),
        }
    }
}

impl SessionConfig {
    /// Read a configuration from a JSON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_error = |message: String| CarveError::Config {
            path: path.to_path_buf(),
            message,
        };

        let text = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config: SessionConfig = serde_json::from_str(&text).map_err(|e| config_error(e.to_string()))?;
        config.validate().map_err(|e| config_error(e.to_string()))?;

        debug!(path = %path.display(), "loaded session config");
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.angle_tolerance_deg.is_finite() || self.angle_tolerance_deg < 0.0 {
            return Err(CarveError::invalid_param(
                "angle_tolerance_deg",
                self.angle_tolerance_deg,
                "must be finite and non-negative",
            ));
        }
        if !self.weld_tolerance.is_finite() || self.weld_tolerance < 0.0 {
            return Err(CarveError::invalid_param(
                "weld_tolerance",
                self.weld_tolerance,
                "must be finite and non-negative",
            ));
        }
        if self.weld_tolerance > 0.0 && self.weld_tolerance < MIN_WELD_TOLERANCE {
            return Err(CarveError::invalid_param(
                "weld_tolerance",
                self.weld_tolerance,
                "must be zero or at least 1e-12",
            ));
        }
        if self.palette.is_empty() {
            return Err(CarveError::invalid_param("palette", "[]", "needs at least one color"));
        }
        self.export_options(PathBuf::new()).validate()?;
        Ok(())
    }

    /// Adjacency options for these settings.
    pub fn adjacency_options(&self) -> AdjacencyOptions {
        AdjacencyOptions::default().with_weld_tolerance(self.weld_tolerance)
    }

    /// An empty group store for a mesh with `face_count` faces, using the palette.
    pub fn group_store(&self, face_count: usize) -> GroupStore {
        GroupStore::with_palette(face_count, self.palette.clone())
    }

    /// Export options writing to `output_path`.
    pub fn export_options<P: Into<PathBuf>>(&self, output_path: P) -> ExportOptions {
        ExportOptions::new(output_path)
            .with_only_selected(self.only_selected)
            .with_format(self.format)
            .with_group_prefix(self.group_prefix.clone())
            .with_unassigned_name(self.unassigned_name.clone())
    }
}
