//! Engine configuration
//!
//! Settings can come from a JSON file; missing keys take their defaults.
//! Command-line flags override whatever the file says.
//!
//! ```json
//! {
//!     "reference_dir": "references",
//!     "reference_name": "reference.json",
//!     "tolerance": 5,
//!     "selection": "name_order",
//!     "render_dpi": 72.0
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::reference_store::{ReferenceStore, SelectionRule};
use crate::core::session::DEFAULT_REFERENCE_NAME;
use crate::core::validator::DEFAULT_TOLERANCE;
use crate::error::{FingerprintError, Result};

/// PDF user-space units per inch; rendering at this DPI maps one point to one pixel.
pub const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the reference records.
    pub reference_dir: PathBuf,
    /// File name a new reference is saved under.
    pub reference_name: String,
    /// Maximum per-axis barcode position deviation, in pixels.
    pub tolerance: u32,
    /// Rule for picking the active reference.
    pub selection: SelectionRule,
    /// Rasterization resolution. Barcode positions are in pixels at this DPI,
    /// so references and candidates must use the same value.
    pub render_dpi: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_dir: PathBuf::from("references"),
            reference_name: DEFAULT_REFERENCE_NAME.to_string(),
            tolerance: DEFAULT_TOLERANCE,
            selection: SelectionRule::default(),
            render_dpi: POINTS_PER_INCH,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|err| FingerprintError::io(path, err))?;
        serde_json::from_str(&json).map_err(|source| FingerprintError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn reference_store(&self) -> ReferenceStore {
        ReferenceStore::new(&self.reference_dir).with_selection(self.selection)
    }

    /// Scale factor from PDF points to raster pixels.
    pub fn render_scale(&self) -> f32 {
        self.render_dpi / POINTS_PER_INCH
    }
}
