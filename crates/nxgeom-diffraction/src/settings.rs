//! Model settings and instrument layout, loaded from TOML.
//!
//! ```toml
//! [geometry]
//! max_chain_length = 64
//! degenerate_epsilon = 1e-12
//! lab_frame = "you"
//!
//! [layout]
//! beam = "/entry/instrument/beam"
//! sample = "/entry/sample"
//! detector_modules = ["/entry/instrument/detector/module"]
//! ```

use nxgeom_chain::DEFAULT_MAX_HOPS;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GeometryError, Result};
use crate::frame::LabFrame;

/// Named lab frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabFramePreset {
    /// NeXus frame, unchanged.
    Identity,
    /// You (1999) frame.
    You,
}

/// Lab frame as written in settings: a preset name or explicit rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabFrameSpec {
    /// A named preset.
    Preset(LabFramePreset),
    /// Row-major basis matrix.
    Rows([[f64; 3]; 3]),
}

impl LabFrameSpec {
    /// Build the frame, validating explicit rows.
    pub fn to_frame(&self) -> Result<LabFrame> {
        match self {
            Self::Preset(LabFramePreset::Identity) => Ok(LabFrame::identity()),
            Self::Preset(LabFramePreset::You) => Ok(LabFrame::you()),
            Self::Rows(rows) => LabFrame::from_rows(*rows),
        }
    }
}

/// Numeric settings for model construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySettings {
    /// Bound on followed `depends_on` references per chain.
    pub max_chain_length: usize,
    /// Smallest `|det(2π·UB)|` treated as invertible.
    pub degenerate_epsilon: f64,
    /// Scan length; inferred from the per-point arrays when absent.
    pub scan_length: Option<usize>,
    /// Frame results are reported in.
    pub lab_frame: LabFrameSpec,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            max_chain_length: DEFAULT_MAX_HOPS,
            degenerate_epsilon: 1e-12,
            scan_length: None,
            lab_frame: LabFrameSpec::Preset(LabFramePreset::Identity),
        }
    }
}

impl GeometrySettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_chain_length == 0 {
            return Err(GeometryError::InvalidSettings(
                "max_chain_length must be positive".into(),
            ));
        }
        if !(self.degenerate_epsilon >= 0.0) {
            return Err(GeometryError::InvalidSettings(
                "degenerate_epsilon must be non-negative".into(),
            ));
        }
        if self.scan_length == Some(0) {
            return Err(GeometryError::InvalidSettings(
                "scan_length must be positive".into(),
            ));
        }
        self.lab_frame.to_frame().map(|_| ())
    }
}

/// Where the model's components live in the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentLayout {
    /// Beam group.
    pub beam: String,
    /// Sample group.
    pub sample: String,
    /// Detector module groups.
    pub detector_modules: Vec<String>,
}

impl Default for InstrumentLayout {
    fn default() -> Self {
        Self {
            beam: "/entry/instrument/beam".to_string(),
            sample: "/entry/sample".to_string(),
            detector_modules: vec!["/entry/instrument/detector/module".to_string()],
        }
    }
}

/// A settings file: `[geometry]` and `[layout]` tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Numeric settings.
    pub geometry: GeometrySettings,
    /// Component paths.
    pub layout: InstrumentLayout,
}

impl GeometryConfig {
    /// Parse and validate TOML.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.geometry.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}
