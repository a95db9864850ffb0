use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fog::DEFAULT_FOG_RESOLUTION;
use crate::picking::{PickMethod, TerrainPicker};

/// Runtime tuning for level of detail, picking and fog.
///
/// ```toml
/// error_ratio = 0.0012
/// march_step = 5.0
/// refine_steps = 5
/// pick_method = "cell_walk"
/// fog_resolution = 128
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Levels of detail dropped per unit of viewer distance.
    pub error_ratio: f32,
    pub march_step: f32,
    pub refine_steps: usize,
    pub pick_method: PickMethod,
    pub fog_resolution: usize,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            error_ratio: 0.0012,
            march_step: 5.0,
            refine_steps: 5,
            pick_method: PickMethod::MarchAndRefine,
            fog_resolution: DEFAULT_FOG_RESOLUTION,
        }
    }
}

impl TerrainSettings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn picker(&self) -> TerrainPicker {
        TerrainPicker {
            march_step: self.march_step,
            refine_steps: self.refine_steps,
            method: self.pick_method,
        }
    }
}
