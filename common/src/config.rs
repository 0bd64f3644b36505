use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::color::{Color, PALETTE};

/// How each layer is turned into geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceMode {
    /// Outline segments on the plane at the bottom of each layer.
    Contour,
    /// Triangles of the mesh clipped to the layer's slab.
    #[default]
    Volumetric,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    /// Layer thickness in model units.
    pub layer_height: f32,
    pub mode: SliceMode,
    pub palette: Vec<Color>,

    // Passed through to print jobs
    pub exposure_time: f32,
    pub bottom_layers: u32,
    pub bottom_exposure: f32,
    pub resin_type: String,
}

impl SliceConfig {
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!("Failed to load config, using defaults: {err:#}");
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(if path.exists() {
            let file = fs::read_to_string(path)
                .with_context(|| format!("reading `{}`", path.display()))?;
            let config = toml::from_str(&file)?;
            info!("Loaded slice config from `{}`", path.display());
            config
        } else {
            info!("No config file at `{}`, using defaults", path.display());
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, toml::to_string(self)?)?;
        Ok(())
    }
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            layer_height: 0.05,
            mode: SliceMode::default(),
            palette: PALETTE.to_vec(),

            exposure_time: 2.0,
            bottom_layers: 5,
            bottom_exposure: 20.0,
            resin_type: "Standard".into(),
        }
    }
}
