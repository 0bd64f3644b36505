use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use common::config::{SliceConfig, SliceMode};
use nalgebra::Vector3;

use layer_slicer::mesh::{Mesh, MeshData};

#[derive(Debug, Parser)]
/// Slices a triangle mesh into layer previews.
pub struct Args {
    #[arg(long)]
    /// TOML slice config. Flags below override its values.
    pub config: Option<PathBuf>,
    #[arg(long)]
    /// Layer height in model units.
    pub layer_height: Option<f32>,
    #[arg(long, value_enum)]
    /// Outline segments per layer, or the mesh clipped to each layer's slab.
    pub mode: Option<Mode>,

    #[command(flatten)]
    pub model: ModelArgs,

    #[arg(long, value_parser = vector_value_parser)]
    /// Where to move the model to, before slicing.
    pub position: Option<Vector3<f32>>,
    #[arg(long, value_parser = vector_value_parser)]
    /// Rotation of the model in degrees, pitch, roll, yaw.
    pub rotation: Option<Vector3<f32>>,
    #[arg(long, value_parser = vector_value_parser)]
    /// Scale of the model along the X, Y, and Z axes.
    pub scale: Option<Vector3<f32>>,

    #[arg(long, short)]
    /// SVG file to draw the sliced layers to.
    pub output: Option<PathBuf>,
    #[arg(long, short)]
    /// Log every layer.
    pub verbose: bool,
}

#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ModelArgs {
    #[arg(long)]
    /// Mesh buffers as JSON: `{ "positions": [..], "indices": [..] }`.
    pub mesh: Option<PathBuf>,
    #[arg(long, value_parser = vector_value_parser)]
    /// Slice a box of this size instead of loading a mesh.
    pub cube: Option<Vector3<f32>>,
    #[arg(long)]
    /// Run a JSON job request, writing protocol messages to stdout as JSON
    /// lines.
    pub job: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Mode {
    Contour,
    Volumetric,
}

impl Args {
    pub fn slice_config(&self) -> SliceConfig {
        let mut config = match &self.config {
            Some(path) => SliceConfig::load_or_default(path),
            None => SliceConfig::default(),
        };

        if let Some(layer_height) = self.layer_height {
            config.layer_height = layer_height;
        }
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }

        config
    }

    pub fn load_mesh(&self) -> Result<Mesh> {
        let mut mesh = if let Some(size) = self.model.cube {
            Mesh::cube(Vector3::zeros(), size)
        } else if let Some(path) = &self.model.mesh {
            let file = fs::read_to_string(path)
                .with_context(|| format!("reading `{}`", path.display()))?;
            let data: MeshData = serde_json::from_str(&file)
                .with_context(|| format!("parsing `{}`", path.display()))?;
            data.into_mesh()?
        } else {
            anyhow::bail!("no model given");
        };

        if let Some(scale) = self.scale {
            mesh.set_scale(scale);
        }
        if let Some(rotation) = self.rotation {
            mesh.set_rotation(rotation.map(f32::to_radians));
        }
        if let Some(position) = self.position {
            mesh.set_position(position);
        }

        Ok(mesh)
    }
}

impl From<Mode> for SliceMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Contour => SliceMode::Contour,
            Mode::Volumetric => SliceMode::Volumetric,
        }
    }
}

fn vector_value_parser(raw: &str) -> Result<Vector3<f32>> {
    let mut vec = Vector3::zeros();

    let mut parts = raw.splitn(3, ',');
    for i in 0..3 {
        let element = parts.next().context("Missing vector element")?.trim();
        vec[i] = element
            .parse()
            .context("Can't convert element from string")?;
    }

    Ok(vec)
}
