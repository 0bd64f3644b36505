use crate::{
    error::{Result, SliceError},
    mesh::{vertex_bounds, WorldGeometry},
};

/// Upper limit on layers per run. Past this, consecutive layer heights stop
/// being distinct in `f32` for typical model heights.
pub const MAX_LAYERS: u32 = 1 << 20;

/// Vertical extent of a mesh in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZBounds {
    pub min: f32,
    pub max: f32,
}

impl ZBounds {
    pub fn of(geometry: &WorldGeometry) -> Result<Self> {
        let vertices = geometry.vertices();
        if vertices.is_empty() {
            return Err(SliceError::invalid_parameter("mesh has no vertices"));
        }

        let (min, max) = vertex_bounds(vertices.iter().copied());
        Ok(Self {
            min: min.z,
            max: max.z,
        })
    }

    pub fn height(&self) -> f32 {
        self.max - self.min
    }

    /// Number of layers of `layer_height` needed to cover the extent.
    pub fn layer_count(&self, layer_height: f32) -> Result<u32> {
        check_layer_height(layer_height)?;

        let count = (self.height() / layer_height).ceil();
        if count > MAX_LAYERS as f32 {
            return Err(SliceError::invalid_parameter(format!(
                "layer height {layer_height} gives {count} layers, at most {MAX_LAYERS} are supported"
            )));
        }

        Ok(count as u32)
    }

    /// Bottom of layer `layer`.
    pub fn layer_z(&self, layer: u32, layer_height: f32) -> f32 {
        self.min + layer as f32 * layer_height
    }
}

pub fn check_layer_height(layer_height: f32) -> Result<()> {
    if !(layer_height.is_finite() && layer_height > 0.0) {
        return Err(SliceError::invalid_parameter(format!(
            "layer height must be a positive number, got {layer_height}"
        )));
    }

    Ok(())
}
