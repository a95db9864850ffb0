//! Landscape asset: the flat little-endian stream produced by the content
//! pipeline and consumed at load time.
//!
//! Fields follow each other without tags, in this order:
//!
//! | field                 | encoding                                            |
//! |-----------------------|-----------------------------------------------------|
//! | world size            | 3 × f32                                             |
//! | grid dimensions       | 2 × i32 (`gx`, `gy`)                                |
//! | heights               | `gx·gy` × f32, row-major (`y` outer, `x` inner)     |
//! | normals, tangents     | `gx·gy` × 3 × f32 each, same order                  |
//! | patch counts          | 2 × i32                                             |
//! | patch bounds          | per patch: min, max (3 × f32 each)                  |
//! | patch groups          | i32 count, then per group i32 `n` and `n` × i32     |
//! | layers                | i32 count, then per layer i32 group and four strings|
//!
//! Strings are a u32 byte length followed by UTF-8. A layer's four strings are
//! its technique and its color, alpha and normal texture references; an empty
//! normal reference means the layer has none.

mod builder;
mod reader;
mod writer;

pub use builder::{target_patches_from_alpha, LandscapeBuilder, LayerDesc};
pub use reader::read_landscape;
pub use writer::write_landscape;

use bevy::prelude::Vec3;
use ndarray::Array2;

use crate::error::{Result, TerrainError};
use crate::landscape::{validate_groups, validate_layers, validate_patch_grid, Layer};
use crate::patch::Aabb;

/// Everything needed to construct a [`Landscape`](crate::Landscape).
#[derive(Clone, Debug)]
pub struct LandscapeAsset {
    pub size: Vec3,
    pub heights: Array2<f32>,
    pub normals: Array2<Vec3>,
    pub tangents: Array2<Vec3>,
    pub patch_count: (usize, usize),
    pub patch_bounds: Vec<Aabb>,
    pub patch_groups: Vec<Vec<usize>>,
    pub layers: Vec<Layer>,
}

impl LandscapeAsset {
    /// Checks the cross references between sections.
    pub fn validate(&self) -> Result<()> {
        validate_patch_grid(self.heights.dim(), self.patch_count)?;

        let patch_count = self.patch_count.0 * self.patch_count.1;
        if self.patch_bounds.len() != patch_count {
            return Err(TerrainError::LengthMismatch {
                what: "patch bounding boxes",
                expected: patch_count,
                found: self.patch_bounds.len(),
            });
        }

        validate_groups(&self.patch_groups, patch_count)?;
        validate_layers(&self.layers, self.patch_groups.len())
    }
}
