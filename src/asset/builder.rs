use bevy::log::{info, warn};
use bevy::prelude::{Vec2, Vec3};
use ndarray::{s, Array2};

use super::LandscapeAsset;
use crate::error::{Result, TerrainError};
use crate::generation::{perlin_terrain, NoiseSettings};
use crate::landscape::{validate_patch_grid, Layer};
use crate::patch::{Aabb, MAX_PATCH_RESOLUTION};
use crate::HeightMap;

/// A texture layer before patch grouping.
#[derive(Clone, Debug, Default)]
pub struct LayerDesc {
    pub technique: String,
    pub color_texture: String,
    pub alpha_texture: String,
    pub normal_texture: Option<String>,
    /// One flag per patch, row-major, marking the patches the layer paints.
    pub target_patches: Vec<bool>,
}

/// Turns a raw heightfield and a list of layers into a [`LandscapeAsset`].
pub struct LandscapeBuilder {
    heightmap: HeightMap,
    patch_count: (usize, usize),
    layers: Vec<LayerDesc>,
}

impl LandscapeBuilder {
    /// Each grid dimension minus one must be a positive multiple of 16.
    pub fn new(size: Vec3, heights: Array2<f32>) -> Result<Self> {
        let (gx, gy) = heights.dim();
        let patch_count = (
            gx.saturating_sub(1) / MAX_PATCH_RESOLUTION,
            gy.saturating_sub(1) / MAX_PATCH_RESOLUTION,
        );
        validate_patch_grid((gx, gy), patch_count)?;

        Ok(Self {
            heightmap: HeightMap::from_heights(size, heights)?,
            patch_count,
            layers: Vec::new(),
        })
    }

    /// Scales normalized samples in `[0, 1]` to `base_height + height * v`.
    pub fn from_normalized(
        footprint: Vec2,
        base_height: f32,
        height: f32,
        data: &Array2<f32>,
    ) -> Result<Self> {
        let heights = data.mapv(|v| base_height + height * v);
        Self::new(footprint.extend(height), heights)
    }

    /// Generates a `dim` sample Perlin heightfield and scales it like
    /// [`LandscapeBuilder::from_normalized`].
    pub fn from_noise(
        footprint: Vec2,
        base_height: f32,
        height: f32,
        dim: (usize, usize),
        seed: u32,
        noise: NoiseSettings,
    ) -> Result<Self> {
        Self::from_normalized(footprint, base_height, height, &perlin_terrain(dim, seed, noise))
    }

    pub fn patch_count(&self) -> (usize, usize) {
        self.patch_count
    }

    pub fn heightmap(&self) -> &HeightMap {
        &self.heightmap
    }

    pub fn with_layer(mut self, layer: LayerDesc) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn build(&self) -> Result<LandscapeAsset> {
        let total = self.patch_count.0 * self.patch_count.1;
        for layer in &self.layers {
            if layer.target_patches.len() != total {
                return Err(TerrainError::LengthMismatch {
                    what: "layer target patches",
                    expected: total,
                    found: layer.target_patches.len(),
                });
            }
        }

        let (patch_groups, layers) = self.group_layers();

        let asset = LandscapeAsset {
            size: self.heightmap.size(),
            heights: self.heightmap.heights().clone(),
            normals: self.heightmap.normals().clone(),
            tangents: self.heightmap.tangents().clone(),
            patch_count: self.patch_count,
            patch_bounds: self.patch_bounds(),
            patch_groups,
            layers,
        };
        asset.validate()?;

        info!(
            "built landscape asset: {}x{} patches, {} layers in {} patch groups",
            self.patch_count.0,
            self.patch_count.1,
            asset.layers.len(),
            asset.patch_groups.len()
        );
        Ok(asset)
    }

    fn patch_bounds(&self) -> Vec<Aabb> {
        let (pcx, pcy) = self.patch_count;
        let mut bounds = Vec::with_capacity(pcx * pcy);

        for py in 0..pcy {
            for px in 0..pcx {
                let (x0, y0) = (px * MAX_PATCH_RESOLUTION, py * MAX_PATCH_RESOLUTION);
                let (x1, y1) = (x0 + MAX_PATCH_RESOLUTION, y0 + MAX_PATCH_RESOLUTION);

                let (min_z, max_z) = self
                    .heightmap
                    .heights()
                    .slice(s![x0..=x1, y0..=y1])
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
                        (lo.min(h), hi.max(h))
                    });

                bounds.push(Aabb::new(
                    self.heightmap.grid_to_position(x0, y0).extend(min_z),
                    self.heightmap.grid_to_position(x1, y1).extend(max_z),
                ));
            }
        }

        bounds
    }

    // Consecutive layers painting the same patches share one group.
    fn group_layers(&self) -> (Vec<Vec<usize>>, Vec<Layer>) {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut layers = Vec::with_capacity(self.layers.len());

        for (i, desc) in self.layers.iter().enumerate() {
            let same_as_previous =
                i > 0 && self.layers[i - 1].target_patches == desc.target_patches;

            if !same_as_previous {
                if !desc.target_patches.contains(&true) {
                    warn!("layer {} ({}) paints no patches", i, desc.color_texture);
                }

                let patches = desc
                    .target_patches
                    .iter()
                    .enumerate()
                    .filter_map(|(patch, &target)| target.then_some(patch))
                    .collect();
                groups.push(patches);
            }

            layers.push(Layer {
                patch_group: groups.len() - 1,
                technique: desc.technique.clone(),
                color_texture: desc.color_texture.clone(),
                alpha_texture: desc.alpha_texture.clone(),
                normal_texture: desc.normal_texture.clone(),
            });
        }

        (groups, layers)
    }
}

/// Marks the patches whose region of an alpha image holds any non-zero pixel.
///
/// `alpha` is indexed `[[x, y]]`; each patch covers an equal share of the
/// image, rounded down.
pub fn target_patches_from_alpha(alpha: &Array2<u8>, (pcx, pcy): (usize, usize)) -> Vec<bool> {
    let (w, h) = alpha.dim();
    let (cell_w, cell_h) = (w / pcx.max(1), h / pcy.max(1));

    let mut targets = Vec::with_capacity(pcx * pcy);
    for y in 0..pcy {
        for x in 0..pcx {
            let (x0, y0) = (x * w / pcx, y * h / pcy);
            let region = alpha.slice(s![x0..x0 + cell_w, y0..y0 + cell_h]);
            targets.push(region.iter().any(|&a| a != 0));
        }
    }
    targets
}
