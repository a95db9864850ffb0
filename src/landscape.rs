use bevy::log::{info, warn};
use bevy::prelude::Vec3;

use crate::asset::LandscapeAsset;
use crate::culling::PatchCuller;
use crate::error::{Result, TerrainError};
use crate::patch::{Patch, MAX_PATCH_RESOLUTION};
use crate::HeightMap;

/// A texture layer drawn over one patch group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layer {
    pub patch_group: usize,
    pub technique: String,
    pub color_texture: String,
    pub alpha_texture: String,
    pub normal_texture: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Bottom,
    Top,
}

/// What changed during a [`Landscape::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatchUpdate {
    pub lod_changed: bool,
    pub visibility_changed: bool,
    /// At least one patch became visible.
    pub visible_enlarged: bool,
    /// Patch groups were reassigned since the previous update.
    pub groups_changed: bool,
}

/// The patch grid laid over a heightmap, with its texture layers.
#[derive(Clone, Debug)]
pub struct Landscape {
    heightmap: HeightMap,
    patches: Vec<Patch>,
    patch_count: (usize, usize),
    patch_groups: Vec<Vec<usize>>,
    layers: Vec<Layer>,
    groups_changed: bool,
}

impl Landscape {
    pub fn from_asset(asset: LandscapeAsset) -> Result<Self> {
        asset.validate()?;

        let LandscapeAsset {
            size,
            heights,
            normals,
            tangents,
            patch_count,
            patch_bounds,
            patch_groups,
            layers,
        } = asset;

        let heightmap = HeightMap::from_fields(size, heights, normals, tangents)?;

        let patches = patch_bounds
            .into_iter()
            .enumerate()
            .map(|(i, bounds)| Patch::new(i, i % patch_count.0, i / patch_count.0, bounds))
            .collect();

        for (i, group) in patch_groups.iter().enumerate() {
            if group.is_empty() {
                warn!("patch group {} contains no patches", i);
            }
        }

        let (gx, gy) = heightmap.dim();
        info!(
            "landscape loaded: {}x{} samples, {}x{} patches, {} layers",
            gx,
            gy,
            patch_count.0,
            patch_count.1,
            layers.len()
        );

        Ok(Self {
            heightmap,
            patches,
            patch_count,
            patch_groups,
            layers,
            groups_changed: false,
        })
    }

    pub fn heightmap(&self) -> &HeightMap {
        &self.heightmap
    }

    pub fn patch_count(&self) -> (usize, usize) {
        self.patch_count
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn patch(&self, x: usize, y: usize) -> &Patch {
        &self.patches[y * self.patch_count.0 + x]
    }

    pub fn patch_mut(&mut self, x: usize, y: usize) -> &mut Patch {
        &mut self.patches[y * self.patch_count.0 + x]
    }

    /// Level of detail of the patch across one side, `None` at the border.
    pub fn neighbor_lod(&self, x: usize, y: usize, side: Side) -> Option<usize> {
        let (nx, ny) = match side {
            Side::Left => (x.checked_sub(1)?, y),
            Side::Right => (x + 1, y),
            Side::Bottom => (x, y.checked_sub(1)?),
            Side::Top => (x, y + 1),
        };

        if nx >= self.patch_count.0 || ny >= self.patch_count.1 {
            return None;
        }

        Some(self.patch(nx, ny).level_of_detail())
    }

    pub fn patch_groups(&self) -> &[Vec<usize>] {
        &self.patch_groups
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Replaces the patch grouping. Only the index streams need rebuilding
    /// afterwards.
    pub fn set_patch_groups(&mut self, groups: Vec<Vec<usize>>) -> Result<()> {
        validate_groups(&groups, self.patches.len())?;
        validate_layers(&self.layers, groups.len())?;

        self.patch_groups = groups;
        self.groups_changed = true;
        Ok(())
    }

    pub fn set_layer_group(&mut self, layer: usize, group: usize) -> Result<()> {
        let count = self.layers.len();
        if group >= self.patch_groups.len() {
            return Err(TerrainError::GroupOutOfRange {
                layer,
                group,
                count: self.patch_groups.len(),
            });
        }

        let layer = self
            .layers
            .get_mut(layer)
            .ok_or(TerrainError::LayerOutOfRange { layer, count })?;

        if layer.patch_group != group {
            layer.patch_group = group;
            self.groups_changed = true;
        }
        Ok(())
    }

    /// Per-frame patch pass: culls every patch, then picks its level of
    /// detail from the viewer position.
    pub fn update(&mut self, eye: Vec3, error_ratio: f32, culler: &impl PatchCuller) -> PatchUpdate {
        let mut changes = PatchUpdate {
            groups_changed: std::mem::take(&mut self.groups_changed),
            ..Default::default()
        };

        for patch in &mut self.patches {
            let visible = culler.is_visible(patch.bounds());
            if visible != patch.visible() {
                changes.visibility_changed = true;
                changes.visible_enlarged |= visible;
                patch.set_visible(visible);
            }

            changes.lod_changed |= patch.update_lod(eye, error_ratio);
        }

        changes
    }
}

pub(crate) fn validate_patch_grid(grid: (usize, usize), patch_count: (usize, usize)) -> Result<()> {
    for (samples, patches) in [(grid.0, patch_count.0), (grid.1, patch_count.1)] {
        let expected = patches * MAX_PATCH_RESOLUTION + 1;
        if patches == 0 || samples != expected {
            return Err(TerrainError::LengthMismatch {
                what: "heightfield samples per patch row",
                expected,
                found: samples,
            });
        }
    }
    Ok(())
}

pub(crate) fn validate_groups(groups: &[Vec<usize>], patch_count: usize) -> Result<()> {
    for (group, patches) in groups.iter().enumerate() {
        if let Some(&patch) = patches.iter().find(|&&p| p >= patch_count) {
            return Err(TerrainError::PatchOutOfRange {
                group,
                patch,
                count: patch_count,
            });
        }
    }
    Ok(())
}

pub(crate) fn validate_layers(layers: &[Layer], group_count: usize) -> Result<()> {
    for (i, layer) in layers.iter().enumerate() {
        if layer.patch_group >= group_count {
            return Err(TerrainError::GroupOutOfRange {
                layer: i,
                group: layer.patch_group,
                count: group_count,
            });
        }
    }
    Ok(())
}
