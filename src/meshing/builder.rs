use bevy::log::debug;

use super::tables::{offset_to_local, stride, LodTables};
use super::{TerrainBuffers, TerrainVertex, VertexGrid};
use crate::landscape::{Landscape, PatchUpdate, Side};
use crate::patch::{Patch, MAX_PATCH_RESOLUTION};

/// Which streams the last [`TerrainMeshBuilder::update`] rewrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshUpdate {
    pub vertices: bool,
    pub indices: bool,
}

impl MeshUpdate {
    pub const ALL: Self = Self {
        vertices: true,
        indices: true,
    };

    pub fn any(&self) -> bool {
        self.vertices || self.indices
    }
}

/// Builds the terrain vertex and index streams from the visible patches.
///
/// Each visible patch contributes the vertices of its level's reduction
/// table. Patch borders next to a coarser neighbour are bent onto the
/// neighbour's edge so that no T-junction gaps appear.
#[derive(Clone, Debug)]
pub struct TerrainMeshBuilder {
    grid: VertexGrid,
    tables: LodTables,
    vertices: Vec<TerrainVertex>,
    indices: Vec<u32>,
    group_indices: Vec<Vec<u32>>,
    starting_vertices: Vec<Option<u32>>,
    // Level each patch had when its vertices were emitted
    stream_lods: Vec<usize>,
    built: bool,
}

impl TerrainMeshBuilder {
    pub fn new(landscape: &Landscape) -> Self {
        let patch_total = landscape.patches().len();

        Self {
            grid: VertexGrid::new(landscape.heightmap(), landscape.patch_count()),
            tables: LodTables::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
            group_indices: Vec::new(),
            starting_vertices: vec![None; patch_total],
            stream_lods: vec![0; patch_total],
            built: false,
        }
    }

    /// Brings the streams in line with the landscape after a patch update.
    ///
    /// Any level or visibility change rebuilds both streams, a regrouping
    /// alone only the index streams. The first call always builds.
    pub fn update(&mut self, landscape: &Landscape, changes: PatchUpdate) -> MeshUpdate {
        if !self.built || changes.lod_changed || changes.visibility_changed {
            self.rebuild(landscape);
            MeshUpdate::ALL
        } else if changes.groups_changed {
            self.rebuild_indices(landscape);
            MeshUpdate {
                vertices: false,
                indices: true,
            }
        } else {
            MeshUpdate::default()
        }
    }

    pub fn rebuild(&mut self, landscape: &Landscape) {
        self.rebuild_vertices(landscape);
        self.rebuild_indices(landscape);
        self.built = true;
    }

    pub fn rebuild_vertices(&mut self, landscape: &Landscape) {
        self.vertices.clear();

        for patch in landscape.patches() {
            let i = patch.index();
            if !patch.visible() {
                self.starting_vertices[i] = None;
                continue;
            }

            self.starting_vertices[i] = Some(self.vertices.len() as u32);
            self.stream_lods[i] = patch.level_of_detail();

            let base_x = patch.x() * MAX_PATCH_RESOLUTION;
            let base_y = patch.y() * MAX_PATCH_RESOLUTION;

            for &offset in self.tables.level(patch.level_of_detail()).vertices() {
                let (lx, ly) = offset_to_local(offset);
                let mut vertex = self.grid.get(base_x + lx, base_y + ly);

                if let Some(z) = self.stitched_height(landscape, patch, lx, ly) {
                    vertex.position[2] = z;
                }

                self.vertices.push(vertex);
            }
        }

        debug!(
            "rebuilt terrain vertices: {} vertices for {} patches",
            self.vertices.len(),
            self.starting_vertices.iter().flatten().count()
        );
    }

    /// Rebuilds the index streams against the current vertex stream.
    pub fn rebuild_indices(&mut self, landscape: &Landscape) {
        let patch_indices = |patch: usize, out: &mut Vec<u32>| {
            if let Some(start) = self.starting_vertices[patch] {
                let table = self.tables.level(self.stream_lods[patch]);
                out.extend(table.indices().iter().map(|&i| i + start));
            }
        };

        let mut indices = Vec::new();
        for patch in 0..self.starting_vertices.len() {
            patch_indices(patch, &mut indices);
        }

        let group_indices = landscape
            .patch_groups()
            .iter()
            .map(|group| {
                let mut out = Vec::new();
                for &patch in group {
                    patch_indices(patch, &mut out);
                }
                out
            })
            .collect();

        self.indices = indices;
        self.group_indices = group_indices;

        debug!(
            "rebuilt terrain indices: {} triangles in {} patch groups",
            self.indices.len() / 3,
            self.group_indices.len()
        );
    }

    // Height of a border vertex bent onto a coarser neighbour's edge. Only the
    // first side that applies is fixed, in left, right, bottom, top order.
    fn stitched_height(&self, landscape: &Landscape, patch: &Patch, lx: usize, ly: usize) -> Option<f32> {
        const LAST: usize = MAX_PATCH_RESOLUTION;
        let lod = patch.level_of_detail();

        let candidates = [
            (Side::Left, lx == 0 && ly != LAST),
            (Side::Right, lx == LAST && ly != LAST),
            (Side::Bottom, ly == 0 && lx != LAST),
            (Side::Top, ly == LAST && lx != LAST),
        ];

        let (side, coarser) = candidates.into_iter().find_map(|(side, on_border)| {
            if !on_border {
                return None;
            }
            let neighbor = landscape.neighbor_lod(patch.x(), patch.y(), side)?;
            (lod > neighbor).then_some((side, neighbor))
        })?;

        let k = stride(coarser);
        let base_x = patch.x() * MAX_PATCH_RESOLUTION;
        let base_y = patch.y() * MAX_PATCH_RESOLUTION;

        let along = match side {
            Side::Left | Side::Right => ly,
            Side::Bottom | Side::Top => lx,
        };
        let t = along / k * k;
        let weight = (along % k) as f32 / k as f32;

        let (a, b) = match side {
            Side::Left | Side::Right => (
                self.grid.height(base_x + lx, base_y + t),
                self.grid.height(base_x + lx, base_y + t + k),
            ),
            Side::Bottom | Side::Top => (
                self.grid.height(base_x + t, base_y + ly),
                self.grid.height(base_x + t + k, base_y + ly),
            ),
        };

        Some(a + (b - a) * weight)
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn group_indices(&self, group: usize) -> &[u32] {
        &self.group_indices[group]
    }

    /// First vertex of a patch in the stream, `None` while it is culled.
    pub fn starting_vertex(&self, patch: usize) -> Option<u32> {
        self.starting_vertices[patch]
    }

    pub fn grid(&self) -> &VertexGrid {
        &self.grid
    }

    pub fn buffers(&self) -> TerrainBuffers<'_> {
        TerrainBuffers {
            vertices: &self.vertices,
            indices: &self.indices,
            group_indices: &self.group_indices,
            starting_vertices: &self.starting_vertices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{LandscapeBuilder, LayerDesc};
    use crate::culling::AllVisible;
    use bevy::prelude::Vec3;
    use ndarray::Array2;

    fn landscape() -> Landscape {
        let heights = Array2::from_shape_fn((33, 33), |(x, y)| ((x * 7 + y * 3) % 11) as f32);
        let asset = LandscapeBuilder::new(Vec3::new(32.0, 32.0, 10.0), heights)
            .unwrap()
            .with_layer(LayerDesc {
                target_patches: vec![true, false, true, true],
                ..Default::default()
            })
            .build()
            .unwrap();
        Landscape::from_asset(asset).unwrap()
    }

    #[test]
    fn first_update_builds_everything() {
        let landscape = landscape();
        let mut builder = TerrainMeshBuilder::new(&landscape);

        assert_eq!(builder.update(&landscape, PatchUpdate::default()), MeshUpdate::ALL);
        // Four visible patches at the coarsest level
        assert_eq!(builder.vertices().len(), 16);
        assert_eq!(builder.indices().len(), 24);
        assert_eq!(builder.group_indices(0).len(), 18);
    }

    #[test]
    fn unchanged_state_skips_rebuild() {
        let landscape = landscape();
        let mut builder = TerrainMeshBuilder::new(&landscape);
        builder.update(&landscape, PatchUpdate::default());

        assert!(!builder.update(&landscape, PatchUpdate::default()).any());
    }

    #[test]
    fn regrouping_only_touches_indices() {
        let mut landscape = landscape();
        let mut builder = TerrainMeshBuilder::new(&landscape);
        builder.update(&landscape, PatchUpdate::default());

        landscape.set_patch_groups(vec![vec![1]]).unwrap();
        let changes = landscape.update(Vec3::splat(1e6), 0.0012, &AllVisible);
        assert!(changes.groups_changed && !changes.lod_changed);

        let update = builder.update(&landscape, changes);
        assert_eq!(
            update,
            MeshUpdate {
                vertices: false,
                indices: true
            }
        );
        assert_eq!(builder.group_indices(0), [4, 5, 6, 5, 7, 6]);
    }

    #[test]
    fn culled_patches_have_no_starting_vertex() {
        let mut landscape = landscape();
        landscape.patch_mut(1, 0).set_visible(false);

        let mut builder = TerrainMeshBuilder::new(&landscape);
        builder.rebuild(&landscape);

        assert_eq!(builder.starting_vertex(0), Some(0));
        assert_eq!(builder.starting_vertex(1), None);
        assert_eq!(builder.starting_vertex(2), Some(4));
        assert_eq!(builder.vertices().len(), 12);
    }

    #[test]
    fn border_follows_coarser_neighbour() {
        let mut landscape = landscape();
        landscape.patch_mut(0, 0).set_level_of_detail(4);
        landscape.patch_mut(1, 0).set_level_of_detail(1);

        let mut builder = TerrainMeshBuilder::new(&landscape);
        builder.rebuild(&landscape);

        let start = builder.starting_vertex(0).unwrap() as usize;
        let grid = builder.grid();
        for ly in 0..MAX_PATCH_RESOLUTION {
            let vertex = builder.vertices()[start + ly * 17 + 16];
            let t = ly / 8 * 8;
            let w = (ly % 8) as f32 / 8.0;
            let expected = grid.height(16, t) + (grid.height(16, t + 8) - grid.height(16, t)) * w;
            assert!((vertex.position[2] - expected).abs() < 1e-5, "row {ly}");
        }
    }
}
