use ndarray::Array2;

use super::TerrainVertex;
use crate::HeightMap;

/// Full-resolution terrain vertices, one per heightfield sample.
///
/// Patch meshes copy their vertices out of this grid.
#[derive(Clone, Debug)]
pub struct VertexGrid(Array2<TerrainVertex>);

impl VertexGrid {
    pub fn new(terrain: &HeightMap, (patches_x, patches_y): (usize, usize)) -> Self {
        let (gx, gy) = terrain.dim();
        let (last_x, last_y) = ((gx - 1) as f32, (gy - 1) as f32);

        let vertices = Array2::from_shape_fn((gx, gy), |(x, y)| {
            let (u, v) = (x as f32 / last_x, y as f32 / last_y);

            TerrainVertex {
                position: terrain.vertex_at(x, y).to_array(),
                // The tile texture covers half a patch
                uv0: [2. * patches_x as f32 * u, 2. * patches_y as f32 * v],
                uv1: [u, v],
                normal: terrain.grid_normal(x, y).to_array(),
                tangent: terrain.grid_tangent(x, y).to_array(),
            }
        });

        Self(vertices)
    }

    pub fn get(&self, x: usize, y: usize) -> TerrainVertex {
        self.0[[x, y]]
    }

    pub fn height(&self, x: usize, y: usize) -> f32 {
        self.0[[x, y]].position[2]
    }

    pub fn dim(&self) -> (usize, usize) {
        self.0.dim()
    }
}
