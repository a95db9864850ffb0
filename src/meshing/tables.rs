//! Per-LOD reduction tables.
//!
//! Every level samples the 17 × 17 reference patch with a fixed stride
//! (16, 8, 4, 2, 1 for levels 0 to 4). A table lists the patch-local vertex
//! offsets (`y * 17 + x`, row-major) kept at that level, and a triangle list
//! indexing into those vertices. Each cell is split along its
//! `(x1, y0)`–`(x0, y1)` diagonal, the same split [`HeightMap::height`]
//! interpolates across:
//!
//! ```text
//!  i2 ___ i3
//!    |\  |
//!    | \ |      (i0, i1, i2), (i1, i3, i2)
//!    |__\|
//!  i0     i1
//! ```
//!
//! [`HeightMap::height`]: crate::HeightMap::height

use crate::patch::{HIGHEST_LOD, MAX_PATCH_RESOLUTION};

pub const LOD_COUNT: usize = HIGHEST_LOD + 1;

/// Grid stride at a level of detail.
pub fn stride(lod: usize) -> usize {
    MAX_PATCH_RESOLUTION >> lod
}

#[derive(Clone, Debug)]
pub struct LodTable {
    stride: usize,
    vertices: Vec<u32>,
    indices: Vec<u32>,
}

impl LodTable {
    fn new(lod: usize) -> Self {
        let stride = stride(lod);
        let row = MAX_PATCH_RESOLUTION + 1;
        let side = MAX_PATCH_RESOLUTION / stride + 1;

        let mut vertices = Vec::with_capacity(side * side);
        for y in (0..=MAX_PATCH_RESOLUTION).step_by(stride) {
            for x in (0..=MAX_PATCH_RESOLUTION).step_by(stride) {
                vertices.push((y * row + x) as u32);
            }
        }

        let cells = side - 1;
        let mut indices = Vec::with_capacity(cells * cells * 6);
        for cy in 0..cells {
            for cx in 0..cells {
                let i0 = (cy * side + cx) as u32;
                let i1 = i0 + 1;
                let i2 = i0 + side as u32;
                let i3 = i2 + 1;
                indices.extend([i0, i1, i2, i1, i3, i2]);
            }
        }

        Self {
            stride,
            vertices,
            indices,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Patch-local vertex offsets, `y * 17 + x`.
    pub fn vertices(&self) -> &[u32] {
        &self.vertices
    }

    /// Triangle list over [`LodTable::vertices`].
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

/// The five reduction tables, coarsest first.
#[derive(Clone, Debug)]
pub struct LodTables {
    levels: Vec<LodTable>,
}

impl Default for LodTables {
    fn default() -> Self {
        Self::new()
    }
}

impl LodTables {
    pub fn new() -> Self {
        Self {
            levels: (0..LOD_COUNT).map(LodTable::new).collect(),
        }
    }

    pub fn level(&self, lod: usize) -> &LodTable {
        &self.levels[lod]
    }
}

/// Splits a patch-local vertex offset into `(x, y)`.
pub fn offset_to_local(offset: u32) -> (usize, usize) {
    let row = MAX_PATCH_RESOLUTION + 1;
    (offset as usize % row, offset as usize / row)
}
