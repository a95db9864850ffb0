use bevy::prelude::{IVec2, Vec2, Vec3};
use ndarray::Array2;

use crate::error::{Result, TerrainError};

// Fractional grid coordinates within this many cells of a grid line are
// snapped onto it, so that world positions produced by `grid_to_position`
// sample exactly. Absolute, so the snap band does not widen on large grids.
const GRID_SNAP_EPSILON: f32 = 1e-4;

/// Sampled terrain surface.
///
/// Samples are indexed `[[x, y]]` with shape `(gx, gy)`. The footprint spans
/// `[0, size.x] × [0, size.y]` on the ground plane and heights run along Z.
#[derive(Clone, Debug)]
pub struct HeightMap {
    size: Vec3,
    heights: Array2<f32>,
    normals: Array2<Vec3>,
    tangents: Array2<Vec3>,
}

impl HeightMap {
    pub fn from_fields(
        size: Vec3,
        heights: Array2<f32>,
        normals: Array2<Vec3>,
        tangents: Array2<Vec3>,
    ) -> Result<Self> {
        let (gx, gy) = heights.dim();
        validate_grid(size, &heights)?;

        for (what, found) in [("normal field", normals.dim()), ("tangent field", tangents.dim())] {
            if found != (gx, gy) {
                return Err(TerrainError::LengthMismatch {
                    what,
                    expected: gx * gy,
                    found: found.0 * found.1,
                });
            }
        }

        Ok(Self {
            size,
            heights,
            normals,
            tangents,
        })
    }

    /// Builds a heightmap from raw heights, deriving smoothed normals and
    /// tangents from the surrounding samples.
    pub fn from_heights(size: Vec3, heights: Array2<f32>) -> Result<Self> {
        validate_grid(size, &heights)?;
        let (normals, tangents) = normals_and_tangents(size, &heights);

        Ok(Self {
            size,
            heights,
            normals,
            tangents,
        })
    }

    pub fn size(&self) -> Vec3 {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.heights.dim()
    }

    pub fn heights(&self) -> &Array2<f32> {
        &self.heights
    }

    pub fn normals(&self) -> &Array2<Vec3> {
        &self.normals
    }

    pub fn tangents(&self) -> &Array2<Vec3> {
        &self.tangents
    }

    pub fn grid_height(&self, x: usize, y: usize) -> f32 {
        self.heights[[x, y]]
    }

    pub fn grid_normal(&self, x: usize, y: usize) -> Vec3 {
        self.normals[[x, y]]
    }

    pub fn grid_tangent(&self, x: usize, y: usize) -> Vec3 {
        self.tangents[[x, y]]
    }

    /// World position of a grid sample, height included.
    pub fn vertex_at(&self, x: usize, y: usize) -> Vec3 {
        self.grid_to_position(x, y).extend(self.heights[[x, y]])
    }

    pub fn grid_to_position(&self, x: usize, y: usize) -> Vec2 {
        let (gx, gy) = self.dim();
        Vec2::new(
            x as f32 * self.size.x / (gx - 1) as f32,
            y as f32 * self.size.y / (gy - 1) as f32,
        )
    }

    /// Grid cell containing a world position. Not clamped: positions outside
    /// the footprint map to cells outside the grid.
    pub fn position_to_grid(&self, x: f32, y: f32) -> IVec2 {
        let (gx, gy) = self.dim();
        IVec2::new(
            (x * (gx - 1) as f32 / self.size.x) as i32,
            (y * (gy - 1) as f32 / self.size.y) as i32,
        )
    }

    /// Lowest and highest stored sample.
    pub fn height_range(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &h| {
                (min.min(h), max.max(h))
            })
    }

    /// Terrain height at any world position.
    ///
    /// The enclosing grid quad is split along its `(x1, y0)`–`(x0, y1)`
    /// diagonal, matching the mesh triangulation, and the height is
    /// interpolated across the triangle the point falls in. Positions off the
    /// footprint are clamped to its border.
    pub fn height(&self, x: f32, y: f32) -> f32 {
        let cell = self.locate(x, y);
        let h = |x: usize, y: usize| self.heights[[x, y]];

        if cell.fx + cell.fy > 1.0 {
            // Upper triangle, anchored at (x1, y1)
            h(cell.x1, cell.y1)
                + (1.0 - cell.fx) * (h(cell.x0, cell.y1) - h(cell.x1, cell.y1))
                + (1.0 - cell.fy) * (h(cell.x1, cell.y0) - h(cell.x1, cell.y1))
        } else {
            // Lower triangle, anchored at (x0, y0)
            h(cell.x0, cell.y0)
                + cell.fx * (h(cell.x1, cell.y0) - h(cell.x0, cell.y0))
                + cell.fy * (h(cell.x0, cell.y1) - h(cell.x0, cell.y0))
        }
    }

    /// Surface normal at any world position.
    ///
    /// Plain bilinear blend of the four surrounding normals rather than the
    /// triangle split used by [`HeightMap::height`].
    pub fn normal(&self, x: f32, y: f32) -> Vec3 {
        let cell = self.locate(x, y);
        let n = |x: usize, y: usize| self.normals[[x, y]];

        let a = n(cell.x0, cell.y0).lerp(n(cell.x0, cell.y1), cell.fy);
        let b = n(cell.x1, cell.y0).lerp(n(cell.x1, cell.y1), cell.fy);

        a.lerp(b, cell.fx).try_normalize().unwrap_or(Vec3::Z)
    }

    fn locate(&self, x: f32, y: f32) -> GridCell {
        let (gx, gy) = self.dim();
        let (x0, x1, fx) = split_axis(x, self.size.x, gx);
        let (y0, y1, fy) = split_axis(y, self.size.y, gy);
        GridCell {
            x0,
            y0,
            x1,
            y1,
            fx,
            fy,
        }
    }
}

struct GridCell {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    fx: f32,
    fy: f32,
}

// Maps a world coordinate onto one grid axis, returning the two bracketing
// samples and the fractional position between them.
fn split_axis(v: f32, extent: f32, samples: usize) -> (usize, usize, f32) {
    let last = (samples - 1) as f32;
    let mut g = (v.clamp(0.0, extent) * last / extent).clamp(0.0, last);

    let nearest = g.round();
    if (g - nearest).abs() <= GRID_SNAP_EPSILON {
        g = nearest;
    }

    let i0 = g as usize;
    let i1 = (i0 + 1).min(samples - 1);
    (i0, i1, g - i0 as f32)
}

fn validate_grid(size: Vec3, heights: &Array2<f32>) -> Result<()> {
    let (gx, gy) = heights.dim();
    if gx < 2 || gy < 2 {
        return Err(TerrainError::InvalidGrid(gx, gy));
    }

    if !size.is_finite() || size.x <= 0.0 || size.y <= 0.0 || size.z < 0.0 {
        return Err(TerrainError::InvalidSize(size));
    }

    if let Some(((x, y), _)) = heights.indexed_iter().find(|(_, h)| !h.is_finite()) {
        return Err(TerrainError::NonFiniteHeight { x, y });
    }

    Ok(())
}

fn normals_and_tangents(size: Vec3, heights: &Array2<f32>) -> (Array2<Vec3>, Array2<Vec3>) {
    let (gx, gy) = heights.dim();

    // Positions keep the unclamped grid coordinate while the height is read
    // from the nearest valid sample.
    let position = |x: isize, y: isize| -> Vec3 {
        let mx = x.clamp(0, gx as isize - 1) as usize;
        let my = y.clamp(0, gy as isize - 1) as usize;
        Vec3::new(
            x as f32 * size.x / (gx - 1) as f32,
            y as f32 * size.y / (gy - 1) as f32,
            heights[[mx, my]],
        )
    };

    let mut normals = Array2::from_elem((gx, gy), Vec3::Z);
    let mut tangents = Array2::from_elem((gx, gy), Vec3::Y);

    for x in 0..gx as isize {
        for y in 0..gy as isize {
            let pos = position(x, y);

            let edge1 = pos - position(x, y + 1);
            let edge2 = pos - position(x + 1, y);
            let edge3 = pos - position(x - 1, y + 1);
            let edge4 = pos - position(x + 1, y + 1);
            let edge5 = pos - position(x - 1, y - 1);

            let normal = edge2.cross(edge1) + edge4.cross(edge3) + edge3.cross(edge5);

            let idx = [x as usize, y as usize];
            normals[idx] = normal.try_normalize().unwrap_or(Vec3::Z);
            tangents[idx] = edge1.try_normalize().unwrap_or(Vec3::Y);
        }
    }

    // Smooth interior normals over a 3x3 neighbourhood, weighting the
    // centre sample 5 out of 13.
    let unsmoothed = normals.clone();
    for x in 1..gx.saturating_sub(1) {
        for y in 1..gy.saturating_sub(1) {
            let mut normal = unsmoothed[[x, y]] * 4.0;
            for nx in x - 1..=x + 1 {
                for ny in y - 1..=y + 1 {
                    normal += unsmoothed[[nx, ny]];
                }
            }

            let normal = normal.try_normalize().unwrap_or(Vec3::Z);
            normals[[x, y]] = normal;

            // Keep the tangent perpendicular to the smoothed normal
            let helper = normal.cross(tangents[[x, y]]);
            tangents[[x, y]] = helper.cross(normal).try_normalize().unwrap_or(Vec3::Y);
        }
    }

    (normals, tangents)
}
