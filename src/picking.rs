use bevy::math::Ray;
use bevy::prelude::{IVec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::HeightMap;

// Below this horizontal length a ray is treated as vertical.
const VERTICAL_EPSILON: f32 = 1e-6;
const MIN_MARCH_STEP: f32 = 1e-3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickMethod {
    /// Fixed-step march followed by bisection.
    #[default]
    MarchAndRefine,
    /// Walks the grid points under the ray and tests the surrounding
    /// triangles exactly.
    CellWalk,
}

/// Ray against heightfield intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainPicker {
    pub march_step: f32,
    pub refine_steps: usize,
    pub method: PickMethod,
}

impl Default for TerrainPicker {
    fn default() -> Self {
        Self {
            march_step: 5.0,
            refine_steps: 5,
            method: PickMethod::default(),
        }
    }
}

impl TerrainPicker {
    /// First point where the ray meets the terrain surface, `None` if it
    /// misses the footprint or never reaches the ground inside it.
    pub fn intersect(&self, map: &HeightMap, ray: Ray) -> Option<Vec3> {
        let direction = ray.direction.try_normalize()?;
        let ray = Ray {
            origin: ray.origin,
            direction,
        };
        let (t_enter, t_exit) = clip_to_footprint(map, &ray)?;

        match self.method {
            PickMethod::MarchAndRefine => {
                let step = self.march_step.max(MIN_MARCH_STEP);
                let (t_enter, t_exit) =
                    clip_to_height_range(map, &ray, (t_enter, t_exit), step)?;
                self.march_and_refine(map, &ray, t_enter, t_exit, step)
            }
            PickMethod::CellWalk => cell_walk(map, &ray, t_enter, t_exit),
        }
    }

    fn march_and_refine(
        &self,
        map: &HeightMap,
        ray: &Ray,
        t_enter: f32,
        t_exit: f32,
        step: f32,
    ) -> Option<Vec3> {
        let below = |t: f32| {
            let p = point_at(ray, t);
            map.height(p.x, p.y) >= p.z
        };

        if below(t_enter) {
            return None;
        }

        let mut previous = t_enter;
        let mut i = 1;
        loop {
            let t = (t_enter + i as f32 * step).min(t_exit);
            if below(t) {
                return Some(point_at(ray, self.refine(&below, previous, t)));
            }
            if t >= t_exit {
                return None;
            }
            previous = t;
            i += 1;
        }
    }

    // Bisects between a parameter above the surface and one below it.
    fn refine(&self, below: &impl Fn(f32) -> bool, mut above: f32, mut under: f32) -> f32 {
        let mut mid = (above + under) / 2.0;
        for _ in 0..self.refine_steps {
            mid = (above + under) / 2.0;
            if below(mid) {
                under = mid;
            } else {
                above = mid;
            }
        }
        mid
    }
}

fn point_at(ray: &Ray, t: f32) -> Vec3 {
    ray.origin + ray.direction * t
}

// Slab test of the ray against the footprint rectangle, returning the
// parameter range inside it. The range is unbounded for vertical rays.
fn clip_to_footprint(map: &HeightMap, ray: &Ray) -> Option<(f32, f32)> {
    let size = map.size();
    let mut t_enter = 0.0f32;
    let mut t_exit = f32::INFINITY;

    for (origin, direction, extent) in [
        (ray.origin.x, ray.direction.x, size.x),
        (ray.origin.y, ray.direction.y, size.y),
    ] {
        if direction.abs() < VERTICAL_EPSILON {
            if !(0.0..=extent).contains(&origin) {
                return None;
            }
            continue;
        }

        let t0 = (0.0 - origin) / direction;
        let t1 = (extent - origin) / direction;
        t_enter = t_enter.max(t0.min(t1));
        t_exit = t_exit.min(t0.max(t1));
    }

    (t_enter <= t_exit).then_some((t_enter, t_exit))
}

// Narrows a parameter range to where the ray lies between the lowest and
// highest samples, widened by `margin` on both planes so the range starts
// strictly above the surface and ends strictly below it. With a unit
// direction the result spans at most `(highest - lowest) / |dz| + 2 * margin`
// or the horizontal extent over `|dxy|`, whichever is shorter.
fn clip_to_height_range(
    map: &HeightMap,
    ray: &Ray,
    (mut t_enter, mut t_exit): (f32, f32),
    margin: f32,
) -> Option<(f32, f32)> {
    let (lowest, highest) = map.height_range();
    let (oz, dz) = (ray.origin.z, ray.direction.z);

    if dz < 0.0 {
        t_enter = t_enter.max((highest - oz) / dz - margin);
        t_exit = t_exit.min((lowest - oz) / dz + margin);
    } else {
        // Never descends, so anything above the highest sample is a miss
        if oz > highest {
            return None;
        }
        if dz > 0.0 {
            t_exit = t_exit.min((highest - oz) / dz + margin);
        }
    }

    (t_enter <= t_exit).then_some((t_enter, t_exit))
}

fn cell_walk(map: &HeightMap, ray: &Ray, t_enter: f32, t_exit: f32) -> Option<Vec3> {
    let horizontal = ray.direction.truncate();
    if horizontal.length() < VERTICAL_EPSILON || !t_exit.is_finite() {
        let (x, y) = (ray.origin.x, ray.origin.y);
        let ground = map.height(x, y);
        return (ray.direction.z < 0.0 && ray.origin.z >= ground).then(|| Vec3::new(x, y, ground));
    }

    let (gx, gy) = map.dim();
    let last = IVec2::new(gx as i32 - 1, gy as i32 - 1);
    let to_grid = |t: f32| {
        let p = point_at(ray, t);
        map.position_to_grid(p.x, p.y).clamp(IVec2::ZERO, last)
    };

    let origin = ray.origin.truncate();
    let horizontal_len2 = horizontal.length_squared();

    for point in GridLine::new(to_grid(t_enter), to_grid(t_exit)) {
        let (x, y) = (point.x as usize, point.y as usize);

        // Ray height where it passes closest to the grid point
        let t = ((map.grid_to_position(x, y) - origin).dot(horizontal) / horizontal_len2)
            .clamp(t_enter, t_exit);
        let ray_z = ray.origin.z + ray.direction.z * t;

        if map.grid_height(x, y) >= ray_z {
            return Some(nearest_triangle_hit(map, ray, point).unwrap_or_else(|| map.vertex_at(x, y)));
        }
    }

    None
}

// Tests the two triangles of each cell touching a grid point, split the
// way the mesh and `HeightMap::height` split them.
fn nearest_triangle_hit(map: &HeightMap, ray: &Ray, point: IVec2) -> Option<Vec3> {
    let (gx, gy) = map.dim();
    let mut nearest: Option<f32> = None;

    for cy in point.y - 1..=point.y {
        for cx in point.x - 1..=point.x {
            if cx < 0 || cy < 0 || cx as usize + 1 >= gx || cy as usize + 1 >= gy {
                continue;
            }
            let (cx, cy) = (cx as usize, cy as usize);

            let v00 = map.vertex_at(cx, cy);
            let v10 = map.vertex_at(cx + 1, cy);
            let v11 = map.vertex_at(cx + 1, cy + 1);
            let v01 = map.vertex_at(cx, cy + 1);

            for triangle in [[v00, v10, v01], [v10, v11, v01]] {
                if let Some(t) = ray_triangle(ray, triangle) {
                    if nearest.map_or(true, |n| t < n) {
                        nearest = Some(t);
                    }
                }
            }
        }
    }

    nearest.map(|t| point_at(ray, t))
}

/// Moller-Trumbore ray-triangle intersection, two-sided.
fn ray_triangle(ray: &Ray, [v0, v1, v2]: [Vec3; 3]) -> Option<f32> {
    const EPSILON: f32 = 1e-7;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t >= 0.0).then_some(t)
}

/// Integer grid points on the line between two points, both ends included,
/// in Bresenham order.
pub struct GridLine {
    current: IVec2,
    end: IVec2,
    delta: IVec2,
    step: IVec2,
    error: i32,
    done: bool,
}

impl GridLine {
    pub fn new(start: IVec2, end: IVec2) -> Self {
        let d = end - start;
        let delta = IVec2::new(d.x.abs(), -d.y.abs());

        Self {
            current: start,
            end,
            delta,
            step: IVec2::new(d.x.signum(), d.y.signum()),
            error: delta.x + delta.y,
            done: false,
        }
    }
}

impl Iterator for GridLine {
    type Item = IVec2;

    fn next(&mut self) -> Option<IVec2> {
        if self.done {
            return None;
        }

        let point = self.current;
        if point == self.end {
            self.done = true;
            return Some(point);
        }

        let e2 = 2 * self.error;
        if e2 >= self.delta.y {
            self.error += self.delta.y;
            self.current.x += self.step.x;
        }
        if e2 <= self.delta.x {
            self.error += self.delta.x;
            self.current.y += self.step.y;
        }

        Some(point)
    }
}
