use bevy::prelude::{Mat4, Vec3, Vec4};

use crate::patch::Aabb;

/// Decides which patches take part in the next mesh rebuild.
pub trait PatchCuller {
    fn is_visible(&self, bounds: &Aabb) -> bool;
}

/// Culler that keeps every patch, for headless use.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllVisible;

impl PatchCuller for AllVisible {
    fn is_visible(&self, _bounds: &Aabb) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// View frustum in terrain space.
#[derive(Clone, Debug)]
pub struct Frustum {
    planes: Vec<Plane>,
}

impl Frustum {
    /// Extracts the clipping planes of a view-projection matrix with a
    /// `[0, 1]` depth range.
    ///
    /// Planes that degenerate to nothing (the far plane of an infinite
    /// reverse-z projection) are dropped.
    pub fn from_view_projection(view_projection: Mat4) -> Self {
        let m = view_projection.transpose();
        let (r0, r1, r2, r3) = (m.x_axis, m.y_axis, m.z_axis, m.w_axis);

        let raw: [Vec4; 6] = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r2,      // z >= 0
            r3 - r2, // z <= w
        ];

        let planes = raw
            .iter()
            .filter_map(|p| {
                let normal = p.truncate();
                let len = normal.length();
                (len > f32::EPSILON).then(|| Plane {
                    normal: normal / len,
                    d: p.w / len,
                })
            })
            .collect();

        Self { planes }
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn intersects_aabb(&self, bounds: &Aabb) -> bool {
        let center = bounds.center();
        let extents = bounds.half_extents();

        self.planes.iter().all(|plane| {
            let radius = extents.dot(plane.normal.abs());
            plane.signed_distance(center) + radius >= 0.0
        })
    }
}

impl PatchCuller for Frustum {
    fn is_visible(&self, bounds: &Aabb) -> bool {
        self.intersects_aabb(bounds)
    }
}
