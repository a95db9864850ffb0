use bevy::prelude::Vec3;

/// At maximum resolution a patch covers 16 × 16 grid cells.
pub const MAX_PATCH_RESOLUTION: usize = 16;

pub const LOWEST_LOD: usize = 0;
pub const HIGHEST_LOD: usize = 4;

/// Axis-aligned bounding box used for patch culling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) / 2.0
    }
}

/// The smallest unit of the terrain: one tile of the heightfield with its own
/// level of detail and visibility.
#[derive(Clone, Debug)]
pub struct Patch {
    index: usize,
    x: usize,
    y: usize,
    lod: usize,
    visible: bool,
    bounds: Aabb,
    center: Vec3,
}

impl Patch {
    pub fn new(index: usize, x: usize, y: usize, bounds: Aabb) -> Self {
        Self {
            index,
            x,
            y,
            lod: LOWEST_LOD,
            visible: true,
            bounds,
            center: bounds.center(),
        }
    }

    /// Picks the level of detail from the distance to the viewer.
    ///
    /// Returns whether the level changed.
    pub fn update_lod(&mut self, eye: Vec3, error_ratio: f32) -> bool {
        let distance = eye.distance(self.center);
        let coarsening = (distance * error_ratio).floor() as i64;
        let lod = (HIGHEST_LOD as i64 - coarsening).clamp(LOWEST_LOD as i64, HIGHEST_LOD as i64) as usize;

        if lod != self.lod {
            self.lod = lod;
            return true;
        }

        false
    }

    pub fn level_of_detail(&self) -> usize {
        self.lod
    }

    pub fn set_level_of_detail(&mut self, lod: usize) {
        self.lod = lod.min(HIGHEST_LOD);
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Index into the landscape's patch list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Patch column.
    pub fn x(&self) -> usize {
        self.x
    }

    /// Patch row.
    pub fn y(&self) -> usize {
        self.y
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }
}
