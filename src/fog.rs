use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use ndarray::Array2;

use crate::error::{Result, TerrainError};

pub const DEFAULT_FOG_RESOLUTION: usize = 128;

/// Intensity of cells seen before but not currently in view.
pub const DISCOVERED_INTENSITY: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
struct VisibleArea {
    radius: f32,
    position: Vec2,
}

/// Fog of war over the terrain footprint.
///
/// Visible circles are queued with [`FogMask::draw_visible_area`] during a
/// frame and rasterised into a coarse grid by [`FogMask::refresh`]. Cells
/// ever visible stay discovered.
#[derive(Clone, Debug)]
pub struct FogMask {
    width: f32,
    height: f32,
    resolution: usize,
    current: Array2<bool>,
    discovered: Array2<bool>,
    pending: Vec<VisibleArea>,
    refreshed: bool,
}

impl FogMask {
    pub fn new(width: f32, height: f32, resolution: usize) -> Result<Self> {
        if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
            return Err(TerrainError::InvalidFogExtent { width, height });
        }

        if resolution == 0 {
            return Err(TerrainError::InvalidFogResolution);
        }

        Ok(Self {
            width,
            height,
            resolution,
            current: Array2::from_elem((resolution, resolution), false),
            discovered: Array2::from_elem((resolution, resolution), false),
            pending: Vec::new(),
            refreshed: false,
        })
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Queues a circle to reveal on the next refresh.
    pub fn draw_visible_area(&mut self, radius: f32, x: f32, y: f32) {
        self.pending.push(VisibleArea {
            radius,
            position: Vec2::new(x, y),
        });
    }

    /// Rasterises the queued circles into the current visibility grid.
    ///
    /// Does nothing when the queue is empty and the mask was built before,
    /// so the last visibility holds until new areas arrive.
    pub fn refresh(&mut self) {
        if self.refreshed && self.pending.is_empty() {
            return;
        }

        self.current.fill(false);

        let s = self.resolution as f32;
        let cell = Vec2::new(self.width / s, self.height / s);
        let last = self.resolution as i64 - 1;
        let to_cell = |v: f32, extent: f32| ((s * v / extent) as i64).clamp(0, last) as usize;

        for area in self.pending.drain(..) {
            let (p, r) = (area.position, area.radius);

            let (x0, x1) = (to_cell(p.x - r, self.width), to_cell(p.x + r, self.width) + 1);
            let (y0, y1) = (to_cell(p.y - r, self.height), to_cell(p.y + r, self.height) + 1);

            for y in y0..=y1.min(self.resolution - 1) {
                for x in x0..=x1.min(self.resolution - 1) {
                    let center = (Vec2::new(x as f32, y as f32) + 0.5) * cell;
                    if center.distance(p) <= r {
                        self.current[[x, y]] = true;
                    }
                }
            }
        }

        self.discovered
            .zip_mut_with(&self.current, |seen, &visible| *seen |= visible);
        self.refreshed = true;
    }

    /// Whether a point lies in the fog: outside the mask or not currently
    /// visible.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        match self.cell(x, y) {
            Some(cell) => !self.current[cell],
            None => true,
        }
    }

    /// Whether a point was ever visible.
    pub fn is_discovered(&self, x: f32, y: f32) -> bool {
        self.cell(x, y).map_or(false, |cell| self.discovered[cell])
    }

    /// 1 in view, [`DISCOVERED_INTENSITY`] for explored ground, 0 elsewhere.
    pub fn intensity(&self, x: f32, y: f32) -> f32 {
        self.cell(x, y).map_or(0.0, |cell| self.cell_intensity(cell))
    }

    fn cell_intensity(&self, cell: [usize; 2]) -> f32 {
        if self.current[cell] {
            1.0
        } else if self.discovered[cell] {
            DISCOVERED_INTENSITY
        } else {
            0.0
        }
    }

    fn cell(&self, x: f32, y: f32) -> Option<[usize; 2]> {
        if x <= 0.0 || y <= 0.0 || x >= self.width || y >= self.height {
            return None;
        }

        let s = self.resolution as f32;
        let cx = ((s * x / self.width) as usize).min(self.resolution - 1);
        let cy = ((s * y / self.height) as usize).min(self.resolution - 1);
        Some([cx, cy])
    }

    /// RGBA8 pixels of the fog intensity, rows from `y = 0` upwards.
    pub fn mask_pixels(&self) -> Vec<u8> {
        let n = self.resolution;
        let mut bytes = Vec::with_capacity(n * n * 4);

        for y in 0..n {
            for x in 0..n {
                let val = (255. * self.cell_intensity([x, y])) as u8;
                bytes.extend([val; 4]);
            }
        }

        bytes
    }

    /// The fog intensity as a texture, for blending over the terrain.
    pub fn to_image(&self) -> Image {
        Image::new(
            Extent3d {
                width: self.resolution as u32,
                height: self.resolution as u32,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            self.mask_pixels(),
            TextureFormat::Rgba8Unorm,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_extent() {
        assert!(FogMask::new(0.0, 10.0, 8).is_err());
        assert!(FogMask::new(10.0, f32::NAN, 8).is_err());
    }

    #[test]
    fn rejects_zero_resolution() {
        assert!(matches!(
            FogMask::new(10.0, 10.0, 0),
            Err(TerrainError::InvalidFogResolution)
        ));
    }

    #[test]
    fn drawing_is_deferred_until_refresh() {
        let mut fog = FogMask::new(100.0, 100.0, 16).unwrap();
        fog.draw_visible_area(10.0, 50.0, 50.0);
        assert!(fog.contains(50.0, 50.0));

        fog.refresh();
        assert!(!fog.contains(50.0, 50.0));
    }

    #[test]
    fn pixels_encode_intensity() {
        let mut fog = FogMask::new(4.0, 4.0, 4).unwrap();
        fog.draw_visible_area(0.5, 0.5, 0.5);
        fog.refresh();

        let pixels = fog.mask_pixels();
        assert_eq!(pixels.len(), 64);
        assert_eq!(&pixels[..4], [255; 4]);
        assert_eq!(&pixels[4..8], [0; 4]);
    }
}
