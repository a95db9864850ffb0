use bevy::log::debug;
use bevy::prelude::Vec3;
use ndarray::Array2;

use super::LandscapeAsset;
use crate::error::{Result, TerrainError};
use crate::landscape::Layer;
use crate::patch::Aabb;

/// Parses a landscape asset. Any truncation, inconsistent count or leftover
/// byte fails the whole load.
pub fn read_landscape(data: &[u8]) -> Result<LandscapeAsset> {
    let mut input = ByteReader::new(data);

    let size = input.read_vec3("terrain size")?;

    let gx = input.read_count("grid width")?;
    let gy = input.read_count("grid height")?;
    if gx < 2 || gy < 2 {
        return Err(TerrainError::InvalidGrid(gx, gy));
    }

    let heights = input.read_grid(gx, gy, "heights", |b| input_f32(b))?;
    if let Some(((x, y), _)) = heights.indexed_iter().find(|(_, h)| !h.is_finite()) {
        return Err(TerrainError::NonFiniteHeight { x, y });
    }

    let normals = input.read_grid(gx, gy, "normals", input_vec3)?;
    let tangents = input.read_grid(gx, gy, "tangents", input_vec3)?;

    let patch_count = (
        input.read_count("patch count x")?,
        input.read_count("patch count y")?,
    );

    let total = patch_count
        .0
        .checked_mul(patch_count.1)
        .ok_or(TerrainError::LengthMismatch {
            what: "patch count",
            expected: usize::MAX,
            found: patch_count.0,
        })?;

    let mut patch_bounds = Vec::with_capacity(total.min(input.remaining() / 24));
    for _ in 0..total {
        let min = input.read_vec3("patch bounds")?;
        let max = input.read_vec3("patch bounds")?;
        patch_bounds.push(Aabb::new(min, max));
    }

    let group_count = input.read_count("patch group count")?;
    let mut patch_groups = Vec::with_capacity(group_count.min(input.remaining() / 4));
    for _ in 0..group_count {
        let n = input.read_count("patch group size")?;
        let mut group = Vec::with_capacity(n.min(input.remaining() / 4));
        for _ in 0..n {
            group.push(input.read_count("patch index")?);
        }
        patch_groups.push(group);
    }

    let layer_count = input.read_count("layer count")?;
    let mut layers = Vec::with_capacity(layer_count.min(input.remaining() / 20));
    for _ in 0..layer_count {
        let patch_group = input.read_count("layer patch group")?;
        let technique = input.read_string("layer technique")?;
        let color_texture = input.read_string("layer color texture")?;
        let alpha_texture = input.read_string("layer alpha texture")?;
        let normal_texture = input.read_string("layer normal texture")?;

        layers.push(Layer {
            patch_group,
            technique,
            color_texture,
            alpha_texture,
            normal_texture: (!normal_texture.is_empty()).then_some(normal_texture),
        });
    }

    if input.remaining() > 0 {
        return Err(TerrainError::TrailingBytes(input.remaining()));
    }

    let asset = LandscapeAsset {
        size,
        heights,
        normals,
        tangents,
        patch_count,
        patch_bounds,
        patch_groups,
        layers,
    };
    asset.validate()?;

    debug!("read landscape asset: {} bytes, {} patches", data.len(), total);
    Ok(asset)
}

fn input_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn input_vec3(bytes: &[u8]) -> Vec3 {
    Vec3::new(input_f32(&bytes[0..4]), input_f32(&bytes[4..8]), input_f32(&bytes[8..12]))
}

trait Element {
    const SIZE: usize;
}

impl Element for f32 {
    const SIZE: usize = 4;
}

impl Element for Vec3 {
    const SIZE: usize = 12;
}

struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(TerrainError::Truncated {
                field,
                offset: self.offset,
                needed: len - self.remaining(),
            });
        }

        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn read_i32(&mut self, field: &'static str) -> Result<i32> {
        let b = self.take(4, field)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_count(&mut self, field: &'static str) -> Result<usize> {
        let value = self.read_i32(field)?;
        usize::try_from(value).map_err(|_| TerrainError::NegativeCount { field, value })
    }

    fn read_vec3(&mut self, field: &'static str) -> Result<Vec3> {
        Ok(input_vec3(self.take(12, field)?))
    }

    fn read_string(&mut self, field: &'static str) -> Result<String> {
        let b = self.take(4, field)?;
        let len = u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize;
        let bytes = self.take(len, field)?;

        String::from_utf8(bytes.to_vec()).map_err(|_| TerrainError::InvalidString { field })
    }

    /// Reads a row-major block of `gx * gy` elements into an `[[x, y]]` array.
    fn read_grid<T: Element + Clone + Default>(
        &mut self,
        gx: usize,
        gy: usize,
        field: &'static str,
        parse: impl Fn(&[u8]) -> T,
    ) -> Result<Array2<T>> {
        let len = gx
            .checked_mul(gy)
            .and_then(|n| n.checked_mul(T::SIZE))
            .unwrap_or(usize::MAX);
        let block = self.take(len, field)?;

        let mut grid = Array2::default((gx, gy));
        for (i, chunk) in block.chunks_exact(T::SIZE).enumerate() {
            grid[[i % gx, i / gx]] = parse(chunk);
        }
        Ok(grid)
    }
}
