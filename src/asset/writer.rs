use bevy::prelude::Vec3;

use super::LandscapeAsset;

/// Serializes an asset in the layout [`read_landscape`](super::read_landscape)
/// expects.
pub fn write_landscape(asset: &LandscapeAsset) -> Vec<u8> {
    let (gx, gy) = asset.heights.dim();
    let mut out = Vec::with_capacity(gx * gy * 28 + asset.patch_bounds.len() * 24 + 64);

    put_vec3(&mut out, asset.size);
    put_count(&mut out, gx);
    put_count(&mut out, gy);

    for y in 0..gy {
        for x in 0..gx {
            out.extend_from_slice(&asset.heights[[x, y]].to_le_bytes());
        }
    }
    for field in [&asset.normals, &asset.tangents] {
        for y in 0..gy {
            for x in 0..gx {
                put_vec3(&mut out, field[[x, y]]);
            }
        }
    }

    put_count(&mut out, asset.patch_count.0);
    put_count(&mut out, asset.patch_count.1);
    for bounds in &asset.patch_bounds {
        put_vec3(&mut out, bounds.min);
        put_vec3(&mut out, bounds.max);
    }

    put_count(&mut out, asset.patch_groups.len());
    for group in &asset.patch_groups {
        put_count(&mut out, group.len());
        for &patch in group {
            put_count(&mut out, patch);
        }
    }

    put_count(&mut out, asset.layers.len());
    for layer in &asset.layers {
        put_count(&mut out, layer.patch_group);
        put_str(&mut out, &layer.technique);
        put_str(&mut out, &layer.color_texture);
        put_str(&mut out, &layer.alpha_texture);
        put_str(&mut out, layer.normal_texture.as_deref().unwrap_or_default());
    }

    out
}

fn put_count(out: &mut Vec<u8>, n: usize) {
    out.extend_from_slice(&(n as i32).to_le_bytes());
}

fn put_vec3(out: &mut Vec<u8>, v: Vec3) {
    for c in v.to_array() {
        out.extend_from_slice(&c.to_le_bytes());
    }
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}
