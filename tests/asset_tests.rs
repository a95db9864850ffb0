use bevy::prelude::*;
use landscape::{
    read_landscape, write_landscape, LandscapeAsset, LandscapeBuilder, LayerDesc, Terrain,
    TerrainError, TerrainSettings,
};
use ndarray::Array2;

fn asset() -> LandscapeAsset {
    let heights = Array2::from_shape_fn((33, 17), |(x, y)| (x as f32 * 0.3).sin() * 2.0 + y as f32 * 0.1);
    LandscapeBuilder::new(Vec3::new(128.0, 64.0, 8.0), heights)
        .unwrap()
        .with_layer(LayerDesc {
            technique: "Base".into(),
            color_texture: "grass.png".into(),
            alpha_texture: "grass_alpha.png".into(),
            normal_texture: None,
            target_patches: vec![true, true],
        })
        .with_layer(LayerDesc {
            technique: "Layer".into(),
            color_texture: "snow.png".into(),
            alpha_texture: "snow_alpha.png".into(),
            normal_texture: Some("snow_normal.png".into()),
            target_patches: vec![false, true],
        })
        .build()
        .unwrap()
}

#[test]
fn written_asset_reads_back() {
    let original = asset();
    let restored = read_landscape(&write_landscape(&original)).unwrap();

    assert_eq!(restored.size, original.size);
    assert_eq!(restored.heights, original.heights);
    assert_eq!(restored.normals, original.normals);
    assert_eq!(restored.tangents, original.tangents);
    assert_eq!(restored.patch_count, (2, 1));
    assert_eq!(restored.patch_bounds, original.patch_bounds);
    assert_eq!(restored.patch_groups, vec![vec![0, 1], vec![1]]);
    assert_eq!(restored.layers, original.layers);
    assert_eq!(restored.layers[1].normal_texture.as_deref(), Some("snow_normal.png"));
}

#[test]
fn heights_are_stored_row_major() {
    let bytes = write_landscape(&asset());
    // size (12 bytes) and grid dimensions (8 bytes) come first
    let second = f32::from_le_bytes(bytes[24..28].try_into().unwrap());
    assert_eq!(second, asset().heights[[1, 0]]);
}

#[test]
fn truncated_stream_is_rejected() {
    let bytes = write_landscape(&asset());
    for len in [0, 3, 12, 20, 1000, bytes.len() / 2, bytes.len() - 1] {
        assert!(
            matches!(read_landscape(&bytes[..len]), Err(TerrainError::Truncated { .. })),
            "length {len}"
        );
    }
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut bytes = write_landscape(&asset());
    bytes.push(0);
    assert!(matches!(read_landscape(&bytes), Err(TerrainError::TrailingBytes(1))));
}

#[test]
fn negative_grid_size_is_rejected() {
    let mut bytes = write_landscape(&asset());
    bytes[12..16].copy_from_slice(&(-33i32).to_le_bytes());
    assert!(matches!(
        read_landscape(&bytes),
        Err(TerrainError::NegativeCount { value: -33, .. })
    ));
}

#[test]
fn dangling_group_reference_is_rejected() {
    let mut asset = asset();
    asset.layers[1].patch_group = 5;
    let bytes = write_landscape(&asset);
    assert!(matches!(
        read_landscape(&bytes),
        Err(TerrainError::GroupOutOfRange { layer: 1, group: 5, .. })
    ));
}

#[test]
fn grid_must_match_patch_count() {
    let mut asset = asset();
    asset.patch_count = (3, 1);
    asset.patch_bounds.push(asset.patch_bounds[0]);
    assert!(matches!(
        read_landscape(&write_landscape(&asset)),
        Err(TerrainError::LengthMismatch { .. })
    ));
}

#[test]
fn terrain_loads_from_bytes() {
    let bytes = write_landscape(&asset());
    let terrain = Terrain::load(&bytes, &TerrainSettings::default()).unwrap();

    assert_eq!(terrain.landscape().patch_count(), (2, 1));
    assert_eq!(terrain.height(0.0, 0.0), asset().heights[[0, 0]]);
    assert_eq!(terrain.fog().resolution(), 128);
}
