use bevy::math::Ray;
use bevy::prelude::*;
use landscape::{
    AllVisible, Layer, LandscapeBuilder, LayerDesc, MeshUpdate, PickMethod, Terrain, TerrainBuffers,
    TerrainRenderer, TerrainSettings,
};
use ndarray::Array2;

#[derive(Default)]
struct RecordingRenderer {
    uploads: Vec<(usize, MeshUpdate)>,
    draws: Vec<Vec<usize>>,
}

impl TerrainRenderer for RecordingRenderer {
    fn upload(&mut self, buffers: &TerrainBuffers, update: MeshUpdate) {
        self.uploads.push((buffers.vertices.len(), update));
    }

    fn draw(&mut self, buffers: &TerrainBuffers, layers: &[Layer]) {
        self.draws.push(
            layers
                .iter()
                .map(|layer| buffers.group_indices[layer.patch_group].len())
                .collect(),
        );
    }
}

fn terrain(settings: &TerrainSettings) -> Terrain {
    let heights = Array2::from_shape_fn((33, 33), |(x, y)| (x + y) as f32 * 0.25);
    let asset = LandscapeBuilder::new(Vec3::new(64.0, 64.0, 16.0), heights)
        .unwrap()
        .with_layer(LayerDesc {
            target_patches: vec![true; 4],
            ..Default::default()
        })
        .with_layer(LayerDesc {
            target_patches: vec![true, false, false, false],
            ..Default::default()
        })
        .build()
        .unwrap();
    Terrain::from_asset(asset, settings).unwrap()
}

#[test]
fn frame_uploads_only_when_dirty() {
    let mut terrain = terrain(&TerrainSettings::default());
    let mut renderer = RecordingRenderer::default();
    let far = Vec3::new(1e5, 1e5, 0.0);

    let update = terrain.update(far, &AllVisible);
    terrain.present(&mut renderer, update);
    let update = terrain.update(far, &AllVisible);
    terrain.present(&mut renderer, update);

    assert_eq!(renderer.uploads, [(16, MeshUpdate::ALL)]);
    assert_eq!(renderer.draws, [vec![24, 6], vec![24, 6]]);
}

#[test]
fn moving_closer_refines_the_mesh() {
    let mut terrain = terrain(&TerrainSettings::default());
    terrain.update(Vec3::new(1e5, 1e5, 0.0), &AllVisible);
    let coarse = terrain.mesh().vertices().len();

    let update = terrain.update(Vec3::new(32.0, 32.0, 20.0), &AllVisible);
    assert!(update.vertices);
    assert!(terrain.mesh().vertices().len() > coarse);
}

#[test]
fn queries_go_through_the_heightmap() {
    let settings = TerrainSettings {
        pick_method: PickMethod::CellWalk,
        ..Default::default()
    };
    let terrain = terrain(&settings);

    assert_eq!(terrain.picker().method, PickMethod::CellWalk);
    assert_eq!(terrain.height(8.0, 4.0), 1.5);
    assert!(terrain.normal(10.0, 10.0).z > 0.0);

    let hit = terrain
        .intersect(Ray {
            origin: Vec3::new(30.0, 30.0, 100.0),
            direction: Vec3::NEG_Z,
        })
        .unwrap();
    assert!((hit.z - terrain.height(30.0, 30.0)).abs() < 1e-4);
}
