use std::hint::black_box;

use bevy::math::Ray;
use bevy::prelude::*;
use criterion::{criterion_group, criterion_main, Criterion};
use landscape::{
    generation::NoiseSettings,
    AllVisible, Landscape, LandscapeBuilder, LayerDesc, PickMethod, TerrainMeshBuilder,
    TerrainPicker,
};

fn landscape() -> Landscape {
    let noise = NoiseSettings::default();
    let asset = LandscapeBuilder::from_noise(Vec2::splat(1024.), 0., 256., (257, 257), 2, noise)
        .unwrap()
        .with_layer(LayerDesc {
            target_patches: vec![true; 256],
            ..Default::default()
        })
        .build()
        .unwrap();
    Landscape::from_asset(asset).unwrap()
}

fn bench_mesh_rebuild(c: &mut Criterion) {
    let mut landscape = landscape();
    landscape.update(Vec3::new(512., 512., 300.), 0.0012, &AllVisible);
    let mut builder = TerrainMeshBuilder::new(&landscape);

    c.bench_function("TerrainMeshBuilder rebuild 16x16 patches", |b| {
        b.iter(|| builder.rebuild(black_box(&landscape)));
    });
}

fn bench_picking(c: &mut Criterion) {
    let landscape = landscape();
    let ray = Ray {
        origin: Vec3::new(-100., 300., 600.),
        direction: Vec3::new(1., 0.4, -0.8),
    };

    for method in [PickMethod::MarchAndRefine, PickMethod::CellWalk] {
        let picker = TerrainPicker {
            method,
            ..Default::default()
        };
        c.bench_function(&format!("TerrainPicker {method:?}"), |b| {
            b.iter(|| picker.intersect(landscape.heightmap(), black_box(ray)));
        });
    }
}

criterion_group!(benches, bench_mesh_rebuild, bench_picking);
criterion_main!(benches);
