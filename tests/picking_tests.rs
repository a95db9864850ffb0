use bevy::math::Ray;
use bevy::prelude::*;
use landscape::{HeightMap, PickMethod, TerrainPicker};
use ndarray::Array2;

const METHODS: [PickMethod; 2] = [PickMethod::MarchAndRefine, PickMethod::CellWalk];

fn flat_map() -> HeightMap {
    HeightMap::from_heights(Vec3::new(256.0, 256.0, 10.0), Array2::zeros((65, 65))).unwrap()
}

fn sloped_map() -> HeightMap {
    // z = 0.1 x over a 4 unit grid
    let heights = Array2::from_shape_fn((65, 65), |(x, _)| x as f32 * 0.4);
    HeightMap::from_heights(Vec3::new(256.0, 256.0, 26.0), heights).unwrap()
}

fn picker(method: PickMethod) -> TerrainPicker {
    TerrainPicker {
        method,
        ..Default::default()
    }
}

fn ray(origin: Vec3, direction: Vec3) -> Ray {
    Ray { origin, direction }
}

#[test]
fn vertical_ray_hits_flat_ground() {
    let map = flat_map();
    for method in METHODS {
        let hit = picker(method)
            .intersect(&map, ray(Vec3::new(128.0, 128.0, 100.0), Vec3::NEG_Z))
            .unwrap();
        assert!(hit.distance(Vec3::new(128.0, 128.0, 0.0)) < 0.2, "{method:?}: {hit}");
    }
}

#[test]
fn slanted_ray_hits_flat_ground() {
    let map = flat_map();
    let expected = Vec3::new(110.0, 71.0, 0.0);
    let origin = Vec3::new(10.0, 21.0, 50.0);

    let hit = picker(PickMethod::MarchAndRefine)
        .intersect(&map, ray(origin, expected - origin))
        .unwrap();
    assert!(hit.distance(expected) < 0.2, "{hit}");

    let hit = picker(PickMethod::CellWalk)
        .intersect(&map, ray(origin, expected - origin))
        .unwrap();
    assert!(hit.distance(expected) < 1e-3, "{hit}");
}

#[test]
fn ray_outside_footprint_misses() {
    let map = flat_map();
    for method in METHODS {
        let picker = picker(method);
        assert_eq!(picker.intersect(&map, ray(Vec3::new(-10.0, -10.0, 100.0), Vec3::NEG_Z)), None);
        // Heading away from the terrain
        assert_eq!(
            picker.intersect(&map, ray(Vec3::new(-10.0, 50.0, 100.0), Vec3::new(-1.0, 0.0, -1.0))),
            None
        );
    }
}

#[test]
fn ray_pointing_up_misses() {
    let map = flat_map();
    for method in METHODS {
        assert_eq!(
            picker(method).intersect(&map, ray(Vec3::new(50.0, 50.0, 10.0), Vec3::new(0.3, 0.2, 1.0))),
            None
        );
    }
}

#[test]
fn ray_from_outside_enters_and_hits() {
    let map = flat_map();
    let origin = Vec3::new(-50.0, 129.0, 40.0);
    let direction = Vec3::new(1.0, 0.0, -0.25);
    // Reaches the ground at x = 110
    for method in METHODS {
        let hit = picker(method).intersect(&map, ray(origin, direction)).unwrap();
        assert!((hit.x - 110.0).abs() < 0.3 && hit.z.abs() < 0.1, "{method:?}: {hit}");
    }
}

#[test]
fn hits_land_on_a_slope() {
    let map = sloped_map();
    let origin = Vec3::new(200.0, 30.0, 80.0);
    let direction = Vec3::new(-1.0, 0.5, -0.6);

    for method in METHODS {
        let hit = picker(method).intersect(&map, ray(origin, direction)).unwrap();
        let surface = map.height(hit.x, hit.y);
        assert!((hit.z - surface).abs() < 0.25, "{method:?}: {hit} vs {surface}");
        assert!((hit.z - 0.1 * hit.x).abs() < 0.25);
    }
}

#[test]
fn start_below_surface_is_not_a_hit() {
    let map = sloped_map();
    let picker = picker(PickMethod::MarchAndRefine);
    let origin = Vec3::new(200.0, 100.0, 5.0);
    assert_eq!(picker.intersect(&map, ray(origin, Vec3::new(-1.0, 0.0, -0.1))), None);
}

#[test]
fn straight_down_on_a_small_field() {
    let map = HeightMap::from_heights(Vec3::new(100.0, 100.0, 1.0), Array2::zeros((11, 11))).unwrap();
    for method in METHODS {
        let hit = picker(method)
            .intersect(&map, ray(Vec3::new(50.0, 50.0, 100.0), Vec3::NEG_Z))
            .unwrap();
        assert!(hit.distance(Vec3::new(50.0, 50.0, 0.0)) < 0.2, "{method:?}: {hit}");
    }
}

#[test]
fn zero_direction_has_no_hit() {
    let map = flat_map();
    assert_eq!(TerrainPicker::default().intersect(&map, ray(Vec3::splat(50.0), Vec3::ZERO)), None);
}

#[test]
fn hits_agree_with_height_inside_a_bent_cell() {
    // A single raised sample makes every cell around it non-planar
    let mut heights = Array2::zeros((3, 3));
    heights[[1, 1]] = 4.0;
    let map = HeightMap::from_heights(Vec3::new(2.0, 2.0, 4.0), heights).unwrap();
    let direction = Vec3::new(0.01, 0.0, -1.0);

    for (x, y) in [(0.6, 0.3), (0.8, 0.6)] {
        let origin = Vec3::new(x, y, 10.0);

        let hit = picker(PickMethod::CellWalk).intersect(&map, ray(origin, direction)).unwrap();
        let surface = map.height(hit.x, hit.y);
        assert!((hit.z - surface).abs() < 1e-3, "cell walk: {hit} vs {surface}");

        let marched = picker(PickMethod::MarchAndRefine).intersect(&map, ray(origin, direction)).unwrap();
        let surface = map.height(marched.x, marched.y);
        assert!((marched.z - surface).abs() < 0.2, "march: {marched} vs {surface}");
        assert!(marched.distance(hit) < 0.2, "{marched} vs {hit}");
    }
}

#[test]
fn near_vertical_rising_ray_misses() {
    let map = flat_map();
    for method in METHODS {
        assert_eq!(
            picker(method).intersect(&map, ray(Vec3::new(50.0, 50.0, 10.0), Vec3::new(2e-6, 0.0, 1.0))),
            None
        );
    }
}

#[test]
fn near_vertical_falling_ray_from_high_up_hits() {
    let map = flat_map();
    for method in METHODS {
        let hit = picker(method)
            .intersect(&map, ray(Vec3::new(50.0, 50.0, 1e4), Vec3::new(2e-6, 0.0, -1.0)))
            .unwrap();
        assert!(hit.truncate().distance(Vec2::new(50.02, 50.0)) < 0.1, "{method:?}: {hit}");
        assert!(hit.z.abs() < 0.2, "{method:?}: {hit}");
    }
}
