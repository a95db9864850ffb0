use bevy::prelude::*;
use landscape::HeightMap;
use ndarray::{array, Array2};

fn wavy_map() -> HeightMap {
    let heights = Array2::from_shape_fn((9, 5), |(x, y)| ((x as f32 * 0.7).sin() + y as f32 * 0.3) * 4.0);
    HeightMap::from_heights(Vec3::new(32.0, 12.0, 8.0), heights).unwrap()
}

#[test]
fn height_is_exact_at_every_sample() {
    let map = wavy_map();
    let (gx, gy) = map.dim();
    for y in 0..gy {
        for x in 0..gx {
            let p = map.grid_to_position(x, y);
            assert_eq!(map.height(p.x, p.y), map.grid_height(x, y), "sample ({x}, {y})");
        }
    }
}

#[test]
fn height_interpolates_across_the_cell_triangles() {
    let heights = array![[0.0, 2.0], [1.0, 4.0]];
    let map = HeightMap::from_heights(Vec3::new(1.0, 1.0, 4.0), heights).unwrap();

    // Lower-left triangle
    assert!((map.height(0.25, 0.25) - 0.75).abs() < 1e-6);
    // Upper-right triangle
    assert!((map.height(0.75, 0.75) - 2.75).abs() < 1e-6);
}

#[test]
fn height_clamps_to_the_footprint() {
    let map = wavy_map();
    assert_eq!(map.height(-10.0, -3.0), map.grid_height(0, 0));
    assert_eq!(map.height(1000.0, 1000.0), map.grid_height(8, 4));
}

#[test]
fn flat_terrain_normals_point_up() {
    let map = HeightMap::from_heights(Vec3::new(16.0, 16.0, 1.0), Array2::from_elem((5, 5), 2.0)).unwrap();
    for (x, y) in [(0.0, 0.0), (3.3, 7.1), (16.0, 16.0), (8.0, 2.5)] {
        assert!(map.normal(x, y).abs_diff_eq(Vec3::Z, 1e-6), "normal at ({x}, {y})");
    }
}

#[test]
fn normals_lean_away_from_slopes() {
    // Rising along +X
    let heights = Array2::from_shape_fn((6, 6), |(x, _)| x as f32);
    let map = HeightMap::from_heights(Vec3::new(5.0, 5.0, 5.0), heights).unwrap();
    let normal = map.normal(2.5, 2.5);
    assert!(normal.x < 0.0 && normal.z > 0.0);
    assert!((normal.length() - 1.0).abs() < 1e-5);
}

#[test]
fn grid_and_world_positions_round_trip() {
    let map = wavy_map();
    for (x, y) in [(0, 0), (3, 2), (7, 4)] {
        let p = map.grid_to_position(x, y);
        // Nudge inside the cell to stay clear of truncation at the boundary
        let g = map.position_to_grid(p.x + 0.01, p.y + 0.01);
        assert_eq!(g, IVec2::new(x as i32, y as i32));
    }
}

#[test]
fn height_stays_linear_far_from_the_origin() {
    let heights = Array2::from_shape_fn((2049, 2), |(x, _)| x as f32);
    let map = HeightMap::from_heights(Vec3::new(2048.0, 1.0, 2048.0), heights).unwrap();

    for x in [10.15, 1000.5, 2000.15, 2047.9] {
        let h = map.height(x, 0.0);
        assert!((h - x).abs() < 1e-2, "height({x}) = {h}");
    }
}
