//! Procedural heightfields, normalized to `[0, 1]` for
//! [`LandscapeBuilder::from_normalized`](crate::LandscapeBuilder::from_normalized).

use ndarray::Array2;
use noise::{NoiseFn, Perlin};

// Frequency ratio between consecutive octaves
const LACUNARITY: f32 = 2.0;
// Octaves read disjoint bands of the noise domain
const OCTAVE_OFFSET: f64 = 1000.0;

#[derive(Clone, Copy, Debug)]
pub struct NoiseSettings {
    /// Frequency of the first octave, in cycles per sample.
    pub scale: f32,
    pub octaves: usize,
    /// Amplitude ratio between consecutive octaves.
    pub persistence: f32,
    /// Normalized height everything lower is raised to, leaving flat lowlands.
    pub floor: f32,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            scale: 5e-3,
            octaves: 8,
            persistence: 0.5,
            floor: 0.0,
        }
    }
}

/// Fractal Perlin noise in `[floor, 1]`, indexed `[[x, y]]`.
pub fn perlin_terrain(dim: (usize, usize), seed: u32, settings: NoiseSettings) -> Array2<f32> {
    let perlin = Perlin::new(seed);

    // Largest magnitude the octave sum can reach
    let peak: f32 = (0..settings.octaves)
        .map(|octave| settings.persistence.powi(octave as i32))
        .sum();
    let peak = peak.max(f32::EPSILON);

    Array2::from_shape_fn(dim, |(x, y)| {
        let v = (fractal_noise(&perlin, &settings, x as f32, y as f32) / peak + 1.) / 2.;
        v.max(settings.floor).min(1.)
    })
}

fn fractal_noise(perlin: &Perlin, settings: &NoiseSettings, x: f32, y: f32) -> f32 {
    let mut amplitude = 1.;
    let mut frequency = settings.scale;
    let mut sum = 0.;

    for octave in 0..settings.octaves {
        let point = [
            octave as f64 * OCTAVE_OFFSET + (frequency * x) as f64,
            (frequency * y) as f64,
        ];
        sum += amplitude * perlin.get(point) as f32;

        amplitude *= settings.persistence;
        frequency *= LACUNARITY;
    }

    sum
}
