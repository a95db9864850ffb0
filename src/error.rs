use bevy::prelude::Vec3;
use thiserror::Error;

pub type Result<T, E = TerrainError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("landscape data truncated at byte {offset}: {field} needs {needed} more bytes")]
    Truncated {
        field: &'static str,
        offset: usize,
        needed: usize,
    },

    #[error("negative count {value} read for {field}")]
    NegativeCount { field: &'static str, value: i32 },

    #[error("{what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("heightfield must have at least 2x2 samples, got {0}x{1}")]
    InvalidGrid(usize, usize),

    #[error("terrain size must be positive and finite, got {0}")]
    InvalidSize(Vec3),

    #[error("height sample ({x}, {y}) is not finite")]
    NonFiniteHeight { x: usize, y: usize },

    #[error("patch group {group} references patch {patch}, but there are only {count} patches")]
    PatchOutOfRange {
        group: usize,
        patch: usize,
        count: usize,
    },

    #[error("layer {layer} references patch group {group}, but there are only {count} groups")]
    GroupOutOfRange {
        layer: usize,
        group: usize,
        count: usize,
    },

    #[error("layer {layer} does not exist, there are only {count} layers")]
    LayerOutOfRange { layer: usize, count: usize },

    #[error("{field} is not valid UTF-8")]
    InvalidString { field: &'static str },

    #[error("{0} trailing bytes after landscape data")]
    TrailingBytes(usize),

    #[error("fog of war extent must be positive, got {width}x{height}")]
    InvalidFogExtent { width: f32, height: f32 },

    #[error("fog of war resolution must be at least one cell")]
    InvalidFogResolution,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] toml::de::Error),
}
