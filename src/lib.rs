//! Patch-based continuous level of detail terrain.
//!
//! A [`HeightMap`] is cut into 16 × 16 cell patches whose resolution follows
//! the viewer. [`TerrainMeshBuilder`] stitches the visible patches into one
//! crack-free vertex stream, [`TerrainPicker`] resolves rays against the
//! surface and [`FogMask`] tracks which parts of the footprint have been seen.

pub mod asset;
pub mod culling;
pub mod error;
pub mod fog;
pub mod generation;
pub mod heightmap;
pub mod landscape;
pub mod meshing;
pub mod patch;
pub mod picking;
pub mod renderer;
pub mod settings;
pub mod terrain;

pub use asset::{read_landscape, write_landscape, LandscapeAsset, LandscapeBuilder, LayerDesc};
pub use culling::{AllVisible, Frustum, PatchCuller};
pub use error::{Result, TerrainError};
pub use fog::FogMask;
pub use heightmap::HeightMap;
pub use landscape::{Landscape, Layer, PatchUpdate, Side};
pub use meshing::{MeshUpdate, TerrainBuffers, TerrainMeshBuilder, TerrainVertex};
pub use patch::{Aabb, Patch};
pub use picking::{PickMethod, TerrainPicker};
pub use renderer::TerrainRenderer;
pub use settings::TerrainSettings;
pub use terrain::Terrain;
