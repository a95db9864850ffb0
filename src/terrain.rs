use bevy::math::Ray;
use bevy::prelude::{Resource, Vec3};

use crate::asset::{read_landscape, LandscapeAsset};
use crate::culling::PatchCuller;
use crate::error::Result;
use crate::fog::FogMask;
use crate::landscape::Landscape;
use crate::meshing::{MeshUpdate, TerrainMeshBuilder};
use crate::picking::TerrainPicker;
use crate::renderer::TerrainRenderer;
use crate::settings::TerrainSettings;

/// A loaded landscape with its mesh, picker and fog of war.
#[derive(Resource)]
pub struct Terrain {
    landscape: Landscape,
    mesh: TerrainMeshBuilder,
    picker: TerrainPicker,
    fog: FogMask,
    error_ratio: f32,
}

impl Terrain {
    pub fn from_asset(asset: LandscapeAsset, settings: &TerrainSettings) -> Result<Self> {
        let landscape = Landscape::from_asset(asset)?;
        let size = landscape.heightmap().size();

        Ok(Self {
            mesh: TerrainMeshBuilder::new(&landscape),
            fog: FogMask::new(size.x, size.y, settings.fog_resolution)?,
            picker: settings.picker(),
            error_ratio: settings.error_ratio,
            landscape,
        })
    }

    /// Loads a serialized landscape asset.
    pub fn load(bytes: &[u8], settings: &TerrainSettings) -> Result<Self> {
        Self::from_asset(read_landscape(bytes)?, settings)
    }

    pub fn height(&self, x: f32, y: f32) -> f32 {
        self.landscape.heightmap().height(x, y)
    }

    pub fn normal(&self, x: f32, y: f32) -> Vec3 {
        self.landscape.heightmap().normal(x, y)
    }

    pub fn intersect(&self, ray: Ray) -> Option<Vec3> {
        self.picker.intersect(self.landscape.heightmap(), ray)
    }

    /// Culls patches, updates their levels of detail and rebuilds whatever
    /// mesh streams that invalidated.
    pub fn update(&mut self, eye: Vec3, culler: &impl PatchCuller) -> MeshUpdate {
        let changes = self.landscape.update(eye, self.error_ratio, culler);
        self.mesh.update(&self.landscape, changes)
    }

    /// Uploads dirty streams and draws every layer.
    pub fn present(&self, renderer: &mut impl TerrainRenderer, update: MeshUpdate) {
        let buffers = self.mesh.buffers();
        if update.any() {
            renderer.upload(&buffers, update);
        }
        renderer.draw(&buffers, self.landscape.layers());
    }

    pub fn landscape(&self) -> &Landscape {
        &self.landscape
    }

    pub fn landscape_mut(&mut self) -> &mut Landscape {
        &mut self.landscape
    }

    pub fn mesh(&self) -> &TerrainMeshBuilder {
        &self.mesh
    }

    pub fn picker(&self) -> &TerrainPicker {
        &self.picker
    }

    pub fn set_picker(&mut self, picker: TerrainPicker) {
        self.picker = picker;
    }

    pub fn fog(&self) -> &FogMask {
        &self.fog
    }

    pub fn fog_mut(&mut self) -> &mut FogMask {
        &mut self.fog
    }

    pub fn error_ratio(&self) -> f32 {
        self.error_ratio
    }
}
