use crate::landscape::Layer;
use crate::meshing::{MeshUpdate, TerrainBuffers};

/// Receives terrain geometry once per frame.
///
/// Level of detail, picking and height queries never go through the
/// renderer, so any implementation can be swapped in.
pub trait TerrainRenderer {
    /// Called only when `update` reports a rewritten stream.
    fn upload(&mut self, buffers: &TerrainBuffers, update: MeshUpdate);

    /// Draws each layer over the triangles of its patch group.
    fn draw(&mut self, buffers: &TerrainBuffers, layers: &[Layer]);
}
