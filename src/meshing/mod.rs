mod builder;
mod grid;
pub mod tables;

pub use builder::{MeshUpdate, TerrainMeshBuilder};
pub use grid::VertexGrid;
pub use tables::{LodTable, LodTables};

use bevy::{
    prelude::*,
    render::{mesh::Indices, render_resource::PrimitiveTopology},
};
use bytemuck::{Pod, Zeroable};

/// One terrain vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    /// Tile texture coordinate, repeating twice per patch.
    pub uv0: [f32; 2],
    /// Whole-terrain coordinate in `[0, 1]`, for fog and visibility textures.
    pub uv1: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
}

/// Borrowed view of the current terrain geometry, handed to renderers.
#[derive(Clone, Copy, Debug)]
pub struct TerrainBuffers<'a> {
    pub vertices: &'a [TerrainVertex],
    /// Triangle list over every patch in the stream.
    pub indices: &'a [u32],
    /// One triangle list per patch group.
    pub group_indices: &'a [Vec<u32>],
    /// First vertex of each patch, `None` for patches not in the stream.
    pub starting_vertices: &'a [Option<u32>],
}

impl TerrainBuffers<'_> {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.vertices)
    }

    pub fn index_bytes(&self, group: usize) -> &[u8] {
        bytemuck::cast_slice(&self.group_indices[group])
    }

    /// Converts the buffers into a Bevy mesh.
    ///
    /// `group` selects one patch group's triangles; `None` takes every patch
    /// once. Positions stay in terrain space (Z up).
    pub fn to_render_mesh(&self, group: Option<usize>) -> Mesh {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList);

        let positions: Vec<[f32; 3]> = self.vertices.iter().map(|v| v.position).collect();
        let normals: Vec<[f32; 3]> = self.vertices.iter().map(|v| v.normal).collect();
        let uvs: Vec<[f32; 2]> = self.vertices.iter().map(|v| v.uv0).collect();
        let tangents: Vec<[f32; 4]> = self
            .vertices
            .iter()
            .map(|v| [v.tangent[0], v.tangent[1], v.tangent[2], 1.])
            .collect();

        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
        mesh.insert_attribute(Mesh::ATTRIBUTE_TANGENT, tangents);

        let indices = match group {
            Some(group) => self.group_indices[group].clone(),
            None => self.indices.to_vec(),
        };
        mesh.set_indices(Some(Indices::U32(indices)));

        mesh
    }
}
