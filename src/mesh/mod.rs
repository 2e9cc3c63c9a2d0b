//! Reduction of host meshes into engine-ready indexed buffers.
//!
//! Host vertices are deduplicated by identity, never by value: two vertices
//! sitting at the same coordinates but owned as separate host vertices stay
//! separate in the output. Identity is an opaque handle into the mesh's
//! vertex arena ([`VertexId`] for polygon lists, [`half_edge::VertexKey`] for
//! half-edge meshes).

pub mod half_edge;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::coords::to_engine_vector;
use crate::error::{BridgeError, Result};

pub use half_edge::{encode_half_edge, HalfEdgeMesh, VertexKey};

/// Handle of a vertex inside a [`PolygonMesh`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u32);

impl VertexId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Triangulated host mesh stored as a flat polygon list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolygonMesh {
    vertices: Vec<Vec3>,
    faces: Vec<[VertexId; 3]>,
}

impl PolygonMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a vertex in host space and returns its handle.
    ///
    /// Handles are `u32`, so an arena holds at most `u32::MAX` addressable
    /// vertices; [`encode_polygons`] rejects larger meshes instead of
    /// encoding through wrapped handles.
    pub fn add_vertex(&mut self, position: Vec3) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(position);
        id
    }

    pub fn add_face(&mut self, face: [VertexId; 3]) {
        self.faces.push(face);
    }

    pub fn vertex(&self, id: VertexId) -> Option<Vec3> {
        self.vertices.get(id.index()).copied()
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[VertexId; 3]] {
        &self.faces
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Unit cube centred on the origin, twelve triangles over eight shared
    /// corners.
    pub fn cube() -> Self {
        let mut mesh = Self::new();
        let corners: Vec<VertexId> = CUBE_CORNERS
            .iter()
            .map(|&[x, y, z]| mesh.add_vertex(Vec3::new(x, y, z)))
            .collect();
        for [a, b, c] in CUBE_TRIANGLES {
            mesh.add_face([corners[a], corners[b], corners[c]]);
        }
        mesh
    }
}

const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
];

const CUBE_TRIANGLES: [[usize; 3]; 12] = [
    [4, 5, 6],
    [4, 6, 7], // top
    [0, 2, 1],
    [0, 3, 2], // bottom
    [0, 1, 5],
    [0, 5, 4], // front
    [3, 7, 6],
    [3, 6, 2], // back
    [0, 4, 7],
    [0, 7, 3], // left
    [1, 2, 6],
    [1, 6, 5], // right
];

/// Host geometry in whichever representation the host handed over.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshData {
    Polygons(PolygonMesh),
    HalfEdge(HalfEdgeMesh),
}

impl MeshData {
    pub fn encode(&self) -> Result<EncodedMesh> {
        match self {
            MeshData::Polygons(mesh) => encode_polygons(mesh),
            MeshData::HalfEdge(mesh) => encode_half_edge(mesh),
        }
    }
}

/// Engine-ready geometry: distinct vertices in engine space plus three
/// indices per triangle, already winding-corrected.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EncodedMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl EncodedMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex buffer as the flat `x y z x y z ...` sequence the engine reads.
    pub fn flat_vertices(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

/// Encodes a flat polygon list. The identity table is indexed directly by
/// vertex handle.
pub fn encode_polygons(mesh: &PolygonMesh) -> Result<EncodedMesh> {
    check_index_space(mesh.vertices.len())?;
    let mut table: Vec<Option<u32>> = vec![None; mesh.vertices.len()];
    let mut vertices = Vec::new();
    let mut indices = Vec::with_capacity(mesh.faces.len() * 3);

    for face in &mesh.faces {
        for &id in face {
            let slot = table.get_mut(id.index()).ok_or_else(|| {
                BridgeError::InvalidInput(format!("face references missing vertex {}", id.0))
            })?;
            let index = match *slot {
                Some(index) => index,
                None => {
                    let index = vertices.len() as u32;
                    vertices.push(to_engine_vector(mesh.vertices[id.index()]));
                    *slot = Some(index);
                    index
                }
            };
            indices.push(index);
        }
    }

    correct_winding(&mut indices);
    Ok(EncodedMesh { vertices, indices })
}

/// Every vertex handle and output index must fit in a `u32`.
pub(crate) fn check_index_space(vertex_count: usize) -> Result<()> {
    u32::try_from(vertex_count).map(|_| ()).map_err(|_| {
        BridgeError::InvalidInput(format!(
            "mesh has {vertex_count} vertices, more than 32-bit indices can address"
        ))
    })
}

/// Swaps the second and third index of every triangle so the engine sees
/// the surface normal pointing the same way the host does.
pub(crate) fn correct_winding(indices: &mut [u32]) {
    for triangle in indices.chunks_exact_mut(3) {
        triangle.swap(1, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> PolygonMesh {
        let mut mesh = PolygonMesh::new();
        let a = mesh.add_vertex(Vec3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Vec3::new(1.0, 1.0, 0.0));
        let d = mesh.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        mesh.add_face([a, b, c]);
        mesh.add_face([a, c, d]);
        mesh
    }

    #[test]
    fn shared_edge_vertices_are_not_duplicated() {
        let encoded = encode_polygons(&quad()).unwrap();
        assert_eq!(encoded.vertex_count(), 4);
        assert_eq!(encoded.indices.len(), 6);
        assert_eq!(encoded.indices, vec![0, 2, 1, 0, 3, 2]);
    }

    #[test]
    fn vertices_are_mapped_to_engine_space() {
        let encoded = encode_polygons(&quad()).unwrap();
        assert_eq!(encoded.vertices[2], Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(
            encoded.flat_vertices(),
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn coincident_vertices_with_distinct_identity_stay_distinct() {
        let mut mesh = PolygonMesh::new();
        let a = mesh.add_vertex(Vec3::ZERO);
        let b = mesh.add_vertex(Vec3::X);
        let c = mesh.add_vertex(Vec3::Y);
        let a2 = mesh.add_vertex(Vec3::ZERO);
        mesh.add_face([a, b, c]);
        mesh.add_face([a2, c, b]);
        let encoded = encode_polygons(&mesh).unwrap();
        assert_eq!(encoded.vertex_count(), 4);
    }

    #[test]
    fn cube_counts_and_index_range() {
        let cube = PolygonMesh::cube();
        let encoded = encode_polygons(&cube).unwrap();
        assert_eq!(encoded.vertex_count(), 8);
        assert_eq!(encoded.indices.len(), 3 * cube.face_count());
        assert!(encoded.indices.iter().all(|&i| (i as usize) < 8));
    }

    #[test]
    fn every_triangle_is_the_host_order_with_last_two_swapped() {
        let cube = PolygonMesh::cube();
        let encoded = encode_polygons(&cube).unwrap();
        let engine_of = |id: VertexId| {
            let position = to_engine_vector(cube.vertex(id).unwrap());
            encoded
                .vertices
                .iter()
                .position(|v| *v == position)
                .unwrap() as u32
        };
        for (face, [a, b, c]) in cube.faces().iter().zip(encoded.triangles()) {
            assert_eq!([a, c, b], face.map(engine_of));
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let cube = PolygonMesh::cube();
        let first = encode_polygons(&cube).unwrap();
        let second = encode_polygons(&cube).unwrap();
        assert_eq!(first.flat_vertices(), second.flat_vertices());
        assert_eq!(first.indices, second.indices);
    }

    #[test]
    fn dangling_vertex_handle_is_rejected() {
        let mut mesh = quad();
        mesh.add_face([VertexId(0), VertexId(1), VertexId(9)]);
        let err = encode_polygons(&mesh).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidInput(_)));
    }

    #[test]
    fn index_space_is_bounded_by_u32() {
        assert!(check_index_space(u32::MAX as usize).is_ok());
        #[cfg(target_pointer_width = "64")]
        assert!(matches!(
            check_index_space(u32::MAX as usize + 1),
            Err(BridgeError::InvalidInput(_))
        ));
    }

    #[test]
    fn unreferenced_vertices_are_dropped() {
        let mut mesh = quad();
        mesh.add_vertex(Vec3::splat(5.0));
        let encoded = encode_polygons(&mesh).unwrap();
        assert_eq!(encoded.vertex_count(), 4);
    }
}
