//! Half-edge mesh representation and its encoder.
//!
//! Vertices live in a hash map keyed by opaque [`VertexKey`]s, so there is no
//! dense index to reuse. The encoder assigns indices in first-seen order in
//! a map of its own and rebuilds the vertex array by sorting the map's
//! entries by assigned index.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{check_index_space, correct_winding, EncodedMesh, PolygonMesh};
use crate::coords::to_engine_vector;
use crate::error::{BridgeError, Result};

/// Opaque vertex identity inside a [`HalfEdgeMesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexKey(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
struct HalfEdge {
    origin: VertexKey,
    next: usize,
}

/// Triangle-only half-edge mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HalfEdgeMesh {
    vertices: HashMap<VertexKey, Vec3>,
    half_edges: Vec<HalfEdge>,
    /// First half-edge of every face loop.
    faces: Vec<usize>,
    next_key: u64,
}

impl HalfEdgeMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, position: Vec3) -> VertexKey {
        // Sparse on purpose: keys are not indices.
        let key = VertexKey(self.next_key.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ 0xA5A5);
        self.next_key += 1;
        self.vertices.insert(key, position);
        key
    }

    /// Adds a triangle as a loop of three half-edges.
    pub fn add_face(&mut self, corners: [VertexKey; 3]) -> Result<()> {
        if let Some(missing) = corners.iter().find(|key| !self.vertices.contains_key(*key)) {
            return Err(BridgeError::InvalidInput(format!(
                "face references unknown vertex {missing:?}"
            )));
        }
        let first = self.half_edges.len();
        for (i, &origin) in corners.iter().enumerate() {
            self.half_edges.push(HalfEdge {
                origin,
                next: first + (i + 1) % 3,
            });
        }
        self.faces.push(first);
        Ok(())
    }

    pub fn vertex(&self, key: VertexKey) -> Option<Vec3> {
        self.vertices.get(&key).copied()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Corners of every face, in face order, found by walking each loop.
    pub fn face_corners(&self) -> impl Iterator<Item = [VertexKey; 3]> + '_ {
        self.faces.iter().map(move |&first| {
            let second = self.half_edges[first].next;
            let third = self.half_edges[second].next;
            [
                self.half_edges[first].origin,
                self.half_edges[second].origin,
                self.half_edges[third].origin,
            ]
        })
    }

    /// Rebuilds a polygon list as a half-edge mesh, keeping face order and
    /// one key per source vertex.
    pub fn from_polygons(mesh: &PolygonMesh) -> Result<Self> {
        let mut half_edge = Self::new();
        let keys: Vec<VertexKey> = mesh
            .vertices()
            .iter()
            .map(|&position| half_edge.add_vertex(position))
            .collect();
        for face in mesh.faces() {
            let mut corners = [VertexKey(0); 3];
            for (corner, id) in corners.iter_mut().zip(face) {
                *corner = *keys.get(id.index()).ok_or_else(|| {
                    BridgeError::InvalidInput(format!("face references missing vertex {}", id.0))
                })?;
            }
            half_edge.add_face(corners)?;
        }
        Ok(half_edge)
    }
}

/// Encodes a half-edge mesh with the same output contract as
/// [`super::encode_polygons`].
pub fn encode_half_edge(mesh: &HalfEdgeMesh) -> Result<EncodedMesh> {
    check_index_space(mesh.vertex_count())?;
    let mut table: HashMap<VertexKey, u32> = HashMap::new();
    let mut indices = Vec::with_capacity(mesh.face_count() * 3);

    for corners in mesh.face_corners() {
        for key in corners {
            let next = table.len() as u32;
            let index = *table.entry(key).or_insert(next);
            indices.push(index);
        }
    }

    let mut entries: Vec<(VertexKey, u32)> = table.into_iter().collect();
    entries.sort_unstable_by_key(|&(_, index)| index);
    let vertices = entries
        .into_iter()
        .map(|(key, _)| {
            mesh.vertex(key)
                .map(to_engine_vector)
                .ok_or_else(|| BridgeError::InvalidInput(format!("vertex {key:?} vanished")))
        })
        .collect::<Result<Vec<_>>>()?;

    correct_winding(&mut indices);
    Ok(EncodedMesh { vertices, indices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::encode_polygons;

    #[test]
    fn face_loops_walk_in_insertion_order() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Vec3::ZERO);
        let b = mesh.add_vertex(Vec3::X);
        let c = mesh.add_vertex(Vec3::Y);
        mesh.add_face([a, b, c]).unwrap();
        assert_eq!(mesh.face_corners().collect::<Vec<_>>(), vec![[a, b, c]]);
    }

    #[test]
    fn unknown_vertex_is_rejected() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Vec3::ZERO);
        let b = mesh.add_vertex(Vec3::X);
        let err = mesh.add_face([a, b, VertexKey(42)]).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidInput(_)));
        assert_eq!(mesh.face_count(), 0);
    }

    #[test]
    fn shared_edge_quad_dedups_to_four_vertices() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Vec3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Vec3::new(1.0, 1.0, 0.0));
        let d = mesh.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        mesh.add_face([a, b, c]).unwrap();
        mesh.add_face([a, c, d]).unwrap();

        let encoded = encode_half_edge(&mesh).unwrap();
        assert_eq!(encoded.vertex_count(), 4);
        assert_eq!(encoded.indices, vec![0, 2, 1, 0, 3, 2]);
        assert_eq!(encoded.vertices[3], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn matches_polygon_encoder_output() {
        let cube = PolygonMesh::cube();
        let from_polygons = encode_polygons(&cube).unwrap();
        let from_half_edge = encode_half_edge(&HalfEdgeMesh::from_polygons(&cube).unwrap()).unwrap();
        assert_eq!(from_polygons, from_half_edge);
    }

    #[test]
    fn repeated_encoding_is_stable() {
        let mesh = HalfEdgeMesh::from_polygons(&PolygonMesh::cube()).unwrap();
        assert_eq!(
            encode_half_edge(&mesh).unwrap(),
            encode_half_edge(&mesh).unwrap()
        );
    }
}
