use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;

use crate::mesh::{PolygonMesh, VertexId};

/// Reads an OBJ file from disk into a triangulated polygon mesh.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<PolygonMesh> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("unable to read mesh {}", path.display()))?;
    load_obj_from_str(&data).with_context(|| format!("invalid mesh {}", path.display()))
}

/// Parses an OBJ file from memory.
///
/// Every `v` line becomes one host vertex, so faces sharing an OBJ index share
/// the vertex. Polygons are fan triangulated; texture and normal references
/// are ignored.
pub fn load_obj_from_str(data: &str) -> Result<PolygonMesh> {
    let mut mesh = PolygonMesh::new();
    let mut polygons: Vec<(usize, Vec<i64>)> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => {
                let position = parse_vec3(parts)
                    .with_context(|| format!("invalid vertex on line {}", line_no + 1))?;
                mesh.add_vertex(position);
            }
            "f" => {
                let polygon = parse_face(parts)
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                polygons.push((line_no + 1, polygon));
            }
            _ => {}
        }
    }

    if mesh.vertices().is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }

    let vertex_count = mesh.vertices().len();
    for (line_no, polygon) in polygons {
        let ids = polygon
            .iter()
            .map(|&index| fix_index(index, vertex_count).map(|i| VertexId(i as u32)))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| anyhow!("face on line {line_no} references a missing vertex"))?;
        triangulate_face(&ids, &mut mesh);
    }
    Ok(mesh)
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut next = || -> Result<f32> {
        Ok(parts
            .next()
            .ok_or_else(|| anyhow!("missing vector component"))?
            .parse::<f32>()?)
    };
    let x = next()?;
    let y = next()?;
    let z = next()?;
    Ok(Vec3::new(x, y, z))
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<i64>> {
    let mut indices = Vec::new();
    for part in parts {
        let vertex = part
            .split('/')
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i64>()?;
        indices.push(vertex);
    }
    if indices.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(indices)
}

fn triangulate_face(polygon: &[VertexId], mesh: &mut PolygonMesh) {
    for i in 1..polygon.len().saturating_sub(1) {
        mesh.add_face([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

fn fix_index(index: i64, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let abs = index.unsigned_abs() as usize;
        (abs <= len).then_some(len - abs)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_triangle() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = load_obj_from_str(obj).unwrap();
        assert_eq!(mesh.vertices().len(), 3);
        assert_eq!(mesh.faces(), &[[VertexId(0), VertexId(1), VertexId(2)]]);
    }

    #[test]
    fn quads_are_fan_triangulated_over_shared_vertices() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1/1/1 2/2/1 3/3/1 4/4/1\n";
        let mesh = load_obj_from_str(obj).unwrap();
        assert_eq!(mesh.vertices().len(), 4);
        assert_eq!(
            mesh.faces(),
            &[
                [VertexId(0), VertexId(1), VertexId(2)],
                [VertexId(0), VertexId(2), VertexId(3)]
            ]
        );
    }

    #[test]
    fn negative_indices_are_relative() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = load_obj_from_str(obj).unwrap();
        assert_eq!(mesh.faces(), &[[VertexId(0), VertexId(1), VertexId(2)]]);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 7\n";
        assert!(load_obj_from_str(obj).is_err());
    }

    #[test]
    fn empty_file_is_an_error() {
        assert!(load_obj_from_str("# nothing\n").is_err());
    }
}
