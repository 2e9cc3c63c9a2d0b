use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glam::{Mat3, Mat4, Quat, Vec3};
use log::warn;
use roxmltree::{Document, Node};

use crate::config::Resolution;
use crate::coords::{host_euler_matrix, host_euler_quat};
use crate::mesh::{HalfEdgeMesh, MeshData, PolygonMesh};
use crate::obj::load_obj;

/// Type tag of a host object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Mesh,
    Lamp,
    Camera,
    Other(String),
}

impl ObjectKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "mesh" => ObjectKind::Mesh,
            "lamp" | "light" => ObjectKind::Lamp,
            "camera" => ObjectKind::Camera,
            _ => ObjectKind::Other(tag.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            ObjectKind::Mesh => "MESH",
            ObjectKind::Lamp => "LAMP",
            ObjectKind::Camera => "CAMERA",
            ObjectKind::Other(tag) => tag,
        }
    }
}

/// Location, XYZ Euler rotation (radians) and scale of a host object, in
/// host space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostTransform {
    pub location: Vec3,
    pub rotation_euler: Vec3,
    pub scale: Vec3,
}

impl Default for HostTransform {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl HostTransform {
    pub fn orientation(&self) -> Quat {
        host_euler_quat(self.rotation_euler)
    }

    pub fn rotation_matrix(&self) -> Mat3 {
        host_euler_matrix(self.rotation_euler)
    }

    pub fn matrix_world(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.location)
    }

    /// Translation part of the world matrix.
    pub fn world_position(&self) -> Vec3 {
        self.matrix_world().w_axis.truncate()
    }
}

/// Object of the host scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct HostObject {
    pub name: String,
    pub kind: ObjectKind,
    pub transform: HostTransform,
    /// Evaluated, triangulated geometry. `None` when the host could not
    /// produce a mesh for this object.
    pub mesh: Option<MeshData>,
    /// Lamp color, components in `[0, 1]`.
    pub color: Vec3,
}

impl HostObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: HostTransform::default(),
            mesh: None,
            color: Vec3::ONE,
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: MeshData) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::new(name, ObjectKind::Mesh)
        }
    }

    pub fn with_transform(mut self, transform: HostTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }
}

/// Snapshot of the host scene for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostScene {
    pub objects: Vec<HostObject>,
    /// Output size requested by the scene, if it carries one.
    pub resolution: Option<Resolution>,
}

impl HostScene {
    pub fn new(objects: Vec<HostObject>) -> Self {
        Self {
            objects,
            resolution: None,
        }
    }

    pub fn meshes(&self) -> impl Iterator<Item = &HostObject> {
        self.objects.iter().filter(|o| o.kind == ObjectKind::Mesh)
    }

    pub fn lamps(&self) -> impl Iterator<Item = &HostObject> {
        self.objects.iter().filter(|o| o.kind == ObjectKind::Lamp)
    }

    pub fn camera(&self) -> Option<&HostObject> {
        self.objects.iter().find(|o| o.kind == ObjectKind::Camera)
    }

    /// Reads an XML scene description; mesh paths are resolved against the
    /// file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path)
            .with_context(|| format!("unable to open {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_xml(&xml, base)
    }

    /// Parses an XML scene description.
    ///
    /// ```xml
    /// <scene>
    ///   <render><width>640</width><height>480</height><percentage>50</percentage></render>
    ///   <object>
    ///     <name>Cube</name><type>mesh</type><mesh>cube</mesh>
    ///     <position>0 0 1</position><rotation>0 0 45</rotation><scale>1 1 1</scale>
    ///   </object>
    ///   <object><name>Lamp</name><type>lamp</type><color>255 255 255</color></object>
    /// </scene>
    /// ```
    ///
    /// Rotations are in degrees. A mesh object without `<mesh>` gets the
    /// built-in cube; `<topology>half-edge</topology>` hands the geometry over
    /// as a half-edge mesh.
    pub fn from_xml(xml: &str, base: &Path) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let mut objects = Vec::new();

        for node in document.descendants().filter(|n| n.has_tag_name("object")) {
            let name = required_text(&node, "name")?;
            let kind = ObjectKind::from_tag(
                optional_text(&node, "type")
                    .as_deref()
                    .unwrap_or("mesh"),
            );
            let defaults = HostTransform::default();
            let transform = HostTransform {
                location: parse_vec3(optional_text(&node, "position"), defaults.location)
                    .with_context(|| format!("invalid position on {name}"))?,
                rotation_euler: parse_vec3(optional_text(&node, "rotation"), Vec3::ZERO)
                    .with_context(|| format!("invalid rotation on {name}"))?
                    * std::f32::consts::PI
                    / 180.0,
                scale: parse_vec3(optional_text(&node, "scale"), defaults.scale)
                    .with_context(|| format!("invalid scale on {name}"))?,
            };
            let color = parse_color(optional_text(&node, "color"), Vec3::ONE)
                .with_context(|| format!("invalid color on {name}"))?;

            let mesh = match kind {
                ObjectKind::Mesh => Some(
                    load_mesh(&node, base)
                        .with_context(|| format!("failed to load mesh for {name}"))?,
                ),
                _ => None,
            };

            objects.push(HostObject {
                name,
                kind,
                transform,
                mesh,
                color,
            });
        }

        let resolution = document
            .descendants()
            .find(|n| n.has_tag_name("render"))
            .map(|render| parse_resolution(&render))
            .transpose()?;

        let lamp_count = objects.iter().filter(|o| o.kind == ObjectKind::Lamp).count();
        if lamp_count > 1 {
            warn!("scene has {lamp_count} lamps; only the first one is rendered");
        }

        Ok(Self {
            objects,
            resolution,
        })
    }
}

fn load_mesh(node: &Node<'_, '_>, base: &Path) -> Result<MeshData> {
    let polygons = match optional_text(node, "mesh").as_deref() {
        None | Some("cube") => PolygonMesh::cube(),
        Some(file) => load_obj(base.join(file))?,
    };
    match optional_text(node, "topology").as_deref() {
        None | Some("polygons") => Ok(MeshData::Polygons(polygons)),
        Some("half-edge") => Ok(MeshData::HalfEdge(HalfEdgeMesh::from_polygons(&polygons)?)),
        Some(other) => Err(anyhow!("unknown topology {other}")),
    }
}

fn parse_resolution(node: &Node<'_, '_>) -> Result<Resolution> {
    let defaults = Resolution::default();
    let parse = |tag: &str, default: u32| -> Result<u32> {
        match optional_text(node, tag) {
            Some(value) => value
                .parse::<u32>()
                .map_err(|err| anyhow!("failed to parse <{tag}>: {err}")),
            None => Ok(default),
        }
    };
    Ok(Resolution {
        x: parse("width", defaults.x)?,
        y: parse("height", defaults.y)?,
        percentage: parse("percentage", defaults.percentage)?,
    })
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_components(value: &str) -> Result<Vec3> {
    let mut numbers = value.split_whitespace().map(str::parse::<f32>);
    let mut next = || -> Result<f32> {
        Ok(numbers
            .next()
            .ok_or_else(|| anyhow!("vector is missing components"))??)
    };
    let x = next()?;
    let y = next()?;
    let z = next()?;
    Ok(Vec3::new(x, y, z))
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => parse_components(&value),
        None => Ok(default),
    }
}

fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => Ok(parse_components(&value)? / 255.0),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const SAMPLE: &str = r#"
    <scene>
        <render>
            <width>320</width>
            <height>240</height>
        </render>
        <object>
            <name>Camera</name>
            <type>camera</type>
            <position>0 -5 1</position>
            <rotation>90 0 0</rotation>
        </object>
        <object>
            <name>Cube</name>
            <type>mesh</type>
            <position>1 2 3</position>
        </object>
        <object>
            <name>Lamp</name>
            <type>lamp</type>
            <position>0 5 0</position>
            <color>255 128 0</color>
        </object>
        <object>
            <name>Fill</name>
            <type>LAMP</type>
        </object>
    </scene>
    "#;

    #[test]
    fn parse_scene_populates_objects() {
        let scene = HostScene::from_xml(SAMPLE, Path::new(".")).unwrap();
        assert_eq!(scene.objects.len(), 4);
        assert_eq!(scene.meshes().count(), 1);
        assert_eq!(scene.lamps().count(), 2);

        let camera = scene.camera().unwrap();
        assert_eq!(camera.name, "Camera");
        assert!((camera.transform.rotation_euler.x - FRAC_PI_2).abs() < 1e-6);

        let lamp = scene.lamps().next().unwrap();
        assert_eq!(lamp.name, "Lamp");
        assert_eq!(lamp.color, Vec3::new(1.0, 128.0 / 255.0, 0.0));

        let cube = scene.meshes().next().unwrap();
        assert_eq!(cube.transform.world_position(), Vec3::new(1.0, 2.0, 3.0));
        assert!(matches!(cube.mesh, Some(MeshData::Polygons(_))));

        let resolution = scene.resolution.unwrap();
        assert_eq!((resolution.x, resolution.y, resolution.percentage), (320, 240, 100));
    }

    #[test]
    fn half_edge_topology_is_honoured() {
        let xml = "<scene><object><name>C</name><topology>half-edge</topology></object></scene>";
        let scene = HostScene::from_xml(xml, Path::new(".")).unwrap();
        assert!(matches!(scene.objects[0].mesh, Some(MeshData::HalfEdge(_))));
    }

    #[test]
    fn missing_name_is_an_error() {
        let xml = "<scene><object><type>mesh</type></object></scene>";
        assert!(HostScene::from_xml(xml, Path::new(".")).is_err());
    }

    #[test]
    fn short_vector_is_an_error() {
        let xml = "<scene><object><name>A</name><type>lamp</type><position>1 2</position></object></scene>";
        assert!(HostScene::from_xml(xml, Path::new(".")).is_err());
    }

    #[test]
    fn obj_meshes_resolve_relative_to_scene() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("tri.obj"),
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        )
        .unwrap();
        let scene_path = dir.path().join("scene.xml");
        fs::write(
            &scene_path,
            "<scene><object><name>Tri</name><mesh>tri.obj</mesh></object></scene>",
        )
        .unwrap();

        let scene = HostScene::load(&scene_path).unwrap();
        match &scene.objects[0].mesh {
            Some(MeshData::Polygons(mesh)) => assert_eq!(mesh.face_count(), 1),
            other => panic!("unexpected mesh {other:?}"),
        }
    }

    #[test]
    fn world_matrix_combines_scale_rotation_translation() {
        let transform = HostTransform {
            location: Vec3::new(1.0, 0.0, 0.0),
            rotation_euler: Vec3::new(0.0, 0.0, FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        let moved = transform.matrix_world().transform_point3(Vec3::X);
        assert!(moved.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-5));
    }
}
