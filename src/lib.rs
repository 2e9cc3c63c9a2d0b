//! Bridge between a host 3D application's scene graph and the RenderGirl
//! raytracing engine.
//!
//! The crate turns host objects into engine-ready groups (axis swap,
//! rotation re-decomposition, deduplicated and winding-corrected geometry),
//! drives the engine through the [`EngineGateway`] call contract and decodes
//! the frames it returns. Engine log messages are routed to the active render
//! session or to the console. The native engine is only linked with the
//! `native-engine` feature; everything else runs against the in-process
//! [`RecordingGateway`].

pub mod config;
pub mod coords;
pub mod error;
pub mod frame;
pub mod gateway;
pub mod log_route;
pub mod mesh;
pub mod obj;
pub mod scene;
pub mod session;

pub use config::{BridgeConfig, Resolution};
pub use error::{BridgeError, Result};
pub use frame::PixelGrid;
pub use gateway::{EngineGateway, RecordingGateway};
pub use log_route::{CollectingSink, Destination, LogRoute, ReportSink, Severity};
pub use mesh::{EncodedMesh, HalfEdgeMesh, MeshData, PolygonMesh};
pub use obj::{load_obj, load_obj_from_str};
pub use scene::{HostObject, HostScene, HostTransform, ObjectKind};
pub use session::{CameraParams, LightParams, MeshGroup, RenderGirl, RenderRequest, SceneSession};
