//! Engine lifecycle and per-frame orchestration.
//!
//! [`RenderGirl`] owns the gateway for as long as the engine is started.
//! A [`SceneSession`] borrows it mutably for one frame, which keeps at most
//! one session alive and pins the log route to that session's report sink
//! until the session is dropped.

use std::ffi::CString;
use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use log::{debug, error, info, warn};

use crate::coords::{camera_basis, to_engine_rotation, to_engine_vector};
use crate::error::{BridgeError, Result};
use crate::frame::{self, PixelGrid};
use crate::gateway::{EngineGateway, RENDER_FAILED};
use crate::log_route::{Destination, LogRoute, ReportSink};
use crate::mesh::EncodedMesh;
use crate::scene::{HostObject, HostScene, HostTransform};

/// Camera in engine space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub position: Vec3,
    pub up: Vec3,
    pub direction: Vec3,
}

impl CameraParams {
    pub fn from_host(transform: &HostTransform) -> Self {
        let basis = camera_basis(transform.orientation());
        Self {
            position: to_engine_vector(transform.world_position()),
            up: basis.up,
            direction: basis.forward,
        }
    }
}

/// Point light in engine space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightParams {
    pub position: Vec3,
    /// RGB, each in `[0, 1]`.
    pub color: Vec3,
}

impl LightParams {
    pub fn from_host(lamp: &HostObject) -> Self {
        Self {
            position: to_engine_vector(lamp.transform.world_position()),
            color: lamp.color.clamp(Vec3::ZERO, Vec3::ONE),
        }
    }

    /// White light sitting on the camera, used when the scene has no lamp.
    pub fn headlight(camera: &CameraParams) -> Self {
        Self {
            position: camera.position,
            color: Vec3::ONE,
        }
    }
}

/// Everything the engine needs for one render call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub width: u32,
    pub height: u32,
    pub camera: CameraParams,
    pub light: LightParams,
}

impl RenderRequest {
    pub fn new(width: u32, height: u32, camera: CameraParams, light: LightParams) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BridgeError::InvalidInput(format!(
                "frame size {width}x{height} is empty"
            )));
        }
        Ok(Self {
            width,
            height,
            camera,
            light,
        })
    }

    /// Camera from the scene camera, light from the first lamp.
    pub fn from_scene(scene: &HostScene, width: u32, height: u32) -> Result<Self> {
        let camera = scene
            .camera()
            .map(|camera| CameraParams::from_host(&camera.transform))
            .ok_or_else(|| BridgeError::InvalidInput("scene has no camera".to_string()))?;
        let mut lamps = scene.lamps();
        let light = match lamps.next() {
            Some(lamp) => {
                let ignored = lamps.count();
                if ignored > 0 {
                    warn!("ignoring {ignored} extra lamp(s), using {}", lamp.name);
                }
                LightParams::from_host(lamp)
            }
            None => LightParams::headlight(&camera),
        };
        Self::new(width, height, camera, light)
    }
}

/// One object's geometry and transform, ready for `AddSceneGroup`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGroup {
    pub name: String,
    pub mesh: EncodedMesh,
    pub position: Vec3,
    /// Engine Euler angles, radians.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl MeshGroup {
    /// Encodes a host mesh object. Fails without side effects when the
    /// object carries no geometry.
    pub fn from_object(object: &HostObject) -> Result<Self> {
        let mesh = object.mesh.as_ref().ok_or_else(|| {
            BridgeError::InvalidInput(format!("object {} has no mesh data", object.name))
        })?;
        let transform = &object.transform;
        Ok(Self {
            name: object.name.clone(),
            mesh: mesh.encode()?,
            position: to_engine_vector(transform.world_position()),
            rotation: to_engine_rotation(transform.rotation_matrix()),
            scale: to_engine_vector(transform.scale),
        })
    }
}

/// Started engine. Dropping it shuts the engine and its log system down.
pub struct RenderGirl<G: EngineGateway> {
    gateway: G,
    route: LogRoute,
}

impl<G: EngineGateway> RenderGirl<G> {
    /// Starts the log system, points the engine at its resources and starts
    /// the engine. A nonzero start code tears the log system down again.
    pub fn start(mut gateway: G, source_path: Option<&Path>) -> Result<Self> {
        let route = LogRoute::new();
        let callback_route = route.clone();
        gateway.start_log_system(Arc::new(move |message: &str, is_error: bool| {
            callback_route.route(message, is_error);
        }));

        if let Some(path) = source_path {
            match CString::new(path.to_string_lossy().into_owned()) {
                Ok(path) => gateway.set_source_path(&path),
                Err(_) => {
                    gateway.finish_log_system();
                    return Err(BridgeError::InvalidInput(format!(
                        "source path {} contains a NUL byte",
                        path.display()
                    )));
                }
            }
        }

        let code = gateway.start();
        if code != 0 {
            error!("engine start failed with code {code}");
            gateway.finish_log_system();
            return Err(BridgeError::EngineStartup { code });
        }
        info!("engine started");
        Ok(Self { gateway, route })
    }

    /// Names of the compute devices the engine can render on.
    pub fn device_names(&mut self) -> Vec<String> {
        let expected = self.gateway.devices_size().max(0) as usize;
        let mut names = self.gateway.devices_name();
        names.truncate(expected);
        names
    }

    pub fn log_route(&self) -> &LogRoute {
        &self.route
    }

    /// Opens the session for one frame, routing engine messages to `sink`
    /// until the session is dropped.
    pub fn begin_session(&mut self, sink: Arc<dyn ReportSink>) -> Result<SceneSession<'_, G>> {
        self.route.attach(sink)?;
        Ok(SceneSession { engine: self })
    }

    pub fn finish(self) {}
}

impl<G: EngineGateway> Drop for RenderGirl<G> {
    fn drop(&mut self) {
        info!("finishing engine");
        self.gateway.finish();
        self.gateway.finish_log_system();
    }
}

/// Live context of one render invocation.
pub struct SceneSession<'a, G: EngineGateway> {
    engine: &'a mut RenderGirl<G>,
}

impl<G: EngineGateway> SceneSession<'_, G> {
    /// Encodes a host mesh object and submits it.
    pub fn submit(&mut self, object: &HostObject) -> Result<()> {
        let group = MeshGroup::from_object(object)?;
        self.submit_group(&group)
    }

    /// Forwards an encoded group. A nonzero gateway status is returned
    /// unchanged inside [`BridgeError::Submission`].
    pub fn submit_group(&mut self, group: &MeshGroup) -> Result<()> {
        let name = CString::new(group.name.as_str()).map_err(|_| {
            BridgeError::InvalidInput(format!("object name {:?} contains a NUL byte", group.name))
        })?;
        debug!(
            "submitting {}: {} vertices, {} faces",
            group.name,
            group.mesh.vertex_count(),
            group.mesh.face_count()
        );
        let code = self.engine.gateway.add_scene_group(
            &name,
            group.mesh.flat_vertices(),
            &group.mesh.indices,
            group.position.to_array(),
            group.rotation.to_array(),
            group.scale.to_array(),
        );
        if code != 0 {
            return Err(BridgeError::Submission {
                object: group.name.clone(),
                code,
            });
        }
        Ok(())
    }

    /// Renders the submitted geometry. On failure nothing is decoded and the
    /// submitted scene stays in the engine; the caller still has to
    /// [`clear`](Self::clear).
    pub fn render_frame(
        &mut self,
        width: u32,
        height: u32,
        camera: &CameraParams,
        light: &LightParams,
    ) -> Result<PixelGrid> {
        let request = RenderRequest::new(width, height, *camera, *light)?;
        self.render_request(&request)
    }

    pub fn render_request(&mut self, request: &RenderRequest) -> Result<PixelGrid> {
        let too_large =
            || BridgeError::InvalidInput(format!("{}x{} is too large", request.width, request.height));
        let width = i32::try_from(request.width).map_err(|_| too_large())?;
        let height = i32::try_from(request.height).map_err(|_| too_large())?;

        let mut buffer = vec![0u8; frame::buffer_len(request.width, request.height)?];
        let status = self.engine.gateway.render(
            width,
            height,
            request.camera.position.to_array(),
            request.camera.up.to_array(),
            request.camera.direction.to_array(),
            request.light.position.to_array(),
            request.light.color.to_array(),
            &mut buffer,
        );
        if status == RENDER_FAILED {
            return Err(BridgeError::Render);
        }
        frame::decode(&buffer, request.width, request.height)
    }

    /// Drops all geometry submitted to the engine.
    pub fn clear(&mut self) {
        self.engine.gateway.clear_scene();
    }

    pub fn route_log(&self, message: &str, is_error: bool) -> Destination {
        self.engine.route.route(message, is_error)
    }

    /// Full frame: submit every mesh, render with the scene camera and first
    /// lamp, then clear exactly once whatever happened. Failures are also
    /// reported through the session's sink.
    pub fn render_scene(&mut self, scene: &HostScene, width: u32, height: u32) -> Result<PixelGrid> {
        let result = self.submit_and_render(scene, width, height);
        self.clear();
        if let Err(err) = &result {
            error!("frame failed: {err}");
            self.route_log(&err.to_string(), true);
        }
        result
    }

    fn submit_and_render(&mut self, scene: &HostScene, width: u32, height: u32) -> Result<PixelGrid> {
        let request = RenderRequest::from_scene(scene, width, height)?;
        for object in scene.meshes() {
            self.submit(object)?;
        }
        self.render_request(&request)
    }
}

impl<G: EngineGateway> Drop for SceneSession<'_, G> {
    fn drop(&mut self) {
        self.engine.route.detach();
    }
}
