use std::ffi::CStr;

use log::debug;

use super::{EngineGateway, LogCallback, RENDER_FAILED};

/// One call made through the gateway, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    StartLogSystem,
    SetSourcePath(String),
    Start,
    DevicesSize,
    DevicesName,
    AddSceneGroup(String),
    Render { width: i32, height: i32 },
    ClearScene,
    Finish,
    FinishLogSystem,
}

/// Scene group as the engine received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedGroup {
    pub name: String,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

/// Arguments of one render call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedRender {
    pub width: i32,
    pub height: i32,
    pub camera_position: [f32; 3],
    pub camera_up: [f32; 3],
    pub camera_direction: [f32; 3],
    pub light_position: [f32; 3],
    pub light_color: [f32; 3],
}

/// In-process engine that records every call and fills frames with a flat
/// color. Status codes are configurable so failure paths can be driven
/// without the native library.
pub struct RecordingGateway {
    devices: Vec<String>,
    start_code: i32,
    failing_group: Option<(String, i32)>,
    render_code: i32,
    fill: [u8; 4],
    log: Option<LogCallback>,
    calls: Vec<GatewayCall>,
    scene: Vec<RecordedGroup>,
    renders: Vec<RecordedRender>,
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self {
            devices: vec!["Recording device".to_string()],
            start_code: 0,
            failing_group: None,
            render_code: 0,
            fill: [0, 0, 0, 255],
            log: None,
            calls: Vec::new(),
            scene: Vec::new(),
            renders: Vec::new(),
        }
    }
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices<I, S>(mut self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.devices = devices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_start_code(mut self, code: i32) -> Self {
        self.start_code = code;
        self
    }

    /// Makes `AddSceneGroup` return `code` for the group called `name`.
    pub fn with_failing_group(mut self, name: impl Into<String>, code: i32) -> Self {
        self.failing_group = Some((name.into(), code));
        self
    }

    pub fn with_render_code(mut self, code: i32) -> Self {
        self.render_code = code;
        self
    }

    pub fn with_fill(mut self, fill: [u8; 4]) -> Self {
        self.fill = fill;
        self
    }

    pub fn calls(&self) -> &[GatewayCall] {
        &self.calls
    }

    /// Groups currently resident in the engine (emptied by `ClearScene`).
    pub fn scene(&self) -> &[RecordedGroup] {
        &self.scene
    }

    pub fn renders(&self) -> &[RecordedRender] {
        &self.renders
    }

    pub fn count(&self, call: &GatewayCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    fn emit(&self, message: &str, is_error: bool) {
        if let Some(log) = &self.log {
            log(message, is_error);
        }
    }
}

impl EngineGateway for RecordingGateway {
    fn start_log_system(&mut self, callback: LogCallback) {
        self.calls.push(GatewayCall::StartLogSystem);
        self.log = Some(callback);
    }

    fn set_source_path(&mut self, path: &CStr) {
        self.calls
            .push(GatewayCall::SetSourcePath(path.to_string_lossy().into_owned()));
    }

    fn start(&mut self) -> i32 {
        self.calls.push(GatewayCall::Start);
        if self.start_code == 0 {
            self.emit("RenderGirl started", false);
        } else {
            self.emit("No OpenCL capable device found", true);
        }
        self.start_code
    }

    fn devices_size(&mut self) -> i32 {
        self.calls.push(GatewayCall::DevicesSize);
        self.devices.len() as i32
    }

    fn devices_name(&mut self) -> Vec<String> {
        self.calls.push(GatewayCall::DevicesName);
        self.devices.clone()
    }

    fn add_scene_group(
        &mut self,
        name: &CStr,
        vertices: &[f32],
        indices: &[u32],
        position: [f32; 3],
        rotation: [f32; 3],
        scale: [f32; 3],
    ) -> i32 {
        let name = name.to_string_lossy().into_owned();
        self.calls.push(GatewayCall::AddSceneGroup(name.clone()));
        if let Some((failing, code)) = &self.failing_group {
            if *failing == name {
                self.emit(&format!("Scene group {name} rejected"), true);
                return *code;
            }
        }
        debug!(
            "recording group {name}: {} floats, {} indices",
            vertices.len(),
            indices.len()
        );
        self.scene.push(RecordedGroup {
            name,
            vertices: vertices.to_vec(),
            indices: indices.to_vec(),
            position,
            rotation,
            scale,
        });
        0
    }

    fn render(
        &mut self,
        width: i32,
        height: i32,
        camera_position: [f32; 3],
        camera_up: [f32; 3],
        camera_direction: [f32; 3],
        light_position: [f32; 3],
        light_color: [f32; 3],
        out: &mut [u8],
    ) -> i32 {
        self.calls.push(GatewayCall::Render { width, height });
        self.renders.push(RecordedRender {
            width,
            height,
            camera_position,
            camera_up,
            camera_direction,
            light_position,
            light_color,
        });
        if self.render_code == RENDER_FAILED {
            self.emit("Render failed", true);
            return RENDER_FAILED;
        }
        self.emit(
            &format!(
                "Rendering {width}x{height} with {} group(s)",
                self.scene.len()
            ),
            false,
        );
        for px in out.chunks_exact_mut(4) {
            px.copy_from_slice(&self.fill);
        }
        self.render_code
    }

    fn clear_scene(&mut self) {
        self.calls.push(GatewayCall::ClearScene);
        self.scene.clear();
    }

    fn finish(&mut self) {
        self.calls.push(GatewayCall::Finish);
    }

    fn finish_log_system(&mut self) {
        self.calls.push(GatewayCall::FinishLogSystem);
        self.log = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::ffi::CString;
    use std::sync::Arc;

    #[test]
    fn clear_scene_drops_resident_groups() {
        let mut gateway = RecordingGateway::new();
        let name = CString::new("Cube").unwrap();
        let status = gateway.add_scene_group(
            &name,
            &[0.0, 0.0, 0.0],
            &[0, 0, 0],
            [0.0; 3],
            [0.0; 3],
            [1.0; 3],
        );
        assert_eq!(status, 0);
        assert_eq!(gateway.scene().len(), 1);
        gateway.clear_scene();
        assert!(gateway.scene().is_empty());
        assert_eq!(gateway.count(&GatewayCall::ClearScene), 1);
    }

    #[test]
    fn render_fills_buffer_and_logs_through_callback() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&messages);
        let mut gateway = RecordingGateway::new().with_fill([1, 2, 3, 4]);
        gateway.start_log_system(Arc::new(move |message: &str, is_error: bool| {
            sink.lock().push((message.to_string(), is_error));
        }));
        let mut out = vec![0u8; 2 * 4];
        let status = gateway.render(2, 1, [0.0; 3], [0.0; 3], [0.0; 3], [0.0; 3], [1.0; 3], &mut out);
        assert_eq!(status, 0);
        assert_eq!(out, vec![1, 2, 3, 4, 1, 2, 3, 4]);
        assert_eq!(
            messages.lock().as_slice(),
            &[("Rendering 2x1 with 0 group(s)".to_string(), false)]
        );
    }

    #[test]
    fn failing_group_reports_configured_code() {
        let mut gateway = RecordingGateway::new().with_failing_group("Bad", 3);
        let name = CString::new("Bad").unwrap();
        let status = gateway.add_scene_group(&name, &[], &[], [0.0; 3], [0.0; 3], [1.0; 3]);
        assert_eq!(status, 3);
        assert!(gateway.scene().is_empty());
    }
}
