//! Boundary to the native raytracing engine.
//!
//! [`EngineGateway`] mirrors the engine's exported C functions one to one,
//! including their status-code conventions, so adapters stay thin. The
//! in-process [`RecordingGateway`] is always available; the FFI adapter is
//! compiled with the `native-engine` feature.

#[cfg(feature = "native-engine")]
pub mod native;
pub mod recording;

use std::ffi::CStr;
use std::sync::Arc;

#[cfg(feature = "native-engine")]
pub use native::NativeGateway;
pub use recording::{GatewayCall, RecordedGroup, RecordedRender, RecordingGateway};

/// Receives `(message, is_error)` from the engine, synchronously, on the
/// thread that made the engine call.
pub type LogCallback = Arc<dyn Fn(&str, bool) + Send + Sync>;

/// `Render` returns this when the frame could not be produced.
pub const RENDER_FAILED: i32 = -1;

/// Fixed native call contract of the engine.
pub trait EngineGateway {
    /// `StartLogSystem`
    fn start_log_system(&mut self, callback: LogCallback);

    /// `SetSourcePath`: directory holding the engine's own resource files.
    fn set_source_path(&mut self, path: &CStr);

    /// `StartRendergirl`, 0 on success.
    fn start(&mut self) -> i32;

    /// `FetchDevicesSize`
    fn devices_size(&mut self) -> i32;

    /// `FetchDevicesName`, one entry per device reported by
    /// [`devices_size`](Self::devices_size).
    fn devices_name(&mut self) -> Vec<String>;

    /// `AddSceneGroup`, 0 on success. `vertices` is flat XYZ, `indices` holds
    /// three entries per triangle. The engine copies both.
    #[allow(clippy::too_many_arguments)]
    fn add_scene_group(
        &mut self,
        name: &CStr,
        vertices: &[f32],
        indices: &[u32],
        position: [f32; 3],
        rotation: [f32; 3],
        scale: [f32; 3],
    ) -> i32;

    /// `Render`, blocks until the frame is complete. `out` is exactly
    /// `width * height * 4` bytes. Returns [`RENDER_FAILED`] on failure.
    #[allow(clippy::too_many_arguments)]
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
    ) -> i32;

    /// `ClearScene`
    fn clear_scene(&mut self);

    /// `FinishRenderGirl`
    fn finish(&mut self);

    /// `FinishLogSystem`
    fn finish_log_system(&mut self);
}

impl<G> EngineGateway for &mut G
where
    G: EngineGateway + ?Sized,
{
    fn start_log_system(&mut self, callback: LogCallback) {
        (**self).start_log_system(callback)
    }

    fn set_source_path(&mut self, path: &CStr) {
        (**self).set_source_path(path)
    }

    fn start(&mut self) -> i32 {
        (**self).start()
    }

    fn devices_size(&mut self) -> i32 {
        (**self).devices_size()
    }

    fn devices_name(&mut self) -> Vec<String> {
        (**self).devices_name()
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
        (**self).add_scene_group(name, vertices, indices, position, rotation, scale)
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
        (**self).render(
            width,
            height,
            camera_position,
            camera_up,
            camera_direction,
            light_position,
            light_color,
            out,
        )
    }

    fn clear_scene(&mut self) {
        (**self).clear_scene()
    }

    fn finish(&mut self) {
        (**self).finish()
    }

    fn finish_log_system(&mut self) {
        (**self).finish_log_system()
    }
}
