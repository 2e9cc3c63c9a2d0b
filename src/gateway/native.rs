//! FFI adapter for the RenderGirlBlender shared library.
//!
//! The library is built per architecture; the link name follows the
//! pointer width of the target.

use std::ffi::{c_char, c_int, CStr};
use std::ptr;

use log::warn;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::{EngineGateway, LogCallback};

/// Room the engine may use for one device name, terminator included.
const DEVICE_NAME_CAPACITY: usize = 256;

type RawLogCallback = extern "C" fn(message: *const c_char, error: bool);

#[cfg_attr(target_pointer_width = "64", link(name = "RenderGirlBlender_x86_64"))]
#[cfg_attr(not(target_pointer_width = "64"), link(name = "RenderGirlBlender_x86"))]
extern "C" {
    fn StartLogSystem(callback: RawLogCallback);
    fn SetSourcePath(path: *const c_char);
    fn StartRendergirl() -> c_int;
    fn FetchDevicesSize() -> c_int;
    fn FetchDevicesName(names: *mut *mut c_char);
    fn AddSceneGroup(
        name: *const c_char,
        vertex: *const f32,
        vertex_size: c_int,
        faces: *const c_int,
        faces_size: c_int,
        position: *const f32,
        rotation: *const f32,
        scale: *const f32,
    ) -> c_int;
    fn Render(
        width: c_int,
        height: c_int,
        camera_pos: *const f32,
        camera_up: *const f32,
        camera_dir: *const f32,
        light_pos: *const f32,
        light_color: *const f32,
        frame: *mut u8,
    ) -> c_int;
    fn ClearScene();
    fn FinishRenderGirl();
    fn FinishLogSystem();
}

// A C function pointer carries no user data, so the trampoline reads the
// active callback from here.
static LOG_CALLBACK: Lazy<Mutex<Option<LogCallback>>> = Lazy::new(|| Mutex::new(None));

extern "C" fn log_trampoline(message: *const c_char, error: bool) {
    if message.is_null() {
        return;
    }
    // SAFETY: the engine passes a NUL-terminated string that outlives the call.
    let text = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    let callback = LOG_CALLBACK.lock().clone();
    if let Some(callback) = callback {
        callback(&text, error);
    }
}

/// Gateway that calls straight into the linked native engine.
#[derive(Debug, Default)]
pub struct NativeGateway {
    _private: (),
}

impl NativeGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EngineGateway for NativeGateway {
    fn start_log_system(&mut self, callback: LogCallback) {
        *LOG_CALLBACK.lock() = Some(callback);
        // SAFETY: the trampoline is a plain `extern "C"` fn valid for the
        // whole process lifetime.
        unsafe { StartLogSystem(log_trampoline) }
    }

    fn set_source_path(&mut self, path: &CStr) {
        // SAFETY: `path` is NUL-terminated; the engine copies it.
        unsafe { SetSourcePath(path.as_ptr()) }
    }

    fn start(&mut self) -> i32 {
        // SAFETY: no preconditions beyond a started log system.
        unsafe { StartRendergirl() }
    }

    fn devices_size(&mut self) -> i32 {
        // SAFETY: no preconditions.
        unsafe { FetchDevicesSize() }
    }

    fn devices_name(&mut self) -> Vec<String> {
        let count = usize::try_from(self.devices_size()).unwrap_or(0);
        let mut storage = vec![[0 as c_char; DEVICE_NAME_CAPACITY]; count];
        let mut pointers: Vec<*mut c_char> =
            storage.iter_mut().map(|name| name.as_mut_ptr()).collect();
        if pointers.is_empty() {
            return Vec::new();
        }
        // SAFETY: one writable buffer of DEVICE_NAME_CAPACITY per reported device.
        unsafe { FetchDevicesName(pointers.as_mut_ptr()) };
        storage
            .iter_mut()
            .map(|name| {
                name[DEVICE_NAME_CAPACITY - 1] = 0;
                // SAFETY: terminator forced above.
                unsafe { CStr::from_ptr(name.as_ptr()) }
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
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
        let (Ok(vertex_size), Ok(faces_size)) = (
            c_int::try_from(vertices.len()),
            c_int::try_from(indices.len() / 3),
        ) else {
            warn!("scene group too large for the engine's int counts");
            return -1;
        };
        if indices.iter().any(|&index| index > c_int::MAX as u32) {
            return -1;
        }
        let faces: &[c_int] = bytemuck::cast_slice(indices);
        // SAFETY: every pointer references a live slice/array of the length
        // announced alongside it; the engine copies the data before returning.
        unsafe {
            AddSceneGroup(
                name.as_ptr(),
                if vertices.is_empty() { ptr::null() } else { vertices.as_ptr() },
                vertex_size,
                if faces.is_empty() { ptr::null() } else { faces.as_ptr() },
                faces_size,
                position.as_ptr(),
                rotation.as_ptr(),
                scale.as_ptr(),
            )
        }
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
        // SAFETY: `out` is sized width * height * 4 by the caller; the
        // vectors are three-float arrays.
        unsafe {
            Render(
                width,
                height,
                camera_position.as_ptr(),
                camera_up.as_ptr(),
                camera_direction.as_ptr(),
                light_position.as_ptr(),
                light_color.as_ptr(),
                out.as_mut_ptr(),
            )
        }
    }

    fn clear_scene(&mut self) {
        // SAFETY: no preconditions.
        unsafe { ClearScene() }
    }

    fn finish(&mut self) {
        // SAFETY: no preconditions.
        unsafe { FinishRenderGirl() }
    }

    fn finish_log_system(&mut self) {
        // SAFETY: no preconditions.
        unsafe { FinishLogSystem() }
        *LOG_CALLBACK.lock() = None;
    }
}
