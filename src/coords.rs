//! Host (Z-up) to engine (Y-up) coordinate conversion.
//!
//! The host and the engine disagree on which axis points up, so every
//! vector crossing the boundary has its second and third components swapped.
//! Rotations need more care: permuting the components of an arbitrary Euler
//! triple does not commute with the rotation it describes, so the host matrix
//! is decomposed in the axis order that lines up with the permutation and the
//! resulting angles are emitted in engine order.

use glam::{Mat3, Quat, Vec3};

/// Canonical camera up vector in the camera's local frame.
pub const CAMERA_UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);
/// Canonical camera viewing direction in the camera's local frame.
pub const CAMERA_FORWARD: Vec3 = Vec3::new(0.0, 0.0, -1.0);

/// Swaps the second and third components. Used for positions, scale, light
/// position and camera position. Applying it twice is the identity.
#[inline]
pub fn to_engine_vector(host: Vec3) -> Vec3 {
    Vec3::new(host.x, host.z, host.y)
}

/// Converts a host rotation matrix into engine Euler angles (radians).
///
/// The matrix is decomposed as `Rx(a) * Rz(b) * Ry(c)` and returned as
/// `(a, b, c)`: engine.x is the host X angle, engine.y the host Z angle and
/// engine.z the host Y angle.
pub fn to_engine_rotation(host: Mat3) -> Vec3 {
    // Row/column naming: m_rc is row r, column c.
    let m00 = host.x_axis.x;
    let m01 = host.y_axis.x;
    let m02 = host.z_axis.x;
    let m11 = host.y_axis.y;
    let m12 = host.z_axis.y;
    let m21 = host.y_axis.z;
    let m22 = host.z_axis.z;

    let z = (-m01).clamp(-1.0, 1.0).asin();
    if m01.abs() < 0.999_999 {
        let x = m21.atan2(m11);
        let y = m02.atan2(m00);
        Vec3::new(x, z, y)
    } else {
        // Gimbal lock: X and Y rotate about the same axis, fold it all into X.
        let x = (-m12).atan2(m22);
        Vec3::new(x, z, 0.0)
    }
}

/// Converts host Euler angles (radians, host XYZ convention where the X
/// rotation is applied first) into engine Euler angles.
pub fn to_engine_rotation_euler(host: Vec3) -> Vec3 {
    to_engine_rotation(host_euler_matrix(host))
}

/// Builds the rotation matrix for host XYZ Euler angles.
pub fn host_euler_matrix(euler: Vec3) -> Mat3 {
    Mat3::from_rotation_z(euler.z) * Mat3::from_rotation_y(euler.y) * Mat3::from_rotation_x(euler.x)
}

/// Builds the orientation quaternion for host XYZ Euler angles.
pub fn host_euler_quat(euler: Vec3) -> Quat {
    Quat::from_rotation_z(euler.z) * Quat::from_rotation_y(euler.y) * Quat::from_rotation_x(euler.x)
}

/// Rotates a local direction by the host orientation and maps it to engine
/// space. Zero vectors stay zero; nothing is normalized here.
pub fn to_engine_direction(orientation: Quat, local: Vec3) -> Vec3 {
    to_engine_vector(orientation * local)
}

/// Up and forward vectors of a camera, in engine space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub up: Vec3,
    pub forward: Vec3,
}

pub fn camera_basis(orientation: Quat) -> CameraBasis {
    CameraBasis {
        up: to_engine_direction(orientation, CAMERA_UP),
        forward: to_engine_direction(orientation, CAMERA_FORWARD),
    }
}
