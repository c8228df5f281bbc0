use glam::{Mat4, Quat, Vec3};

use crate::constants::{SHADOW_FAR_Z, SHADOW_NEAR_Z};

/// Cube map face look directions and up vectors, in +X, -X, +Y, -Y, +Z, -Z order.
pub const CUBE_FACE_AXES: [(Vec3, Vec3); 6] = [
    (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
    (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
    (Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, -1.0)),
    (Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    (Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0)),
    (Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 0.0)),
];

/// Right-handed perspective projection with inverse-Z: the near plane maps to
/// depth 1 and the far plane to depth 0.
pub fn perspective_inverse_z(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(fov_y, aspect, far, near)
}

/// View matrix of one cube face centered on `position`.
pub fn cube_face_view(position: Vec3, face: usize) -> Mat4 {
    let (dir, up) = CUBE_FACE_AXES[face % 6];
    Mat4::look_to_rh(position, dir, up)
}

/// 90 degree, square, inverse-Z projection shared by all shadow cube faces.
pub fn cube_face_projection() -> Mat4 {
    perspective_inverse_z(
        std::f32::consts::FRAC_PI_2,
        1.0,
        SHADOW_NEAR_Z,
        SHADOW_FAR_Z,
    )
}

/// View-projection matrices for the six faces of a point light's shadow cube.
pub fn cube_face_view_projs(position: Vec3) -> [Mat4; 6] {
    let proj = cube_face_projection();
    std::array::from_fn(|face| proj * cube_face_view(position, face))
}

/// Free-flying camera with yaw around world +Z and pitch around the yawed +X axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl FpsCamera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
        }
    }

    pub fn from_degrees(position: Vec3, yaw_degrees: f32, pitch_degrees: f32) -> Self {
        Self::new(position, yaw_degrees.to_radians(), pitch_degrees.to_radians())
    }

    pub fn rotation(&self) -> Quat {
        let yaw = Quat::from_axis_angle(Vec3::Z, self.yaw);
        let pitch_axis = yaw * Vec3::X;
        let pitch = Quat::from_axis_angle(pitch_axis, self.pitch);
        pitch * yaw
    }

    /// Move by a view-space offset (-Z forward) and turn by the given angles.
    pub fn advance(&mut self, movement_view: Vec3, turn_yaw: f32, turn_pitch: f32) {
        let tau = std::f32::consts::TAU;
        self.yaw = (self.yaw + turn_yaw) % tau;
        self.pitch = (self.pitch + turn_pitch) % tau;
        self.position += self.rotation() * movement_view;
    }

    pub fn view(&self) -> Mat4 {
        view_matrix(self.position, self.rotation())
    }
}

/// Right-handed look-at view from a position and orientation (-Z forward, +Y up).
pub fn view_matrix(position: Vec3, rotation: Quat) -> Mat4 {
    let forward = rotation * Vec3::NEG_Z;
    let up = rotation * Vec3::Y;
    Mat4::look_at_rh(position, position + forward, up)
}

/// Smallest power of two greater than or equal to `v` (1 for 0).
pub fn pow2_round_up(v: u32) -> u32 {
    v.max(1).next_power_of_two()
}

/// Full mip chain length for a texture, down to the smaller side reaching 1.
pub fn full_mip_count(width: u32, height: u32) -> u32 {
    let side = pow2_round_up(width).min(pow2_round_up(height));
    side.trailing_zeros().max(1)
}
