use crate::{Mat4, Vec3};

const MOUSE_SENSITIVITY: f32 = 0.1;
const MOVE_SPEED: f32 = 3.5;
const PITCH_LIMIT_DEG: f32 = 89.0;

/// Per-frame movement request, decoupled from any windowing backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CameraInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

/// Fly camera: position + yaw/pitch integrated from input deltas.
///
/// Yaw/pitch are stored in degrees. `view()` and `proj()` are derived on
/// demand; nothing is cached between frames.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    pub fov_y_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
    /// Mouse-look is only applied while enabled (e.g. RMB held).
    pub enabled: bool,
    first_mouse: bool,
    last_x: f32,
    last_y: f32,
}

impl Camera {
    pub fn new(position: Vec3, aspect: f32) -> Self {
        Self {
            position,
            // yaw 0 / pitch 0 looks down +X.
            forward: Vec3::X,
            up: Vec3::Y,
            yaw_deg: 0.0,
            pitch_deg: 0.0,
            fov_y_deg: 45.0,
            z_near: 0.1,
            z_far: 1000.0,
            aspect,
            enabled: false,
            first_mouse: true,
            last_x: 0.0,
            last_y: 0.0,
        }
    }

    /// Enable or disable mouse-look. Disabling re-latches the first-mouse
    /// guard so re-enabling does not produce a jump from a stale cursor.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.first_mouse = true;
        }
    }

    /// Integrate keyboard movement over `dt` seconds.
    pub fn process_movement(&mut self, input: CameraInput, dt: f32) {
        let speed = MOVE_SPEED * dt;
        let right = self.forward.cross(self.up).normalize_or_zero();
        if input.forward {
            self.position += self.forward * speed;
        }
        if input.backward {
            self.position -= self.forward * speed;
        }
        if input.left {
            self.position -= right * speed;
        }
        if input.right {
            self.position += right * speed;
        }
        if input.up {
            self.position += self.up * speed;
        }
        if input.down {
            self.position -= self.up * speed;
        }
    }

    /// Integrate a mouse move (absolute cursor position in pixels).
    pub fn process_mouse(&mut self, x: f32, y: f32) {
        if !self.enabled {
            return;
        }
        if self.first_mouse {
            self.last_x = x;
            self.last_y = y;
            self.first_mouse = false;
        }

        let dx = x - self.last_x;
        let dy = self.last_y - y; // screen Y grows downward
        self.last_x = x;
        self.last_y = y;

        self.yaw_deg += dx * MOUSE_SENSITIVITY;
        self.pitch_deg =
            (self.pitch_deg + dy * MOUSE_SENSITIVITY).clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG);

        let yaw = self.yaw_deg.to_radians();
        let pitch = self.pitch_deg.to_radians();
        self.forward = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward, self.up)
    }

    /// Perspective projection with 0..1 depth (wgpu convention).
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    #[inline]
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_is_clamped() {
        let mut cam = Camera::new(Vec3::ZERO, 16.0 / 9.0);
        cam.set_enabled(true);
        cam.process_mouse(0.0, 0.0);
        // Huge upward drag: pitch must stop at the limit.
        cam.process_mouse(0.0, -100_000.0);
        assert!((cam.pitch_deg - PITCH_LIMIT_DEG).abs() < 1e-3);
        assert!(cam.forward.is_normalized());
    }

    #[test]
    fn disabled_camera_ignores_mouse() {
        let mut cam = Camera::new(Vec3::ZERO, 1.0);
        let before = cam.forward;
        cam.process_mouse(100.0, 50.0);
        assert_eq!(cam.forward, before);
    }

    #[test]
    fn first_mouse_does_not_jump() {
        let mut cam = Camera::new(Vec3::ZERO, 1.0);
        cam.set_enabled(true);
        // First sample only latches the cursor; no rotation yet.
        cam.process_mouse(640.0, 360.0);
        assert_eq!(cam.yaw_deg, 0.0);
        assert_eq!(cam.pitch_deg, 0.0);
    }

    #[test]
    fn movement_follows_forward() {
        let mut cam = Camera::new(Vec3::ZERO, 1.0);
        cam.process_movement(
            CameraInput {
                forward: true,
                ..Default::default()
            },
            1.0,
        );
        assert!((cam.position.x - MOVE_SPEED).abs() < 1e-6);
        assert_eq!(cam.position.y, 0.0);
    }

    #[test]
    fn proj_view_is_finite() {
        let cam = Camera::new(Vec3::new(-8.0, 2.0, 0.0), 16.0 / 9.0);
        let pv = cam.proj_view();
        assert!(pv.to_cols_array().iter().all(|f| f.is_finite()));
    }
}
