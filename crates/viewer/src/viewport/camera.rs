use glam::{Mat4, Vec3, Vec4};

/// A ray in world space
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// FPS-style camera: a position and an orthonormal front/up pair.
///
/// `yaw`/`pitch` (degrees) are what input handlers edit; `front` is derived from
/// them by [`Camera::from_yaw_pitch`] and [`Camera::look`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for Camera {
    /// At the origin, looking down -Z.
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            yaw: -90.0,
            pitch: 0.0,
        }
    }
}

impl Camera {
    pub fn from_yaw_pitch(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let pitch = pitch.clamp(-89.0, 89.0);
        let (ys, yc) = yaw.to_radians().sin_cos();
        let (ps, pc) = pitch.to_radians().sin_cos();
        let front = Vec3::new(yc * pc, ps, ys * pc).normalize();
        let right = front.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(front).normalize_or_zero();
        Self {
            position,
            front,
            up,
            yaw,
            pitch,
        }
    }

    /// Set position and orientation directly. `front` is normalized and `up` is
    /// re-orthogonalized against it; a degenerate pair keeps world Y as up.
    pub fn set(&mut self, position: Vec3, front: Vec3, up: Vec3) {
        let front = front.try_normalize().unwrap_or(Vec3::NEG_Z);
        let right = front
            .cross(up)
            .try_normalize()
            .or_else(|| front.cross(Vec3::Y).try_normalize())
            .unwrap_or(Vec3::X);
        self.position = position;
        self.front = front;
        self.up = right.cross(front).normalize();
        self.pitch = front.y.clamp(-1.0, 1.0).asin().to_degrees();
        self.yaw = front.z.atan2(front.x).to_degrees();
    }

    /// Mouse-look: offsets in pixels, sensitivity in degrees per pixel.
    pub fn look(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        *self = Self::from_yaw_pitch(
            self.position,
            self.yaw + dx * sensitivity,
            self.pitch - dy * sensitivity,
        );
    }

    pub fn right(&self) -> Vec3 {
        self.front.cross(self.up).normalize_or_zero()
    }

    pub fn move_forward(&mut self, distance: f32) {
        self.position += self.front * distance;
    }

    pub fn strafe(&mut self, distance: f32) {
        self.position += self.right() * distance;
    }

    pub fn lift(&mut self, distance: f32) {
        self.position += self.up * distance;
    }

    /// Cast a ray through a pixel (top-left origin) of a `size` viewport.
    pub fn screen_ray(&self, view_projection: &Mat4, pixel: [f32; 2], size: [f32; 2]) -> Ray {
        let ndc_x = pixel[0] / size[0] * 2.0 - 1.0;
        let ndc_y = 1.0 - pixel[1] / size[1] * 2.0;

        let vp_inv = view_projection.inverse();
        let near_world = vp_inv * Vec4::new(ndc_x, ndc_y, -1.0, 1.0);
        let far_world = vp_inv * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let near = near_world.truncate() / near_world.w;
        let far = far_world.truncate() / far_world.w;

        Ray {
            origin: self.position,
            direction: (far - near).normalize_or_zero(),
        }
    }

    /// Project a world point to pixel coordinates (top-left origin).
    pub fn project(&self, view_projection: &Mat4, point: Vec3, size: [f32; 2]) -> Option<[f32; 2]> {
        let p = *view_projection * point.extend(1.0);
        if p.w <= 0.0 {
            return None;
        }
        let ndc = p.truncate() / p.w;
        Some([
            (ndc.x + 1.0) * 0.5 * size[0],
            (1.0 - ndc.y) * 0.5 * size[1],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_looks_down_negative_z() {
        let cam = Camera::default();
        assert_eq!(cam.position, Vec3::ZERO);
        assert_eq!(cam.front, Vec3::NEG_Z);
        assert!(cam.front.dot(cam.up).abs() < 1e-6);
    }

    #[test]
    fn test_yaw_pitch_matches_default() {
        let cam = Camera::from_yaw_pitch(Vec3::ZERO, -90.0, 0.0);
        assert!((cam.front - Vec3::NEG_Z).length() < 1e-5);
        assert!((cam.up - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut cam = Camera::default();
        cam.look(0.0, -10_000.0, 1.0);
        assert!(cam.pitch <= 89.0);
        assert!(cam.front.is_finite());
    }

    #[test]
    fn test_set_orthogonalizes_up() {
        let mut cam = Camera::default();
        cam.set(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -2.0), Vec3::new(0.0, 1.0, 1.0));
        assert!((cam.front.length() - 1.0).abs() < 1e-6);
        assert!(cam.front.dot(cam.up).abs() < 1e-6);
        assert!(cam.up.y > 0.9);
    }

    #[test]
    fn test_set_with_parallel_up_keeps_valid_basis() {
        let mut cam = Camera::default();
        cam.set(Vec3::ZERO, Vec3::Y, Vec3::Y);
        assert!(cam.up.is_finite());
        assert!(cam.front.dot(cam.up).abs() < 1e-6);
    }

    #[test]
    fn test_strafe_moves_right() {
        let mut cam = Camera::default();
        cam.strafe(2.0);
        assert!((cam.position - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
    }
}
