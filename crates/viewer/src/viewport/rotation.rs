//! Whole-scene rotation with a snapshot undo stack.
//!
//! The rotation is applied around a pivot (the global bounding box centroid)
//! on top of each mesh's own model matrix, so it never touches per-mesh fields.

use glam::{Mat3, Quat};

#[derive(Debug, Clone, Default)]
pub struct GlobalRotation {
    rotation: Quat,
    undo_stack: Vec<Quat>,
}

impl GlobalRotation {
    pub fn new() -> Self {
        Self {
            rotation: Quat::IDENTITY,
            undo_stack: Vec::new(),
        }
    }

    pub fn quaternion(&self) -> Quat {
        self.rotation
    }

    /// Snapshot the current rotation. Call once when a rotation gesture starts.
    pub fn push_rotation(&mut self) {
        self.undo_stack.push(self.rotation);
    }

    /// Left-multiply the current rotation by an incremental one.
    pub fn apply_delta(&mut self, delta: Quat) {
        self.rotation = (delta * self.rotation).normalize();
    }

    /// Restore the last snapshot, or reset to identity when there is none.
    /// Returns `true` if a snapshot was restored.
    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(prev) => {
                self.rotation = prev;
                true
            }
            None => {
                self.rotation = Quat::IDENTITY;
                false
            }
        }
    }

    pub fn reset(&mut self) {
        self.undo_stack.clear();
        self.rotation = Quat::IDENTITY;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Incremental rotation for a pointer drag: horizontal motion turns about
    /// world Y, vertical motion about world X. Sensitivity is degrees per 100 px.
    pub fn delta_from_drag(dx: f32, dy: f32, degrees_per_100px: f32) -> Quat {
        let yaw = (dx / 100.0 * degrees_per_100px).to_radians();
        let pitch = (dy / 100.0 * degrees_per_100px).to_radians();
        Quat::from_rotation_y(yaw) * Quat::from_rotation_x(pitch)
    }

    /// X, Y, Z angles in degrees such that `q = qz * qy * qx`.
    pub fn to_euler_degrees(&self) -> [f32; 3] {
        let m = Mat3::from_quat(self.rotation);
        // Row/column naming: r{row}{col}; glam stores columns.
        let r00 = m.x_axis.x;
        let r10 = m.x_axis.y;
        let r20 = m.x_axis.z;
        let r11 = m.y_axis.y;
        let r21 = m.y_axis.z;
        let r12 = m.z_axis.y;
        let r22 = m.z_axis.z;

        let y = (-r20).clamp(-1.0, 1.0).asin();
        let (x, z) = if r20.abs() < 0.999_999 {
            (r21.atan2(r22), r10.atan2(r00))
        } else {
            // gimbal lock: fold Z into X
            ((-r12).atan2(r11), 0.0)
        };

        [x.to_degrees(), y.to_degrees(), z.to_degrees()]
    }

    /// Replace the rotation from X, Y, Z angles in degrees (`q = qz * qy * qx`).
    pub fn set_euler_degrees(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Self::from_euler_degrees(x, y, z);
    }

    pub fn from_euler_degrees(x: f32, y: f32, z: f32) -> Quat {
        let qx = Quat::from_rotation_x(x.to_radians());
        let qy = Quat::from_rotation_y(y.to_radians());
        let qz = Quat::from_rotation_z(z.to_radians());
        (qz * qy * qx).normalize()
    }
}
