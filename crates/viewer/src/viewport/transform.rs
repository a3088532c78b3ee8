//! Matrix composition shared by rendering, picking and bounding boxes.
//!
//! Every path that needs a mesh's placement goes through [`model_matrix`] and
//! [`FrameTransforms`]; nothing else builds these matrices.

use glam::{Mat3, Mat4, Quat, Vec3};
use mesh_model::Mesh;

use super::camera::Camera;

pub const FOV_Y_DEGREES: f32 = 45.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;

/// `Translate(translate) * Scale(scale) * Translate(-center)`.
pub fn model_matrix(mesh: &Mesh) -> Mat4 {
    Mat4::from_translation(Vec3::from(mesh.translate))
        * Mat4::from_scale(Vec3::from(mesh.scale.to_array()))
        * Mat4::from_translation(-Vec3::from(mesh.center))
}

/// Rotation about `pivot`: `Translate(pivot) * R(q) * Translate(-pivot)`.
pub fn global_transform(pivot: Vec3, rotation: Quat) -> Mat4 {
    Mat4::from_translation(pivot) * Mat4::from_quat(rotation) * Mat4::from_translation(-pivot)
}

pub fn view_matrix(camera: &Camera) -> Mat4 {
    Mat4::look_at_rh(camera.position, camera.position + camera.front, camera.up)
}

pub fn projection_matrix(aspect: f32) -> Mat4 {
    let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
    Mat4::perspective_rh_gl(FOV_Y_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR)
}

pub fn mvp(mesh: &Mesh, global: &Mat4, view: &Mat4, projection: &Mat4) -> Mat4 {
    *projection * *view * *global * model_matrix(mesh)
}

/// Inverse-transpose of the upper 3x3, for transforming normals.
pub fn normal_matrix(model: &Mat4) -> Mat3 {
    let m = Mat3::from_mat4(*model);
    if m.determinant().abs() < f32::EPSILON {
        return Mat3::IDENTITY;
    }
    m.inverse().transpose()
}

/// `global * model * local_point`.
pub fn local_to_world(mesh: &Mesh, global: &Mat4, local_point: Vec3) -> Vec3 {
    (*global * model_matrix(mesh)).transform_point3(local_point)
}

/// The `translate` value that places `local_point` of `mesh` at `world`,
/// holding center and scale fixed.
pub fn translate_for_world_point(mesh: &Mesh, global: &Mat4, local_point: Vec3, world: Vec3) -> [f32; 3] {
    let scene_point = global.inverse().transform_point3(world);
    let scaled = Vec3::from(mesh.scale.to_array()) * (local_point - Vec3::from(mesh.center));
    (scene_point - scaled).to_array()
}

/// Unproject a pixel (top-left origin) onto the plane that faces the camera and
/// passes through `reference`. Returns `None` when the ray is parallel to it.
pub fn screen_to_world(
    camera: &Camera,
    view_projection: &Mat4,
    pixel: [f32; 2],
    size: [f32; 2],
    reference: Vec3,
) -> Option<Vec3> {
    if size[0] <= 0.0 || size[1] <= 0.0 {
        return None;
    }
    let ray = camera.screen_ray(view_projection, pixel, size);
    let denom = ray.direction.dot(camera.front);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (reference - ray.origin).dot(camera.front) / denom;
    Some(ray.origin + ray.direction * t)
}

/// Matrices shared by every draw in one frame. The pivot is fixed for the frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameTransforms {
    pub pivot: Vec3,
    pub global: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

impl FrameTransforms {
    pub fn new(camera: &Camera, rotation: Quat, pivot: Vec3, aspect: f32) -> Self {
        Self {
            pivot,
            global: global_transform(pivot, rotation),
            view: view_matrix(camera),
            projection: projection_matrix(aspect),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// `P * V * G`, for geometry already expressed in scene space.
    pub fn scene_mvp(&self) -> Mat4 {
        self.projection * self.view * self.global
    }

    pub fn mesh_mvp(&self, mesh: &Mesh) -> Mat4 {
        mvp(mesh, &self.global, &self.view, &self.projection)
    }

    /// `G * M`, the lit program's world matrix.
    pub fn mesh_world(&self, mesh: &Mesh) -> Mat4 {
        self.global * model_matrix(mesh)
    }
}
