// Library crate: the render/transform/picking engine plus the headless harness,
// so integration tests can drive it without a window.
// The egui shell (app, ui, viewport panel) stays in the binary crate.

pub mod fixtures;
pub mod harness;
pub mod state;

/// Engine modules. The binary's viewport panel lives next to these files but is
/// compiled only into the binary.
pub mod viewport {
    pub mod bounds;
    pub mod camera;
    pub mod error;
    pub mod gl_renderer;
    pub mod gpu;
    pub mod mesh;
    pub mod normals;
    pub mod picking;
    pub mod post;
    pub mod rotation;
    pub mod shaders;
    pub mod transform;

    pub use gl_renderer::{RenderEngine, RenderParams};
    pub use gpu::{Gpu, GlowGpu};
}
