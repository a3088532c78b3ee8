//! Offscreen target and blur pass used for antialiasing.

use super::error::RenderError;
use super::gpu::{Capability, DrawMode, Gpu, VertexLayout, ViewportRect};
use super::mesh::fullscreen_quad;
use super::shaders::ProgramKind;

/// Color texture + depth renderbuffer + framebuffer of one size.
pub struct OffscreenTarget<G: Gpu> {
    pub framebuffer: G::Framebuffer,
    pub color: G::Texture,
    pub depth: G::Renderbuffer,
    pub size: [u32; 2],
}

impl<G: Gpu> OffscreenTarget<G> {
    pub fn create(gpu: &G, size: [u32; 2]) -> Result<Self, RenderError> {
        let color = gpu.create_color_texture(size[0], size[1])?;
        let depth = match gpu.create_depth_buffer(size[0], size[1]) {
            Ok(d) => d,
            Err(e) => {
                gpu.delete_texture(color);
                return Err(e);
            }
        };
        match gpu.create_framebuffer(color, depth) {
            Ok(framebuffer) => Ok(Self {
                framebuffer,
                color,
                depth,
                size,
            }),
            Err(e) => {
                gpu.delete_depth_buffer(depth);
                gpu.delete_texture(color);
                Err(e)
            }
        }
    }

    pub fn destroy(self, gpu: &G) {
        gpu.delete_framebuffer(self.framebuffer);
        gpu.delete_depth_buffer(self.depth);
        gpu.delete_texture(self.color);
    }
}

/// Post-process program, its quad, and the offscreen target sized to the surface.
pub struct PostProcess<G: Gpu> {
    program: G::Program,
    quad_vao: G::VertexArray,
    quad_vbo: G::Buffer,
    target: Option<OffscreenTarget<G>>,
}

impl<G: Gpu> PostProcess<G> {
    pub fn create(gpu: &G) -> Result<Self, RenderError> {
        let (vs, fs) = ProgramKind::Post.sources();
        let program = gpu.create_program(ProgramKind::Post.label(), vs, fs)?;
        let (quad_vao, quad_vbo) = match gpu.create_vertex_buffer(VertexLayout::QUAD) {
            Ok(v) => v,
            Err(e) => {
                gpu.delete_program(program);
                return Err(e);
            }
        };
        gpu.write_vertex_buffer(quad_vbo, &fullscreen_quad());
        tracing::debug!("post-process resources created");
        Ok(Self {
            program,
            quad_vao,
            quad_vbo,
            target: None,
        })
    }

    /// Framebuffer matching `size`, recreated when the size changed.
    pub fn ensure_target(&mut self, gpu: &G, size: [u32; 2]) -> Result<G::Framebuffer, RenderError> {
        if let Some(target) = &self.target {
            if target.size == size {
                return Ok(target.framebuffer);
            }
        }
        if let Some(old) = self.target.take() {
            old.destroy(gpu);
        }
        let target = OffscreenTarget::create(gpu, size)?;
        tracing::debug!("offscreen target {}x{}", size[0], size[1]);
        let fb = target.framebuffer;
        self.target = Some(target);
        Ok(fb)
    }

    /// Blur the offscreen color into the window framebuffer over `viewport`.
    /// Depth test and culling are off for the quad and restored afterwards.
    pub fn draw(&self, gpu: &G, viewport: ViewportRect) {
        let Some(target) = &self.target else {
            return;
        };

        let depth_was = gpu.is_enabled(Capability::DepthTest);
        let cull_was = gpu.is_enabled(Capability::CullFace);
        gpu.set_capability(Capability::DepthTest, false);
        gpu.set_capability(Capability::CullFace, false);

        gpu.bind_framebuffer(None);
        gpu.set_viewport(viewport);
        // the scissor still holds the offscreen rect
        gpu.set_scissor(viewport);
        gpu.use_program(Some(self.program));
        gpu.bind_texture(0, Some(target.color));
        gpu.set_uniform_i32(self.program, "u_texture", 0);
        gpu.set_uniform_vec2(
            self.program,
            "u_texel",
            [1.0 / target.size[0].max(1) as f32, 1.0 / target.size[1].max(1) as f32],
        );
        gpu.draw_arrays(self.quad_vao, DrawMode::Triangles, 6);
        gpu.bind_texture(0, None);

        gpu.set_capability(Capability::DepthTest, depth_was);
        gpu.set_capability(Capability::CullFace, cull_was);
    }

    pub fn destroy(mut self, gpu: &G) {
        if let Some(target) = self.target.take() {
            target.destroy(gpu);
        }
        gpu.delete_vertex_buffer(self.quad_vao, self.quad_vbo);
        gpu.delete_program(self.program);
    }
}
