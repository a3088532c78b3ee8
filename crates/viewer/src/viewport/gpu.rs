//! The narrow slice of OpenGL the engine uses, behind a trait.
//!
//! [`GlowGpu`] drives a real `glow` context; the headless harness implements the
//! same trait for tests.

use std::cell::Cell;
use std::fmt::Debug;
use std::sync::Arc;

use glam::{Mat3, Mat4, Vec3};
use glow::HasContext;

use super::error::RenderError;

/// Fixed-function state the engine toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    CullFace,
    ScissorTest,
    ProgramPointSize,
    Blend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    Triangles,
    Lines,
    Points,
}

/// Pixel rectangle, bottom-left origin (as `glViewport`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ViewportRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_size(size: [u32; 2]) -> Self {
        Self::new(0, 0, size[0] as i32, size[1] as i32)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0 {
            self.width as f32 / self.height as f32
        } else {
            1.0
        }
    }
}

/// Float attributes of one interleaved vertex buffer: `(location, components)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub attributes: &'static [(u32, i32)],
}

impl VertexLayout {
    /// position(3) + normal(3)
    pub const FILL: Self = Self {
        attributes: &[(0, 3), (1, 3)],
    };
    /// position(3) + color(4)
    pub const LINE: Self = Self {
        attributes: &[(0, 3), (1, 4)],
    };
    /// clip xy(2) + uv(2)
    pub const QUAD: Self = Self {
        attributes: &[(0, 2), (1, 2)],
    };

    pub fn floats_per_vertex(&self) -> usize {
        self.attributes.iter().map(|&(_, n)| n as usize).sum()
    }

    pub fn stride_bytes(&self) -> i32 {
        (self.floats_per_vertex() * std::mem::size_of::<f32>()) as i32
    }
}

/// Live GPU objects, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub programs: usize,
    pub vertex_arrays: usize,
    pub buffers: usize,
    pub textures: usize,
    pub renderbuffers: usize,
    pub framebuffers: usize,
}

impl ResourceCounts {
    pub fn total(&self) -> usize {
        self.programs + self.vertex_arrays + self.buffers + self.textures + self.renderbuffers + self.framebuffers
    }
}

pub trait Gpu {
    type Program: Copy + Debug;
    type VertexArray: Copy + Debug;
    type Buffer: Copy + Debug;
    type Texture: Copy + Debug;
    type Renderbuffer: Copy + Debug;
    type Framebuffer: Copy + Debug;

    // ── Programs ─────────────────────────────────────────────

    fn create_program(&self, label: &str, vertex: &str, fragment: &str) -> Result<Self::Program, RenderError>;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);

    fn set_uniform_mat4(&self, program: Self::Program, name: &str, m: &Mat4);
    fn set_uniform_mat3(&self, program: Self::Program, name: &str, m: &Mat3);
    fn set_uniform_vec2(&self, program: Self::Program, name: &str, v: [f32; 2]);
    fn set_uniform_vec3(&self, program: Self::Program, name: &str, v: Vec3);
    fn set_uniform_f32(&self, program: Self::Program, name: &str, v: f32);
    fn set_uniform_i32(&self, program: Self::Program, name: &str, v: i32);

    // ── Vertex data ──────────────────────────────────────────

    fn create_vertex_buffer(&self, layout: VertexLayout) -> Result<(Self::VertexArray, Self::Buffer), RenderError>;
    fn write_vertex_buffer(&self, buffer: Self::Buffer, data: &[f32]);
    fn delete_vertex_buffer(&self, vao: Self::VertexArray, buffer: Self::Buffer);
    fn draw_arrays(&self, vao: Self::VertexArray, mode: DrawMode, count: usize);

    // ── State ────────────────────────────────────────────────

    fn set_capability(&self, cap: Capability, enabled: bool);
    fn is_enabled(&self, cap: Capability) -> bool;
    fn set_line_width(&self, width: f32);
    fn set_viewport(&self, rect: ViewportRect);
    fn set_scissor(&self, rect: ViewportRect);
    /// Clear color and depth of the bound framebuffer.
    fn clear(&self, color: [f32; 4]);

    // ── Offscreen targets ────────────────────────────────────

    fn create_color_texture(&self, width: u32, height: u32) -> Result<Self::Texture, RenderError>;
    fn delete_texture(&self, texture: Self::Texture);
    fn create_depth_buffer(&self, width: u32, height: u32) -> Result<Self::Renderbuffer, RenderError>;
    fn delete_depth_buffer(&self, rb: Self::Renderbuffer);
    /// Framebuffer over `color` + `depth`; fails if it is not complete.
    fn create_framebuffer(
        &self,
        color: Self::Texture,
        depth: Self::Renderbuffer,
    ) -> Result<Self::Framebuffer, RenderError>;
    fn delete_framebuffer(&self, fb: Self::Framebuffer);
    /// `None` binds the window's framebuffer.
    fn bind_framebuffer(&self, fb: Option<Self::Framebuffer>);
    fn bind_texture(&self, unit: u32, texture: Option<Self::Texture>);

    /// RGBA of one pixel of the bound framebuffer (bottom-left origin).
    fn read_pixel(&self, x: i32, y: i32) -> [u8; 4];

    fn resource_counts(&self) -> ResourceCounts;
}

// ── glow implementation ──────────────────────────────────────

/// [`Gpu`] over a live OpenGL 3.3 context.
pub struct GlowGpu {
    gl: Arc<glow::Context>,
    counts: Cell<ResourceCounts>,
}

impl GlowGpu {
    pub fn new(gl: Arc<glow::Context>) -> Self {
        Self {
            gl,
            counts: Cell::new(ResourceCounts::default()),
        }
    }

    pub fn context(&self) -> &Arc<glow::Context> {
        &self.gl
    }

    fn count(&self, f: impl FnOnce(&mut ResourceCounts)) {
        let mut c = self.counts.get();
        f(&mut c);
        self.counts.set(c);
    }

    fn compile_stage(&self, label: &str, stage: u32, source: &str) -> Result<glow::Shader, RenderError> {
        let gl = &self.gl;
        let stage_name = if stage == glow::VERTEX_SHADER { "vertex" } else { "fragment" };
        unsafe {
            let shader = gl.create_shader(stage).map_err(RenderError::ResourceCreation)?;
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                tracing::error!(
                    "{stage_name} shader error in '{label}': {log}\n{}",
                    numbered_source(source)
                );
                gl.delete_shader(shader);
                return Err(RenderError::ShaderCompile {
                    program: label.to_string(),
                    stage: stage_name,
                    log,
                });
            }
            Ok(shader)
        }
    }
}

impl Gpu for GlowGpu {
    type Program = glow::Program;
    type VertexArray = glow::VertexArray;
    type Buffer = glow::Buffer;
    type Texture = glow::Texture;
    type Renderbuffer = glow::Renderbuffer;
    type Framebuffer = glow::Framebuffer;

    fn create_program(&self, label: &str, vertex: &str, fragment: &str) -> Result<glow::Program, RenderError> {
        let gl = &self.gl;
        let vert = self.compile_stage(label, glow::VERTEX_SHADER, vertex)?;
        let frag = match self.compile_stage(label, glow::FRAGMENT_SHADER, fragment) {
            Ok(frag) => frag,
            Err(e) => {
                unsafe { gl.delete_shader(vert) };
                return Err(e);
            }
        };

        unsafe {
            let program = match gl.create_program() {
                Ok(p) => p,
                Err(e) => {
                    gl.delete_shader(vert);
                    gl.delete_shader(frag);
                    return Err(RenderError::ResourceCreation(e));
                }
            };
            gl.attach_shader(program, vert);
            gl.attach_shader(program, frag);
            gl.link_program(program);
            let linked = gl.get_program_link_status(program);

            gl.detach_shader(program, vert);
            gl.detach_shader(program, frag);
            gl.delete_shader(vert);
            gl.delete_shader(frag);

            if !linked {
                let log = gl.get_program_info_log(program);
                tracing::error!("Program link error in '{label}': {log}");
                gl.delete_program(program);
                return Err(RenderError::ProgramLink {
                    program: label.to_string(),
                    log,
                });
            }

            self.count(|c| c.programs += 1);
            tracing::debug!("compiled '{label}' program");
            Ok(program)
        }
    }

    fn delete_program(&self, program: glow::Program) {
        unsafe { self.gl.delete_program(program) };
        self.count(|c| c.programs = c.programs.saturating_sub(1));
    }

    fn use_program(&self, program: Option<glow::Program>) {
        unsafe { self.gl.use_program(program) };
    }

    fn set_uniform_mat4(&self, program: glow::Program, name: &str, m: &Mat4) {
        unsafe {
            let loc = self.gl.get_uniform_location(program, name);
            self.gl.uniform_matrix_4_f32_slice(loc.as_ref(), false, &m.to_cols_array());
        }
    }

    fn set_uniform_mat3(&self, program: glow::Program, name: &str, m: &Mat3) {
        unsafe {
            let loc = self.gl.get_uniform_location(program, name);
            self.gl.uniform_matrix_3_f32_slice(loc.as_ref(), false, &m.to_cols_array());
        }
    }

    fn set_uniform_vec2(&self, program: glow::Program, name: &str, v: [f32; 2]) {
        unsafe {
            let loc = self.gl.get_uniform_location(program, name);
            self.gl.uniform_2_f32(loc.as_ref(), v[0], v[1]);
        }
    }

    fn set_uniform_vec3(&self, program: glow::Program, name: &str, v: Vec3) {
        unsafe {
            let loc = self.gl.get_uniform_location(program, name);
            self.gl.uniform_3_f32(loc.as_ref(), v.x, v.y, v.z);
        }
    }

    fn set_uniform_f32(&self, program: glow::Program, name: &str, v: f32) {
        unsafe {
            let loc = self.gl.get_uniform_location(program, name);
            self.gl.uniform_1_f32(loc.as_ref(), v);
        }
    }

    fn set_uniform_i32(&self, program: glow::Program, name: &str, v: i32) {
        unsafe {
            let loc = self.gl.get_uniform_location(program, name);
            self.gl.uniform_1_i32(loc.as_ref(), v);
        }
    }

    fn create_vertex_buffer(
        &self,
        layout: VertexLayout,
    ) -> Result<(glow::VertexArray, glow::Buffer), RenderError> {
        let gl = &self.gl;
        unsafe {
            let vao = gl.create_vertex_array().map_err(RenderError::ResourceCreation)?;
            let vbo = match gl.create_buffer() {
                Ok(b) => b,
                Err(e) => {
                    gl.delete_vertex_array(vao);
                    return Err(RenderError::ResourceCreation(e));
                }
            };

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            let stride = layout.stride_bytes();
            let mut offset = 0;
            for &(location, size) in layout.attributes {
                gl.enable_vertex_attrib_array(location);
                gl.vertex_attrib_pointer_f32(location, size, glow::FLOAT, false, stride, offset);
                offset += size * 4;
            }
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            self.count(|c| {
                c.vertex_arrays += 1;
                c.buffers += 1;
            });
            Ok((vao, vbo))
        }
    }

    fn write_vertex_buffer(&self, buffer: glow::Buffer, data: &[f32]) {
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl
                .buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck_cast_slice(data), glow::DYNAMIC_DRAW);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn delete_vertex_buffer(&self, vao: glow::VertexArray, buffer: glow::Buffer) {
        unsafe {
            self.gl.delete_vertex_array(vao);
            self.gl.delete_buffer(buffer);
        }
        self.count(|c| {
            c.vertex_arrays = c.vertex_arrays.saturating_sub(1);
            c.buffers = c.buffers.saturating_sub(1);
        });
    }

    fn draw_arrays(&self, vao: glow::VertexArray, mode: DrawMode, count: usize) {
        if count == 0 {
            return;
        }
        let mode = match mode {
            DrawMode::Triangles => glow::TRIANGLES,
            DrawMode::Lines => glow::LINES,
            DrawMode::Points => glow::POINTS,
        };
        unsafe {
            self.gl.bind_vertex_array(Some(vao));
            self.gl.draw_arrays(mode, 0, count as i32);
            self.gl.bind_vertex_array(None);
        }
    }

    fn set_capability(&self, cap: Capability, enabled: bool) {
        let gl = &self.gl;
        let cap_gl = capability_enum(cap);
        unsafe {
            if enabled {
                gl.enable(cap_gl);
                match cap {
                    Capability::DepthTest => gl.depth_func(glow::LEQUAL),
                    Capability::CullFace => gl.cull_face(glow::BACK),
                    _ => {}
                }
            } else {
                gl.disable(cap_gl);
            }
        }
    }

    fn is_enabled(&self, cap: Capability) -> bool {
        unsafe { self.gl.is_enabled(capability_enum(cap)) }
    }

    fn set_line_width(&self, width: f32) {
        unsafe { self.gl.line_width(width) };
    }

    fn set_viewport(&self, r: ViewportRect) {
        unsafe { self.gl.viewport(r.x, r.y, r.width, r.height) };
    }

    fn set_scissor(&self, r: ViewportRect) {
        unsafe { self.gl.scissor(r.x, r.y, r.width, r.height) };
    }

    fn clear(&self, color: [f32; 4]) {
        unsafe {
            self.gl.depth_mask(true);
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn create_color_texture(&self, width: u32, height: u32) -> Result<glow::Texture, RenderError> {
        let gl = &self.gl;
        unsafe {
            let tex = gl.create_texture().map_err(RenderError::ResourceCreation)?;
            gl.bind_texture(glow::TEXTURE_2D, Some(tex));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(None),
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.bind_texture(glow::TEXTURE_2D, None);
            self.count(|c| c.textures += 1);
            Ok(tex)
        }
    }

    fn delete_texture(&self, texture: glow::Texture) {
        unsafe { self.gl.delete_texture(texture) };
        self.count(|c| c.textures = c.textures.saturating_sub(1));
    }

    fn create_depth_buffer(&self, width: u32, height: u32) -> Result<glow::Renderbuffer, RenderError> {
        let gl = &self.gl;
        unsafe {
            let rb = gl.create_renderbuffer().map_err(RenderError::ResourceCreation)?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(rb));
            gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH_COMPONENT24, width as i32, height as i32);
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);
            self.count(|c| c.renderbuffers += 1);
            Ok(rb)
        }
    }

    fn delete_depth_buffer(&self, rb: glow::Renderbuffer) {
        unsafe { self.gl.delete_renderbuffer(rb) };
        self.count(|c| c.renderbuffers = c.renderbuffers.saturating_sub(1));
    }

    fn create_framebuffer(
        &self,
        color: glow::Texture,
        depth: glow::Renderbuffer,
    ) -> Result<glow::Framebuffer, RenderError> {
        let gl = &self.gl;
        unsafe {
            let fb = gl.create_framebuffer().map_err(RenderError::ResourceCreation)?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fb));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(color),
                0,
            );
            gl.framebuffer_renderbuffer(glow::FRAMEBUFFER, glow::DEPTH_ATTACHMENT, glow::RENDERBUFFER, Some(depth));
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_framebuffer(fb);
                return Err(RenderError::IncompleteFramebuffer(status));
            }
            self.count(|c| c.framebuffers += 1);
            Ok(fb)
        }
    }

    fn delete_framebuffer(&self, fb: glow::Framebuffer) {
        unsafe { self.gl.delete_framebuffer(fb) };
        self.count(|c| c.framebuffers = c.framebuffers.saturating_sub(1));
    }

    fn bind_framebuffer(&self, fb: Option<glow::Framebuffer>) {
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, fb) };
    }

    fn bind_texture(&self, unit: u32, texture: Option<glow::Texture>) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, texture);
        }
    }

    fn read_pixel(&self, x: i32, y: i32) -> [u8; 4] {
        let mut pixel = [0u8; 4];
        unsafe {
            self.gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
            self.gl.read_pixels(
                x,
                y,
                1,
                1,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(Some(&mut pixel[..])),
            );
        }
        pixel
    }

    fn resource_counts(&self) -> ResourceCounts {
        self.counts.get()
    }
}

fn capability_enum(cap: Capability) -> u32 {
    match cap {
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::CullFace => glow::CULL_FACE,
        Capability::ScissorTest => glow::SCISSOR_TEST,
        Capability::ProgramPointSize => glow::PROGRAM_POINT_SIZE,
        Capability::Blend => glow::BLEND,
    }
}

/// Shader source with line numbers, for compile diagnostics.
pub fn numbered_source(source: &str) -> String {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{:>4} | {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Byte cast helper ─────────────────────────────────────────

fn bytemuck_cast_slice<T: Copy>(slice: &[T]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, std::mem::size_of_val(slice)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_strides() {
        assert_eq!(VertexLayout::FILL.stride_bytes(), 24);
        assert_eq!(VertexLayout::LINE.stride_bytes(), 28);
        assert_eq!(VertexLayout::QUAD.floats_per_vertex(), 4);
    }

    #[test]
    fn test_numbered_source() {
        let s = numbered_source("a\nb");
        assert_eq!(s, "   1 | a\n   2 | b");
    }

    #[test]
    fn test_viewport_aspect() {
        assert_eq!(ViewportRect::new(0, 0, 200, 100).aspect(), 2.0);
        assert_eq!(ViewportRect::default().aspect(), 1.0);
        assert!(ViewportRect::default().is_empty());
    }
}
