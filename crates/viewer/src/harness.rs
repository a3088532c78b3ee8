//! Headless test harness.
//!
//! [`HeadlessGpu`] implements [`Gpu`] without a GL context: it tracks live
//! objects, the clear color of each framebuffer and the flat color of the last
//! triangle draw, and answers pixel reads from those. [`TestHarness`] wires a
//! scene, settings and a [`RenderEngine`] over it.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use glam::{Mat3, Mat4, Vec3};
use mesh_model::obj::{self, ObjError};
use mesh_model::MeshId;

use crate::state::scene::Scene;
use crate::state::settings::ViewerSettings;
use crate::viewport::error::RenderError;
use crate::viewport::gl_renderer::{RenderEngine, RenderParams};
use crate::viewport::gpu::{Capability, DrawMode, Gpu, ResourceCounts, VertexLayout, ViewportRect};
use crate::viewport::picking::quantize;

/// Opaque object name handed out by [`HeadlessGpu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u32);

/// Calls worth asserting on, in issue order. `target` is the bound
/// framebuffer (`None` = window).
#[derive(Debug, Clone, PartialEq)]
pub enum GpuEvent {
    Clear {
        target: Option<Handle>,
        color: [f32; 4],
    },
    /// `scissor` is `None` while the scissor test is off.
    Draw {
        target: Option<Handle>,
        program: String,
        mode: DrawMode,
        count: usize,
        viewport: ViewportRect,
        scissor: Option<ViewportRect>,
        depth_test: bool,
        culling: bool,
    },
    ReadPixel {
        target: Option<Handle>,
        x: i32,
        y: i32,
    },
}

#[derive(Debug, Clone, Copy, Default)]
struct Surface {
    clear: [u8; 4],
    fill: Option<[u8; 4]>,
}

#[derive(Default)]
struct HeadlessState {
    next_handle: u32,
    programs: HashMap<Handle, String>,
    vertex_arrays: HashSet<Handle>,
    buffers: HashMap<Handle, usize>,
    textures: HashMap<Handle, [u32; 2]>,
    renderbuffers: HashSet<Handle>,
    /// framebuffer -> its color texture
    framebuffers: HashMap<Handle, Handle>,
    current_program: Option<Handle>,
    uniforms: HashMap<(Handle, String), Vec<f32>>,
    bound_framebuffer: Option<Handle>,
    bound_texture: Option<Handle>,
    capabilities: HashSet<Capability>,
    viewport: ViewportRect,
    scissor: ViewportRect,
    surfaces: HashMap<Option<Handle>, Surface>,
    covered: HashSet<(i32, i32)>,
    cover_all: bool,
    events: Vec<GpuEvent>,
    fail_framebuffers: bool,
    fail_program: Option<String>,
}

impl HeadlessState {
    fn handle(&mut self) -> Handle {
        self.next_handle += 1;
        Handle(self.next_handle)
    }

    fn uniform(&mut self, program: Handle, name: &str, values: &[f32]) {
        self.uniforms.insert((program, name.to_string()), values.to_vec());
    }

    fn uniform_rgb(&self, program: Handle, name: &str) -> Option<[u8; 4]> {
        let v = self.uniforms.get(&(program, name.to_string()))?;
        (v.len() >= 3).then(|| [quantize(v[0]), quantize(v[1]), quantize(v[2]), 255])
    }
}

/// In-memory stand-in for a GL context.
#[derive(Default)]
pub struct HeadlessGpu {
    state: RefCell<HeadlessState>,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pixels (framebuffer coordinates, bottom-left origin) that triangle draws cover.
    pub fn cover_pixel(&self, x: i32, y: i32) {
        self.state.borrow_mut().covered.insert((x, y));
    }

    /// Make every triangle draw cover the whole target.
    pub fn cover_everything(&self, all: bool) {
        self.state.borrow_mut().cover_all = all;
    }

    /// Make the next framebuffer creations report an incomplete framebuffer.
    pub fn fail_framebuffers(&self, fail: bool) {
        self.state.borrow_mut().fail_framebuffers = fail;
    }

    /// Make linking the program with this label fail.
    pub fn fail_program(&self, label: Option<&str>) {
        self.state.borrow_mut().fail_program = label.map(str::to_string);
    }

    pub fn events(&self) -> Vec<GpuEvent> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Programs used by draw calls since the last [`clear_events`](Self::clear_events).
    pub fn draw_programs(&self) -> Vec<String> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                GpuEvent::Draw { program, .. } => Some(program.clone()),
                _ => None,
            })
            .collect()
    }

    /// Draw calls with a given program and mode.
    pub fn draw_count(&self, program: &str, mode: DrawMode) -> usize {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|e| matches!(e, GpuEvent::Draw { program: p, mode: m, .. } if p == program && *m == mode))
            .count()
    }

    /// Color a window pixel would read as right now.
    pub fn window_pixel(&self, x: i32, y: i32) -> [u8; 4] {
        let state = self.state.borrow();
        let surface = state.surfaces.get(&None).copied().unwrap_or_default();
        sample(&state, surface, x, y)
    }

    pub fn window_clear_color(&self) -> [u8; 4] {
        self.state.borrow().surfaces.get(&None).map(|s| s.clear).unwrap_or_default()
    }

    pub fn is_bound_to_window(&self) -> bool {
        self.state.borrow().bound_framebuffer.is_none()
    }

    pub fn last_viewport(&self) -> ViewportRect {
        self.state.borrow().viewport
    }
}

fn sample(state: &HeadlessState, surface: Surface, x: i32, y: i32) -> [u8; 4] {
    match surface.fill {
        Some(fill) if state.cover_all || state.covered.contains(&(x, y)) => fill,
        _ => surface.clear,
    }
}

fn stage_ok(source: &str) -> bool {
    source.trim_start().starts_with("#version")
}

impl Gpu for HeadlessGpu {
    type Program = Handle;
    type VertexArray = Handle;
    type Buffer = Handle;
    type Texture = Handle;
    type Renderbuffer = Handle;
    type Framebuffer = Handle;

    fn create_program(&self, label: &str, vertex: &str, fragment: &str) -> Result<Handle, RenderError> {
        let mut s = self.state.borrow_mut();
        if !stage_ok(vertex) || !stage_ok(fragment) {
            return Err(RenderError::ShaderCompile {
                program: label.to_string(),
                stage: if stage_ok(vertex) { "fragment" } else { "vertex" },
                log: "missing #version".to_string(),
            });
        }
        if s.fail_program.as_deref() == Some(label) {
            return Err(RenderError::ProgramLink {
                program: label.to_string(),
                log: "link failure requested by test".to_string(),
            });
        }
        let h = s.handle();
        s.programs.insert(h, label.to_string());
        Ok(h)
    }

    fn delete_program(&self, program: Handle) {
        let mut s = self.state.borrow_mut();
        s.programs.remove(&program);
        s.uniforms.retain(|(p, _), _| *p != program);
    }

    fn use_program(&self, program: Option<Handle>) {
        self.state.borrow_mut().current_program = program;
    }

    fn set_uniform_mat4(&self, program: Handle, name: &str, m: &Mat4) {
        self.state.borrow_mut().uniform(program, name, &m.to_cols_array());
    }

    fn set_uniform_mat3(&self, program: Handle, name: &str, m: &Mat3) {
        self.state.borrow_mut().uniform(program, name, &m.to_cols_array());
    }

    fn set_uniform_vec2(&self, program: Handle, name: &str, v: [f32; 2]) {
        self.state.borrow_mut().uniform(program, name, &v);
    }

    fn set_uniform_vec3(&self, program: Handle, name: &str, v: Vec3) {
        self.state.borrow_mut().uniform(program, name, &v.to_array());
    }

    fn set_uniform_f32(&self, program: Handle, name: &str, v: f32) {
        self.state.borrow_mut().uniform(program, name, &[v]);
    }

    fn set_uniform_i32(&self, program: Handle, name: &str, v: i32) {
        self.state.borrow_mut().uniform(program, name, &[v as f32]);
    }

    fn create_vertex_buffer(&self, _layout: VertexLayout) -> Result<(Handle, Handle), RenderError> {
        let mut s = self.state.borrow_mut();
        let vao = s.handle();
        let vbo = s.handle();
        s.vertex_arrays.insert(vao);
        s.buffers.insert(vbo, 0);
        Ok((vao, vbo))
    }

    fn write_vertex_buffer(&self, buffer: Handle, data: &[f32]) {
        if let Some(len) = self.state.borrow_mut().buffers.get_mut(&buffer) {
            *len = data.len();
        }
    }

    fn delete_vertex_buffer(&self, vao: Handle, buffer: Handle) {
        let mut s = self.state.borrow_mut();
        s.vertex_arrays.remove(&vao);
        s.buffers.remove(&buffer);
    }

    fn draw_arrays(&self, vao: Handle, mode: DrawMode, count: usize) {
        let mut s = self.state.borrow_mut();
        if count == 0 || !s.vertex_arrays.contains(&vao) {
            return;
        }
        let Some(program) = s.current_program else {
            return;
        };
        let label = s.programs.get(&program).cloned().unwrap_or_default();
        let target = s.bound_framebuffer;

        if mode == DrawMode::Triangles {
            match label.as_str() {
                "fill" => {
                    if let Some(color) = s.uniform_rgb(program, "u_color") {
                        s.surfaces.entry(target).or_default().fill = Some(color);
                    }
                }
                "pick" => {
                    if let Some(color) = s.uniform_rgb(program, "u_pick_color") {
                        s.surfaces.entry(target).or_default().fill = Some(color);
                    }
                }
                "post" => {
                    // blur of the offscreen image lands in the bound target
                    let source = s
                        .bound_texture
                        .and_then(|tex| s.framebuffers.iter().find(|(_, c)| **c == tex).map(|(fb, _)| *fb));
                    if let Some(fb) = source {
                        let copied = s.surfaces.get(&Some(fb)).copied().unwrap_or_default();
                        s.surfaces.insert(target, copied);
                    }
                }
                _ => {}
            }
        }

        let scissor = s.capabilities.contains(&Capability::ScissorTest).then_some(s.scissor);
        let event = GpuEvent::Draw {
            target,
            program: label,
            mode,
            count,
            viewport: s.viewport,
            scissor,
            depth_test: s.capabilities.contains(&Capability::DepthTest),
            culling: s.capabilities.contains(&Capability::CullFace),
        };
        s.events.push(event);
    }

    fn set_capability(&self, cap: Capability, enabled: bool) {
        let mut s = self.state.borrow_mut();
        if enabled {
            s.capabilities.insert(cap);
        } else {
            s.capabilities.remove(&cap);
        }
    }

    fn is_enabled(&self, cap: Capability) -> bool {
        self.state.borrow().capabilities.contains(&cap)
    }

    fn set_line_width(&self, _width: f32) {}

    fn set_viewport(&self, rect: ViewportRect) {
        self.state.borrow_mut().viewport = rect;
    }

    fn set_scissor(&self, rect: ViewportRect) {
        self.state.borrow_mut().scissor = rect;
    }

    fn clear(&self, color: [f32; 4]) {
        let mut s = self.state.borrow_mut();
        let target = s.bound_framebuffer;
        s.surfaces.insert(
            target,
            Surface {
                clear: color.map(quantize),
                fill: None,
            },
        );
        s.events.push(GpuEvent::Clear { target, color });
    }

    fn create_color_texture(&self, width: u32, height: u32) -> Result<Handle, RenderError> {
        let mut s = self.state.borrow_mut();
        let h = s.handle();
        s.textures.insert(h, [width, height]);
        Ok(h)
    }

    fn delete_texture(&self, texture: Handle) {
        self.state.borrow_mut().textures.remove(&texture);
    }

    fn create_depth_buffer(&self, _width: u32, _height: u32) -> Result<Handle, RenderError> {
        let mut s = self.state.borrow_mut();
        let h = s.handle();
        s.renderbuffers.insert(h);
        Ok(h)
    }

    fn delete_depth_buffer(&self, rb: Handle) {
        self.state.borrow_mut().renderbuffers.remove(&rb);
    }

    fn create_framebuffer(&self, color: Handle, _depth: Handle) -> Result<Handle, RenderError> {
        let mut s = self.state.borrow_mut();
        if s.fail_framebuffers {
            // GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT
            return Err(RenderError::IncompleteFramebuffer(0x8CD6));
        }
        let h = s.handle();
        s.framebuffers.insert(h, color);
        Ok(h)
    }

    fn delete_framebuffer(&self, fb: Handle) {
        let mut s = self.state.borrow_mut();
        s.framebuffers.remove(&fb);
        s.surfaces.remove(&Some(fb));
    }

    fn bind_framebuffer(&self, fb: Option<Handle>) {
        self.state.borrow_mut().bound_framebuffer = fb;
    }

    fn bind_texture(&self, _unit: u32, texture: Option<Handle>) {
        self.state.borrow_mut().bound_texture = texture;
    }

    fn read_pixel(&self, x: i32, y: i32) -> [u8; 4] {
        let mut s = self.state.borrow_mut();
        let target = s.bound_framebuffer;
        s.events.push(GpuEvent::ReadPixel { target, x, y });
        let surface = s.surfaces.get(&target).copied().unwrap_or_default();
        sample(&s, surface, x, y)
    }

    fn resource_counts(&self) -> ResourceCounts {
        let s = self.state.borrow();
        ResourceCounts {
            programs: s.programs.len(),
            vertex_arrays: s.vertex_arrays.len(),
            buffers: s.buffers.len(),
            textures: s.textures.len(),
            renderbuffers: s.renderbuffers.len(),
            framebuffers: s.framebuffers.len(),
        }
    }
}

// ── Viewer harness ───────────────────────────────────────────

/// Scene + settings + engine over a [`HeadlessGpu`], ready to draw.
pub struct TestHarness {
    pub scene: Scene,
    pub settings: ViewerSettings,
    pub engine: RenderEngine<HeadlessGpu>,
}

impl TestHarness {
    /// Initialized and compiled engine drawing into a `width` x `height` window.
    pub fn new(width: u32, height: u32) -> Self {
        let mut engine = RenderEngine::new();
        let settings = ViewerSettings::default();
        engine.initialize_render_target(HeadlessGpu::new(), [width, height], settings.antialiasing);
        if let Err(e) = engine.compile_programs_once() {
            panic!("headless programs failed to compile: {e}");
        }
        Self {
            scene: Scene::default(),
            settings,
            engine,
        }
    }

    pub fn gpu(&self) -> &HeadlessGpu {
        match self.engine.gpu() {
            Some(gpu) => gpu,
            None => panic!("harness engine has no GPU"),
        }
    }

    /// Parse OBJ (+ optional MTL) text and import it the way the viewer does.
    pub fn load_obj(&mut self, obj_text: &str, mtl_text: Option<&str>) -> Result<Vec<MeshId>, ObjError> {
        let data = obj::parse_obj(obj_text)?;
        let materials = match mtl_text {
            Some(text) => obj::parse_mtl(text)?,
            None => HashMap::new(),
        };
        let records = obj::assign_materials(&data, &materials);
        let normalization = obj::normalize(&data);
        self.scene.clear();
        Ok(self.scene.import(records, Some(normalization), [0.0, 0.0, -3.0]))
    }

    pub fn params(&self) -> RenderParams {
        RenderParams::from_settings(&self.settings, self.scene.selected())
    }

    pub fn redraw(&mut self) {
        let params = self.params();
        self.engine.redraw(&self.scene.meshes, &params);
    }

    /// Pick at a pixel and select the result.
    pub fn click(&mut self, x: f32, y: f32) -> Option<MeshId> {
        let params = self.params();
        let picked = self.engine.pick_at(x, y, &self.scene.meshes, &params);
        self.scene.select(picked);
        picked
    }
}
