use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use mesh_model::{Mesh, MeshId};

use super::bounds::{self, Aabb, DISPLAY_EPSILON};
use super::camera::Camera;
use super::error::RenderError;
use super::gpu::{Capability, DrawMode, Gpu, ResourceCounts, VertexLayout, ViewportRect};
use super::mesh::{self, Shading};
use super::post::PostProcess;
use super::rotation::GlobalRotation;
use super::shaders::ProgramKind;
use super::transform::{normal_matrix, FrameTransforms};
use crate::state::settings::{FeatureFlags, LightSettings, OverlayStyle, ViewerSettings};

// ── Render parameters ────────────────────────────────────────

/// Per-frame inputs the engine does not own
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    /// Background color RGBA
    pub background: [f32; 4],
    /// Mesh that gets the local bounding box
    pub selected: Option<MeshId>,
    pub features: FeatureFlags,
    pub style: OverlayStyle,
    pub light: LightSettings,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self::from_settings(&ViewerSettings::default(), None)
    }
}

impl RenderParams {
    pub fn from_settings(settings: &ViewerSettings, selected: Option<MeshId>) -> Self {
        Self {
            background: settings.background,
            selected,
            features: settings.features,
            style: settings.style,
            light: settings.light,
        }
    }
}

// ── GPU resource set ─────────────────────────────────────────

/// What a cached vertex buffer holds for a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Fill,
    Wireframe,
    Points,
    Normals,
    LocalBox,
    GlobalBox,
}

type GeometryKey = (MeshId, GeometryKind);

struct GpuGeometry<G: Gpu> {
    vao: G::VertexArray,
    vbo: G::Buffer,
    vertex_count: usize,
    touched: bool,
}

struct Programs<G: Gpu> {
    fill: G::Program,
    pick: G::Program,
    overlay: G::Program,
}

/// Everything created on one context generation.
pub(super) struct GpuResources<G: Gpu> {
    generation: u64,
    programs: Programs<G>,
    geometry: HashMap<GeometryKey, GpuGeometry<G>>,
    post: Option<PostProcess<G>>,
}

impl<G: Gpu> GpuResources<G> {
    fn compile(gpu: &G, generation: u64) -> Result<Self, RenderError> {
        let mut created: Vec<G::Program> = Vec::with_capacity(3);
        for kind in [ProgramKind::Fill, ProgramKind::Pick, ProgramKind::Overlay] {
            let (vs, fs) = kind.sources();
            match gpu.create_program(kind.label(), vs, fs) {
                Ok(p) => created.push(p),
                Err(e) => {
                    for p in created {
                        gpu.delete_program(p);
                    }
                    return Err(e);
                }
            }
        }
        let programs = Programs {
            fill: created[0],
            pick: created[1],
            overlay: created[2],
        };
        Ok(Self {
            generation,
            programs,
            geometry: HashMap::new(),
            post: None,
        })
    }

    /// Refill (creating if needed) the buffer for `key` and mark it used this frame.
    pub(super) fn upload(
        &mut self,
        gpu: &G,
        key: GeometryKey,
        layout: VertexLayout,
        data: &[f32],
    ) -> Option<(G::VertexArray, usize)> {
        if data.is_empty() {
            return None;
        }
        if !self.geometry.contains_key(&key) {
            match gpu.create_vertex_buffer(layout) {
                Ok((vao, vbo)) => {
                    self.geometry.insert(
                        key,
                        GpuGeometry {
                            vao,
                            vbo,
                            vertex_count: 0,
                            touched: false,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!("skipping {:?} of mesh {}: {e}", key.1, key.0);
                    return None;
                }
            }
        }
        let entry = self.geometry.get_mut(&key)?;
        gpu.write_vertex_buffer(entry.vbo, data);
        entry.vertex_count = data.len() / layout.floats_per_vertex();
        entry.touched = true;
        Some((entry.vao, entry.vertex_count))
    }

    /// Delete buffers no pass used since the last sweep.
    fn sweep_geometry(&mut self, gpu: &G) {
        self.geometry.retain(|key, entry| {
            if entry.touched {
                entry.touched = false;
                true
            } else {
                tracing::trace!("releasing {:?} of mesh {}", key.1, key.0);
                gpu.delete_vertex_buffer(entry.vao, entry.vbo);
                false
            }
        });
    }

    fn destroy(mut self, gpu: &G) {
        for (_, entry) in self.geometry.drain() {
            gpu.delete_vertex_buffer(entry.vao, entry.vbo);
        }
        if let Some(post) = self.post.take() {
            post.destroy(gpu);
        }
        gpu.delete_program(self.programs.fill);
        gpu.delete_program(self.programs.pick);
        gpu.delete_program(self.programs.overlay);
    }

    pub(super) fn pick_program(&self) -> G::Program {
        self.programs.pick
    }
}

/// Where the current pass draws: the window or the offscreen target.
#[derive(Debug, Clone, Copy)]
pub(super) struct FrameTarget {
    /// Drawing rectangle inside the bound framebuffer
    pub rect: ViewportRect,
    /// Rectangle of the window framebuffer the frame ends up in
    pub window: ViewportRect,
    pub offscreen: bool,
}

// ── Render engine ────────────────────────────────────────────

/// Owns GPU resources and the view state (camera, global rotation), and draws
/// caller-owned meshes.
///
/// Calls made before a context is installed or before
/// [`compile_programs_once`](Self::compile_programs_once) are no-ops that log once.
pub struct RenderEngine<G: Gpu> {
    pub(super) gpu: Option<G>,
    generation: u64,
    pub(super) resources: Option<GpuResources<G>>,
    programs_requested: bool,
    surface: [u32; 2],
    viewport: Option<ViewportRect>,
    antialias: bool,
    pub(super) depth_test: bool,
    pub(super) culling: bool,
    camera: Camera,
    rotation: GlobalRotation,
    not_ready_logged: bool,
}

impl<G: Gpu> Default for RenderEngine<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Gpu> RenderEngine<G> {
    pub fn new() -> Self {
        Self {
            gpu: None,
            generation: 0,
            resources: None,
            programs_requested: false,
            surface: [0, 0],
            viewport: None,
            antialias: false,
            depth_test: true,
            culling: false,
            camera: Camera::default(),
            rotation: GlobalRotation::new(),
            not_ready_logged: false,
        }
    }

    // ── Setup ────────────────────────────────────────────────

    /// Install a (possibly new) context. Resources from an earlier context are
    /// forgotten without touching it; programs are rebuilt on the next frame if
    /// they had been compiled before. Returns `false` for an empty surface.
    pub fn initialize_render_target(&mut self, gpu: G, surface: [u32; 2], antialias: bool) -> bool {
        if surface[0] == 0 || surface[1] == 0 {
            tracing::warn!("refusing render target of size {}x{}", surface[0], surface[1]);
            return false;
        }
        if self.resources.take().is_some() {
            tracing::debug!("discarding resources of context generation {}", self.generation);
        }
        self.generation += 1;
        self.gpu = Some(gpu);
        self.surface = surface;
        self.antialias = antialias;
        self.not_ready_logged = false;
        tracing::info!(
            "render target {}x{} (antialias: {antialias}, generation {})",
            surface[0],
            surface[1],
            self.generation
        );
        true
    }

    /// Compile the fill, pick and overlay programs for the current context.
    /// Calling it again on the same context does nothing.
    pub fn compile_programs_once(&mut self) -> Result<(), RenderError> {
        let gpu = self.gpu.as_ref().ok_or(RenderError::ContextUnavailable)?;
        if self.resources.as_ref().is_some_and(|r| r.generation == self.generation) {
            return Ok(());
        }
        let resources = GpuResources::compile(gpu, self.generation)?;
        self.resources = Some(resources);
        self.programs_requested = true;
        tracing::debug!("programs compiled for generation {}", self.generation);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.gpu.is_some() && self.resources.as_ref().is_some_and(|r| r.generation == self.generation)
    }

    /// Make sure resources exist for the current context, recompiling lazily
    /// after a context change. Logs once per misordered streak.
    pub(super) fn ensure_ready(&mut self) -> bool {
        if self.gpu.is_none() {
            self.log_not_ready("no render target initialized");
            return false;
        }
        if self.is_ready() {
            self.not_ready_logged = false;
            return true;
        }
        // stale set from an older context: its handles are dead
        self.resources = None;
        if !self.programs_requested {
            self.log_not_ready("programs not compiled yet");
            return false;
        }
        match self.compile_programs_once() {
            Ok(()) => {
                tracing::debug!("recompiled programs after context change");
                true
            }
            Err(e) => {
                if !self.not_ready_logged {
                    tracing::error!("recompiling programs failed: {e}");
                    self.not_ready_logged = true;
                }
                false
            }
        }
    }

    fn log_not_ready(&mut self, why: &str) {
        if !self.not_ready_logged {
            tracing::warn!("draw skipped: {why}");
            self.not_ready_logged = true;
        }
    }

    /// Delete every resource of the current context.
    pub fn destroy(&mut self) {
        if let (Some(gpu), Some(resources)) = (self.gpu.as_ref(), self.resources.take()) {
            if resources.generation == self.generation {
                resources.destroy(gpu);
            }
        }
        self.programs_requested = false;
    }

    pub fn gpu(&self) -> Option<&G> {
        self.gpu.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn resource_counts(&self) -> ResourceCounts {
        self.gpu.as_ref().map(|g| g.resource_counts()).unwrap_or_default()
    }

    /// Cached vertex buffers, for diagnostics.
    pub fn geometry_entries(&self) -> usize {
        self.resources.as_ref().map_or(0, |r| r.geometry.len())
    }

    // ── Surface and state ────────────────────────────────────

    pub fn resize(&mut self, surface: [u32; 2]) {
        self.surface = surface;
    }

    /// Draw into a sub-rectangle of the surface (bottom-left origin).
    pub fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.viewport = Some(ViewportRect::new(x, y, width, height));
    }

    pub fn viewport(&self) -> ViewportRect {
        self.viewport.unwrap_or_else(|| ViewportRect::from_size(self.surface))
    }

    /// Turning it off releases the offscreen target and post program right away;
    /// turning it on builds them on the next frame.
    pub fn set_antialiasing(&mut self, enabled: bool) {
        if !enabled {
            if let (Some(gpu), Some(res)) = (self.gpu.as_ref(), self.resources.as_mut()) {
                if let Some(post) = res.post.take() {
                    post.destroy(gpu);
                    tracing::debug!("post-process resources released");
                }
            }
        }
        self.antialias = enabled;
    }

    pub fn antialiasing(&self) -> bool {
        self.antialias
    }

    pub fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    pub fn set_culling(&mut self, enabled: bool) {
        self.culling = enabled;
    }

    // ── Camera and rotation ──────────────────────────────────

    pub fn set_camera(&mut self, position: Vec3, front: Vec3, up: Vec3) {
        self.camera.set(position, front, up);
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn rotation(&self) -> &GlobalRotation {
        &self.rotation
    }

    pub fn push_rotation(&mut self) {
        self.rotation.push_rotation();
    }

    pub fn apply_rotation_delta(&mut self, delta: Quat) {
        self.rotation.apply_delta(delta);
    }

    pub fn undo_rotation(&mut self) -> bool {
        self.rotation.undo()
    }

    pub fn reset_rotation(&mut self) {
        self.rotation.reset();
    }

    pub fn rotation_euler_degrees(&self) -> [f32; 3] {
        self.rotation.to_euler_degrees()
    }

    pub fn set_rotation_euler_degrees(&mut self, x: f32, y: f32, z: f32) {
        self.rotation.set_euler_degrees(x, y, z);
    }

    // ── Read-only queries ────────────────────────────────────

    pub fn compute_local_bounding_box(&self, mesh: &Mesh) -> Aabb {
        bounds::local_bounding_box(mesh)
    }

    pub fn compute_global_bounding_box(&self, meshes: &[Mesh]) -> Aabb {
        bounds::global_bounding_box(meshes)
    }

    /// Matrices for one frame; the rotation pivot is the global centroid now.
    pub fn frame_transforms(&self, meshes: &[Mesh]) -> FrameTransforms {
        let pivot = bounds::global_centroid(meshes);
        FrameTransforms::new(&self.camera, self.rotation.quaternion(), pivot, self.viewport().aspect())
    }

    // ── Frame ────────────────────────────────────────────────

    /// Clear, draw meshes, draw overlays, then blur into the window if
    /// antialiasing is on.
    pub fn redraw(&mut self, meshes: &[Mesh], params: &RenderParams) {
        if !self.ensure_ready() {
            return;
        }
        let frame = self.frame_transforms(meshes);
        let Some(target) = self.begin_target(params.background) else {
            return;
        };
        let (Some(gpu), Some(res)) = (self.gpu.as_ref(), self.resources.as_mut()) else {
            return;
        };

        tracing::trace!("redraw: {} meshes, offscreen {}", meshes.len(), target.offscreen);
        draw_meshes(gpu, res, meshes, params, &frame);
        draw_overlays(gpu, res, meshes, params, &frame);
        if target.offscreen {
            if let Some(post) = &res.post {
                post.draw(gpu, target.window);
            }
        }
        res.sweep_geometry(gpu);
        end_frame(gpu);
    }

    /// ClearTarget: bind the window or offscreen framebuffer, set viewport and
    /// scissor, apply depth/cull flags and clear to `clear`.
    pub(super) fn begin_target(&mut self, clear: [f32; 4]) -> Option<FrameTarget> {
        let window = self.viewport();
        if window.is_empty() {
            return None;
        }
        let gpu = self.gpu.as_ref()?;
        let res = self.resources.as_mut()?;

        let mut target = FrameTarget {
            rect: window,
            window,
            offscreen: false,
        };

        if self.antialias {
            if res.post.is_none() {
                match PostProcess::create(gpu) {
                    Ok(post) => res.post = Some(post),
                    Err(e) => tracing::warn!("antialiasing unavailable: {e}"),
                }
            }
            let size = [window.width as u32, window.height as u32];
            match res.post.as_mut().map(|p| p.ensure_target(gpu, size)) {
                Some(Ok(fb)) => {
                    gpu.bind_framebuffer(Some(fb));
                    target.rect = ViewportRect::new(0, 0, window.width, window.height);
                    target.offscreen = true;
                }
                Some(Err(e)) => {
                    tracing::warn!("offscreen target failed, falling back to direct rendering: {e}");
                }
                None => {}
            }
            if !target.offscreen {
                if let Some(post) = res.post.take() {
                    post.destroy(gpu);
                }
                self.antialias = false;
            }
        }
        if !target.offscreen {
            gpu.bind_framebuffer(None);
        }

        gpu.set_viewport(target.rect);
        gpu.set_scissor(target.rect);
        gpu.set_capability(Capability::ScissorTest, true);
        gpu.set_capability(Capability::Blend, false);
        gpu.clear(clear);
        gpu.set_capability(Capability::DepthTest, self.depth_test);
        gpu.set_capability(Capability::CullFace, self.culling);
        Some(target)
    }
}

// ── Passes ───────────────────────────────────────────────────

fn draw_meshes<G: Gpu>(
    gpu: &G,
    res: &mut GpuResources<G>,
    meshes: &[Mesh],
    params: &RenderParams,
    frame: &FrameTransforms,
) {
    if !params.features.fill {
        return;
    }
    let program = res.programs.fill;
    let light = &params.light;
    gpu.use_program(Some(program));
    gpu.set_uniform_vec3(program, "u_light_dir", Vec3::from(light.direction).normalize_or(Vec3::Z));
    gpu.set_uniform_vec3(program, "u_light_color", Vec3::from(light.color));
    gpu.set_uniform_vec3(program, "u_ambient", Vec3::from(light.ambient));

    let shading = if params.features.flat_shading {
        Shading::Flat
    } else {
        Shading::Smooth
    };

    for m in meshes.iter().filter(|m| !m.is_empty()) {
        let data = mesh::build_fill(m, shading);
        let Some((vao, count)) = res.upload(gpu, (m.id, GeometryKind::Fill), VertexLayout::FILL, &data.vertices)
        else {
            continue;
        };
        let world = frame.mesh_world(m);
        gpu.set_uniform_vec3(program, "u_color", Vec3::from(m.color));
        gpu.set_uniform_mat4(program, "u_mvp", &frame.mesh_mvp(m));
        gpu.set_uniform_mat4(program, "u_model", &world);
        gpu.set_uniform_mat3(program, "u_normal_matrix", &normal_matrix(&world));
        gpu.draw_arrays(vao, DrawMode::Triangles, count);
    }
}

fn draw_overlays<G: Gpu>(
    gpu: &G,
    res: &mut GpuResources<G>,
    meshes: &[Mesh],
    params: &RenderParams,
    frame: &FrameTransforms,
) {
    let features = &params.features;
    let style = &params.style;
    let program = res.programs.overlay;
    let scene_mvp = frame.scene_mvp();

    gpu.use_program(Some(program));
    gpu.set_line_width(style.line_width);
    gpu.set_uniform_f32(program, "u_point_size", 1.0);
    gpu.set_uniform_i32(program, "u_round_points", 0);

    let draw_lines = |res: &mut GpuResources<G>, key: GeometryKey, data: &mesh::LineMeshData, mvp: &Mat4| {
        if let Some((vao, count)) = res.upload(gpu, key, VertexLayout::LINE, &data.vertices) {
            gpu.set_uniform_mat4(program, "u_mvp", mvp);
            gpu.draw_arrays(vao, DrawMode::Lines, count);
        }
    };

    if features.wireframe {
        // pulled forward only when it sits on top of the fill
        let bias = if features.fill { style.wireframe_depth_bias } else { 0.0 };
        gpu.set_uniform_f32(program, "u_depth_bias", bias);
        for m in meshes.iter().filter(|m| !m.is_empty()) {
            let data = mesh::build_wireframe(m, style.wireframe_color);
            draw_lines(res, (m.id, GeometryKind::Wireframe), &data, &frame.mesh_mvp(m));
        }
    }
    gpu.set_uniform_f32(program, "u_depth_bias", 0.0);

    if features.normals {
        for m in meshes.iter().filter(|m| !m.is_empty()) {
            let data = mesh::build_normals(m, style.normal_color, style.normal_percent);
            draw_lines(res, (m.id, GeometryKind::Normals), &data, &scene_mvp);
        }
    }

    if features.local_bbox {
        let selected = params.selected.and_then(|id| meshes.iter().find(|m| m.id == id));
        if let Some(m) = selected.filter(|m| !m.is_empty()) {
            let aabb = bounds::transformed_bounding_box(m).expanded(DISPLAY_EPSILON);
            let data = mesh::box_lines(&aabb, style.local_bbox_color);
            draw_lines(res, (m.id, GeometryKind::LocalBox), &data, &scene_mvp);
        }
    }

    if features.global_bbox {
        let aabb = bounds::global_bounding_box(meshes).expanded(DISPLAY_EPSILON);
        let data = mesh::box_lines(&aabb, style.global_bbox_color);
        draw_lines(res, (0, GeometryKind::GlobalBox), &data, &scene_mvp);
    }

    if features.vertices {
        gpu.set_capability(Capability::ProgramPointSize, true);
        gpu.set_uniform_f32(program, "u_point_size", style.point_size.max(1.0));
        gpu.set_uniform_i32(program, "u_round_points", 1);
        for m in meshes.iter().filter(|m| !m.vertices.is_empty()) {
            let data = mesh::build_points(m, style.point_color);
            if let Some((vao, count)) = res.upload(gpu, (m.id, GeometryKind::Points), VertexLayout::LINE, &data.vertices)
            {
                gpu.set_uniform_mat4(program, "u_mvp", &frame.mesh_mvp(m));
                gpu.draw_arrays(vao, DrawMode::Points, count);
            }
        }
        gpu.set_capability(Capability::ProgramPointSize, false);
    }

    gpu.set_line_width(1.0);
}

/// Leave GL state the way the host expects it.
pub(super) fn end_frame<G: Gpu>(gpu: &G) {
    gpu.use_program(None);
    gpu.bind_framebuffer(None);
    gpu.set_capability(Capability::DepthTest, false);
    gpu.set_capability(Capability::CullFace, false);
    gpu.set_capability(Capability::ScissorTest, false);
}
