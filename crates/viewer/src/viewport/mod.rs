//! 3D viewport panel with OpenGL rendering

mod input;

pub use meshview_lib::viewport::{gl_renderer, gpu, rotation, transform};

use std::sync::{Arc, Mutex};

use egui::Ui;
use mesh_model::{Mesh, MeshId};

use crate::state::{Scene, ViewerSettings};
use gl_renderer::{RenderEngine, RenderParams};
use gpu::GlowGpu;
use input::DragState;

type SharedEngine = Arc<Mutex<RenderEngine<GlowGpu>>>;

/// Pick request handed to the paint callback and the answer it leaves behind.
#[derive(Debug, Default)]
struct PickSlot {
    /// Pixel inside the viewport, top-left origin
    request: Option<[f32; 2]>,
    result: Option<Option<MeshId>>,
}

/// Engine-side switches last pushed from settings.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AppliedFlags {
    antialiasing: bool,
    depth_test: bool,
    culling: bool,
}

impl AppliedFlags {
    fn from_settings(settings: &ViewerSettings) -> Self {
        Self {
            antialiasing: settings.antialiasing,
            depth_test: settings.depth_test,
            culling: settings.culling,
        }
    }
}

/// 3D viewport panel with OpenGL rendering
pub struct ViewportPanel {
    engine: Option<SharedEngine>,
    pick: Arc<Mutex<PickSlot>>,
    /// Snapshot of the scene meshes the paint callback draws
    meshes: Arc<Vec<Mesh>>,
    meshes_version: Option<u64>,
    applied: Option<AppliedFlags>,
    drag: DragState,
}

impl ViewportPanel {
    pub fn new() -> Self {
        Self {
            engine: None,
            pick: Arc::new(Mutex::new(PickSlot::default())),
            meshes: Arc::new(Vec::new()),
            meshes_version: None,
            applied: None,
            drag: DragState::default(),
        }
    }

    /// Create the engine on the host's GL context and compile its programs.
    pub fn init_gl(&mut self, gl: &Arc<glow::Context>, surface: [u32; 2], settings: &ViewerSettings) {
        let mut engine = RenderEngine::new();
        let surface = [surface[0].max(1), surface[1].max(1)];
        engine.initialize_render_target(GlowGpu::new(gl.clone()), surface, settings.antialiasing);
        engine.set_depth_test(settings.depth_test);
        engine.set_culling(settings.culling);
        if let Err(e) = engine.compile_programs_once() {
            tracing::error!("Failed to compile viewport programs: {e}");
        }
        self.applied = Some(AppliedFlags::from_settings(settings));
        self.engine = Some(Arc::new(Mutex::new(engine)));
    }

    /// Run `f` on the engine if there is one.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut RenderEngine<GlowGpu>) -> R) -> Option<R> {
        let engine = self.engine.as_ref()?;
        let mut guard = engine.lock().ok()?;
        Some(f(&mut guard))
    }

    pub fn undo_rotation(&self) -> bool {
        self.with_engine(|e| e.undo_rotation()).unwrap_or(false)
    }

    pub fn reset_rotation(&self) {
        self.with_engine(|e| e.reset_rotation());
    }

    pub fn reset_camera(&self) {
        self.with_engine(|e| *e.camera_mut() = Default::default());
    }

    /// Release every GPU object. Called on exit while the context is alive.
    pub fn destroy(&mut self) {
        self.with_engine(|e| e.destroy());
        self.engine = None;
    }

    pub fn show(&mut self, ui: &mut Ui, scene: &mut Scene, settings: &mut ViewerSettings) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());

        self.collect_pick(ui, scene);

        if let Some(engine) = self.engine.clone() {
            if let Ok(mut engine) = engine.lock() {
                self.sync_flags(&mut engine, settings);
                let ppp = ui.ctx().pixels_per_point();
                let click = self.drag.handle(&mut engine, &response, rect, ppp, scene, settings);
                if let Some(pixel) = click {
                    if let Ok(mut slot) = self.pick.lock() {
                        slot.request = Some(pixel);
                    }
                    ui.ctx().request_repaint();
                }
            }
        }

        if !ui.is_rect_visible(rect) {
            return;
        }

        if self.meshes_version != Some(scene.version()) {
            self.meshes = Arc::new(scene.meshes.clone());
            self.meshes_version = Some(scene.version());
        }

        self.render_gl(ui, rect, scene, settings);
        self.draw_info(ui, rect);
    }

    /// Apply a pick answered by the last paint callback.
    fn collect_pick(&self, ui: &Ui, scene: &mut Scene) {
        let Some(result) = self.pick.lock().ok().and_then(|mut slot| slot.result.take()) else {
            return;
        };
        scene.select(result);
        ui.ctx().request_repaint();
    }

    /// Push depth/cull/antialias switches to the engine when they change, and
    /// reflect an antialiasing fallback back into the settings.
    fn sync_flags(&mut self, engine: &mut RenderEngine<GlowGpu>, settings: &mut ViewerSettings) {
        if let Some(applied) = self.applied {
            if applied.antialiasing && settings.antialiasing && !engine.antialiasing() {
                tracing::warn!("Antialiasing turned off after the offscreen target failed");
                settings.antialiasing = false;
            }
        }
        let wanted = AppliedFlags::from_settings(settings);
        if self.applied == Some(wanted) {
            return;
        }
        engine.set_antialiasing(wanted.antialiasing);
        engine.set_depth_test(wanted.depth_test);
        engine.set_culling(wanted.culling);
        self.applied = Some(wanted);
    }

    fn render_gl(&self, ui: &mut Ui, rect: egui::Rect, scene: &Scene, settings: &ViewerSettings) {
        let Some(engine) = &self.engine else {
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "OpenGL context unavailable",
                egui::FontId::proportional(14.0),
                egui::Color32::GRAY,
            );
            return;
        };

        let engine = engine.clone();
        let pick = self.pick.clone();
        let meshes = self.meshes.clone();
        let params = RenderParams::from_settings(settings, scene.selected());

        let callback = egui::PaintCallback {
            rect,
            callback: Arc::new(eframe::egui_glow::CallbackFn::new(move |info, painter| {
                let gl = painter.gl();
                let Ok(mut engine) = engine.lock() else {
                    return;
                };

                // a new host context invalidates everything built on the old one
                let same_context = engine.gpu().is_some_and(|g| Arc::ptr_eq(g.context(), gl));
                if !same_context {
                    let antialias = engine.antialiasing();
                    engine.initialize_render_target(GlowGpu::new(gl.clone()), info.screen_size_px, antialias);
                }

                engine.resize(info.screen_size_px);
                let vp = info.viewport_in_pixels();
                engine.set_viewport(vp.left_px, vp.from_bottom_px, vp.width_px, vp.height_px);

                let request = pick.lock().ok().and_then(|mut slot| slot.request.take());
                match request {
                    Some([x, y]) => {
                        let hit = engine.pick_at(x, y, &meshes, &params);
                        if let Ok(mut slot) = pick.lock() {
                            slot.result = Some(hit);
                        }
                    }
                    None => engine.redraw(&meshes, &params),
                }
            })),
        };

        ui.painter().add(callback);
    }

    fn draw_info(&self, ui: &Ui, rect: egui::Rect) {
        let Some((camera, euler, depth)) = self.with_engine(|e| {
            (*e.camera(), e.rotation_euler_degrees(), e.rotation().undo_depth())
        }) else {
            return;
        };

        let painter = ui.painter_at(rect);
        let overlay_rect = egui::Rect::from_min_size(
            egui::pos2(rect.right() - 196.0, rect.top() + 4.0),
            egui::vec2(192.0, 58.0),
        );
        painter.rect_filled(
            overlay_rect,
            4.0,
            egui::Color32::from_rgba_premultiplied(0, 0, 0, 140),
        );
        painter.text(
            overlay_rect.min + egui::vec2(6.0, 4.0),
            egui::Align2::LEFT_TOP,
            format!(
                "Pos: {:.2} {:.2} {:.2}\nYaw: {:.0}  Pitch: {:.0}\nRot: {:.0} {:.0} {:.0} ({depth})",
                camera.position.x,
                camera.position.y,
                camera.position.z,
                camera.yaw,
                camera.pitch,
                euler[0],
                euler[1],
                euler[2],
            ),
            egui::FontId::monospace(10.0),
            egui::Color32::from_rgb(160, 160, 170),
        );
    }
}
