//! Main application module

mod keyboard;
pub mod loader;
pub mod menus;
mod styles;

use std::path::{Path, PathBuf};

use eframe::egui;

use crate::state::{Scene, ViewerSettings};
use crate::ui::{sidebar, status_bar};
use crate::viewport::ViewportPanel;
use menus::MenuAction;

/// Main application
pub struct MeshViewApp {
    scene: Scene,
    settings: ViewerSettings,
    viewport: ViewportPanel,
    /// Name of the loaded file, or the last load error
    status: Option<String>,
    /// Settings as last written to disk
    saved_settings: ViewerSettings,
}

impl MeshViewApp {
    pub fn new(cc: &eframe::CreationContext<'_>, initial_obj: Option<PathBuf>) -> Self {
        let settings = ViewerSettings::load();

        styles::configure_styles(&cc.egui_ctx);

        let mut viewport = ViewportPanel::new();

        // Initialize the render engine if a glow context is available
        if let Some(gl) = cc.gl.as_ref() {
            let size = cc.egui_ctx.screen_rect().size() * cc.egui_ctx.pixels_per_point();
            viewport.init_gl(gl, [size.x as u32, size.y as u32], &settings);
        } else {
            tracing::warn!("No glow context; the viewport will stay empty");
        }

        let mut app = Self {
            scene: Scene::default(),
            saved_settings: settings.clone(),
            settings,
            viewport,
            status: None,
        };

        if let Some(path) = initial_obj {
            app.open_obj(&path);
        }
        app
    }

    /// Replace the scene with the meshes of an OBJ file.
    fn open_obj(&mut self, path: &Path) {
        match loader::read_obj(path) {
            Ok(loaded) => {
                self.scene.clear();
                self.scene
                    .import(loaded.records, Some(loaded.normalization), loader::PLACEMENT);
                self.viewport.reset_rotation();
                self.status = Some(loaded.name);
            }
            Err(e) => {
                tracing::error!("Failed to load OBJ: {e}");
                self.status = Some(format!("Load failed: {e}"));
            }
        }
    }

    fn apply_menu_action(&mut self, action: MenuAction) {
        match action {
            MenuAction::Open(path) => self.open_obj(&path),
            MenuAction::Clear => {
                self.scene.clear();
                self.status = None;
            }
            MenuAction::ResetCamera => self.viewport.reset_camera(),
            MenuAction::ResetRotation => self.viewport.reset_rotation(),
            MenuAction::ResetSettings => self.settings = ViewerSettings::default(),
        }
    }
}

impl eframe::App for MeshViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        keyboard::handle_keyboard(ctx, &mut self.scene, &self.settings, &self.viewport);

        // ── Menu bar ──────────────────────────────────────────
        let mut action = None;
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                if let Some(a) = menus::file_menu(ui) {
                    action = Some(a);
                }
                if let Some(a) = menus::view_menu(ui, &mut self.settings) {
                    action = Some(a);
                }
            });
        });
        if let Some(action) = action {
            self.apply_menu_action(action);
        }

        // ── Status bar ───────────────────────────────────────
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(22.0)
            .frame(
                egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(8, 2)),
            )
            .show(ctx, |ui| {
                status_bar::show(ui, &self.scene, self.status.as_deref());
            });

        // ── Left panel: meshes and display settings ──────────
        egui::SidePanel::left("sidebar")
            .default_width(260.0)
            .width_range(200.0..=420.0)
            .resizable(true)
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::same(6)))
            .show(ctx, |ui| {
                if let Some(path) = sidebar::show(ui, &mut self.scene, &mut self.settings, &self.viewport) {
                    self.open_obj(&path);
                }
            });

        // ── Central panel: 3D viewport ───────────────────────
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.viewport.show(ui, &mut self.scene, &mut self.settings);
            });

        if self.settings != self.saved_settings && !ctx.input(|i| i.pointer.any_down()) {
            self.settings.save();
            self.saved_settings = self.settings.clone();
        }
    }

    fn on_exit(&mut self, _gl: Option<&glow::Context>) {
        self.settings.save();
        self.viewport.destroy();
    }
}
