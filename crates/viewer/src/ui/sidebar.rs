//! Side panel: meshes, selection properties, scene rotation and display settings

use std::path::PathBuf;

use egui::Ui;
use mesh_model::{MeshId, Scale};

use crate::state::{Scene, ViewerSettings};
use crate::viewport::ViewportPanel;

/// Returns the path of an OBJ file the user picked.
pub fn show(
    ui: &mut Ui,
    scene: &mut Scene,
    settings: &mut ViewerSettings,
    viewport: &ViewportPanel,
) -> Option<PathBuf> {
    let mut opened = None;

    egui::ScrollArea::vertical().show(ui, |ui| {
        if ui.button("Open OBJ…").clicked() {
            opened = crate::app::menus::pick_obj_file();
        }
        ui.separator();

        show_mesh_list(ui, scene);
        ui.add_space(6.0);
        show_selection(ui, scene);
        ui.add_space(6.0);
        show_rotation(ui, viewport);
        ui.add_space(6.0);
        show_display(ui, settings);
    });

    opened
}

fn show_mesh_list(ui: &mut Ui, scene: &mut Scene) {
    egui::CollapsingHeader::new(format!("Meshes ({})", scene.meshes.len()))
        .id_salt("meshes")
        .default_open(true)
        .show(ui, |ui| {
            if scene.is_empty() {
                ui.weak("No meshes loaded");
                return;
            }
            let mut clicked: Option<MeshId> = None;
            for mesh in &scene.meshes {
                let selected = scene.selected() == Some(mesh.id);
                let label = format!("Mesh {} · {} tris", mesh.id, mesh.triangle_count());
                if ui.selectable_label(selected, label).clicked() {
                    clicked = Some(mesh.id);
                }
            }
            if clicked.is_some() {
                scene.select(clicked);
            }
        });
}

fn show_selection(ui: &mut Ui, scene: &mut Scene) {
    let Some((id, mut color, mut translate, mut scale)) = scene
        .selected_mesh()
        .map(|m| (m.id, m.color, m.translate, m.scale.to_array()))
    else {
        return;
    };

    egui::CollapsingHeader::new(format!("Mesh {id}"))
        .id_salt("selection")
        .default_open(true)
        .show(ui, |ui| {
            egui::Grid::new("selection_props")
                .num_columns(2)
                .spacing([8.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Color:");
                    if ui.color_edit_button_rgb(&mut color).changed() {
                        scene.set_color(id, color);
                    }
                    ui.end_row();

                    ui.label("Translate:");
                    if vec3_drag(ui, &mut translate, 0.01) {
                        scene.set_translate(id, translate);
                    }
                    ui.end_row();

                    ui.label("Scale:");
                    if vec3_drag(ui, &mut scale, 0.001) {
                        let scale = if scale[0] == scale[1] && scale[1] == scale[2] {
                            Scale::Uniform(scale[0])
                        } else {
                            Scale::PerAxis(scale)
                        };
                        scene.set_scale(id, scale);
                    }
                    ui.end_row();
                });

            ui.horizontal(|ui| {
                if ui.button("Deselect").clicked() {
                    scene.deselect();
                }
                if ui.button("Delete").clicked() {
                    scene.remove(id);
                }
            });
        });
}

fn show_rotation(ui: &mut Ui, viewport: &ViewportPanel) {
    let Some((mut euler, depth)) = viewport.with_engine(|e| (e.rotation_euler_degrees(), e.rotation().undo_depth()))
    else {
        return;
    };

    egui::CollapsingHeader::new("Scene rotation")
        .id_salt("rotation")
        .default_open(true)
        .show(ui, |ui| {
            let mut begin = false;
            let mut changed = false;
            ui.horizontal(|ui| {
                for (label, angle) in ["X", "Y", "Z"].into_iter().zip(euler.iter_mut()) {
                    ui.label(label);
                    let resp = ui.add(egui::DragValue::new(angle).speed(0.5).suffix("°"));
                    begin |= resp.drag_started() || resp.gained_focus();
                    changed |= resp.changed();
                }
            });
            if begin || changed {
                viewport.with_engine(|e| {
                    if begin {
                        e.push_rotation();
                    }
                    if changed {
                        e.set_rotation_euler_degrees(euler[0], euler[1], euler[2]);
                    }
                });
            }

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(depth > 0, egui::Button::new(format!("Undo ({depth})")))
                    .clicked()
                {
                    viewport.undo_rotation();
                }
                if ui.button("Reset").clicked() {
                    viewport.reset_rotation();
                }
            });
        });
}

fn show_display(ui: &mut Ui, settings: &mut ViewerSettings) {
    egui::CollapsingHeader::new("Display")
        .id_salt("display")
        .default_open(true)
        .show(ui, |ui| {
            let features = &mut settings.features;
            ui.checkbox(&mut features.fill, "Fill");
            ui.checkbox(&mut features.flat_shading, "Flat shading");
            ui.checkbox(&mut features.wireframe, "Wireframe");
            ui.checkbox(&mut features.vertices, "Vertices");
            ui.checkbox(&mut features.normals, "Normals");
            ui.checkbox(&mut features.local_bbox, "Selection box");
            ui.checkbox(&mut features.global_bbox, "Scene box");
            ui.separator();
            ui.checkbox(&mut settings.depth_test, "Depth test");
            ui.checkbox(&mut settings.culling, "Back-face culling");
            ui.checkbox(&mut settings.antialiasing, "Antialiasing");
        });

    egui::CollapsingHeader::new("Style")
        .id_salt("style")
        .default_open(false)
        .show(ui, |ui| {
            let style = &mut settings.style;
            egui::Grid::new("style_props")
                .num_columns(2)
                .spacing([8.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Background:");
                    ui.color_edit_button_rgba_unmultiplied(&mut settings.background);
                    ui.end_row();

                    ui.label("Wireframe:");
                    ui.color_edit_button_rgba_unmultiplied(&mut style.wireframe_color);
                    ui.end_row();

                    ui.label("Vertices:");
                    ui.color_edit_button_rgba_unmultiplied(&mut style.point_color);
                    ui.end_row();

                    ui.label("Point size:");
                    ui.add(egui::DragValue::new(&mut style.point_size).range(1.0..=32.0).speed(0.1));
                    ui.end_row();

                    ui.label("Normals:");
                    ui.color_edit_button_rgba_unmultiplied(&mut style.normal_color);
                    ui.end_row();

                    ui.label("Normal length:");
                    ui.add(egui::Slider::new(&mut style.normal_percent, 0.005..=0.5).logarithmic(true));
                    ui.end_row();

                    ui.label("Selection box:");
                    ui.color_edit_button_rgba_unmultiplied(&mut style.local_bbox_color);
                    ui.end_row();

                    ui.label("Scene box:");
                    ui.color_edit_button_rgba_unmultiplied(&mut style.global_bbox_color);
                    ui.end_row();
                });
        });

    egui::CollapsingHeader::new("Light & controls")
        .id_salt("light")
        .default_open(false)
        .show(ui, |ui| {
            egui::Grid::new("light_props")
                .num_columns(2)
                .spacing([8.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Direction:");
                    vec3_drag(ui, &mut settings.light.direction, 0.01);
                    ui.end_row();

                    ui.label("Light:");
                    ui.color_edit_button_rgb(&mut settings.light.color);
                    ui.end_row();

                    ui.label("Ambient:");
                    ui.color_edit_button_rgb(&mut settings.light.ambient);
                    ui.end_row();

                    ui.label("Rotate speed:");
                    ui.add(
                        egui::DragValue::new(&mut settings.rotation_sensitivity)
                            .range(1.0..=720.0)
                            .suffix("°/100px"),
                    );
                    ui.end_row();

                    ui.label("Look speed:");
                    ui.add(
                        egui::DragValue::new(&mut settings.look_sensitivity)
                            .range(0.01..=2.0)
                            .speed(0.01),
                    );
                    ui.end_row();

                    ui.label("Move speed:");
                    ui.add(
                        egui::DragValue::new(&mut settings.move_speed)
                            .range(0.1..=50.0)
                            .speed(0.05),
                    );
                    ui.end_row();
                });
        });
}

/// Three drag values in a row; `true` when any changed.
fn vec3_drag(ui: &mut Ui, v: &mut [f32; 3], speed: f64) -> bool {
    ui.horizontal(|ui| {
        let mut changed = false;
        for c in v.iter_mut() {
            changed |= ui.add(egui::DragValue::new(c).speed(speed)).changed();
        }
        changed
    })
    .inner
}
