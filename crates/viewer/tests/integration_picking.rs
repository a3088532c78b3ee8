//! Integration tests for color-coded picking over the headless GPU.

use meshview_lib::fixtures::{triangle_mesh, TWO_MATERIAL_MTL, TWO_MATERIAL_OBJ};
use meshview_lib::harness::{GpuEvent, HeadlessGpu, TestHarness};
use meshview_lib::viewport::gl_renderer::{RenderEngine, RenderParams};
use meshview_lib::viewport::gpu::DrawMode;
use meshview_lib::viewport::picking::quantize;

fn loaded() -> TestHarness {
    let mut h = TestHarness::new(100, 100);
    h.load_obj(TWO_MATERIAL_OBJ, Some(TWO_MATERIAL_MTL)).unwrap();
    h
}

fn read_events(gpu: &HeadlessGpu) -> Vec<(i32, i32)> {
    gpu.events()
        .into_iter()
        .filter_map(|e| match e {
            GpuEvent::ReadPixel { x, y, .. } => Some((x, y)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_pick_background_returns_none() {
    let mut h = loaded();
    assert_eq!(h.click(50.0, 50.0), None);
    assert_eq!(h.scene.selected(), None);
}

#[test]
fn test_pick_hit_returns_mesh_under_cursor() {
    let mut h = loaded();
    // pixel (10, 20) from the top of a 100 px tall viewport is row 79
    h.gpu().cover_pixel(10, 79);
    assert_eq!(h.click(10.0, 20.0), Some(2));
    assert_eq!(h.scene.selected(), Some(2));
    assert_eq!(read_events(h.gpu()), [(10, 79)]);
}

#[test]
fn test_pick_reads_inside_sub_viewport() {
    let mut h = loaded();
    h.engine.set_viewport(30, 40, 50, 50);
    h.gpu().clear_events();
    h.click(5.0, 5.0);
    assert_eq!(read_events(h.gpu()), [(35, 84)]);
}

#[test]
fn test_pick_outside_viewport_reads_nothing() {
    let mut h = loaded();
    h.gpu().cover_everything(true);
    h.gpu().clear_events();
    assert_eq!(h.click(-1.0, 10.0), None);
    assert_eq!(h.click(10.0, 100.0), None);
    assert!(read_events(h.gpu()).is_empty());
}

#[test]
fn test_pick_redraws_visible_frame() {
    let mut h = loaded();
    h.settings.background = [0.1, 0.2, 0.3, 1.0];
    h.gpu().cover_pixel(10, 79);
    h.gpu().clear_events();
    h.click(10.0, 20.0);

    let events = h.gpu().events();
    let clears: Vec<[f32; 4]> = events
        .iter()
        .filter_map(|e| match e {
            GpuEvent::Clear { color, .. } => Some(*color),
            _ => None,
        })
        .collect();
    // black pick pass first, then the normal frame
    assert_eq!(clears, [[0.0, 0.0, 0.0, 1.0], [0.1, 0.2, 0.3, 1.0]]);
    assert_eq!(h.gpu().window_clear_color(), [0.1, 0.2, 0.3, 1.0].map(quantize));
    // selected blue quad is what the window shows under the cursor
    assert_eq!(h.gpu().window_pixel(10, 79), [0, 0, 255, 255]);
}

#[test]
fn test_pick_miss_restores_background() {
    let mut h = loaded();
    h.settings.background = [1.0, 1.0, 1.0, 1.0];
    h.click(50.0, 50.0);
    assert_eq!(h.gpu().window_pixel(50, 49), [255, 255, 255, 255]);
}

#[test]
fn test_pick_uses_offscreen_target_with_antialiasing() {
    let mut h = loaded();
    h.engine.set_antialiasing(true);
    h.gpu().cover_pixel(10, 79);
    assert_eq!(h.click(10.0, 20.0), Some(2));

    let targets: Vec<bool> = h
        .gpu()
        .events()
        .iter()
        .filter_map(|e| match e {
            GpuEvent::ReadPixel { target, .. } => Some(target.is_some()),
            _ => None,
        })
        .collect();
    assert_eq!(targets, [true]);
    assert!(h.gpu().is_bound_to_window());
}

#[test]
fn test_pick_draws_flat_ids_for_every_mesh() {
    let mut h = loaded();
    h.gpu().clear_events();
    h.click(50.0, 50.0);
    assert_eq!(h.gpu().draw_count("pick", DrawMode::Triangles), 2);
}

#[test]
fn test_unencodable_ids_are_skipped() {
    let mut engine = RenderEngine::new();
    engine.initialize_render_target(HeadlessGpu::new(), [64, 64], false);
    engine.compile_programs_once().unwrap();
    let gpu = engine.gpu().unwrap();
    gpu.cover_everything(true);

    let meshes = vec![triangle_mesh(0), triangle_mesh(0x0100_0000)];
    assert_eq!(engine.pick_at(10.0, 10.0, &meshes, &RenderParams::default()), None);
    assert_eq!(engine.gpu().unwrap().draw_count("pick", DrawMode::Triangles), 0);
}

#[test]
fn test_pick_before_ready_is_none() {
    let mut engine = RenderEngine::new();
    engine.initialize_render_target(HeadlessGpu::new(), [64, 64], false);
    engine.gpu().unwrap().cover_everything(true);
    let meshes = vec![triangle_mesh(1)];
    assert_eq!(engine.pick_at(10.0, 10.0, &meshes, &RenderParams::default()), None);
}

#[test]
fn test_escape_style_deselect_after_pick() {
    let mut h = loaded();
    h.gpu().cover_pixel(0, 99);
    assert_eq!(h.click(0.0, 0.0), Some(2));
    h.scene.deselect();
    assert_eq!(h.scene.selected(), None);
}
