//! Integration tests for the render engine over the headless GPU.
//!
//! Covers frame ordering, antialiasing resources, context changes and the
//! geometry cache.

use meshview_lib::fixtures::{cube_mesh, triangle_mesh, TWO_MATERIAL_MTL, TWO_MATERIAL_OBJ};
use meshview_lib::harness::{GpuEvent, HeadlessGpu, TestHarness};
use meshview_lib::viewport::error::RenderError;
use meshview_lib::viewport::gl_renderer::{RenderEngine, RenderParams};
use meshview_lib::viewport::gpu::{DrawMode, ResourceCounts, ViewportRect};
use meshview_lib::viewport::picking::quantize;

fn loaded(width: u32, height: u32) -> TestHarness {
    let mut h = TestHarness::new(width, height);
    h.load_obj(TWO_MATERIAL_OBJ, Some(TWO_MATERIAL_MTL)).unwrap();
    h
}

#[test]
fn test_draw_before_initialize_is_noop() {
    let mut engine: RenderEngine<HeadlessGpu> = RenderEngine::new();
    let meshes = vec![triangle_mesh(1)];
    engine.redraw(&meshes, &RenderParams::default());
    assert!(!engine.is_ready());
    assert_eq!(engine.pick_at(0.0, 0.0, &meshes, &RenderParams::default()), None);
    assert!(matches!(engine.compile_programs_once(), Err(RenderError::ContextUnavailable)));
}

#[test]
fn test_draw_before_compile_is_noop() {
    let mut engine = RenderEngine::new();
    assert!(engine.initialize_render_target(HeadlessGpu::new(), [64, 64], false));
    let meshes = vec![triangle_mesh(1)];
    engine.redraw(&meshes, &RenderParams::default());
    engine.redraw(&meshes, &RenderParams::default());

    let gpu = engine.gpu().unwrap();
    assert!(gpu.events().is_empty());
    assert_eq!(engine.resource_counts(), ResourceCounts::default());
}

#[test]
fn test_empty_surface_rejected() {
    let mut engine = RenderEngine::new();
    assert!(!engine.initialize_render_target(HeadlessGpu::new(), [0, 64], false));
    assert!(engine.gpu().is_none());
}

#[test]
fn test_compile_is_idempotent() {
    let mut h = TestHarness::new(32, 32);
    h.engine.compile_programs_once().unwrap();
    h.engine.compile_programs_once().unwrap();
    assert_eq!(h.engine.resource_counts().programs, 3);
}

#[test]
fn test_failed_program_leaves_nothing_behind() {
    let gpu = HeadlessGpu::new();
    gpu.fail_program(Some("pick"));
    let mut engine = RenderEngine::new();
    engine.initialize_render_target(gpu, [64, 64], false);

    let err = engine.compile_programs_once().unwrap_err();
    assert!(matches!(err, RenderError::ProgramLink { ref program, .. } if program == "pick"));
    assert!(!engine.is_ready());
    assert_eq!(engine.resource_counts().programs, 0);
}

#[test]
fn test_frame_clears_to_background_then_draws() {
    let mut h = loaded(100, 100);
    h.settings.background = [0.2, 0.4, 0.6, 1.0];
    h.gpu().clear_events();
    h.redraw();

    let events = h.gpu().events();
    assert!(matches!(events[0], GpuEvent::Clear { target: None, color } if color == [0.2, 0.4, 0.6, 1.0]));
    assert_eq!(h.gpu().draw_count("fill", DrawMode::Triangles), 2);
    assert_eq!(h.gpu().window_clear_color(), [0.2, 0.4, 0.6, 1.0].map(quantize));
    assert!(h.gpu().is_bound_to_window());
}

#[test]
fn test_fill_flag_off_skips_meshes() {
    let mut h = loaded(100, 100);
    h.settings.features.fill = false;
    h.settings.features.wireframe = true;
    h.gpu().clear_events();
    h.redraw();

    assert_eq!(h.gpu().draw_count("fill", DrawMode::Triangles), 0);
    assert_eq!(h.gpu().draw_count("overlay", DrawMode::Lines), 2);
}

#[test]
fn test_overlay_passes_follow_flags() {
    let mut h = loaded(100, 100);
    let features = &mut h.settings.features;
    features.wireframe = true;
    features.vertices = true;
    features.normals = true;
    features.global_bbox = true;
    features.local_bbox = true;
    h.scene.select(Some(1));
    h.gpu().clear_events();
    h.redraw();

    // wireframe x2, normals x2, local box, global box
    assert_eq!(h.gpu().draw_count("overlay", DrawMode::Lines), 6);
    assert_eq!(h.gpu().draw_count("overlay", DrawMode::Points), 2);
}

#[test]
fn test_local_box_needs_selection() {
    let mut h = loaded(100, 100);
    h.settings.features.local_bbox = true;
    h.gpu().clear_events();
    h.redraw();
    assert_eq!(h.gpu().draw_count("overlay", DrawMode::Lines), 0);

    h.scene.select(Some(2));
    h.gpu().clear_events();
    h.redraw();
    assert_eq!(h.gpu().draw_count("overlay", DrawMode::Lines), 1);
}

#[test]
fn test_antialias_pass_order() {
    let mut h = loaded(100, 100);
    h.settings.features.wireframe = true;
    h.engine.set_antialiasing(true);
    h.gpu().clear_events();
    h.redraw();

    let programs = h.gpu().draw_programs();
    assert_eq!(programs, ["fill", "fill", "overlay", "overlay", "post"]);

    let events = h.gpu().events();
    let targets: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GpuEvent::Draw { target, program, .. } => Some((program.as_str(), *target)),
            _ => None,
        })
        .collect();
    for (program, target) in &targets {
        if *program == "post" {
            assert!(target.is_none());
        } else {
            assert!(target.is_some(), "{program} should draw offscreen");
        }
    }
    assert!(h.gpu().is_bound_to_window());
}

#[test]
fn test_antialias_blur_reaches_window() {
    let mut h = loaded(100, 100);
    h.settings.background = [0.0, 1.0, 0.0, 1.0];
    h.engine.set_antialiasing(true);
    h.redraw();
    assert_eq!(h.gpu().window_pixel(50, 50), [0, 255, 0, 255]);
}

#[test]
fn test_antialias_toggle_restores_resource_counts() {
    let mut h = loaded(100, 100);
    h.redraw();
    let without = h.engine.resource_counts();

    h.engine.set_antialiasing(true);
    h.redraw();
    let with = h.engine.resource_counts();
    assert_eq!(with.programs, without.programs + 1);
    assert_eq!(with.textures, 1);
    assert_eq!(with.renderbuffers, 1);
    assert_eq!(with.framebuffers, 1);

    h.engine.set_antialiasing(false);
    assert_eq!(h.engine.resource_counts(), without);
    h.redraw();
    assert_eq!(h.engine.resource_counts(), without);

    h.engine.set_antialiasing(true);
    h.redraw();
    assert_eq!(h.engine.resource_counts(), with);
}

#[test]
fn test_resize_recreates_offscreen_target() {
    let mut h = loaded(100, 100);
    h.engine.set_antialiasing(true);
    h.redraw();
    let before = h.engine.resource_counts();

    h.engine.resize([200, 150]);
    h.redraw();
    assert_eq!(h.engine.resource_counts(), before);
    assert_eq!(h.gpu().last_viewport().width, 200);
    assert_eq!(h.gpu().last_viewport().height, 150);
}

#[test]
fn test_framebuffer_failure_falls_back_to_direct() {
    let mut h = loaded(100, 100);
    h.gpu().fail_framebuffers(true);
    h.engine.set_antialiasing(true);
    h.gpu().clear_events();
    h.redraw();

    assert!(!h.engine.antialiasing());
    let counts = h.engine.resource_counts();
    assert_eq!(counts.programs, 3);
    assert_eq!(counts.textures, 0);
    assert_eq!(counts.renderbuffers, 0);
    assert_eq!(counts.framebuffers, 0);
    assert!(!h.gpu().draw_programs().iter().any(|p| p == "post"));
    assert_eq!(h.gpu().draw_count("fill", DrawMode::Triangles), 2);
}

#[test]
fn test_context_change_recompiles_lazily() {
    let mut h = loaded(100, 100);
    h.redraw();
    let generation = h.engine.generation();

    assert!(h.engine.initialize_render_target(HeadlessGpu::new(), [100, 100], false));
    assert_eq!(h.engine.generation(), generation + 1);
    assert!(!h.engine.is_ready());
    assert_eq!(h.engine.resource_counts(), ResourceCounts::default());

    h.redraw();
    assert!(h.engine.is_ready());
    assert_eq!(h.engine.resource_counts().programs, 3);
    assert_eq!(h.gpu().draw_count("fill", DrawMode::Triangles), 2);
}

#[test]
fn test_context_change_before_compile_stays_idle() {
    let mut engine = RenderEngine::new();
    engine.initialize_render_target(HeadlessGpu::new(), [64, 64], false);
    engine.initialize_render_target(HeadlessGpu::new(), [64, 64], false);
    engine.redraw(&[cube_mesh(1)], &RenderParams::default());
    assert!(!engine.is_ready());
    assert!(engine.gpu().unwrap().events().is_empty());
}

#[test]
fn test_geometry_cache_sweeps_unused_buffers() {
    let mut h = loaded(100, 100);
    h.settings.features.wireframe = true;
    h.redraw();
    assert_eq!(h.engine.geometry_entries(), 4);

    h.settings.features.wireframe = false;
    h.redraw();
    assert_eq!(h.engine.geometry_entries(), 2);

    assert!(h.scene.remove(1));
    h.redraw();
    assert_eq!(h.engine.geometry_entries(), 1);
    let counts = h.engine.resource_counts();
    assert_eq!(counts.vertex_arrays, 1);
    assert_eq!(counts.buffers, 1);
}

#[test]
fn test_destroy_releases_everything() {
    let mut h = loaded(100, 100);
    h.settings.features.global_bbox = true;
    h.engine.set_antialiasing(true);
    h.redraw();
    assert!(h.engine.resource_counts().total() > 0);

    h.engine.destroy();
    assert_eq!(h.engine.resource_counts(), ResourceCounts::default());
    assert!(!h.engine.is_ready());
}

/// (depth test, culling) in effect for each draw with `program`.
fn draw_flags(h: &TestHarness, program: &str) -> Vec<(bool, bool)> {
    h.gpu()
        .events()
        .into_iter()
        .filter_map(|e| match e {
            GpuEvent::Draw {
                program: p,
                depth_test,
                culling,
                ..
            } if p == program => Some((depth_test, culling)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_depth_and_cull_flags_apply_to_mesh_pass() {
    use meshview_lib::viewport::gpu::{Capability, Gpu};

    let mut h = loaded(100, 100);
    h.engine.set_depth_test(false);
    h.engine.set_culling(true);
    h.gpu().clear_events();
    h.redraw();

    let fill = draw_flags(&h, "fill");
    assert_eq!(fill, [(false, true), (false, true)]);

    // restored for the host once the frame ends
    assert!(!h.gpu().is_enabled(Capability::DepthTest));
    assert!(!h.gpu().is_enabled(Capability::CullFace));
    assert!(!h.gpu().is_enabled(Capability::ScissorTest));
}

#[test]
fn test_depth_and_cull_flags_apply_to_pick_pass() {
    let mut h = loaded(100, 100);
    h.engine.set_depth_test(true);
    h.engine.set_culling(false);
    h.gpu().clear_events();
    h.click(50.0, 50.0);

    let pick = draw_flags(&h, "pick");
    assert_eq!(pick, [(true, false), (true, false)]);
}

#[test]
fn test_antialiased_blur_lands_in_offset_viewport() {
    let mut h = loaded(300, 100);
    h.engine.set_viewport(200, 0, 100, 100);
    h.engine.set_antialiasing(true);
    h.gpu().clear_events();
    h.redraw();

    let posts: Vec<_> = h
        .gpu()
        .events()
        .into_iter()
        .filter_map(|e| match e {
            GpuEvent::Draw {
                target,
                program,
                viewport,
                scissor,
                ..
            } if program == "post" => Some((target, viewport, scissor)),
            _ => None,
        })
        .collect();
    let panel = ViewportRect::new(200, 0, 100, 100);
    assert_eq!(posts, [(None, panel, Some(panel))]);
}

#[test]
fn test_viewport_follows_set_viewport() {
    let mut h = loaded(200, 100);
    h.engine.set_viewport(20, 10, 80, 60);
    h.redraw();
    let vp = h.gpu().last_viewport();
    assert_eq!((vp.x, vp.y, vp.width, vp.height), (20, 10, 80, 60));
}
