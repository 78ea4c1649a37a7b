mod common;

use common::{running_manager, Manager, MockText};
use enroth_vr::graphics::{RasterState, Rect};
use enroth_vr::types::{CompositionLayer, Pose, QuadPlacement};
use glam::{Quat, Vec3};

fn quad_layers(vr: &Manager) -> Vec<(QuadPlacement, Pose)> {
    vr.runtime()
        .submitted
        .last()
        .map(|(_, layers)| {
            layers
                .iter()
                .filter_map(|layer| match layer {
                    CompositionLayer::Quad {
                        placement, pose, ..
                    } => Some((*placement, *pose)),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// One frame in which the host captures its 2D screen into the quad layer.
fn frame_with_layer_capture(vr: &mut Manager) -> bool {
    if !vr.begin_frame() {
        return false;
    }
    let captured = vr.capture_screen_to_overlay_layer(1920, 1080);
    vr.end_frame();
    captured
}

fn move_head(vr: &mut Manager, offset: Vec3) {
    for (i, pose) in vr.runtime_mut().eye_poses.iter_mut().enumerate() {
        let x = if i == 0 { -0.032 } else { 0.032 };
        pose.position = Vec3::new(x, 1.6, 0.0) + offset;
    }
}

#[test]
fn quad_layer_needs_enable_and_a_captured_frame() {
    let mut vr = running_manager();
    assert!(vr.init_overlay_layer(None));
    assert_eq!(vr.runtime().created_swapchains[2].width, 1280);

    assert!(!frame_with_layer_capture(&mut vr));
    assert!(quad_layers(&vr).is_empty());

    vr.set_overlay_layer_enabled(true);
    assert!(common::render_frame(&mut vr));
    assert!(quad_layers(&vr).is_empty(), "nothing captured yet");

    assert!(frame_with_layer_capture(&mut vr));
    let submitted = vr.runtime().submitted.last().map(|(_, l)| l.len());
    assert_eq!(submitted, Some(2));
    let quads = quad_layers(&vr);
    assert_eq!(quads.len(), 1);
    assert_eq!(quads[0].0, QuadPlacement::WorldAnchored);
    assert!((quads[0].1.position - Vec3::new(0.0, 1.6, -1.5)).length() < 1e-5);
    assert!(matches!(
        vr.runtime().submitted.last().map(|(_, l)| &l[0]),
        Some(CompositionLayer::Projection { .. })
    ));

    vr.runtime_mut().should_render = false;
    assert!(!vr.begin_frame());
    assert!(quad_layers(&vr).is_empty());
}

#[test]
fn quad_layer_blits_default_framebuffer_into_swapchain() {
    let mut vr = running_manager();
    vr.init_overlay_layer(Some((800, 600)));
    vr.set_overlay_layer_enabled(true);
    assert!(frame_with_layer_capture(&mut vr));

    let (src, dst, read, draw) = vr.graphics().blits[0];
    assert_eq!(src, Rect::sized(1920, 1080));
    assert_eq!(dst, Rect::sized(800, 600));
    assert_eq!(read, None);
    assert!(draw.is_some());
    assert_eq!(vr.graphics().draw_framebuffer, None);
}

#[test]
fn layer_anchor_latches_once_per_enable_cycle() {
    let mut vr = running_manager();
    vr.init_overlay_layer(None);
    vr.set_overlay_layer_enabled(true);

    assert!(frame_with_layer_capture(&mut vr));
    let first = vr.overlay_layer_anchor().expect("anchored");

    move_head(&mut vr, Vec3::new(2.0, 0.0, 1.0));
    assert!(frame_with_layer_capture(&mut vr));
    assert!(frame_with_layer_capture(&mut vr));
    assert_eq!(vr.overlay_layer_anchor(), Some(first));
    assert_eq!(quad_layers(&vr)[0].1, first);

    vr.set_overlay_layer_enabled(false);
    assert!(common::render_frame(&mut vr));
    assert!(quad_layers(&vr).is_empty());
    assert_eq!(vr.overlay_layer_anchor(), None);

    vr.set_overlay_layer_enabled(true);
    assert!(frame_with_layer_capture(&mut vr));
    let second = vr.overlay_layer_anchor().expect("re-anchored");
    assert!((second.position - Vec3::new(2.0, 1.6, -0.5)).length() < 1e-5);
}

#[test]
fn world_panel_anchor_latches_once_per_activation() {
    let mut vr = running_manager();
    vr.set_world_panel_active(true);
    assert!(common::render_frame(&mut vr));
    let first = vr.world_panel_anchor().expect("anchored");
    assert!((first.position - Vec3::new(0.0, 1.6, -1.2)).length() < 1e-5);

    move_head(&mut vr, Vec3::new(0.0, 0.0, 3.0));
    assert!(common::render_frame(&mut vr));
    assert_eq!(vr.world_panel_anchor(), Some(first));

    vr.set_world_panel_active(false);
    vr.set_world_panel_active(true);
    assert_eq!(vr.world_panel_anchor(), None);
    assert!(common::render_frame(&mut vr));
    let second = vr.world_panel_anchor().expect("re-anchored");
    assert!((second.position - Vec3::new(0.0, 1.6, 1.8)).length() < 1e-5);
}

#[test]
fn pointer_maps_aim_onto_panel_with_edge_click() {
    let mut vr = running_manager();
    assert!(common::render_frame(&mut vr));
    assert_eq!(vr.menu_mouse_state(641, 481), None, "no target yet");

    vr.set_world_panel_active(true);
    vr.runtime_mut().aim_pose = Some(Pose::new(Vec3::new(0.0, 1.6, 0.0), Quat::IDENTITY));

    let mut clicks = Vec::new();
    for pressed in [false, true, true, false, true] {
        vr.runtime_mut().bools.insert("menu_select_click", pressed);
        assert!(common::render_frame(&mut vr));
        let state = vr.menu_mouse_state(641, 481).expect("pointer");
        assert_eq!((state.x, state.y), (320, 240));
        clicks.push(state.click);
    }
    assert_eq!(clicks, vec![false, true, false, false, true]);

    vr.set_world_panel_active(false);
    assert_eq!(vr.menu_mouse_state(641, 481), None);
}

#[test]
fn trigger_value_also_clicks() {
    let mut vr = running_manager();
    vr.set_world_panel_active(true);
    vr.runtime_mut().aim_pose = Some(Pose::new(Vec3::new(0.0, 1.6, 0.0), Quat::IDENTITY));
    assert!(common::render_frame(&mut vr));
    vr.runtime_mut().floats.insert("menu_select_value", 0.9);
    assert!(common::render_frame(&mut vr));
    assert!(vr.menu_mouse_state(641, 481).expect("pointer").click);
}

#[test]
fn head_locked_capture_draws_and_restores_raster_state() {
    let mut vr = running_manager();
    assert!(vr.init_overlay(1920, 1080));
    assert!(vr.capture_screen_to_overlay(1920, 1080));
    let (src, dst, read, draw) = vr.graphics().blits[0];
    assert_eq!((src, dst, read), (Rect::sized(1920, 1080), Rect::sized(1920, 1080), None));
    assert!(draw.is_some());

    let host = RasterState {
        depth_test: true,
        blend: false,
        cull_face: true,
    };
    vr.graphics_mut().raster = host;
    vr.set_head_locked_overlay(true);

    assert!(vr.begin_frame());
    vr.acquire_swapchain_texture(0).expect("eye");
    vr.render_overlays();
    vr.release_swapchain_texture(0);
    vr.end_frame();

    let draws = &vr.graphics().draws;
    assert_eq!(draws.len(), 1);
    assert_eq!(
        draws[0].1,
        RasterState {
            depth_test: false,
            blend: true,
            cull_face: false,
        }
    );
    assert_eq!(vr.graphics().raster, host);
}

#[test]
fn shader_failure_skips_the_draw() {
    let mut vr = running_manager();
    vr.graphics_mut().fail_compile = true;
    vr.init_overlay(640, 480);
    vr.capture_screen_to_overlay(640, 480);
    vr.set_head_locked_overlay(true);

    assert!(vr.begin_frame());
    vr.render_overlays();
    vr.render_overlays();
    vr.end_frame();
    assert!(vr.graphics().draws.is_empty());
    assert_eq!(vr.runtime().pairing_violations, 0);
}

#[test]
fn overlay_render_target_redirects_and_restores() {
    let mut vr = running_manager();
    vr.init_overlay(1024, 768);
    vr.graphics_mut().viewport = Rect::sized(1920, 1080);

    assert!(vr.begin_overlay_render());
    assert!(vr.graphics().draw_framebuffer.is_some());
    assert_eq!(vr.graphics().viewport, Rect::sized(1024, 768));
    vr.end_overlay_render();
    assert_eq!(vr.graphics().draw_framebuffer, None);
    assert_eq!(vr.graphics().viewport, Rect::sized(1920, 1080));
}

#[test]
fn dialogue_text_is_rasterised_once_per_change() {
    let mut vr = running_manager();
    vr.set_dialogue_text(&MockText, "Welcome to the Harmondale tavern");
    vr.set_dialogue_text(&MockText, "Welcome to the Harmondale tavern");
    assert_eq!(vr.graphics().uploads.len(), 1);
    let (_, width, height, pixels) = &vr.graphics().uploads[0];
    assert_eq!((*width, *height), (1024, 10 + 24));
    assert_eq!(pixels.len(), 1024 * 34 * 4);

    vr.set_dialogue_text(&MockText, "Goodbye");
    assert_eq!(vr.graphics().uploads.len(), 2);
}

#[test]
fn dialogue_menu_highlight_is_flipped_for_upload() {
    let mut vr = running_manager();
    let options = vec!["Yes".to_string(), "No".to_string(), "Maybe".to_string()];
    vr.set_dialogue_options(&MockText, &options);

    let (_, width, height, pixels) = vr.graphics().uploads.last().cloned().expect("menu");
    assert_eq!((width, height), (1024, 22 * 3 + 12));
    let at = |row_from_bottom: usize| {
        let i = row_from_bottom * width as usize * 4;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    };
    // The first option sits at the top of the menu, so at the end of the upload.
    assert_eq!(at(60), [70, 90, 160, 230]);
    assert_eq!(at(10), [10, 10, 16, 200]);
}

#[test]
fn dialogue_menu_steps_with_stick_and_confirms_with_click() {
    let mut vr = running_manager();
    let options = vec!["Buy".to_string(), "Sell".to_string(), "Leave".to_string()];
    vr.set_dialogue_options(&MockText, &options);
    let uploads = vr.graphics().uploads.len();

    vr.runtime_mut().vectors.insert("move", glam::Vec2::new(0.0, -0.9));
    assert!(common::render_frame(&mut vr));
    assert_eq!(vr.update_dialogue_menu(&MockText), None);
    assert_eq!(vr.update_dialogue_menu(&MockText), None);
    assert_eq!(vr.dialogue_selection(), 1);
    assert_eq!(vr.graphics().uploads.len(), uploads + 1);

    vr.runtime_mut().vectors.insert("move", glam::Vec2::ZERO);
    vr.runtime_mut().bools.insert("menu_select_click", true);
    assert!(common::render_frame(&mut vr));
    assert_eq!(vr.update_dialogue_menu(&MockText), Some(1));

    assert!(common::render_frame(&mut vr));
    assert_eq!(vr.update_dialogue_menu(&MockText), None, "held click is not a new press");

    vr.hide_dialogue();
    vr.runtime_mut().bools.insert("menu_select_click", false);
    assert!(common::render_frame(&mut vr));
    assert_eq!(vr.update_dialogue_menu(&MockText), None);
}

#[test]
fn layer_capture_skips_release_when_wait_fails() {
    let mut vr = running_manager();
    vr.init_overlay_layer(None);
    vr.set_overlay_layer_enabled(true);
    vr.runtime_mut().fail_wait = true;
    assert!(!frame_with_layer_capture(&mut vr));
    assert_eq!(vr.runtime().count("release_image"), 0);
    assert!(vr.graphics().blits.is_empty());
    assert!(quad_layers(&vr).is_empty());
}

fn press_on_rendered_frame(vr: &mut Manager) {
    vr.set_world_panel_active(true);
    vr.runtime_mut().aim_pose = Some(Pose::new(Vec3::new(0.0, 1.6, 0.0), Quat::IDENTITY));
    vr.runtime_mut().bools.insert("menu_select_click", true);
    assert!(common::render_frame(vr));
    assert!(vr.menu_mouse_state(641, 481).expect("pointer").click);
    vr.runtime_mut().bools.insert("menu_select_click", false);
}

#[test]
fn unrendered_frame_drops_the_click() {
    let mut vr = running_manager();
    press_on_rendered_frame(&mut vr);

    vr.runtime_mut().should_render = false;
    assert!(!vr.begin_frame());
    let state = vr.menu_mouse_state(641, 481).expect("pointer");
    assert!(!state.click);
}

#[test]
fn dialogue_choice_confirms_once_across_a_failed_locate() {
    let mut vr = running_manager();
    let options = vec!["Rest".to_string(), "Leave".to_string()];
    vr.set_dialogue_options(&MockText, &options);

    vr.runtime_mut().bools.insert("menu_select_click", true);
    assert!(common::render_frame(&mut vr));
    assert_eq!(vr.update_dialogue_menu(&MockText), Some(0));

    vr.runtime_mut().bools.insert("menu_select_click", false);
    vr.runtime_mut().fail_locate = true;
    assert!(!vr.begin_frame());
    assert_eq!(vr.update_dialogue_menu(&MockText), None);
    assert_eq!(vr.runtime().pairing_violations, 0);
}
