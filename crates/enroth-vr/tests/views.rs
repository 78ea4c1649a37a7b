mod common;

use common::{manager_with, render_frame, running_manager, xlib_context, MockRuntime};
use enroth_vr::graphics::Rect;
use enroth_vr::{ClipPlanes, DebugFlags, NoContext, SessionState, VrConfig, VrManager};
use glam::{Mat4, Vec3};

#[test]
fn acquire_then_release_restores_default_framebuffer() {
    let mut vr = running_manager();
    assert!(vr.begin_frame());
    for eye in 0..vr.view_count() {
        let fb = vr.acquire_swapchain_texture(eye).expect("eye target");
        assert_eq!(vr.graphics().draw_framebuffer, Some(fb));
        assert_eq!(vr.graphics().viewport, Rect::sized(1440, 1584));
        assert!(!vr.graphics().scissor.enabled);
        vr.release_swapchain_texture(eye);
        assert_eq!(vr.graphics().draw_framebuffer, None);
        assert_eq!(vr.graphics().read_framebuffer, None);
    }
    vr.end_frame();
    assert_eq!(vr.runtime().count("release_image"), 2);
}

#[test]
fn depth_buffers_are_created_once_per_view() {
    let mut vr = running_manager();
    let mut depth_per_eye = Vec::new();
    for _ in 0..4 {
        assert!(vr.begin_frame());
        for eye in 0..2 {
            vr.acquire_swapchain_texture(eye).expect("eye target");
            depth_per_eye.push((eye, vr.graphics().attached_depth));
            vr.release_swapchain_texture(eye);
        }
        vr.end_frame();
    }

    assert_eq!(vr.graphics().renderbuffers_created, 2);
    assert_eq!(vr.graphics().live_renderbuffers.len(), 2);
    for eye in 0..2 {
        let ids: Vec<_> = depth_per_eye
            .iter()
            .filter(|(e, _)| *e == eye)
            .map(|(_, d)| *d)
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert!(ids[0].is_some());
    }

    vr.shutdown();
    assert!(vr.graphics().live_renderbuffers.is_empty());
    assert!(vr.graphics().live_framebuffers.is_empty());
}

#[test]
fn invalid_view_index_is_rejected() {
    let mut vr = running_manager();
    assert!(vr.begin_frame());
    assert_eq!(vr.acquire_swapchain_texture(2), None);
    vr.release_swapchain_texture(7);
    assert_eq!(vr.graphics().draw_framebuffer, None);
    vr.end_frame();
    assert_eq!(vr.runtime().count("acquire_image"), 0);
    assert_eq!(vr.runtime().count("release_image"), 0);
}

#[test]
fn failed_acquire_skips_the_eye() {
    let mut vr = running_manager();
    vr.runtime_mut().fail_acquire = true;
    assert!(vr.begin_frame());
    assert_eq!(vr.acquire_swapchain_texture(0), None);
    vr.release_swapchain_texture(0);
    vr.end_frame();
    assert_eq!(vr.runtime().count("wait_image"), 0);
    assert_eq!(vr.runtime().count("release_image"), 0);
    assert_eq!(vr.runtime().pairing_violations, 0);
}

#[test]
fn failed_wait_does_not_release_the_image() {
    let mut vr = running_manager();
    vr.runtime_mut().fail_wait = true;
    assert!(vr.begin_frame());
    assert_eq!(vr.acquire_swapchain_texture(0), None);
    vr.release_swapchain_texture(0);
    vr.end_frame();
    assert_eq!(vr.runtime().count("wait_image"), 1);
    assert_eq!(vr.runtime().count("release_image"), 0);
    assert_eq!(vr.graphics().draw_framebuffer, None);
}

#[test]
fn debug_clear_paints_each_eye_differently() {
    let mut vr = VrManager::new(
        MockRuntime::default(),
        common::MockGraphics::default(),
        VrConfig::default(),
    )
    .with_debug_flags(DebugFlags {
        clear_per_eye: true,
        ..DebugFlags::default()
    });
    vr.initialize().expect("initialize");
    vr.create_session(Some(xlib_context()), &NoContext)
        .expect("session");
    vr.runtime_mut().push_state(SessionState::Ready);

    assert!(render_frame(&mut vr));
    assert_eq!(
        vr.graphics().clears,
        vec![[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]]
    );
}

#[test]
fn projection_follows_host_clip_planes() {
    let mut vr = running_manager();
    assert!(vr.begin_frame());
    vr.end_frame();
    let default_proj = vr.current_projection_matrix();
    let (near, far) = (4.0f32, 30000.0f32);
    assert!((default_proj.w_axis.z - (-(2.0 * far * near) / (far - near))).abs() < 1e-2);

    vr.set_host_clip_planes(Some(ClipPlanes {
        near: 1.0,
        far: 100.0,
    }));
    assert!(vr.begin_frame());
    vr.end_frame();
    let proj = vr.current_projection_matrix();
    let expected = Mat4::perspective_rh_gl(90f32.to_radians(), 1.0, 1.0, 100.0);
    assert!(proj.abs_diff_eq(expected, 1e-4));
    assert_eq!(vr.view_tangents(0).map(|t| (t.left * 1e4).round()), Some(-1e4));
}

#[test]
fn view_matrix_places_host_camera_at_eye() {
    let mut vr = manager_with(MockRuntime {
        eye_poses: vec![enroth_vr::Pose::IDENTITY; 2],
        ..MockRuntime::default()
    });
    vr.initialize().expect("initialize");
    vr.create_session(Some(xlib_context()), &NoContext)
        .expect("session");
    vr.runtime_mut().push_state(SessionState::Ready);
    assert!(render_frame(&mut vr));

    let origin = Vec3::new(1000.0, -2000.0, 150.0);
    vr.set_current_view_index(1);
    let view = vr.current_view_matrix(origin, 0.0);
    assert!(view.transform_point3(origin).length() < 1e-2);

    // Host yaw 0 looks down host +X.
    let forward = view.inverse().transform_vector3(Vec3::NEG_Z);
    assert!((forward - Vec3::X).length() < 1e-4);
}

#[test]
fn rebind_sets_full_viewport() {
    let mut vr = running_manager();
    assert!(vr.begin_frame());
    let fb = vr.acquire_swapchain_texture(1).expect("eye target");
    vr.graphics_mut().viewport = Rect::sized(640, 480);
    vr.graphics_mut().draw_framebuffer = None;
    assert_eq!(vr.bind_swapchain_framebuffer(1), Some(fb));
    assert_eq!(vr.graphics().draw_framebuffer, Some(fb));
    assert_eq!(vr.graphics().viewport, Rect::sized(1440, 1584));
    vr.release_swapchain_texture(1);
    vr.end_frame();
}
