use anyhow::anyhow;
use futures::executor::block_on;
use ray_transmission::{
    data_structures::{screen::Screen, texture::ColorSpace},
    engine::{Engine, colour_from_hex},
    screen::{ScreenConfig, ScreenController, ScreenState},
};

use crate::common::test_utils::{MemoryAssets, MockEngine, MockTexture, faces};

mod common;

fn ready_controller(engine: &mut MockEngine) -> ScreenController {
    let config = ScreenConfig::default();
    let assets = MemoryAssets::cube(&config, 8);
    let mut controller = ScreenController::new(config);
    let loaded = block_on(controller.load_texture(assets));
    controller
        .on_texture_loaded(engine, "canvas", loaded)
        .expect("screen initializes");
    controller
}

fn screen<'a>(engine: &'a MockEngine, controller: &ScreenController) -> &'a Screen<MockTexture> {
    let handle = controller.handle().expect("controller is ready");
    engine.scene().screen(handle).expect("screen is in the scene")
}

#[test]
fn no_frame_runs_before_the_texture_is_loaded() {
    let mut engine = MockEngine::new();
    let controller = ScreenController::new(ScreenConfig::default());

    assert_eq!(*controller.state(), ScreenState::Loading);
    engine.tick().unwrap();
    engine.tick().unwrap();

    assert_eq!(engine.registered_callbacks(), 0);
    assert_eq!(engine.render_calls, 0);
    assert_eq!(engine.setup_calls, 0);
    assert!(engine.scene().is_empty());
}

#[test]
fn loading_sets_up_the_engine_and_registers_one_frame_callback() {
    let mut engine = MockEngine::new();
    let controller = ready_controller(&mut engine);

    assert!(matches!(controller.state(), ScreenState::Ready(_)));
    assert_eq!(engine.surface, Some("canvas"));
    assert_eq!(engine.setup_calls, 1);
    assert_eq!(engine.registered_callbacks(), 1);
    assert_eq!(engine.scene().len(), 1);
    assert_eq!(engine.scene().background, colour_from_hex(0x0f0f0f));
    assert!(engine.controls().enable_damping);
    assert_eq!(engine.controls().damping_factor, 0.15);
    assert!((engine.camera().position.z - 3.0).abs() < 1e-4);

    let screen = screen(&engine, &controller);
    assert_eq!(
        screen.material.uniforms.t_env.value,
        MockTexture {
            size: 8,
            color_space: ColorSpace::LinearSrgb,
        }
    );
}

#[test]
fn the_screen_starts_with_the_current_camera_values() {
    let mut engine = MockEngine::new();
    let controller = ready_controller(&mut engine);

    let uniforms = &screen(&engine, &controller).material.uniforms;
    let camera = engine.camera();
    assert_eq!(uniforms.u_camera_position.value, camera.position);
    assert_eq!(uniforms.u_projection_matrix_inverse.value, camera.projection_matrix_inverse);
    assert_eq!(uniforms.u_view_matrix_inverse.value, camera.matrix_world);
}

#[test]
fn every_frame_copies_the_camera_into_the_uniforms_and_renders() {
    let mut engine = MockEngine::new();
    let controller = ready_controller(&mut engine);

    for frame in 1..=5 {
        let before = engine.camera().position;
        engine.controls_mut().rotate_left(0.3);
        engine.controls_mut().rotate_up(0.1);
        engine.tick().unwrap();

        let camera = engine.camera().clone();
        assert_ne!(camera.position, before, "frame {frame} should move the camera");
        let uniforms = &screen(&engine, &controller).material.uniforms;
        assert_eq!(uniforms.u_camera_position.value, camera.position);
        assert_eq!(uniforms.u_projection_matrix_inverse.value, camera.projection_matrix_inverse);
        assert_eq!(uniforms.u_view_matrix_inverse.value, camera.matrix_world);
        assert_eq!(engine.render_calls, frame);
    }
}

#[test]
fn the_projection_uniform_follows_a_lens_change() {
    let mut engine = MockEngine::new();
    let controller = ready_controller(&mut engine);

    engine.camera_mut().set_aspect(800, 800);
    engine.tick().unwrap();

    let uniforms = &screen(&engine, &controller).material.uniforms;
    assert_eq!(
        uniforms.u_projection_matrix_inverse.value,
        engine.camera().projection_matrix_inverse
    );
}

#[test]
fn frames_without_input_do_not_drift() {
    let mut engine = MockEngine::new();
    let controller = ready_controller(&mut engine);

    engine.tick().unwrap();
    let first = screen(&engine, &controller).material.uniforms.to_raw();
    engine.tick().unwrap();
    let second = screen(&engine, &controller).material.uniforms.to_raw();

    for (a, b) in first.camera_position.iter().zip(second.camera_position) {
        assert!((a - b).abs() < 1e-5);
    }
    for (a, b) in first
        .view_matrix_inverse
        .iter()
        .flatten()
        .zip(second.view_matrix_inverse.iter().flatten())
    {
        assert!((a - b).abs() < 1e-5);
    }
    assert_eq!(first.projection_matrix_inverse, second.projection_matrix_inverse);
}

#[test]
fn dispose_halts_frames_and_releases_the_scene() {
    let mut engine = MockEngine::new();
    let mut controller = ready_controller(&mut engine);
    engine.tick().unwrap();
    assert_eq!(engine.render_calls, 1);

    controller.dispose(&mut engine);
    engine.tick().unwrap();
    engine.tick().unwrap();

    assert_eq!(*controller.state(), ScreenState::Disposed);
    assert_eq!(engine.render_calls, 1);
    assert_eq!(engine.registered_callbacks(), 0);
    assert!(engine.scene().is_empty());
    assert!(engine.is_disposed());
}

#[test]
fn dispose_twice_tears_down_once() {
    let mut engine = MockEngine::new();
    let mut controller = ready_controller(&mut engine);

    controller.dispose(&mut engine);
    controller.dispose(&mut engine);

    assert_eq!(engine.dispose_calls, 1);
}

#[test]
fn a_missing_face_is_reported_as_a_failure() {
    let config = ScreenConfig::default();
    let assets = MemoryAssets::cube(&config, 8).without("images/ny.jpg");
    let mut engine = MockEngine::new();
    let mut controller = ScreenController::new(config);

    let loaded = block_on(controller.load_texture(assets));
    let result = controller.on_texture_loaded(&mut engine, "canvas", loaded);

    let err = result.expect_err("a missing face must fail the load");
    assert!(format!("{err:#}").contains("images/ny.jpg"));
    match controller.state() {
        ScreenState::Failed(message) => assert!(message.contains("images/ny.jpg")),
        state => panic!("expected a failed controller, got {state:?}"),
    }
    assert_eq!(engine.setup_calls, 0);
    assert_eq!(engine.registered_callbacks(), 0);
    assert!(engine.scene().is_empty());
}

#[test]
fn an_undecodable_face_is_reported_as_a_failure() {
    let config = ScreenConfig::default();
    let assets = MemoryAssets::cube(&config, 8).with_bytes("images/pz.jpg", b"not an image");
    let mut engine = MockEngine::new();
    let mut controller = ScreenController::new(config);

    let loaded = block_on(controller.load_texture(assets));
    let err = controller
        .on_texture_loaded(&mut engine, "canvas", loaded)
        .expect_err("garbage bytes must fail the load");

    assert!(format!("{err:#}").contains("cannot decode cube map face images/pz.jpg"));
    assert!(matches!(controller.state(), ScreenState::Failed(_)));
    assert_eq!(engine.setup_calls, 0);
}

#[test]
fn a_failed_upload_disposes_the_engine_it_set_up() {
    let mut engine = MockEngine::new();
    engine.fail_texture_upload = true;
    let mut controller = ScreenController::new(ScreenConfig::default());

    let result = controller.on_texture_loaded(&mut engine, "canvas", Ok(faces(4)));

    assert!(result.is_err());
    assert!(matches!(controller.state(), ScreenState::Failed(_)));
    assert_eq!(engine.setup_calls, 1);
    assert_eq!(engine.dispose_calls, 1);
    assert_eq!(engine.registered_callbacks(), 0);
    assert!(engine.scene().is_empty());
}

#[test]
fn a_load_finishing_after_dispose_is_dropped() {
    let config = ScreenConfig::default();
    let assets = MemoryAssets::cube(&config, 8);
    let mut engine = MockEngine::new();
    let mut controller = ScreenController::new(config);

    let pending = controller.load_texture(assets);
    controller.dispose(&mut engine);
    let loaded = block_on(pending);
    assert!(loaded.is_ok());

    controller
        .on_texture_loaded(&mut engine, "canvas", loaded)
        .expect("a late load is not an error");

    assert_eq!(*controller.state(), ScreenState::Disposed);
    assert_eq!(engine.setup_calls, 0);
    assert_eq!(engine.registered_callbacks(), 0);
    engine.tick().unwrap();
    assert_eq!(engine.render_calls, 0);
}

#[test]
fn a_second_load_result_is_ignored() {
    let mut engine = MockEngine::new();
    let mut controller = ready_controller(&mut engine);

    controller
        .on_texture_loaded(&mut engine, "other canvas", Ok(faces(2)))
        .unwrap();

    assert_eq!(engine.setup_calls, 1);
    assert_eq!(engine.surface, Some("canvas"));
    assert_eq!(engine.registered_callbacks(), 1);
    assert_eq!(engine.scene().len(), 1);
}

#[test]
fn the_screen_is_a_transparent_two_by_two_plane() {
    let mut engine = MockEngine::new();
    let controller = ready_controller(&mut engine);
    let screen = screen(&engine, &controller);

    assert_eq!(screen.geometry.width, 2.0);
    assert_eq!(screen.geometry.height, 2.0);
    assert_eq!(screen.geometry.vertices.len(), 4);
    assert_eq!(screen.geometry.indices, vec![0, 2, 1, 2, 3, 1]);
    for vertex in &screen.geometry.vertices {
        assert_eq!(vertex.position[0].abs(), 1.0);
        assert_eq!(vertex.position[1].abs(), 1.0);
        assert_eq!(vertex.position[2], 0.0);
    }
    assert!(screen.material.transparent);
}

#[test]
fn the_material_exposes_the_shader_uniform_names() {
    let mut engine = MockEngine::new();
    let controller = ready_controller(&mut engine);
    let uniforms = &screen(&engine, &controller).material.uniforms;

    assert_eq!(uniforms.t_env.name, "tEnv");
    assert_eq!(uniforms.u_camera_position.name, "uCameraPosition");
    assert_eq!(uniforms.u_projection_matrix_inverse.name, "uProjectionMatrixInverse");
    assert_eq!(uniforms.u_view_matrix_inverse.name, "uViewMatrixInverse");
}

#[test]
fn the_colour_space_is_configurable() {
    let config = ScreenConfig {
        color_space: ColorSpace::Srgb,
        ..Default::default()
    };
    let mut engine = MockEngine::new();
    let mut controller = ScreenController::new(config);

    controller
        .on_texture_loaded(&mut engine, "canvas", Ok(faces(4)))
        .unwrap();

    let env = &screen(&engine, &controller).material.uniforms.t_env.value;
    assert_eq!(env.color_space, ColorSpace::Srgb);
    assert_eq!(env.size, 4);
}

#[test]
fn a_removed_screen_fails_the_frame() {
    let mut engine = MockEngine::new();
    let controller = ready_controller(&mut engine);
    let handle = controller.handle().unwrap();

    engine.scene_mut().remove(handle);

    assert!(engine.tick().is_err());
    assert_eq!(engine.render_calls, 0);
}

#[test]
fn a_missing_surface_is_reported_as_a_failure() {
    let config = ScreenConfig::default();
    let assets = MemoryAssets::cube(&config, 8);
    let mut engine = MockEngine::new();
    let mut controller = ScreenController::new(config);
    let loaded = block_on(controller.load_texture(assets));
    assert!(loaded.is_ok());

    let err = controller
        .on_surface_failed(anyhow!("no GPU adapter").context("cannot create the main context"))
        .expect_err("a missing surface must fail the load");

    assert!(format!("{err:#}").contains("no GPU adapter"));
    match controller.state() {
        ScreenState::Failed(message) => assert!(message.contains("cannot create the main context")),
        state => panic!("expected a failed controller, got {state:?}"),
    }
    assert_eq!(engine.setup_calls, 0);
    assert_eq!(engine.registered_callbacks(), 0);
}

#[test]
fn a_missing_surface_after_dispose_is_ignored() {
    let mut engine = MockEngine::new();
    let mut controller = ScreenController::new(ScreenConfig::default());
    controller.dispose(&mut engine);

    controller
        .on_surface_failed(anyhow!("no GPU adapter"))
        .expect("nothing is left to fail");

    assert_eq!(*controller.state(), ScreenState::Disposed);
}
