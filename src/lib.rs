//! ray-transmission
//!
//! A small cross-platform real-time visual: a full-screen plane drawn with a
//! shader that simulates light refracting and reflecting through a glass body,
//! lit by an environment cube map and viewed through orbit controls. Runs
//! natively on top of winit + wgpu and on the web through WebGL2.
//!
//! High-level modules
//! - `camera`: perspective camera and damped orbit controls
//! - `context`: GPU context that owns window, surface, device and queue
//! - `data_structures`: the screen quad, its shader material and the cube texture
//! - `engine`: the engine contract the screen controller is written against
//! - `flow`: the winit application loop driving the demo
//! - `headless`: offscreen rendering for GPU tests (`integration-tests` feature)
//! - `pipelines`: the screen render pipeline and its WGSL shader
//! - `render`: the wgpu implementation of the engine contract
//! - `resources`: loading and decoding the cube map faces
//! - `screen`: the screen controller keeping shader uniforms in sync with the camera
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod engine;
pub mod flow;
#[cfg(feature = "integration-tests")]
pub mod headless;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod screen;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::{Matrix4, Point3, Vector3};
pub use winit::event::WindowEvent;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Web entry point; the page must provide a `<canvas id="canvas">`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    if let Err(e) = flow::run(screen::ScreenConfig::default()) {
        log::error!("{e:#}");
    }
}
