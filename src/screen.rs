//! The screen controller.
//!
//! [`ScreenController`] owns the refraction screen and keeps its shader inputs
//! consistent with the live camera. Its lifecycle:
//!
//! 1. [`new`](ScreenController::new) creates it in [`ScreenState::Loading`]
//! 2. [`load_texture`](ScreenController::load_texture) yields the future that
//!    loads the cube map; the host awaits it on its executor
//! 3. [`on_texture_loaded`](ScreenController::on_texture_loaded) sets up the
//!    engine, builds the screen and registers the per-frame callback
//! 4. [`dispose`](ScreenController::dispose) tears the engine down
//!
//! The per-frame callback is only registered once the screen exists, so it
//! never observes a half-built controller.


use anyhow::Context as _;

use crate::{
    data_structures::{screen::Screen, texture::ColorSpace},
    engine::{Engine, ScreenHandle, colour_from_hex},
    resources::{
        AssetSource,
        texture::{CubeFaces, load_cube_faces},
    },
};

/// Settings of the screen and its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenConfig {
    /// Prefix prepended to every face file name.
    pub asset_prefix: String,
    /// Face file names in the order +X, -X, +Y, -Y, +Z, -Z.
    pub faces: [String; 6],
    pub color_space: ColorSpace,
    /// Background as `0xRRGGBB` sRGB.
    pub background: u32,
    /// Initial distance of the camera from the origin along +Z.
    pub camera_distance: f32,
    pub damping_factor: f32,
    pub enable_damping: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            asset_prefix: "images/".to_string(),
            faces: ["px.jpg", "nx.jpg", "py.jpg", "ny.jpg", "pz.jpg", "nz.jpg"].map(String::from),
            color_space: ColorSpace::LinearSrgb,
            background: 0x0f0f0f,
            camera_distance: 3.0,
            damping_factor: 0.15,
            enable_damping: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenState {
    /// Waiting for the cube map.
    Loading,
    /// The screen is in the scene and refreshed every frame.
    Ready(ScreenHandle),
    /// Initialization failed; the engine was left untouched or disposed.
    Failed(String),
    Disposed,
}

pub struct ScreenController {
    config: ScreenConfig,
    state: ScreenState,
}

impl ScreenController {
    pub fn new(config: ScreenConfig) -> Self {
        Self {
            config,
            state: ScreenState::Loading,
        }
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    pub fn handle(&self) -> Option<ScreenHandle> {
        match self.state {
            ScreenState::Ready(handle) => Some(handle),
            _ => None,
        }
    }

    /// The cube map load. Does not borrow the controller, so the caller may
    /// dispose while it is pending.
    pub fn load_texture<S: AssetSource + 'static>(
        &self,
        source: S,
    ) -> impl Future<Output = anyhow::Result<CubeFaces>> + use<S> {
        load_cube_faces(
            source,
            self.config.asset_prefix.clone(),
            self.config.faces.clone(),
        )
    }

    /// Finish construction with the outcome of [`load_texture`](Self::load_texture).
    ///
    /// A result arriving after [`dispose`](Self::dispose) is dropped along with
    /// the surface. A failed load leaves the engine untouched and moves the
    /// controller to [`ScreenState::Failed`]; the error is also returned.
    pub fn on_texture_loaded<E: Engine>(
        &mut self,
        engine: &mut E,
        surface: E::Surface,
        faces: anyhow::Result<CubeFaces>,
    ) -> anyhow::Result<()> {
        if !self.is_loading() {
            return Ok(());
        }

        match faces.and_then(|faces| self.init(engine, surface, &faces)) {
            Ok(handle) => {
                log::info!("screen ready");
                self.state = ScreenState::Ready(handle);
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// Finish construction when no rendering surface could be created.
    ///
    /// The controller moves to [`ScreenState::Failed`] and `error` is returned;
    /// after [`dispose`](Self::dispose) this does nothing.
    pub fn on_surface_failed(&mut self, error: anyhow::Error) -> anyhow::Result<()> {
        if !self.is_loading() {
            return Ok(());
        }
        self.fail(error)
    }

    fn is_loading(&self) -> bool {
        match self.state {
            ScreenState::Loading => true,
            ScreenState::Disposed => {
                log::warn!("cube map finished loading after dispose, dropping it");
                false
            }
            ref state => {
                log::warn!("cube map load completed twice, controller already {:?}", state);
                false
            }
        }
    }

    fn fail(&mut self, e: anyhow::Error) -> anyhow::Result<()> {
        log::error!("screen initialization failed: {e:#}");
        self.state = ScreenState::Failed(format!("{e:#}"));
        Err(e)
    }

    fn init<E: Engine>(
        &self,
        engine: &mut E,
        surface: E::Surface,
        faces: &CubeFaces,
    ) -> anyhow::Result<ScreenHandle> {
        engine.setup(surface).context("cannot set up the engine")?;
        let built = self.build(engine, faces);
        if built.is_err() {
            // no half-initialized surface survives a failure
            engine.dispose();
        }
        built
    }

    fn build<E: Engine>(&self, engine: &mut E, faces: &CubeFaces) -> anyhow::Result<ScreenHandle> {
        engine.scene_mut().background = colour_from_hex(self.config.background);
        engine.camera_mut().position.z = self.config.camera_distance;
        let controls = engine.controls_mut();
        controls.damping_factor = self.config.damping_factor;
        controls.enable_damping = self.config.enable_damping;
        // settle the camera on its orbit so the first uniforms are consistent
        engine.update_controls();

        let texture = engine
            .create_cube_texture(faces, self.config.color_space)
            .context("cannot upload the cube map")?;
        let screen = Screen::new(texture, engine.camera());
        let handle = engine.scene_mut().add(screen);

        engine.animation(Box::new(move |engine: &mut E| on_frame(engine, handle)));
        Ok(handle)
    }

    /// Tear the engine down. Safe in every state, repeated calls do nothing.
    pub fn dispose<E: Engine>(&mut self, engine: &mut E) {
        if self.state == ScreenState::Disposed {
            return;
        }
        self.state = ScreenState::Disposed;
        engine.dispose();
    }
}

/// Refresh the screen's camera uniforms and draw one frame.
fn on_frame<E: Engine>(engine: &mut E, handle: ScreenHandle) -> anyhow::Result<()> {
    engine.update_controls();

    let camera = engine.camera();
    let (position, projection_matrix_inverse, view_matrix_inverse) = (
        camera.position,
        camera.projection_matrix_inverse,
        camera.matrix_world,
    );
    let screen = engine
        .scene_mut()
        .screen_mut(handle)
        .context("the screen was removed from the scene")?;
    screen
        .material
        .uniforms
        .sync_camera(position, projection_matrix_inverse, view_matrix_inverse);

    engine.render()
}
