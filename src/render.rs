//! The wgpu engine.
//!
//! [`WgpuEngine`] implements [`Engine`] over a [`Context`]: it keeps the scene,
//! camera and orbit controls, lazily creates GPU resources for every screen in
//! the scene and draws them over the background colour each frame.
//!

use std::iter;

use anyhow::{Context as _, anyhow};

use crate::{
    camera::{Camera, OrbitControls},
    context::Context,
    data_structures::texture::{ColorSpace, CubeTexture},
    engine::{AnimationLoop, Engine, Scene, ScreenHandle},
    pipelines::screen::{ScreenResources, encode_screens},
    resources::texture::CubeFaces,
};

pub struct WgpuEngine {
    ctx: Option<Context>,
    scene: Scene<CubeTexture>,
    camera: Camera,
    controls: OrbitControls,
    animation: AnimationLoop<Self>,
    gpu_screens: Vec<(ScreenHandle, ScreenResources)>,
    disposed: bool,
}

impl WgpuEngine {
    pub fn new() -> Self {
        Self {
            ctx: None,
            scene: Scene::new(),
            camera: Camera::default(),
            controls: OrbitControls::default(),
            animation: AnimationLoop::new(),
            gpu_screens: Vec::new(),
            disposed: false,
        }
    }

    pub fn context(&self) -> Option<&Context> {
        self.ctx.as_ref()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(ctx) = &mut self.ctx {
            ctx.resize(width, height);
        }
        self.camera.set_aspect(width, height);
        self.controls.set_viewport_height(height);
    }

    /// Resize to the current window size, e.g. after the surface was lost.
    pub fn reconfigure(&mut self) {
        if let Some(ctx) = &self.ctx {
            let size = ctx.window.inner_size();
            self.resize(size.width, size.height);
        }
    }

    // Create GPU resources for screens added since the last frame and forget
    // those of removed screens.
    fn sync_gpu_screens(&mut self) -> anyhow::Result<()> {
        let ctx = self.ctx.as_ref().context("render called before setup")?;
        let scene = &self.scene;
        self.gpu_screens.retain(|(handle, resources)| {
            let alive = scene.screen(*handle).is_some();
            if !alive {
                resources.destroy();
            }
            alive
        });
        for (handle, screen) in scene.screens() {
            if !self.gpu_screens.iter().any(|(h, _)| *h == handle) {
                log::debug!("creating GPU resources for screen {:?}", handle);
                let resources = ScreenResources::new(&ctx.device, ctx.config.format, screen);
                self.gpu_screens.push((handle, resources));
            }
        }
        Ok(())
    }
}

impl Default for WgpuEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for WgpuEngine {
    type Surface = Context;
    type Texture = CubeTexture;

    fn setup(&mut self, surface: Context) -> anyhow::Result<()> {
        if self.disposed {
            return Err(anyhow!("cannot set up a disposed engine"));
        }
        let size = surface.window.inner_size();
        self.ctx = Some(surface);
        self.resize(size.width, size.height);
        log::info!("engine set up at {}x{}", size.width, size.height);
        if let Some(ctx) = &self.ctx {
            ctx.request_redraw();
        }
        Ok(())
    }

    fn create_cube_texture(
        &mut self,
        faces: &CubeFaces,
        color_space: ColorSpace,
    ) -> anyhow::Result<CubeTexture> {
        let ctx = self
            .ctx
            .as_ref()
            .context("cube textures need a set up engine")?;
        CubeTexture::from_faces(&ctx.device, &ctx.queue, faces, color_space, Some("env cube texture"))
    }

    fn scene(&self) -> &Scene<CubeTexture> {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene<CubeTexture> {
        &mut self.scene
    }

    fn camera(&self) -> &Camera {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    fn update_controls(&mut self) {
        self.controls.update(&mut self.camera);
    }

    fn animation_loop(&mut self) -> &mut AnimationLoop<Self> {
        &mut self.animation
    }

    fn render(&mut self) -> anyhow::Result<()> {
        self.sync_gpu_screens()?;
        let ctx = self.ctx.as_ref().context("render called before setup")?;

        // keep the display loop going
        ctx.request_redraw();

        // Rendering requires the surface to be configured
        if !ctx.is_surface_configured {
            return Ok(());
        }

        for (handle, resources) in &self.gpu_screens {
            if let Some(screen) = self.scene.screen(*handle) {
                resources.write_uniforms(&ctx.queue, screen);
            }
        }

        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        encode_screens(
            &mut encoder,
            &view,
            self.scene.background,
            self.gpu_screens.iter().map(|(_, resources)| resources),
        );

        ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.animation.halt();
        for (_, resources) in self.gpu_screens.drain(..) {
            resources.destroy();
        }
        for screen in self.scene.clear() {
            screen.material.uniforms.t_env.value.destroy();
        }
        // dropping the context releases surface, device and queue
        self.ctx = None;
        log::info!("engine disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
