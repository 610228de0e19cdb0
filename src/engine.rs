//! The engine contract the screen controller is written against.
//!
//! The controller never reaches for a global renderer; it receives an
//! [`Engine`] and talks to it through this trait. [`crate::render::WgpuEngine`]
//! implements it on top of wgpu, tests implement it without a GPU.
//!
//! # Key types
//!
//! - [`Engine`] owns the surface, scene, camera and controls
//! - [`Scene`] is the flat list of screens plus the background colour
//! - [`AnimationLoop`] stores the per-frame callbacks and runs them on [`Engine::tick`]
//!

use crate::{
    camera::{Camera, OrbitControls},
    data_structures::{screen::Screen, texture::ColorSpace},
    resources::texture::CubeFaces,
};

/// A per-frame callback registered with [`Engine::animation`].
pub type FrameCallback<E> = Box<dyn FnMut(&mut E) -> anyhow::Result<()>>;

/// Index of a screen inside a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenHandle(pub(crate) usize);

/// Renderable content of an engine.
#[derive(Debug)]
pub struct Scene<T> {
    pub background: wgpu::Color,
    screens: Vec<Option<Screen<T>>>,
}

impl<T> Scene<T> {
    pub fn new() -> Self {
        Self {
            background: wgpu::Color::BLACK,
            screens: Vec::new(),
        }
    }

    pub fn add(&mut self, screen: Screen<T>) -> ScreenHandle {
        self.screens.push(Some(screen));
        ScreenHandle(self.screens.len() - 1)
    }

    pub fn remove(&mut self, handle: ScreenHandle) -> Option<Screen<T>> {
        self.screens.get_mut(handle.0).and_then(Option::take)
    }

    pub fn screen(&self, handle: ScreenHandle) -> Option<&Screen<T>> {
        self.screens.get(handle.0).and_then(Option::as_ref)
    }

    pub fn screen_mut(&mut self, handle: ScreenHandle) -> Option<&mut Screen<T>> {
        self.screens.get_mut(handle.0).and_then(Option::as_mut)
    }

    pub fn screens(&self) -> impl Iterator<Item = (ScreenHandle, &Screen<T>)> {
        self.screens
            .iter()
            .enumerate()
            .filter_map(|(idx, screen)| screen.as_ref().map(|s| (ScreenHandle(idx), s)))
    }

    pub fn len(&self) -> usize {
        self.screens.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every screen and hand them back, e.g. to release their GPU resources.
    pub fn clear(&mut self) -> Vec<Screen<T>> {
        self.screens.drain(..).flatten().collect()
    }
}

impl<T> Default for Scene<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Registered frame callbacks and whether the loop was halted by a dispose.
pub struct AnimationLoop<E> {
    callbacks: Vec<FrameCallback<E>>,
    halted: bool,
}

impl<E> AnimationLoop<E> {
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
            halted: false,
        }
    }

    pub fn register(&mut self, callback: FrameCallback<E>) {
        if self.halted {
            log::warn!("frame callback registered after dispose, ignoring it");
            return;
        }
        self.callbacks.push(callback);
    }

    /// Drop all callbacks; no frame callback runs after this returns.
    pub fn halt(&mut self) {
        self.halted = true;
        self.callbacks.clear();
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    fn take(&mut self) -> Vec<FrameCallback<E>> {
        std::mem::take(&mut self.callbacks)
    }

    // Callbacks registered while the taken ones ran go after them.
    fn restore(&mut self, mut callbacks: Vec<FrameCallback<E>>) {
        if self.halted {
            return;
        }
        callbacks.append(&mut self.callbacks);
        self.callbacks = callbacks;
    }
}

impl<E> Default for AnimationLoop<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Renderer, scene graph, camera and orbit controls behind one handle.
pub trait Engine: Sized + 'static {
    /// What [`setup`](Self::setup) attaches the engine to.
    type Surface;
    /// GPU handle of a cube texture.
    type Texture;

    /// Attach the engine to its rendering surface.
    fn setup(&mut self, surface: Self::Surface) -> anyhow::Result<()>;

    /// Upload decoded faces as a cube texture. Requires [`setup`](Self::setup).
    fn create_cube_texture(
        &mut self,
        faces: &CubeFaces,
        color_space: ColorSpace,
    ) -> anyhow::Result<Self::Texture>;

    fn scene(&self) -> &Scene<Self::Texture>;
    fn scene_mut(&mut self) -> &mut Scene<Self::Texture>;

    fn camera(&self) -> &Camera;
    fn camera_mut(&mut self) -> &mut Camera;

    fn controls_mut(&mut self) -> &mut OrbitControls;

    /// Advance the controls' damping and move the camera accordingly.
    fn update_controls(&mut self);

    fn animation_loop(&mut self) -> &mut AnimationLoop<Self>;

    /// Draw one frame of the scene.
    fn render(&mut self) -> anyhow::Result<()>;

    /// Release all GPU resources and halt the animation loop.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;

    /// Register a callback invoked once per frame until [`dispose`](Self::dispose).
    fn animation(&mut self, callback: FrameCallback<Self>) {
        self.animation_loop().register(callback);
    }

    /// Run every registered frame callback once.
    ///
    /// Stops at the first failing callback. A dispose issued by a callback
    /// prevents the remaining callbacks from running.
    fn tick(&mut self) -> anyhow::Result<()> {
        let mut callbacks = self.animation_loop().take();
        let mut result = Ok(());
        for callback in callbacks.iter_mut() {
            if self.animation_loop().is_halted() {
                break;
            }
            if let Err(e) = callback(self) {
                result = Err(e);
                break;
            }
        }
        self.animation_loop().restore(callbacks);
        result
    }
}

/// Convert a `0xRRGGBB` sRGB colour to the linear colour wgpu clears with.
pub fn colour_from_hex(hex: u32) -> wgpu::Color {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f64 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    wgpu::Color {
        r: channel(16),
        g: channel(8),
        b: channel(0),
        a: 1.0,
    }
}
