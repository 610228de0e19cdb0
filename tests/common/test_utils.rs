#![allow(dead_code)]

use std::{collections::HashMap, io::Cursor};

use anyhow::{anyhow, bail};
use ray_transmission::{
    camera::{Camera, OrbitControls},
    data_structures::texture::ColorSpace,
    engine::{AnimationLoop, Engine, Scene},
    resources::{AssetSource, texture::CubeFaces},
    screen::ScreenConfig,
};

/// Stand-in for the GPU texture: remembers what was uploaded.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MockTexture {
    pub(crate) size: u32,
    pub(crate) color_space: ColorSpace,
}

/// Engine without a GPU. Counts calls and records what each render saw.
pub(crate) struct MockEngine {
    pub(crate) surface: Option<&'static str>,
    pub(crate) setup_calls: u32,
    pub(crate) render_calls: u32,
    pub(crate) dispose_calls: u32,
    pub(crate) fail_texture_upload: bool,
    scene: Scene<MockTexture>,
    camera: Camera,
    controls: OrbitControls,
    animation: AnimationLoop<Self>,
    disposed: bool,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self {
            surface: None,
            setup_calls: 0,
            render_calls: 0,
            dispose_calls: 0,
            fail_texture_upload: false,
            scene: Scene::new(),
            camera: Camera::new(cgmath::Deg(50.0), 16.0 / 9.0, 0.1, 100.0),
            controls: OrbitControls::default(),
            animation: AnimationLoop::new(),
            disposed: false,
        }
    }

    pub(crate) fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub(crate) fn registered_callbacks(&mut self) -> usize {
        self.animation.len()
    }
}

impl Engine for MockEngine {
    type Surface = &'static str;
    type Texture = MockTexture;

    fn setup(&mut self, surface: &'static str) -> anyhow::Result<()> {
        if self.disposed {
            bail!("cannot set up a disposed engine");
        }
        self.setup_calls += 1;
        self.surface = Some(surface);
        Ok(())
    }

    fn create_cube_texture(
        &mut self,
        faces: &CubeFaces,
        color_space: ColorSpace,
    ) -> anyhow::Result<MockTexture> {
        if self.surface.is_none() {
            bail!("cube textures need a set up engine");
        }
        if self.fail_texture_upload {
            bail!("out of GPU memory");
        }
        Ok(MockTexture {
            size: faces.size(),
            color_space,
        })
    }

    fn scene(&self) -> &Scene<MockTexture> {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene<MockTexture> {
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
        if self.surface.is_none() {
            return Err(anyhow!("render called before setup"));
        }
        self.render_calls += 1;
        Ok(())
    }

    fn dispose(&mut self) {
        self.dispose_calls += 1;
        self.disposed = true;
        self.animation.halt();
        self.scene.clear();
        self.surface = None;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// In-memory asset source serving encoded images by path.
#[derive(Clone, Default)]
pub(crate) struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serve a PNG of `width` x `height` pixels at `path`.
    pub(crate) fn with_png(mut self, path: &str, width: u32, height: u32) -> Self {
        self.files.insert(path.to_string(), png(width, height));
        self
    }

    pub(crate) fn with_bytes(mut self, path: &str, bytes: &[u8]) -> Self {
        self.files.insert(path.to_string(), bytes.to_vec());
        self
    }

    pub(crate) fn without(mut self, path: &str) -> Self {
        self.files.remove(path);
        self
    }

    /// All six default faces as square PNGs of `size` pixels.
    pub(crate) fn cube(config: &ScreenConfig, size: u32) -> Self {
        config.faces.iter().fold(Self::new(), |assets, face| {
            assets.with_png(&format!("{}{}", config.asset_prefix, face), size, size)
        })
    }
}

impl AssetSource for MemoryAssets {
    async fn load_binary(&self, file_name: &str) -> anyhow::Result<Vec<u8>> {
        self.files
            .get(file_name)
            .cloned()
            .ok_or_else(|| anyhow!("404 Not Found: {file_name}"))
    }
}

pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 40) as u8, (y * 40) as u8, 128, 255])
    });
    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encoding a test png");
    bytes.into_inner()
}

pub(crate) fn faces(size: u32) -> CubeFaces {
    let face = image::RgbaImage::new(size, size);
    CubeFaces::new([
        face.clone(),
        face.clone(),
        face.clone(),
        face.clone(),
        face.clone(),
        face,
    ])
    .expect("square faces of equal size")
}

pub(crate) fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}
