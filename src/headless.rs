//! Offscreen rendering without a window.
//!
//! Draws screens into a texture and reads the pixels back, so the shader,
//! uniform layout and pipeline can be checked by integration tests on any
//! machine with a GPU (or a software adapter).

use std::{iter, time::Duration};

use anyhow::Context as _;

use crate::{
    data_structures::{screen::Screen, texture::CubeTexture},
    pipelines::screen::{ScreenResources, encode_screens},
};

pub struct Headless {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Headless {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub async fn new() -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter available for offscreen rendering")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("headless device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("cannot acquire a GPU device")?;
        Ok(Self { device, queue })
    }

    /// Clear a `width` x `height` target to `background`, draw `screen` over it
    /// and return the resulting pixels.
    pub async fn render(
        &self,
        screen: &Screen<CubeTexture>,
        background: wgpu::Color,
        width: u32,
        height: u32,
    ) -> anyhow::Result<image::RgbaImage> {
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let target = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("headless target"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let resources = ScreenResources::new(&self.device, Self::FORMAT, screen);
        resources.write_uniforms(&self.queue, screen);

        // rows of a texture-to-buffer copy are padded to the copy alignment
        let row_bytes = 4 * width;
        let padded_row_bytes = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("headless readback"),
            size: (padded_row_bytes * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Headless Encoder"),
            });
        encode_screens(&mut encoder, &view, background, iter::once(&resources));
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(height),
                },
            },
            extent,
        );
        self.queue.submit(iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })
            .context("the GPU did not finish the offscreen frame")?;
        rx.receive()
            .await
            .context("the readback buffer was never mapped")??;

        let mut pixels = Vec::with_capacity((row_bytes * height) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in data.chunks(padded_row_bytes as usize) {
                pixels.extend_from_slice(&row[..row_bytes as usize]);
            }
        }
        output_buffer.unmap();
        resources.destroy();
        target.destroy();

        image::RgbaImage::from_raw(width, height, pixels)
            .context("readback does not match the target size")
    }
}
