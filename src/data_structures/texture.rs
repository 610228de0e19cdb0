//! GPU cube textures.
//!
//! This module provides [`CubeTexture`], the environment map sampled by the
//! screen shader, and [`ColorSpace`], the annotation deciding how the texel
//! values of the loaded faces are interpreted.

use anyhow::*;

use crate::resources::texture::CubeFaces;

/// How the bytes of a loaded image are interpreted when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    /// Bytes are sampled as-is.
    #[default]
    LinearSrgb,
    /// Bytes are sRGB encoded and decoded to linear on sampling.
    Srgb,
}

impl ColorSpace {
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            ColorSpace::LinearSrgb => wgpu::TextureFormat::Rgba8Unorm,
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

/// Six square images uploaded as the layers of one cube texture.
///
/// Layers follow the wgpu cube order +X, -X, +Y, -Y, +Z, -Z.
#[derive(Debug)]
pub struct CubeTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub color_space: ColorSpace,
    pub size: u32,
}

impl CubeTexture {
    pub fn from_faces(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &CubeFaces,
        color_space: ColorSpace,
        label: Option<&str>,
    ) -> Result<Self> {
        let size = faces.size();
        ensure!(size > 0, "cube map faces are empty");
        let max = device.limits().max_texture_dimension_2d;
        ensure!(
            size <= max,
            "cube map faces are {size}px wide, the device supports at most {max}px"
        );

        let extent = wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 6,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: color_space.texture_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                },
                face.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * size),
                    rows_per_image: Some(size),
                },
                wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label,
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            color_space,
            size,
        })
    }

    pub fn destroy(&self) {
        self.texture.destroy();
    }
}
