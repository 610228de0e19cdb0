//! The screen: a 2x2 plane paired with the refraction shader material.
//!
//! The plane spans clip space exactly, so the vertex stage passes it through
//! and every pixel of the surface runs the fragment shader once. The material
//! carries the named uniform slots the shader reads.

use cgmath::{Matrix4, Point3};

use crate::camera::Camera;

/// Vertex of the plane: position in the plane's local space.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScreenVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl ScreenVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ScreenVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// A single segment plane in the XY plane facing +Z.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneGeometry {
    pub width: f32,
    pub height: f32,
    pub vertices: Vec<ScreenVertex>,
    pub indices: Vec<u16>,
}

impl PlaneGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        let vertices = vec![
            ScreenVertex {
                position: [-hw, hh, 0.0],
                uv: [0.0, 1.0],
            },
            ScreenVertex {
                position: [hw, hh, 0.0],
                uv: [1.0, 1.0],
            },
            ScreenVertex {
                position: [-hw, -hh, 0.0],
                uv: [0.0, 0.0],
            },
            ScreenVertex {
                position: [hw, -hh, 0.0],
                uv: [1.0, 0.0],
            },
        ];
        // counter-clockwise seen from +Z
        let indices = vec![0, 2, 1, 2, 3, 1];
        Self {
            width,
            height,
            vertices,
            indices,
        }
    }
}

/// A named shader input.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform<V> {
    pub name: &'static str,
    pub value: V,
}

impl<V> Uniform<V> {
    pub fn new(name: &'static str, value: V) -> Self {
        Self { name, value }
    }
}

/// The uniform slots of the refraction shader.
///
/// The camera slots hold copies of the camera values; the frame callback
/// overwrites all three every frame so they never lag behind the camera.
#[derive(Debug, Clone)]
pub struct ScreenUniforms<T> {
    pub t_env: Uniform<T>,
    pub u_camera_position: Uniform<Point3<f32>>,
    pub u_projection_matrix_inverse: Uniform<Matrix4<f32>>,
    pub u_view_matrix_inverse: Uniform<Matrix4<f32>>,
}

impl<T> ScreenUniforms<T> {
    pub fn new(t_env: T, camera: &Camera) -> Self {
        Self {
            t_env: Uniform::new("tEnv", t_env),
            u_camera_position: Uniform::new("uCameraPosition", camera.position),
            u_projection_matrix_inverse: Uniform::new(
                "uProjectionMatrixInverse",
                camera.projection_matrix_inverse,
            ),
            u_view_matrix_inverse: Uniform::new("uViewMatrixInverse", camera.matrix_world),
        }
    }

    /// Overwrite the camera slots with the camera's current values.
    pub fn sync_camera(
        &mut self,
        position: Point3<f32>,
        projection_matrix_inverse: Matrix4<f32>,
        view_matrix_inverse: Matrix4<f32>,
    ) {
        self.u_projection_matrix_inverse.value = projection_matrix_inverse;
        self.u_camera_position.value = position;
        self.u_view_matrix_inverse.value = view_matrix_inverse;
    }

    pub fn to_raw(&self) -> ScreenUniformsRaw {
        ScreenUniformsRaw {
            projection_matrix_inverse: self.u_projection_matrix_inverse.value.into(),
            view_matrix_inverse: self.u_view_matrix_inverse.value.into(),
            camera_position: self.u_camera_position.value.into(),
            _padding: 0,
        }
    }
}

/// GPU layout of the non-texture uniform slots.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScreenUniformsRaw {
    pub projection_matrix_inverse: [[f32; 4]; 4],
    pub view_matrix_inverse: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    pub _padding: u32,
}

/// Shader program plus its inputs and blend state.
#[derive(Debug, Clone)]
pub struct ShaderMaterial<T> {
    pub uniforms: ScreenUniforms<T>,
    pub shader: &'static str,
    pub transparent: bool,
}

/// The refraction screen: plane geometry and its material.
#[derive(Debug, Clone)]
pub struct Screen<T> {
    pub geometry: PlaneGeometry,
    pub material: ShaderMaterial<T>,
}

impl<T> Screen<T> {
    pub const WIDTH: f32 = 2.0;
    pub const HEIGHT: f32 = 2.0;

    /// Build the screen around `env`, seeding the camera slots from `camera`.
    pub fn new(env: T, camera: &Camera) -> Self {
        Self {
            geometry: PlaneGeometry::new(Self::WIDTH, Self::HEIGHT),
            material: ShaderMaterial {
                uniforms: ScreenUniforms::new(env, camera),
                shader: crate::pipelines::screen::SCREEN_SHADER,
                transparent: true,
            },
        }
    }
}
