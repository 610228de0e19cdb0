//! Perspective camera and damped orbit controls.
//!
//! [`Camera`] holds the state the screen shader consumes every frame: the
//! world position, the camera-to-world matrix and the projection matrix
//! together with its inverse. [`OrbitControls`] moves the camera on a sphere
//! around a target from mouse input, smoothing the motion with damping when
//! enabled.

use std::f32::consts::PI;

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, Zero};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

/// cgmath produces OpenGL clip space (z in [-1, 1]); wgpu expects z in [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A perspective camera.
///
/// `matrix_world` is the camera-to-world transform, i.e. the inverse of the
/// view matrix. Call [`look_at`](Self::look_at) after moving the camera and
/// [`update_projection_matrix`](Self::update_projection_matrix) after changing
/// the lens so both stay consistent.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Rad<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    pub matrix_world: Matrix4<f32>,
    pub projection_matrix: Matrix4<f32>,
    pub projection_matrix_inverse: Matrix4<f32>,
}

impl Camera {
    pub fn new<F: Into<Rad<f32>>>(fovy: F, aspect: f32, znear: f32, zfar: f32) -> Self {
        let mut camera = Self {
            position: Point3::origin(),
            up: Vector3::unit_y(),
            fovy: fovy.into(),
            aspect,
            znear,
            zfar,
            matrix_world: Matrix4::identity(),
            projection_matrix: Matrix4::identity(),
            projection_matrix_inverse: Matrix4::identity(),
        };
        camera.update_projection_matrix();
        camera
    }

    /// Orient the camera towards `target`, rebuilding `matrix_world`.
    ///
    /// The translation always follows `position`. A camera sitting on the
    /// target looks down -Z; one looking exactly along `up` is nudged off the
    /// axis so the basis stays defined.
    pub fn look_at(&mut self, target: Point3<f32>) {
        let mut z = self.position - target;
        if z.magnitude2() == 0.0 {
            z.z = 1.0;
        }
        let mut z = z.normalize();
        let mut x = self.up.cross(z);
        if x.magnitude2() == 0.0 {
            if self.up.z.abs() == 1.0 {
                z.x += 0.0001;
            } else {
                z.z += 0.0001;
            }
            z = z.normalize();
            x = self.up.cross(z);
        }
        let x = x.normalize();
        let y = z.cross(x);
        self.matrix_world = Matrix4::from_cols(
            x.extend(0.0),
            y.extend(0.0),
            z.extend(0.0),
            self.position.to_homogeneous(),
        );
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
        self.update_projection_matrix();
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection_matrix =
            OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar);
        if let Some(inverse) = self.projection_matrix.invert() {
            self.projection_matrix_inverse = inverse;
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(cgmath::Deg(50.0), 1.0, 0.1, 100.0)
    }
}

/// Spherical coordinates around the orbit target.
///
/// `phi` is the polar angle measured from +Y, `theta` the azimuth around +Y
/// measured from +Z.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(&self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// Orbit a camera around a target with the mouse.
///
/// Left drag rotates, right drag pans the target in screen space, the wheel
/// dollies. Input only accumulates a pending delta, the camera moves on
/// [`update`](Self::update) which the frame loop calls once per frame.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub enable_pan: bool,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    spherical_delta: Spherical,
    scale: f32,
    // pixels dragged since the last update
    pan_pixels: (f32, f32),
    pan_offset: Vector3<f32>,
    viewport_height: f32,
    rotating: bool,
    panning: bool,
    cursor: Option<PhysicalPosition<f64>>,
}

impl OrbitControls {
    const EPS: f32 = 0.000001;

    pub fn new(target: Point3<f32>) -> Self {
        Self {
            target,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            enable_pan: true,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            spherical_delta: Spherical::default(),
            scale: 1.0,
            pan_pixels: (0.0, 0.0),
            pan_offset: Vector3::zero(),
            viewport_height: 1.0,
            rotating: false,
            panning: false,
            cursor: None,
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    pub fn dolly_in(&mut self, scale: f32) {
        self.scale /= scale;
    }

    pub fn dolly_out(&mut self, scale: f32) {
        self.scale *= scale;
    }

    /// Drag the target by `dx`, `dy` pixels, right and down positive.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if !self.enable_pan {
            return;
        }
        self.pan_pixels.0 += dx;
        self.pan_pixels.1 += dy;
    }

    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// The rotation still waiting to be applied to the camera.
    pub fn pending_rotation(&self) -> Spherical {
        self.spherical_delta
    }

    /// The target translation still waiting to be applied.
    pub fn pending_pan(&self) -> Vector3<f32> {
        self.pan_offset
    }

    fn zoom_scale(&self) -> f32 {
        0.95_f32.powf(self.zoom_speed)
    }

    /// Accumulate input from a window event. Returns whether it was consumed.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.rotating = *state == ElementState::Pressed;
                true
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Right,
                ..
            } => {
                self.panning = *state == ElementState::Pressed;
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.cursor.replace(*position);
                let Some(previous) = previous else {
                    return false;
                };
                let dx = (position.x - previous.x) as f32;
                let dy = (position.y - previous.y) as f32;
                if self.rotating {
                    let unit = 2.0 * PI * self.rotate_speed / self.viewport_height;
                    self.rotate_left(dx * unit);
                    self.rotate_up(dy * unit);
                    true
                } else if self.panning {
                    self.pan(dx, dy);
                    true
                } else {
                    false
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                };
                if dy > 0.0 {
                    self.dolly_in(self.zoom_scale());
                } else if dy < 0.0 {
                    self.dolly_out(self.zoom_scale());
                }
                true
            }
            _ => false,
        }
    }

    /// Apply the pending rotation, pan and dolly to `camera`.
    ///
    /// With damping only `damping_factor` of the pending rotation and pan is
    /// applied and the rest decays, otherwise both are applied in full.
    /// Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let before = camera.position;
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(offset);

        if self.pan_pixels != (0.0, 0.0) {
            // the visible half height at the target's distance spans half the viewport
            let half_height = offset.magnitude() * (camera.fovy.0 / 2.0).tan();
            let unit = 2.0 * half_height * self.pan_speed / self.viewport_height;
            let right = camera.matrix_world.x.truncate();
            let up = camera.matrix_world.y.truncate();
            let (dx, dy) = self.pan_pixels;
            self.pan_offset += up * (dy * unit) - right * (dx * unit);
            self.pan_pixels = (0.0, 0.0);
        }

        if self.enable_damping {
            spherical.theta += self.spherical_delta.theta * self.damping_factor;
            spherical.phi += self.spherical_delta.phi * self.damping_factor;
        } else {
            spherical.theta += self.spherical_delta.theta;
            spherical.phi += self.spherical_delta.phi;
        }
        spherical.phi = spherical.phi.clamp(Self::EPS, PI - Self::EPS);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        if self.enable_damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        camera.position = self.target + spherical.to_offset();
        camera.look_at(self.target);

        if self.enable_damping {
            self.spherical_delta.theta *= 1.0 - self.damping_factor;
            self.spherical_delta.phi *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vector3::zero();
        }
        self.scale = 1.0;

        (camera.position - before).magnitude2() > Self::EPS
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(Point3::origin())
    }
}
