//! Data structures: the screen quad with its material, and cube textures.
//!
//! - `screen` contains the plane geometry, shader material and uniform slots
//! - `texture` contains the GPU cube texture and its colour-space annotation

pub mod screen;
pub mod texture;
