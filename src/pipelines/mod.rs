//! Render pipelines.
//!
//! - `screen` builds the refraction pipeline, its bind group layout and the
//!   per-screen GPU resources

pub mod screen;
