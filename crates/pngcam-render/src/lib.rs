//! # Pngcam Render
//!
//! The inverse ingress of the pngcam pipeline: rasterizes a triangle mesh
//! into the same heightmap representation the CAM side consumes, either as
//! a flat top-down projection or as a rotary unwrap.

pub mod mesh;
pub mod raster;
pub mod renderer;

pub use mesh::{Mesh, Triangle};
pub use raster::DepthBuffer;
pub use renderer::{RenderOptions, Renderer};
