//! # Pngcam
//!
//! Converts a grayscale depth image (a heightmap) into a G-code program
//! that carves the depicted surface into a workpiece on a 3-axis (or
//! rotary 4-axis) CNC mill, and renders STL meshes into such heightmaps.
//!
//! ## Architecture
//!
//! Pngcam is organized as a workspace with three crates:
//!
//! 1. **pngcam-core** - Error types and measurement units
//! 2. **pngcam-cam** - Heightmap dilation, toolpath generation, path
//!    transforms, G-code emission, stock simulation
//! 3. **pngcam-render** - STL mesh to heightmap rasterizer
//!
//! plus this root crate, which carries the `pngcam` and `pngcam-render`
//! binaries.

// Re-export the library surface for the binaries
pub use pngcam_cam::{
    Direction, FeedKind, GcodeEmitter, HeightmapImage, Job, JobOptions, Tool, Toolpath,
    ToolpathSegment, Toolpoint, ToolpointsMap,
};
pub use pngcam_core::{Error, MeasurementSystem, Result};
pub use pngcam_render::{DepthBuffer, Mesh, RenderOptions, Renderer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging to stderr.
///
/// Stdout carries the G-code program, so all diagnostics go to stderr.
/// `RUST_LOG` overrides the default level; `--quiet` drops it to errors
/// only.
pub fn init_logging(quiet: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = if quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::INFO
    };
    let env_filter = EnvFilter::from_default_env().add_directive(default_level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
