//! # Pngcam CAM
//!
//! The toolpath computation pipeline: heightmap sampling, Minkowski-style
//! dilation of the surface by the tool profile, serpentine path generation,
//! level-based roughing, path transforms (simplification, nearest-neighbour
//! ordering, ramp entries, segment combining, cycle-time estimation),
//! G-code emission, and the forward stock simulation.

pub mod gcode;
pub mod heightmap;
pub mod job;
pub mod options;
pub mod tool;
pub mod toolpath;
pub mod toolpoints;

pub use gcode::GcodeEmitter;
pub use heightmap::HeightmapImage;
pub use job::Job;
pub use options::{Direction, JobOptions};
pub use tool::Tool;
pub use toolpath::{FeedKind, Toolpath, ToolpathSegment, Toolpoint};
pub use toolpoints::ToolpointsMap;
