//! # Pngcam Core
//!
//! Core types shared by the pngcam CAM pipeline and the STL renderer:
//! error handling and measurement units.

pub mod error;
pub mod units;

pub use error::{Error, Result};
pub use units::MeasurementSystem;
