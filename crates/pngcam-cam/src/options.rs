//! Job parameters.
//!
//! A [`JobOptions`] is built once from the command line, finalised with the
//! pixel dimensions of the heightmap, and then threaded read-only through
//! the whole pipeline. It also owns the two pieces of arithmetic that
//! everything else leans on: feed-rate selection for a move, and the
//! mm<->pixel coordinate conversion.

use crate::tool::Tool;
use crate::toolpath::Toolpoint;
use pngcam_core::MeasurementSystem;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

const EPSILON: f64 = 1e-5;

/// Raster scan direction for the main toolpath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Rows run along the X axis, stepping over in Y.
    Horizontal,
    /// Rows run along the Y axis, stepping over in X.
    Vertical,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "horizontal" => Ok(Self::Horizontal),
            "vertical" => Ok(Self::Vertical),
            _ => Err(format!("unrecognised route: {}", s)),
        }
    }
}

/// All parameters for one carving job.
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Path of the heightmap PNG.
    pub heightmap_path: PathBuf,
    /// Optional stock heightmap to read, to save cutting air in roughing.
    pub read_stock_path: Option<PathBuf>,
    /// Optional stock heightmap to write after simulating the cut.
    pub write_stock_path: Option<PathBuf>,
    /// Write the stock PNG with the depth packed across R/G/B rather than
    /// replicated as grayscale.
    pub rgb_stock: bool,

    /// Z height that is safe for rapid travel.
    pub safe_z: f64,
    /// Feed rate for rapid moves, units/min.
    pub rapid_feed: f64,
    /// Maximum feed rate in the XY plane, units/min.
    pub xy_feed: f64,
    /// Maximum feed rate in Z, units/min.
    pub z_feed: f64,
    /// Spindle speed in RPM.
    pub rpm: f64,

    /// Workpiece width.
    pub width: f64,
    /// Workpiece height (360 degrees in rotary mode).
    pub height: f64,
    /// Total depth of the part.
    pub depth: f64,
    /// Wrap the Y axis around a cylinder; Y becomes an angle in degrees.
    pub rotary: bool,

    /// Raster scan direction.
    pub direction: Direction,

    /// Distance between adjacent raster rows.
    pub step_over: f64,
    /// Maximum depth of cut per roughing pass.
    pub step_down: f64,

    /// The cutter.
    pub tool: Tool,

    /// Uniform offset added to every cut depth, to leave material for a
    /// later finish pass.
    pub stock_to_leave: f64,

    /// Only emit the roughing passes.
    pub roughing_only: bool,
    /// Skip cutting surfaces at the top of the heightmap.
    pub omit_top: bool,
    /// Replace steep plunges with in-line ramps where possible.
    pub ramp_entry: bool,
    /// Let the tool cut below the full depth where that reproduces the
    /// non-black parts of the heightmap better.
    pub cut_below_bottom: bool,
    /// Let the tool cut beyond the edges of the heightmap.
    pub cut_beyond_edges: bool,

    /// Unit system; affects only the G-code preamble and log labels.
    pub units: MeasurementSystem,

    /// Offset added to emitted X coordinates.
    pub x_offset: f64,
    /// Offset added to emitted Y coordinates.
    pub y_offset: f64,
    /// Offset added to emitted Z coordinates.
    pub z_offset: f64,

    /// Velocity cap for cycle-time estimation, units/min.
    pub max_vel: f64,
    /// Acceleration cap for cycle-time estimation, units/sec².
    pub max_accel: f64,

    /// Suppress progress and dimension output.
    pub quiet: bool,

    /// Size of one pixel in the X axis; derived from width / width_px.
    pub x_mm_per_px: f64,
    /// Size of one pixel in the Y axis; derived from height / height_px.
    pub y_mm_per_px: f64,
    /// Heightmap width in pixels.
    pub width_px: i32,
    /// Heightmap height in pixels.
    pub height_px: i32,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            heightmap_path: PathBuf::new(),
            read_stock_path: None,
            write_stock_path: None,
            rgb_stock: false,

            safe_z: 5.0,
            rapid_feed: 10000.0,
            xy_feed: 400.0,
            z_feed: 50.0,
            rpm: 10000.0,

            width: 100.0,
            height: 100.0,
            depth: 10.0,
            rotary: false,

            direction: Direction::Horizontal,

            step_over: 5.0,
            step_down: 100.0,

            tool: Tool::Ball { radius: 3.0 },

            stock_to_leave: 0.0,

            roughing_only: false,
            omit_top: false,
            ramp_entry: false,
            cut_below_bottom: false,
            cut_beyond_edges: false,

            units: MeasurementSystem::Metric,

            x_offset: 0.0,
            y_offset: 0.0,
            z_offset: 0.0,

            max_vel: 4000.0,
            max_accel: 50.0,

            quiet: false,

            x_mm_per_px: 1.0,
            y_mm_per_px: 1.0,
            width_px: 0,
            height_px: 0,
        }
    }
}

impl JobOptions {
    /// Record the heightmap's pixel dimensions and derive the per-pixel
    /// resolution from the workpiece size.
    pub fn set_resolution(&mut self, width_px: u32, height_px: u32) {
        self.width_px = width_px as i32;
        self.height_px = height_px as i32;
        self.x_mm_per_px = self.width / width_px as f64;
        self.y_mm_per_px = self.height / height_px as f64;
    }

    /// Select the feed rate for the move from `start` to `end`.
    ///
    /// Retracts (pure vertical upward moves) take the rapid feed. Otherwise
    /// the limiting axis decides: shallow moves are limited by the XY feed,
    /// steep downward moves by the Z feed scaled so that the effective Z
    /// velocity reaches `z_feed`. In rotary mode the Y distance is an arc
    /// length and the result is an inverse-time feed (moves per minute).
    pub fn feed_rate(&self, start: &Toolpoint, end: &Toolpoint) -> f64 {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let dz = end.z - start.z;

        let mut xy_dist = (dx * dx + dy * dy).sqrt();
        let z_dist = dz;

        if self.rotary {
            // TODO: this is only an approximation of the arc length; the
            // radius varies over the move
            let high_z = start.z.max(end.z);
            let arc_length = std::f64::consts::PI * high_z * 2.0 * dy / 360.0;
            xy_dist = (arc_length * arc_length + dx * dx).sqrt();
        }

        let total_dist = (xy_dist * xy_dist + z_dist * z_dist).sqrt();

        // rapid feed on vertical upwards movement with no XY component;
        // anything else, including a degenerate zero-length move, falls
        // through to the limiting-axis selection
        let mut units_per_min = self.rapid_feed;
        if xy_dist >= EPSILON || z_dist <= 0.0 {
            if z_dist >= 0.0 || (xy_dist / z_dist).abs() > (self.xy_feed / self.z_feed).abs() {
                // XY feed is the limiting factor
                units_per_min = self.xy_feed;
            } else {
                // Z feed is the limiting factor; scale so the Z component
                // of the velocity reaches z_feed
                units_per_min = (total_dist / z_dist).abs() * self.z_feed;
            }
        }

        if self.rotary {
            // rotary moves use inverse-time feed rates
            if total_dist < EPSILON {
                return self.rapid_feed;
            }
            units_per_min / total_dist
        } else {
            units_per_min
        }
    }

    /// Convert a position to pixel coordinates. The Y axis is inverted so
    /// that pixel (0, height_px-1) is position (0, 0) with +Y upward. In
    /// rotary mode the Y pixel wraps around the cylinder.
    pub fn mm_to_px(&self, x: f64, y: f64) -> (i32, i32) {
        let x_px = (x / self.x_mm_per_px) as i32;
        let mut y_px = (-y / self.y_mm_per_px) as i32 + self.height_px - 1;
        if self.rotary {
            y_px = y_px.rem_euclid(self.height_px);
        }
        (x_px, y_px)
    }

    /// Convert pixel coordinates back to a position. Inverse of
    /// [`mm_to_px`](Self::mm_to_px) up to one-pixel truncation.
    pub fn px_to_mm(&self, x: i32, y: i32) -> (f64, f64) {
        let x_mm = x as f64 * self.x_mm_per_px;
        let y_mm = (self.height_px - 1 - y) as f64 * self.y_mm_per_px;
        (x_mm, y_mm)
    }
}
