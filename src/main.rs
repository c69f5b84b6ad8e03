//! Pngcam CLI - converts a heightmap PNG into a G-code program on stdout.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pngcam::{Direction, Job, JobOptions, MeasurementSystem, Tool};
use std::io::Write;
use std::path::PathBuf;

/// Convert a grayscale heightmap into G-code for a CNC mill
#[derive(Parser, Debug)]
#[command(name = "pngcam")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Set the shape of the end mill (ball, flat, or vbit<angle>)
    #[arg(long, default_value = "ball")]
    tool_shape: String,

    /// Set the diameter of the end mill in mm
    #[arg(long, default_value = "6")]
    tool_diameter: f64,

    /// Set the maximum step-down in mm; deeper cuts are taken in multiple
    /// passes
    #[arg(long, default_value = "100")]
    step_down: f64,

    /// Set the distance to move the tool over per pass in mm
    #[arg(long, default_value = "5")]
    step_over: f64,

    /// Set the maximum feed rate in the X/Y plane in mm/min
    #[arg(long, default_value = "400")]
    xy_feed_rate: f64,

    /// Set the maximum feed rate in the Z axis in mm/min
    #[arg(long, default_value = "50")]
    z_feed_rate: f64,

    /// Set the maximum feed rate for rapid travel moves in mm/min
    #[arg(long, default_value = "10000")]
    rapid_feed_rate: f64,

    /// Set the spindle speed in RPM
    #[arg(long = "speed", default_value = "10000")]
    speed: f64,

    /// Only do the roughing passes and skip the finish pass
    #[arg(long)]
    roughing_only: bool,

    /// Set the clearance to leave around the part in mm, for a later
    /// finish pass to clean up
    #[arg(long, default_value = "0")]
    clearance: f64,

    /// Set the Z clearance to leave above the part during rapid moves
    #[arg(long, default_value = "5")]
    rapid_clearance: f64,

    /// Set whether the tool moves in horizontal or vertical lines
    #[arg(long, default_value = "horizontal")]
    route: String,

    /// Set the offset to add to X coordinates
    #[arg(long, default_value = "0")]
    x_offset: f64,

    /// Set the offset to add to Y coordinates
    #[arg(long, default_value = "0")]
    y_offset: f64,

    /// Set the offset to add to Z coordinates
    #[arg(long, default_value = "0")]
    z_offset: f64,

    /// Add horizontal movements to plunge cuts where possible, to reduce
    /// cutting forces
    #[arg(long)]
    ramp_entry: bool,

    /// Set the width of the image in mm
    #[arg(long, default_value = "100")]
    width: f64,

    /// Set the height of the image in mm
    #[arg(long, default_value = "100")]
    height: f64,

    /// Set the total depth of the part in mm
    #[arg(long, default_value = "10")]
    depth: f64,

    /// Set the diameter of the part for rotary carving
    #[arg(long)]
    diameter: Option<f64>,

    /// Rotary carving
    #[arg(long)]
    rotary: bool,

    /// Let the tool cut below the full depth if this allows better
    /// reproduction of the non-black parts of the heightmap
    #[arg(long = "deep-black")]
    deep_black: bool,

    /// Let the tool cut beyond the edges of the heightmap
    #[arg(long = "beyond-edges")]
    beyond_edges: bool,

    /// Don't bother cutting top surfaces that are at the upper limit of
    /// the heightmap
    #[arg(long)]
    omit_top: bool,

    /// All units in inches instead of mm; G-code output has G20 instead
    /// of G21
    #[arg(long)]
    imperial: bool,

    /// Read stock heightmap from a PNG file, to save cutting air in
    /// roughing passes
    #[arg(long)]
    read_stock: Option<PathBuf>,

    /// Write the output heightmap to a PNG file, to use with --read-stock
    #[arg(long)]
    write_stock: Option<PathBuf>,

    /// Pack the stock PNG depth across the R/G/B channels instead of
    /// writing grayscale
    #[arg(long)]
    rgb: bool,

    /// Max. velocity in mm/min for cycle time estimation
    #[arg(long, default_value = "4000")]
    max_vel: f64,

    /// Max. acceleration in mm/sec^2 for cycle time estimation
    #[arg(long, default_value = "50")]
    max_accel: f64,

    /// Suppress output of dimensions, resolutions, and progress
    #[arg(long, short)]
    quiet: bool,

    /// Heightmap PNG file
    #[arg(value_name = "HEIGHTMAPFILE")]
    heightmap: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    pngcam::init_logging(cli.quiet)?;

    let tool = Tool::from_shape(&cli.tool_shape, cli.tool_diameter)?;
    let direction: Direction = cli.route.parse().map_err(anyhow::Error::msg)?;

    let mut depth = cli.depth;
    let mut height = cli.height;
    let mut safe_z = cli.rapid_clearance;

    if let Some(diameter) = cli.diameter {
        if !cli.rotary {
            bail!("can't use diameter in non-rotary mode");
        }
        depth = diameter / 2.0;
    }

    if cli.rotary {
        // rotary parts are always 360 degrees around
        height = 360.0;
        safe_z += depth;
    }

    let options = JobOptions {
        heightmap_path: cli.heightmap,
        read_stock_path: cli.read_stock,
        write_stock_path: cli.write_stock,
        rgb_stock: cli.rgb,

        safe_z,
        rapid_feed: cli.rapid_feed_rate,
        xy_feed: cli.xy_feed_rate,
        z_feed: cli.z_feed_rate,
        rpm: cli.speed,

        width: cli.width,
        height,
        depth,
        rotary: cli.rotary,

        direction,

        step_over: cli.step_over,
        step_down: cli.step_down,

        tool,

        stock_to_leave: cli.clearance,

        roughing_only: cli.roughing_only,
        omit_top: cli.omit_top,
        ramp_entry: cli.ramp_entry,
        cut_below_bottom: cli.deep_black,
        cut_beyond_edges: cli.beyond_edges,

        units: if cli.imperial {
            MeasurementSystem::Imperial
        } else {
            MeasurementSystem::Metric
        },

        x_offset: cli.x_offset,
        y_offset: cli.y_offset,
        z_offset: cli.z_offset,

        max_vel: cli.max_vel,
        max_accel: cli.max_accel,

        quiet: cli.quiet,

        ..Default::default()
    };

    let mut job = Job::new(options)?;

    let progress = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("Generating path: [{bar:40.cyan/blue}] {pos}%")
                .unwrap()
                .progress_chars("#>-"),
        );
        bar
    };

    job.generate(|pct| progress.set_position((pct * 100.0) as u64));
    progress.finish_and_clear();

    let gcode = job.gcode();

    std::io::stdout()
        .write_all(gcode.as_bytes())
        .context("write G-code to stdout")?;

    Ok(())
}
