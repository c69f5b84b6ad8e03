//! Pngcam-render CLI - renders an STL mesh into a heightmap PNG.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pngcam::{RenderOptions, Renderer};
use std::path::PathBuf;

/// Render an STL mesh into a heightmap PNG
#[derive(Parser, Debug)]
#[command(name = "pngcam-render")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Set the width of the part in pixels
    #[arg(long, default_value = "400")]
    width: u32,

    /// Set the height of the part in pixels
    #[arg(long, default_value = "400")]
    height: u32,

    /// Output PNG filename (default: the STL filename with .png appended)
    #[arg(long)]
    png: Option<PathBuf>,

    /// Draw the bottom side instead of the top
    #[arg(long)]
    bottom: bool,

    /// Rotary carving
    #[arg(long)]
    rotary: bool,

    /// Suppress output of dimensions, resolutions, and progress
    #[arg(long, short)]
    quiet: bool,

    /// STL file
    #[arg(value_name = "STLFILE")]
    stl: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    pngcam::init_logging(cli.quiet)?;

    let png_path = cli
        .png
        .unwrap_or_else(|| PathBuf::from(format!("{}.png", cli.stl.display())));

    let options = RenderOptions {
        stl_path: cli.stl,
        png_path,
        width: cli.width,
        height: cli.height,
        bottom: cli.bottom,
        rotary: cli.rotary,
        quiet: cli.quiet,
    };

    let mut renderer = Renderer::new(options)?;

    let progress = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("Rendering: [{bar:40.cyan/blue}] {pos}%")
                .unwrap()
                .progress_chars("#>-"),
        );
        bar
    };

    renderer.render(|pct| progress.set_position((pct * 100.0) as u64));
    progress.finish_and_clear();

    renderer.save()?;

    Ok(())
}
