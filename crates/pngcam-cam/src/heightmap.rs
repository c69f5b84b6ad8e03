//! Heightmap sampling and cut-depth dilation.
//!
//! A [`HeightmapImage`] wraps the decoded PNG and interprets pixel
//! brightness as depth below the top of stock: composite 24-bit brightness
//! 0 is the full depth, brightness 2^24-1 is the top surface. The key
//! operation is [`cut_depth`](HeightmapImage::cut_depth), the dilation of
//! the surface by the tool profile: the highest Z at which the tool can be
//! centred over a point without its surface dipping below the model
//! anywhere in its footprint.

use crate::options::JobOptions;
use image::RgbImage;
use pngcam_core::{Error, Result};
use std::path::Path;
use std::sync::Arc;

const EPSILON: f64 = 1e-5;

/// Decode a PNG into an RGB raster, splitting failures into open and
/// decode errors.
pub fn decode(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(source) => Error::InputOpen {
            path: path.display().to_string(),
            source,
        },
        other => Error::InputDecode {
            path: path.display().to_string(),
            reason: other.to_string(),
        },
    })?;
    Ok(img.to_rgb8())
}

/// A heightmap decoded from a PNG.
#[derive(Debug)]
pub struct HeightmapImage {
    img: RgbImage,
    options: Arc<JobOptions>,
}

impl HeightmapImage {
    /// Decode a heightmap from a PNG file.
    pub fn open(path: &Path, options: Arc<JobOptions>) -> Result<Self> {
        Ok(Self::from_image(decode(path)?, options))
    }

    /// Wrap an already-decoded image.
    pub fn from_image(img: RgbImage, options: Arc<JobOptions>) -> Self {
        Self { img, options }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.img.width()
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.img.height()
    }

    /// Depth of the model surface at a position, in `[-depth, 0]`.
    pub fn get_depth(&self, x: f64, y: f64) -> f64 {
        let (px, py) = self.options.mm_to_px(x, y);
        self.get_depth_px(px, py)
    }

    /// Depth of the model surface at a pixel. Out-of-bounds pixels read as
    /// black, i.e. the full depth; in rotary mode the Y axis wraps instead.
    pub fn get_depth_px(&self, px: i32, py: i32) -> f64 {
        let opt = &self.options;

        let mut py = py;
        if opt.rotary {
            // rotary parts wrap around
            py = py.rem_euclid(opt.height_px);
        }

        let (r, g, b) = if px < 0
            || py < 0
            || px >= self.img.width() as i32
            || py >= self.img.height() as i32
        {
            (0u32, 0u32, 0u32)
        } else {
            let p = self.img.get_pixel(px as u32, py as u32);
            (p.0[0] as u32, p.0[1] as u32, p.0[2] as u32)
        };

        let brightness = (65536 * r + 256 * g + b) as f64 / 16777215.0;

        brightness * opt.depth - opt.depth
    }

    /// Whether the surface at a position is at the full depth of the part.
    pub fn is_bottom(&self, x: f64, y: f64) -> bool {
        self.get_depth(x, y) < -self.options.depth + EPSILON
    }

    /// The highest Z at which the tool can be centred over `(x, y)` without
    /// its surface going below the model surface anywhere under its
    /// footprint, plus the stock-to-leave allowance.
    ///
    /// This is the dilation of the model surface by the tool's bottom
    /// envelope, evaluated by sampling the footprint at pixel pitch. In
    /// rotary mode the footprint spans [-90, 90] degrees of rotation and
    /// every sample is lifted onto the cylinder before the tool profile is
    /// applied.
    pub fn cut_depth(&self, x: f64, y: f64) -> f64 {
        let opt = &self.options;
        let tool = &opt.tool;

        let below_bottom_depth = -opt.depth - tool.radius() + opt.stock_to_leave;

        let mut max_depth = below_bottom_depth;

        let tool_radius_sqr = tool.radius() * tool.radius();

        if opt.rotary {
            // the y range of 360 degrees is treated as 360 units
            let mut sy = -90.0;
            while sy <= 90.0 {
                let mut sx = -tool.radius();
                while sx <= tool.radius() {
                    // TODO: the -1 degree offset in the sample position is
                    // unexplained; review against a machined test part
                    let workpiece_z = opt.depth + self.get_depth(x + sx, -1.0 - y + sy);
                    let real_y = workpiece_z * sy.to_radians().sin();
                    let real_z = workpiece_z * sy.to_radians().cos();

                    let r_sqr = sx * sx + real_y * real_y;
                    if r_sqr <= tool_radius_sqr {
                        let d = opt.stock_to_leave - tool.height_at_radius_sqr(r_sqr) + real_z;
                        if d > max_depth {
                            max_depth = d;
                        }
                    }

                    sx += opt.x_mm_per_px;
                }
                sy += opt.y_mm_per_px;
            }
        } else {
            let mut sy = -tool.radius();
            while sy <= tool.radius() {
                let mut sx = -tool.radius();
                while sx <= tool.radius() {
                    let r_sqr = sx * sx + sy * sy;
                    if r_sqr <= tool_radius_sqr
                        && (!opt.cut_below_bottom || !self.is_bottom(x + sx, y + sy))
                    {
                        let d = opt.stock_to_leave - tool.height_at_radius_sqr(r_sqr)
                            + self.get_depth(x + sx, y + sy);
                        if d > max_depth {
                            max_depth = d;
                        }
                    }

                    sx += opt.x_mm_per_px;
                }
                sy += opt.y_mm_per_px;
            }
        }

        max_depth
    }
}
