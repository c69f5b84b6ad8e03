//! Toolpoints maps.
//!
//! A [`ToolpointsMap`] is a W×H grid of tool-tip Z values. It comes in two
//! flavours:
//!
//! - **lazy**: backed by a heightmap; cells start as NaN and are filled
//!   with the cut-depth dilation on first read. This is the work surface
//!   the path generator samples.
//! - **eager**: initialised to a fixed height and mutated by plotting the
//!   executed toolpath back into it. This is the stock simulation.
//!
//! Plotting is a min-filter: each cell converges to the deepest cut that
//! ever touched it. NaN is never produced by the dilation, so it doubles as
//! the "uncomputed" sentinel in lazy maps.

use crate::heightmap::HeightmapImage;
use crate::options::JobOptions;
use crate::toolpath::{Toolpath, ToolpathSegment};
use image::RgbImage;
use pngcam_core::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// A grid of achievable tool-tip Z values.
#[derive(Debug)]
pub struct ToolpointsMap {
    w: i32,
    h: i32,
    heightmap: Option<Arc<HeightmapImage>>,
    height: Vec<f64>,
    initial_height: f64,
    options: Arc<JobOptions>,
}

impl ToolpointsMap {
    /// Create an eager map with every cell at `initial_height`.
    pub fn new(w: u32, h: u32, options: Arc<JobOptions>, initial_height: f64) -> Self {
        Self {
            w: w as i32,
            h: h as i32,
            heightmap: None,
            height: vec![initial_height; (w * h) as usize],
            initial_height,
            options,
        }
    }

    /// Create a lazy map over a heightmap: cells start uncomputed and fill
    /// with the cut-depth dilation on first read.
    pub fn lazy(heightmap: Arc<HeightmapImage>, options: Arc<JobOptions>) -> Self {
        let w = heightmap.width();
        let h = heightmap.height();
        let mut map = Self::new(w, h, options, f64::NAN);
        map.heightmap = Some(heightmap);
        map
    }

    /// Map width in pixels.
    pub fn width(&self) -> i32 {
        self.w
    }

    /// Map height in pixels.
    pub fn height(&self) -> i32 {
        self.h
    }

    /// Pre-fill every cell from an existing stock heightmap's surface.
    pub fn fill_from_heightmap(&mut self, stock: &HeightmapImage) {
        for y in 0..self.h {
            for x in 0..self.w {
                self.height[(y * self.w + x) as usize] = stock.get_depth_px(x, y);
            }
        }
    }

    /// Set a cell; out-of-bounds writes are ignored.
    pub fn set_px(&mut self, x: i32, y: i32, z: f64) {
        if x < 0 || y < 0 || x >= self.w || y >= self.h {
            return;
        }
        self.height[(y * self.w + x) as usize] = z;
    }

    /// Read a cell, computing the dilation on demand for lazy maps.
    ///
    /// Out-of-bounds reads return the dilation result for lazy maps (the
    /// backing heightmap extends conceptually beyond its edges) and -inf
    /// for eager maps.
    pub fn get_px(&mut self, x: i32, y: i32) -> f64 {
        if x < 0 || y < 0 || x >= self.w || y >= self.h {
            return match &self.heightmap {
                Some(hm) => {
                    let (mx, my) = self.options.px_to_mm(x, y);
                    hm.cut_depth(mx, my)
                }
                None => f64::NEG_INFINITY,
            };
        }

        let n = (y * self.w + x) as usize;
        if self.height[n].is_nan() {
            if let Some(hm) = &self.heightmap {
                let (mx, my) = self.options.px_to_mm(x, y);
                self.height[n] = hm.cut_depth(mx, my);
            }
        }
        self.height[n]
    }

    /// As [`set_px`](Self::set_px), addressed in workpiece units.
    pub fn set_mm(&mut self, x: f64, y: f64, z: f64) {
        let (px, py) = self.options.mm_to_px(x, y);
        self.set_px(px, py, z);
    }

    /// As [`get_px`](Self::get_px), addressed in workpiece units.
    pub fn get_mm(&mut self, x: f64, y: f64) -> f64 {
        let (px, py) = self.options.mm_to_px(x, y);
        self.get_px(px, py)
    }

    /// Min-filter write: keep the lower of the current and new value.
    pub fn plot_pixel_px(&mut self, px: i32, py: i32, z: f64) {
        let cur_z = self.get_px(px, py);
        if cur_z.is_nan() || z < cur_z {
            self.set_px(px, py, z);
        }
    }

    /// As [`plot_pixel_px`](Self::plot_pixel_px) in workpiece units.
    pub fn plot_pixel_mm(&mut self, x: f64, y: f64, z: f64) {
        let (px, py) = self.options.mm_to_px(x, y);
        self.plot_pixel_px(px, py, z);
    }

    /// Stamp the tool's shape into the map with its tip at `(x, y, z)`.
    ///
    /// Every pixel under the tool footprint receives the height of the tool
    /// surface above that pixel. The bounding box is one pixel larger than
    /// the radius so adjacent stamps cannot leave spikes between rows. In
    /// rotary mode the footprint spans the rotation angles the tool can
    /// reach and uses the ray-intersection length instead of the profile
    /// height.
    pub fn plot_tool_shape(&mut self, x: f64, y: f64, z: f64) {
        let opt = self.options.clone();
        let tool = &opt.tool;

        let (x_px, y_px) = opt.mm_to_px(x, y);

        let r = tool.radius();
        let r_px_x = (r / opt.x_mm_per_px) as i32 + 1;
        let mut r_px_y = (r / opt.y_mm_per_px) as i32 + 1;
        if opt.rotary {
            r_px_y = (90.0 / opt.y_mm_per_px) as i32 + 1;
        }

        let tool_radius_sqr = r * r;

        if opt.rotary {
            for sy in -r_px_y..=r_px_y {
                for sx in -r_px_x..=r_px_x {
                    let sx_mm = sx as f64 * opt.x_mm_per_px;
                    let sy_deg = sy as f64 * opt.y_mm_per_px;

                    let height = tool.length_to_intersection(sx_mm, sy_deg, z);
                    // NaN (no contact) fails the min-filter comparison and
                    // is dropped
                    self.plot_pixel_px(x_px + sx, y_px + sy, height - opt.depth);
                }
            }
        } else {
            for sy in -r_px_y..=r_px_y {
                for sx in -r_px_x..=r_px_x {
                    let sx_mm = sx as f64 * opt.x_mm_per_px;
                    let sy_mm = sy as f64 * opt.y_mm_per_px;

                    let r_sqr = sx_mm * sx_mm + sy_mm * sy_mm;
                    if r_sqr > tool_radius_sqr {
                        continue;
                    }
                    let z_offset = tool.height_at_radius_sqr(r_sqr);
                    self.plot_pixel_px(x_px + sx, y_px + sy, z + z_offset);
                }
            }
        }
    }

    /// Stamp the tool shape at every pixel step along a line segment. A
    /// zero-length line stamps once.
    pub fn plot_line(&mut self, x1: f64, y1: f64, z1: f64, x2: f64, y2: f64, z2: f64) {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let dz = z2 - z1;

        let xy_dist = (dx * dx + dy * dy).sqrt();

        // zero-length in XY (a lone point or a pure plunge): stamp once
        if xy_dist < 1e-12 {
            self.plot_tool_shape(x1, y1, z1.min(z2));
            return;
        }

        let x_step = dx / xy_dist;
        let y_step = dy / xy_dist;
        let z_step = dz / xy_dist;

        // TODO: stepping by the X pitch is wrong if the Y pitch differs a lot
        let mut k = 0.0;
        while k <= xy_dist {
            self.plot_tool_shape(x1 + x_step * k, y1 + y_step * k, z1 + z_step * k);
            k += self.options.x_mm_per_px;
        }
    }

    /// Plot every line of a segment.
    pub fn plot_segment(&mut self, seg: &ToolpathSegment) {
        if seg.points.is_empty() {
            return;
        }

        if seg.points.len() == 1 {
            let p = seg.points[0];
            self.plot_line(p.x, p.y, p.z, p.x, p.y, p.z);
            return;
        }

        for i in 1..seg.points.len() {
            let a = seg.points[i - 1];
            let b = seg.points[i];
            self.plot_line(a.x, a.y, a.z, b.x, b.y, b.z);
        }
    }

    /// Plot every segment of a toolpath.
    pub fn plot_toolpath(&mut self, tp: &Toolpath) {
        for seg in &tp.segments {
            self.plot_segment(seg);
        }
    }

    /// Write the map as a stock heightmap PNG.
    ///
    /// Each cell is clamped into `[-depth, 0]` and becomes the 24-bit
    /// brightness `16777215 * (z/depth + 1)`, packed across R/G/B or
    /// replicated as grayscale depending on the `rgb_stock` option.
    pub fn write_png(&self, path: &Path) -> Result<()> {
        let opt = &self.options;

        let mut img = RgbImage::new(self.w as u32, self.h as u32);

        for y in 0..self.h {
            for x in 0..self.w {
                let n = (y * self.w + x) as usize;

                let mut z = self.height[n];
                if z.is_nan() {
                    z = self.initial_height;
                }
                let z = z.clamp(-opt.depth, 0.0);
                let brightness = (16777215.0 * (z / opt.depth + 1.0)) as u32;

                let pixel = if opt.rgb_stock {
                    image::Rgb([
                        (brightness >> 16) as u8,
                        ((brightness >> 8) & 0xff) as u8,
                        (brightness & 0xff) as u8,
                    ])
                } else {
                    let v = (brightness >> 16) as u8;
                    image::Rgb([v, v, v])
                };
                img.put_pixel(x as u32, y as u32, pixel);
            }
        }

        img.save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| Error::OutputWrite {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Tool;

    fn options(w: u32, h: u32) -> Arc<JobOptions> {
        let mut opt = JobOptions {
            width: w as f64,
            height: h as f64,
            depth: 10.0,
            tool: Tool::Flat { radius: 1.0 },
            ..Default::default()
        };
        opt.set_resolution(w, h);
        Arc::new(opt)
    }

    #[test]
    fn test_min_filter() {
        let mut map = ToolpointsMap::new(8, 8, options(8, 8), 0.0);

        map.plot_pixel_px(3, 3, -2.0);
        assert_eq!(map.get_px(3, 3), -2.0);

        // a shallower write loses
        map.plot_pixel_px(3, 3, -1.0);
        assert_eq!(map.get_px(3, 3), -2.0);

        // a deeper write wins
        map.plot_pixel_px(3, 3, -5.0);
        assert_eq!(map.get_px(3, 3), -5.0);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut map = ToolpointsMap::new(8, 8, options(8, 8), 0.0);

        // eager out-of-bounds reads are -inf, writes are dropped
        assert_eq!(map.get_px(-1, 0), f64::NEG_INFINITY);
        assert_eq!(map.get_px(0, 8), f64::NEG_INFINITY);
        map.set_px(-1, 0, 5.0);
        map.set_px(8, 8, 5.0);
        assert_eq!(map.get_px(0, 0), 0.0);
    }

    #[test]
    fn test_lazy_memoizes_dilation() {
        let opt = options(8, 8);
        let img = RgbImage::from_pixel(8, 8, image::Rgb([128, 128, 128]));
        let hm = Arc::new(HeightmapImage::from_image(img, opt.clone()));
        let mut map = ToolpointsMap::lazy(hm.clone(), opt.clone());

        let first = map.get_px(4, 4);
        assert!(!first.is_nan());
        assert_eq!(first, hm.cut_depth(4.0, 3.0));

        // and the memoized value is returned on the next read
        assert_eq!(map.get_px(4, 4), first);
    }

    #[test]
    fn test_lazy_bounds() {
        // every lazily computed cell lies within the part depth
        let opt = options(8, 8);
        let img = RgbImage::from_pixel(8, 8, image::Rgb([90, 14, 200]));
        let hm = Arc::new(HeightmapImage::from_image(img, opt.clone()));
        let mut map = ToolpointsMap::lazy(hm, opt.clone());

        for y in 0..8 {
            for x in 0..8 {
                let z = map.get_px(x, y);
                assert!(z >= -opt.depth && z <= 0.0, "z {} out of range", z);
            }
        }
    }

    #[test]
    fn test_plot_tool_shape_flat() {
        let mut map = ToolpointsMap::new(8, 8, options(8, 8), 0.0);

        // flat tool of radius 1 stamped at the centre cuts its own disc
        map.plot_tool_shape(4.0, 3.0, -3.0);

        let (px, py) = map.options.mm_to_px(4.0, 3.0);
        assert_eq!(map.get_px(px, py), -3.0);
        assert_eq!(map.get_px(px + 1, py), -3.0);
        // outside the footprint is untouched
        assert_eq!(map.get_px(px + 3, py), 0.0);
    }

    #[test]
    fn test_plot_line_covers_endpoints() {
        let mut map = ToolpointsMap::new(8, 8, options(8, 8), 0.0);

        map.plot_line(1.0, 3.0, -2.0, 6.0, 3.0, -2.0);

        let (px1, py1) = map.options.mm_to_px(1.0, 3.0);
        let (px2, py2) = map.options.mm_to_px(6.0, 3.0);
        assert_eq!(map.get_px(px1, py1), -2.0);
        assert_eq!(map.get_px(px2, py2), -2.0);
    }

    #[test]
    fn test_plot_single_point_segment() {
        let mut map = ToolpointsMap::new(8, 8, options(8, 8), 0.0);

        let seg = ToolpathSegment {
            points: vec![crate::toolpath::Toolpoint::new(
                4.0,
                3.0,
                -1.5,
                crate::toolpath::FeedKind::Cutting,
            )],
        };
        map.plot_segment(&seg);

        let (px, py) = map.options.mm_to_px(4.0, 3.0);
        assert_eq!(map.get_px(px, py), -1.5);
    }

    #[test]
    fn test_fill_from_heightmap() {
        let opt = options(8, 8);
        let img = RgbImage::from_pixel(8, 8, image::Rgb([128, 128, 128]));
        let hm = HeightmapImage::from_image(img, opt.clone());

        let mut map = ToolpointsMap::new(8, 8, opt, 0.0);
        map.fill_from_heightmap(&hm);

        assert_eq!(map.get_px(2, 2), hm.get_depth_px(2, 2));
    }
}
