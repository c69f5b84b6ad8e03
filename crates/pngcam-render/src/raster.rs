//! Scanline triangle rasterizer.
//!
//! Renders triangles into a depth buffer as seen from above: for each
//! triangle the three edges are walked pixel by pixel to find the leftmost
//! and rightmost X (with interpolated Z) on every scanline, and each
//! scanline is filled with Z interpolated linearly between them. Writes are
//! a max-filter, so the highest surface wins and the result is a top-down
//! depth image.

use image::RgbImage;
use nalgebra::Point3;
use pngcam_core::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// A W×H grid of surface heights in `[0, 1]`, highest-wins.
#[derive(Debug, Clone)]
pub struct DepthBuffer {
    width: i32,
    height: i32,
    cells: Vec<f32>,
}

impl DepthBuffer {
    /// Create a buffer with every cell at the minimum height.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as i32,
            height: height as i32,
            cells: vec![0.0; (width * height) as usize],
        }
    }

    /// Buffer width in pixels.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Buffer height in pixels.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Read a cell; out of bounds reads the minimum height.
    pub fn get(&self, x: i32, y: i32) -> f32 {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return 0.0;
        }
        self.cells[(y * self.width + x) as usize]
    }

    /// Max-filter write: keep the higher of the current and new value.
    /// Out-of-bounds writes are ignored.
    pub fn plot_pixel(&mut self, x: i32, y: i32, z: f32) {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return;
        }

        let n = (y * self.width + x) as usize;
        if z > self.cells[n] {
            self.cells[n] = z;
        }
    }

    /// Rasterize a triangle given in pixel coordinates (Z in `[0, 1]`).
    pub fn draw_triangle(&mut self, a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) {
        // leftmost/rightmost X and its Z for each scanline
        let mut left: HashMap<i32, (i32, f32)> = HashMap::new();
        let mut right: HashMap<i32, (i32, f32)> = HashMap::new();

        let mut min_y = self.height;
        let mut max_y = -1;

        // 1. walk the outline of the triangle
        let mut perimeter = |x: i32, y: i32, z: f32| {
            match left.get(&y) {
                Some(&(cur, _)) if x >= cur => {}
                _ => {
                    left.insert(y, (x, z));
                }
            }
            match right.get(&y) {
                Some(&(cur, _)) if x <= cur => {}
                _ => {
                    right.insert(y, (x, z));
                }
            }
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        };
        iterate_line(a, b, &mut perimeter);
        iterate_line(b, c, &mut perimeter);
        iterate_line(c, a, &mut perimeter);

        // 2. fill in scanlines
        for y in min_y..=max_y {
            let (Some(&(start_x, start_z)), Some(&(end_x, end_z))) = (left.get(&y), right.get(&y))
            else {
                continue;
            };

            let dx = (end_x - start_x) as f32;
            let dz = end_z - start_z;
            for x in start_x..=end_x {
                let k = if dx != 0.0 {
                    (x - start_x) as f32 / dx
                } else {
                    1.0
                };

                self.plot_pixel(x, y, start_z + dz * k);
            }
        }
    }

    /// Rasterize only the y = 0 scanline of a triangle into output row
    /// `row`. Used by the rotary renderer, which rotates the mesh so that
    /// the row of interest lies on y = 0.
    pub fn draw_triangle_on_one_line(
        &mut self,
        a: Point3<f32>,
        b: Point3<f32>,
        c: Point3<f32>,
        row: i32,
    ) {
        let mut left_x = self.width;
        let mut right_x = 0;
        let mut left_z = 0.0f32;
        let mut right_z = 0.0f32;

        // 1. walk the outline, keeping only pixels on y = 0
        let mut perimeter = |x: i32, y: i32, z: f32| {
            if y != 0 {
                return;
            }
            if x < left_x {
                left_x = x;
                left_z = z;
            }
            if x > right_x {
                right_x = x;
                right_z = z;
            }
        };
        iterate_line(a, b, &mut perimeter);
        iterate_line(b, c, &mut perimeter);
        iterate_line(c, a, &mut perimeter);

        if left_x >= self.width {
            // the triangle never crossed y = 0
            return;
        }

        // 2. draw the single scanline
        let dx = (right_x - left_x) as f32;
        let dz = right_z - left_z;
        for x in left_x..=right_x {
            let k = if dx != 0.0 {
                (x - left_x) as f32 / dx
            } else {
                1.0
            };

            self.plot_pixel(x, row, left_z + dz * k);
        }
    }

    /// Write the buffer as a PNG, brightness `16777215 * z` packed across
    /// the R/G/B channels.
    pub fn write_png(&self, path: &Path) -> Result<()> {
        let mut img = RgbImage::new(self.width as u32, self.height as u32);

        for y in 0..self.height {
            for x in 0..self.width {
                let z = self.cells[(y * self.width + x) as usize].clamp(0.0, 1.0);
                let brightness = (16777215.0 * z) as u32;

                img.put_pixel(
                    x as u32,
                    y as u32,
                    image::Rgb([
                        (brightness >> 16) as u8,
                        ((brightness >> 8) & 0xff) as u8,
                        (brightness & 0xff) as u8,
                    ]),
                );
            }
        }

        img.save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| Error::OutputWrite {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

/// Visit each pixel along a line, stepping one pixel-length at a time
/// along the longer 2D projection. Z is carried along and interpolated. A
/// line shorter than one pixel visits only its first point.
pub fn iterate_line<F: FnMut(i32, i32, f32)>(a: Point3<f32>, b: Point3<f32>, cb: &mut F) {
    // visit the first point
    cb(a.x as i32, a.y as i32, a.z);

    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dz = b.z - a.z;
    let length = (dx * dx + dy * dy).sqrt();

    if length < 1.0 {
        return;
    }

    let dx = dx / length;
    let dy = dy / length;
    let dz = dz / length;

    let (mut x, mut y, mut z) = (a.x, a.y, a.z);

    for _ in 1..=length as i32 {
        x += dx;
        y += dy;
        z += dz;
        cb(x as i32, y as i32, z);
    }
}
