//! Mesh-to-heightmap rendering.
//!
//! Normalizes a mesh into the workpiece coordinate frame and rasterizes it
//! into a [`DepthBuffer`], either as a flat top-down projection or as a
//! rotary unwrap where each output row is the surface seen after rotating
//! the part to that angle.

use crate::mesh::Mesh;
use crate::raster::DepthBuffer;
use nalgebra::{Point3, Rotation3, Vector3};
use pngcam_core::Result;
use std::path::PathBuf;
use tracing::info;

/// Parameters for one render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Input STL path.
    pub stl_path: PathBuf,
    /// Output PNG path.
    pub png_path: PathBuf,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Render the bottom side instead of the top.
    pub bottom: bool,
    /// Unwrap the part around the X axis, one output row per angle step.
    pub rotary: bool,
    /// Suppress dimension and progress output.
    pub quiet: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            stl_path: PathBuf::new(),
            png_path: PathBuf::new(),
            width: 400,
            height: 400,
            bottom: false,
            rotary: false,
            quiet: false,
        }
    }
}

/// Renders one mesh into one depth image.
pub struct Renderer {
    options: RenderOptions,
    mesh: Mesh,
    mm_width: f32,
    mm_height: f32,
    mm_depth: f32,
    heightmap: DepthBuffer,
}

impl Renderer {
    /// Load the STL and normalize it into the workpiece frame.
    pub fn new(options: RenderOptions) -> Result<Self> {
        let mesh = Mesh::open(&options.stl_path)?;
        Ok(Self::with_mesh(mesh, options))
    }

    /// Normalize an already-loaded mesh.
    ///
    /// The bottom side is selected by rotating half a turn about Y. Flat
    /// renders translate the bounding box's minimum corner to the origin;
    /// rotary renders centre Y and Z about the rotational axis, and the
    /// effective depth becomes the part radius.
    pub fn with_mesh(mut mesh: Mesh, options: RenderOptions) -> Self {
        if options.bottom {
            mesh.rotate(&Rotation3::from_axis_angle(
                &Vector3::y_axis(),
                std::f32::consts::PI,
            ));
        }

        let (min, max) = mesh.bounds();

        let mm_width = max.x - min.x;
        let mm_height = max.y - min.y;
        let mm_depth;

        if options.rotary {
            mesh.translate(Vector3::new(
                -min.x,
                -(min.y + max.y) / 2.0,
                -(min.z + max.z) / 2.0,
            ));
            mm_depth = (max.z - min.z) / 2.0;
        } else {
            mesh.translate(Vector3::new(-min.x, -min.y, -min.z));
            mm_depth = max.z - min.z;
        }

        info!(
            "{}x{} px depth map. {}x{} mm work piece.",
            options.width, options.height, mm_width, mm_height
        );
        info!("Work piece is {} tall in Z axis.", mm_depth);
        info!(
            "X resolution is {} px/mm. Y resolution is {} px/mm.",
            options.width as f32 / mm_width,
            options.height as f32 / mm_height
        );

        let heightmap = DepthBuffer::new(options.width, options.height);

        Self {
            options,
            mesh,
            mm_width,
            mm_height,
            mm_depth,
            heightmap,
        }
    }

    /// The rendered depth buffer.
    pub fn heightmap(&self) -> &DepthBuffer {
        &self.heightmap
    }

    /// Rasterize the mesh. `progress` is called with the completed
    /// fraction.
    pub fn render<F: FnMut(f32)>(&mut self, mut progress: F) {
        if self.options.rotary {
            self.render_rotary(&mut progress);
        } else {
            self.render_flat(&mut progress);
        }
        progress(1.0);
    }

    fn render_flat<F: FnMut(f32)>(&mut self, progress: &mut F) {
        let w = self.options.width as f32;
        let h = self.options.height as f32;
        let (mm_w, mm_h, mm_d) = (self.mm_width, self.mm_height, self.mm_depth);

        let to_px = |v: &Point3<f32>| {
            Point3::new(v.x * w / mm_w, (h - 1.0) - v.y * h / mm_h, v.z / mm_d)
        };

        let total = self.mesh.triangles.len();
        for (i, t) in self.mesh.triangles.iter().enumerate() {
            self.heightmap.draw_triangle(
                to_px(&t.vertices[0]),
                to_px(&t.vertices[1]),
                to_px(&t.vertices[2]),
            );
            if i % 256 == 0 {
                progress(i as f32 / total as f32);
            }
        }
    }

    fn render_rotary<F: FnMut(f32)>(&mut self, progress: &mut F) {
        let h = self.options.height;
        let w = self.options.width as f32;
        let (mm_w, mm_h, mm_d) = (self.mm_width, self.mm_height, self.mm_depth);

        let to_px =
            |v: &Point3<f32>| Point3::new(v.x * w / mm_w, -v.y * h as f32 / mm_h, v.z / mm_d);

        // one output row per angle step; rotate the whole mesh so the row
        // of interest lies on the y = 0 plane
        for row in 0..h {
            let theta = 2.0 * std::f32::consts::PI * row as f32 / h as f32;
            let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), theta);

            for t in &self.mesh.triangles {
                let a = rotation * t.vertices[0];
                let b = rotation * t.vertices[1];
                let c = rotation * t.vertices[2];
                self.heightmap
                    .draw_triangle_on_one_line(to_px(&a), to_px(&b), to_px(&c), row as i32);
            }

            progress(row as f32 / h as f32);
        }
    }

    /// Write the rendered depth image as a PNG.
    pub fn save(&self) -> Result<()> {
        self.heightmap.write_png(&self.options.png_path)
    }
}
