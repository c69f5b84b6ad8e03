//! The carving job pipeline.
//!
//! A [`Job`] threads one heightmap through the whole pipeline: the
//! serpentine raster scan over the dilated surface, the level-by-level
//! roughing decomposition, the finishing pass, greedy segment combining,
//! and finally G-code emission plus the optional stock simulation.

use crate::gcode::GcodeEmitter;
use crate::heightmap::{self, HeightmapImage};
use crate::options::{Direction, JobOptions};
use crate::toolpath::{FeedKind, Toolpath, ToolpathSegment, Toolpoint};
use crate::toolpoints::ToolpointsMap;
use image::RgbImage;
use pngcam_core::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// One carving job: the loaded inputs and the paths derived from them.
pub struct Job {
    options: Arc<JobOptions>,
    toolpoints: ToolpointsMap,
    read_stock: Option<ToolpointsMap>,
    write_stock: Option<ToolpointsMap>,
    main_toolpath: Toolpath,
}

impl Job {
    /// Load the heightmap (and stock maps, if requested) and prepare a job.
    pub fn new(options: JobOptions) -> Result<Self> {
        let img = heightmap::decode(&options.heightmap_path)?;
        Self::from_image(img, options)
    }

    /// Prepare a job over an already-decoded heightmap.
    pub fn from_image(img: RgbImage, mut options: JobOptions) -> Result<Self> {
        options.set_resolution(img.width(), img.height());
        let options = Arc::new(options);

        let hm = Arc::new(HeightmapImage::from_image(img, options.clone()));
        let toolpoints = ToolpointsMap::lazy(hm.clone(), options.clone());

        let read_stock_hm = match &options.read_stock_path {
            Some(path) => Some(Arc::new(HeightmapImage::open(path, options.clone())?)),
            None => None,
        };
        let read_stock = read_stock_hm
            .as_ref()
            .map(|stock| ToolpointsMap::lazy(stock.clone(), options.clone()));

        let write_stock = options.write_stock_path.as_ref().map(|_| {
            let mut ws = ToolpointsMap::new(hm.width(), hm.height(), options.clone(), 0.0);
            if let Some(stock) = &read_stock_hm {
                ws.fill_from_heightmap(stock);
            }
            ws
        });

        let unit = options.units.unit_label();
        info!(
            "{}x{} px height map. {}x{} {} work piece.",
            options.width_px, options.height_px, options.width, options.height, unit
        );
        info!(
            "X resolution is {} px/{}. Y resolution is {} px/{}.",
            1.0 / options.x_mm_per_px,
            unit,
            1.0 / options.y_mm_per_px,
            unit
        );
        info!(
            "Step-over is {} {} = {} px in X and {} px in Y.",
            options.step_over,
            unit,
            options.step_over / options.x_mm_per_px,
            options.step_over / options.y_mm_per_px
        );

        Ok(Self {
            options,
            toolpoints,
            read_stock,
            write_stock,
            main_toolpath: Toolpath::new(),
        })
    }

    /// The job's options.
    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// The main (finishing-resolution) toolpath. Empty until
    /// [`generate`](Self::generate) has run.
    pub fn main_toolpath(&self) -> &Toolpath {
        &self.main_toolpath
    }

    /// Build the main toolpath: a serpentine raster scan over the work
    /// area at pixel resolution, sampling the dilated surface.
    ///
    /// `progress` is called with the completed fraction as rows finish.
    pub fn generate<F: FnMut(f32)>(&mut self, mut progress: F) {
        let opt = self.options.clone();

        self.main_toolpath = Toolpath::new();

        let mut x_limit = opt.width;
        let mut y_limit = opt.height;

        let mut x_step = opt.x_mm_per_px;
        let mut y_step = 0.0;
        if opt.direction == Direction::Vertical {
            x_step = 0.0;
            y_step = opt.y_mm_per_px;
        }

        let mut zero = 0.0;

        if opt.cut_beyond_edges {
            let extra_limit = opt.tool.radius();
            zero -= extra_limit;
            x_limit += extra_limit;
            y_limit += extra_limit;
        }

        let mut x = zero;
        let mut y = zero;

        while x >= zero && y >= zero && x < x_limit && y < y_limit {
            let mut seg = ToolpathSegment::new();

            while x >= zero && y >= zero && x < x_limit && y < y_limit {
                seg.append(Toolpoint::new(
                    x,
                    y,
                    self.toolpoints.get_mm(x, y),
                    FeedKind::Cutting,
                ));

                x += x_step;
                y += y_step;
            }

            if opt.omit_top {
                self.main_toolpath
                    .append_toolpath(&seg.omit_top().simplified());
            } else {
                self.main_toolpath.append(seg.simplified());
            }

            let pct = if opt.direction == Direction::Horizontal {
                y += opt.step_over;
                (y - zero) / (y_limit - zero)
            } else {
                x += opt.step_over;
                (x - zero) / (x_limit - zero)
            };

            x_step = -x_step;
            y_step = -y_step;
            x += x_step;
            y += y_step;

            progress((pct as f32).min(1.0));
        }
    }

    /// Produce the complete G-code program, simulating the cut into the
    /// write-stock map on the way when one was requested.
    pub fn gcode(&mut self) -> String {
        let opt = self.options.clone();

        let mut path = self.roughing();

        if !opt.roughing_only {
            path.append_toolpath(&self.finishing());
        }

        if opt.ramp_entry {
            path = path.ramp_entry(&opt);
        }

        let gcode = GcodeEmitter::new(&opt).program(&path);
        let cycle_time = path.cycle_time(&opt);

        if let Some(write_stock) = &mut self.write_stock {
            write_stock.plot_toolpath(&path);
            if let Some(ws_path) = &opt.write_stock_path {
                info!("Writing stock: {}", ws_path.display());
                if let Err(e) = write_stock.write_png(ws_path) {
                    warn!("{}", e);
                }
            }
        }

        info!("Cycle time estimate: {} secs", cycle_time);

        gcode
    }

    /// The finishing pass: the main toolpath simplified, ordered, and with
    /// adjacent segments combined.
    pub fn finishing(&mut self) -> Toolpath {
        let sorted = self.main_toolpath.simplified().sorted();
        self.combine_segments(sorted)
    }

    /// The roughing passes: one level per step-down, top first.
    pub fn roughing(&mut self) -> Toolpath {
        let opt = self.options.clone();

        let mut deepest = -opt.depth;
        if opt.cut_below_bottom {
            deepest -= opt.tool.radius();
        }

        let mut path = Toolpath::new();

        let mut z = -opt.step_down;
        while z > deepest {
            let level = self.roughing_level(z);
            path.append_toolpath(&level.simplified().sorted());
            z -= opt.step_down;
        }

        path
    }

    /// One roughing level: the parts of the main toolpath that lie below
    /// `z`, clamped up to `z`, skipping regions a read-stock map says are
    /// already clear.
    pub fn roughing_level(&mut self, z: f64) -> Toolpath {
        let mut path = Toolpath::new();

        for i in 0..self.main_toolpath.segments.len() {
            let mut seg = ToolpathSegment::new();
            for p in 0..self.main_toolpath.segments[i].points.len() {
                let tp = self.main_toolpath.segments[i].points[p];
                let wanted = tp.z < z
                    && match self.read_stock.as_mut() {
                        None => true,
                        Some(stock) => z < stock.get_mm(tp.x, tp.y),
                    };
                if wanted {
                    // this point is cut at this level
                    seg.append(Toolpoint::new(tp.x, tp.y, z, FeedKind::Cutting));
                } else {
                    // this point isn't in this level: emit what we have and
                    // start a new segment
                    if !seg.points.is_empty() {
                        path.append(seg);
                    }
                    seg = ToolpathSegment::new();
                }
            }

            if !seg.points.is_empty() {
                path.append(seg);
            }
        }

        let sorted = path.sorted();
        self.combine_segments(sorted)
    }

    /// Weld adjacent segments together when cutting across is quicker than
    /// retracting, travelling, and plunging.
    ///
    /// For each junction the straight surface-following cut is compared
    /// against axis-aligned X-then-Y and Y-then-X cuts and the rapid path;
    /// the cut is taken when it beats ten times the rapid's estimated time,
    /// the margin covering the coarseness of the estimator.
    pub fn combine_segments(&mut self, tp: Toolpath) -> Toolpath {
        let opt = self.options.clone();

        if tp.segments.len() <= 1 {
            return tp;
        }

        let mut newtp = Toolpath::new();

        // TODO: what happens when there are 0-length segments?

        let mut seg = tp.segments[0].clone();

        for i in 1..tp.segments.len() {
            let prev = seg.points[seg.points.len() - 1];
            let cur = tp.segments[i].points[0];

            let rapid_path = Toolpath::rapid_path(&prev, &cur, &opt);
            let deepest_z = prev.z.min(cur.z);
            let mut cut_path = self.cut_path(&prev, &cur, deepest_z);

            // as well as the straight line from prev to cur, try
            // axis-aligned lines in x-first and y-first configuration
            let x_mid_z = deepest_z.max(self.toolpoints.get_mm(cur.x, prev.y));
            let x_mid = Toolpoint::new(cur.x, prev.y, x_mid_z, FeedKind::Cutting);
            let y_mid_z = deepest_z.max(self.toolpoints.get_mm(prev.x, cur.y));
            let y_mid = Toolpoint::new(prev.x, cur.y, y_mid_z, FeedKind::Cutting);

            let mut xy_cut_path = self.cut_path(&prev, &x_mid, deepest_z);
            let xy_cut_path2 = self.cut_path(&x_mid, &cur, deepest_z);
            xy_cut_path.append_segment(&xy_cut_path2);
            let mut yx_cut_path = self.cut_path(&prev, &y_mid, deepest_z);
            let yx_cut_path2 = self.cut_path(&y_mid, &cur, deepest_z);
            yx_cut_path.append_segment(&yx_cut_path2);

            if xy_cut_path.cycle_time(&opt) < cut_path.cycle_time(&opt) {
                cut_path = xy_cut_path;
            }
            if yx_cut_path.cycle_time(&opt) < cut_path.cycle_time(&opt) {
                cut_path = yx_cut_path;
            }

            // TODO: lose the factor of 10 once the cycle-time estimate
            // models acceleration
            if cut_path.cycle_time(&opt) < 10.0 * rapid_path.cycle_time(&opt) {
                seg.append_segment(&cut_path);
            } else {
                newtp.append(seg);
                seg = ToolpathSegment::new();
            }
            seg.append_segment(&tp.segments[i]);
        }

        if !seg.points.is_empty() {
            newtp.append(seg);
        }

        newtp
    }

    /// A surface-following cut from `a` to `b`, never below `deepest_z`.
    ///
    /// Long travels (over twice the step-over) additionally lift the floor
    /// by the nominal deviation of the step-over pattern, so the traverse
    /// does not gouge the scallops left between raster rows.
    pub fn cut_path(&mut self, a: &Toolpoint, b: &Toolpoint, deepest_z: f64) -> ToolpathSegment {
        let opt = self.options.clone();

        let mut deepest_z = deepest_z;

        let mut dx = b.x - a.x;
        let mut dy = b.y - a.y;
        let dist = (dx * dx + dy * dy).sqrt();

        if dist > 2.0 * opt.step_over {
            let r1 = opt.tool.radius();
            let r2 = opt.step_over / 2.0;
            deepest_z += (r1 * r1 - r2 * r2).sqrt();
        }

        let mut seg = ToolpathSegment::new();

        if dist < 1e-12 {
            let z = self.toolpoints.get_mm(a.x, a.y).max(deepest_z);
            seg.append(Toolpoint::new(a.x, a.y, z, FeedKind::Cutting));
            return seg;
        }

        dx /= dist;
        dy /= dist;

        // TODO: stepping by the X pitch is wrong if the Y pitch differs a lot
        let mut k = 0.0;
        while k <= dist {
            let x = a.x + k * dx;
            let y = a.y + k * dy;

            let z = self.toolpoints.get_mm(x, y).max(deepest_z);

            seg.append(Toolpoint::new(x, y, z, FeedKind::Cutting));
            k += opt.x_mm_per_px;
        }

        seg
    }
}
