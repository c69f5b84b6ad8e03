//! Toolpath representation and transforms.
//!
//! A toolpath is an ordered list of segments; a segment is an ordered list
//! of toolpoints cut without a retract in between. The transforms here are
//! pure: collinear simplification, greedy nearest-neighbour ordering,
//! top-surface omission, ramped entries, and cycle-time estimation. Where a
//! transform needs job parameters (feeds, safe Z) it borrows the
//! [`JobOptions`].

use crate::options::JobOptions;

/// How a point is reached: at the rapid feed or at a cutting feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Travel move; not in contact with material.
    Rapid,
    /// Cutting move; feed rate chosen per move.
    Cutting,
}

/// A tool-tip position plus the feed class used to reach it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Toolpoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub feed: FeedKind,
}

impl Toolpoint {
    /// Create a toolpoint.
    pub fn new(x: f64, y: f64, z: f64, feed: FeedKind) -> Self {
        Self { x, y, z, feed }
    }

    /// Euclidean distance to another toolpoint.
    pub fn distance_to(&self, other: &Toolpoint) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// A continuous run of toolpoints cut without retracting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolpathSegment {
    pub points: Vec<Toolpoint>,
}

/// An ordered sequence of segments separated by retracts.
#[derive(Debug, Clone, Default)]
pub struct Toolpath {
    pub segments: Vec<ToolpathSegment>,
}

impl ToolpathSegment {
    /// Create an empty segment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a toolpoint.
    pub fn append(&mut self, p: Toolpoint) {
        self.points.push(p);
    }

    /// Append every point of another segment.
    pub fn append_segment(&mut self, more: &ToolpathSegment) {
        self.points.extend_from_slice(&more.points);
    }

    /// Drop interior points that are collinear with their neighbours.
    ///
    /// A point is dropped when the run from the last kept point through it
    /// continues at the same angle in all three projections (xy, xz, yz),
    /// within 1e-5 radians. The first and last points are always kept.
    /// Idempotent.
    pub fn simplified(&self) -> ToolpathSegment {
        let mut newseg = ToolpathSegment::new();

        if self.points.is_empty() {
            return newseg;
        }

        newseg.append(self.points[0]);

        if self.points.len() == 1 {
            return newseg;
        }

        let epsilon = 1e-5;

        let mut prev = self.points[1];

        for i in 2..self.points.len() {
            let first = newseg.points[newseg.points.len() - 1];
            let cur = self.points[i];

            let prev_xy = (prev.y - first.y).atan2(prev.x - first.x);
            let cur_xy = (cur.y - prev.y).atan2(cur.x - prev.x);
            let prev_xz = (prev.z - first.z).atan2(prev.x - first.x);
            let cur_xz = (cur.z - prev.z).atan2(cur.x - prev.x);
            let prev_yz = (prev.z - first.z).atan2(prev.y - first.y);
            let cur_yz = (cur.z - prev.z).atan2(cur.y - prev.y);

            // if the route first->prev has the same angle as prev->cur then
            // first->prev->cur is a straight line and prev can go
            if (cur_xy - prev_xy).abs() > epsilon
                || (cur_xz - prev_xz).abs() > epsilon
                || (cur_yz - prev_yz).abs() > epsilon
            {
                newseg.append(prev);
            }
            prev = cur;
        }

        newseg.append(prev);

        newseg
    }

    /// The same segment with the point order reversed.
    pub fn reversed(&self) -> ToolpathSegment {
        ToolpathSegment {
            points: self.points.iter().rev().copied().collect(),
        }
    }

    /// Split the segment wherever it touches the top surface, returning the
    /// sub-segments that actually cut something.
    pub fn omit_top(&self) -> Toolpath {
        let mut tp = Toolpath::new();

        let mut newseg = ToolpathSegment::new();

        // larger than the geometric epsilon: sampling the cutter off its
        // very centre can report e.g. -0.005 on a surface that is exactly 0
        let epsilon = 0.01;

        for p in &self.points {
            if p.z > -epsilon {
                tp.append(newseg);
                newseg = ToolpathSegment::new();
            } else {
                newseg.append(*p);
            }
        }

        tp.append(newseg);

        tp
    }

    /// Replace steep plunges with a pair of in-line ramps.
    ///
    /// When a cutting point descends from its predecessor at more than 30
    /// degrees from horizontal and the following leg has enough horizontal
    /// travel, the plunge is replaced by a ramp out along the next leg's
    /// direction to half depth, returning to the original point at full
    /// depth. The ramp steepens beyond 30 degrees when the next leg is
    /// short or itself descending; if the return leg would end up steeper
    /// than the original plunge, the plunge is kept.
    pub fn ramp_entry(&self) -> ToolpathSegment {
        if self.points.len() <= 2 {
            return self.clone();
        }

        let mut newseg = ToolpathSegment::new();

        let max_plunge_angle = 30.0f64.to_radians();
        let min_ramp_distance = 0.01; // avoid dividing by 0

        for i in 1..self.points.len() - 1 {
            let last = self.points[i - 1];
            let p = self.points[i];
            let next = self.points[i + 1];

            // don't ramp on rapids
            if p.feed == FeedKind::Rapid {
                newseg.append(p);
                continue;
            }

            let dx_last = p.x - last.x;
            let dy_last = p.y - last.y;
            let dz_last = p.z - last.z;
            let dxy_last = (dx_last * dx_last + dy_last * dy_last).sqrt();

            let plunge_angle = (-dz_last).atan2(dxy_last);
            if plunge_angle < max_plunge_angle {
                // already within allowable range
                newseg.append(p);
                continue;
            }

            let dx_next = next.x - p.x;
            let dy_next = next.y - p.y;
            let dz_next = next.z - p.z;
            let dxy_next = (dx_next * dx_next + dy_next * dy_next).sqrt();

            if dxy_next < min_ramp_distance {
                // not enough room
                newseg.append(p);
                continue;
            }

            // the first ramp leg goes out along p->next down to half depth,
            // the second leg comes back to land exactly on p

            // how steep is the next leg of the toolpath?
            let available_ramp_angle = dz_next.atan2(dxy_next);

            // how steep would the ramp need to be to finish before passing
            // the next point?
            let implied_available_ramp_angle = (-dz_last / 2.0).atan2(dxy_next);

            // use whichever limit forces the steepest ramp, so that no
            // limit is exceeded
            let ramp_angle = max_plunge_angle
                .max(available_ramp_angle)
                .max(implied_available_ramp_angle);

            let dxy_ramp = -(dz_last / 2.0) / ramp_angle.tan();
            let k = dxy_ramp / dxy_next;
            let dx_ramp = k * dx_next;
            let dy_ramp = k * dy_next;

            // if splitting this move into 2 ramps makes the return ramp
            // steeper than the original move, keep the original move
            let plunge_angle2 = (-dz_last / 2.0).atan2(dxy_ramp.abs() - dxy_last);
            if plunge_angle2 > plunge_angle {
                newseg.append(p);
                continue;
            }

            newseg.append(Toolpoint::new(
                last.x + dx_ramp,
                last.y + dy_ramp,
                p.z - dz_last / 2.0,
                FeedKind::Cutting,
            ));
            newseg.append(p);
        }

        newseg.append(self.points[self.points.len() - 1]);

        newseg
    }

    /// Estimated time in seconds to execute this segment.
    ///
    /// Sums distance over feed for each move, with the feed capped at
    /// `max_vel`.
    pub fn cycle_time(&self, opt: &JobOptions) -> f64 {
        let mut cycle_time = 0.0;

        for i in 1..self.points.len() {
            let prev = &self.points[i - 1];
            let cur = &self.points[i];
            let dist = prev.distance_to(cur);

            let mut feed_rate = opt.rapid_feed;
            if cur.feed == FeedKind::Cutting {
                feed_rate = opt.feed_rate(prev, cur);
            }
            if feed_rate > opt.max_vel {
                feed_rate = opt.max_vel;
            }

            // TODO: account for max_accel; until then the estimate is
            // coarse, which is why segment combining applies a 10x margin
            cycle_time += 60.0 * (dist / feed_rate);
        }

        cycle_time
    }
}

impl Toolpath {
    /// Create an empty toolpath.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment.
    pub fn append(&mut self, seg: ToolpathSegment) {
        self.segments.push(seg);
    }

    /// Append every segment of another toolpath.
    pub fn append_toolpath(&mut self, more: &Toolpath) {
        self.segments.extend_from_slice(&more.segments);
    }

    /// Simplify every segment.
    pub fn simplified(&self) -> Toolpath {
        Toolpath {
            segments: self.segments.iter().map(|s| s.simplified()).collect(),
        }
    }

    /// Apply ramped entries to the whole path (flattened to one segment).
    pub fn ramp_entry(&self, opt: &JobOptions) -> Toolpath {
        let mut newtp = Toolpath::new();
        newtp.append(self.as_one_segment(opt).ramp_entry());
        newtp
    }

    /// Order segments greedily by nearest endpoint.
    ///
    /// Starting from the first non-empty segment's start point, repeatedly
    /// pick the remaining segment whose start or end lies closest, reversing
    /// it when its end is the closer one. The remaining set is held in a
    /// plain Vec scanned in order, so the result is deterministic.
    pub fn sorted(&self) -> Toolpath {
        let mut newtp = Toolpath::new();

        let mut remaining: Vec<&ToolpathSegment> = self
            .segments
            .iter()
            .filter(|s| !s.points.is_empty())
            .collect();

        let mut last = match remaining.first() {
            Some(seg) => seg.points[0],
            None => return newtp,
        };

        while !remaining.is_empty() {
            let mut min_dist = f64::INFINITY;
            let mut min_idx = 0;
            let mut min_reversed = false;

            for (i, seg) in remaining.iter().enumerate() {
                let dist = seg.points[0].distance_to(&last);
                if dist < min_dist {
                    min_dist = dist;
                    min_idx = i;
                    min_reversed = false;
                }

                // the same segment again, but in reverse
                let dist = seg.points[seg.points.len() - 1].distance_to(&last);
                if dist < min_dist {
                    min_dist = dist;
                    min_idx = i;
                    min_reversed = true;
                }
            }

            let min_seg = remaining.remove(min_idx);
            if min_reversed {
                last = min_seg.points[0];
                newtp.append(min_seg.reversed());
            } else {
                last = min_seg.points[min_seg.points.len() - 1];
                newtp.append(min_seg.clone());
            }
        }

        newtp
    }

    /// Flatten into a single segment with rapids interleaved.
    ///
    /// Each segment is preceded by a rapid to its start at safe Z, then a
    /// rapid down to one step-down above the entry point when that still
    /// clears safe Z, and followed by a retract back up to safe Z.
    pub fn as_one_segment(&self, opt: &JobOptions) -> ToolpathSegment {
        let mut seg = ToolpathSegment::new();

        for s in &self.segments {
            if s.points.is_empty() {
                continue;
            }

            let p0 = s.points[0];
            let p_last = s.points[s.points.len() - 1];

            // move above the start point of this segment
            seg.append(Toolpoint::new(p0.x, p0.y, opt.safe_z, FeedKind::Rapid));

            // rapid down to one step-down above the entry height?
            if p0.z + opt.step_down < opt.safe_z {
                seg.append(Toolpoint::new(
                    p0.x,
                    p0.y,
                    p0.z + opt.step_down,
                    FeedKind::Rapid,
                ));
            }

            // the segment itself
            seg.append_segment(s);

            // back up to safe Z
            seg.append(Toolpoint::new(
                p_last.x,
                p_last.y,
                opt.safe_z,
                FeedKind::Rapid,
            ));
        }

        seg
    }

    /// The rapid travel from `a` to `b`: up to safe Z, across, and back
    /// down to one step-down above the target when that clears safe Z.
    pub fn rapid_path(a: &Toolpoint, b: &Toolpoint, opt: &JobOptions) -> ToolpathSegment {
        let mut seg = ToolpathSegment::new();

        seg.append(Toolpoint::new(a.x, a.y, opt.safe_z, FeedKind::Rapid));
        seg.append(Toolpoint::new(b.x, b.y, opt.safe_z, FeedKind::Rapid));

        if b.z + opt.step_down < opt.safe_z {
            seg.append(Toolpoint::new(
                b.x,
                b.y,
                b.z + opt.step_down,
                FeedKind::Rapid,
            ));
        }

        seg
    }

    /// Estimated execution time in seconds, including interleaved rapids.
    pub fn cycle_time(&self, opt: &JobOptions) -> f64 {
        self.as_one_segment(opt).cycle_time(opt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cutting(x: f64, y: f64, z: f64) -> Toolpoint {
        Toolpoint::new(x, y, z, FeedKind::Cutting)
    }

    #[test]
    fn test_simplify_collinear() {
        let seg = ToolpathSegment {
            points: vec![
                cutting(0.0, 0.0, 0.0),
                cutting(1.0, 0.0, 0.0),
                cutting(2.0, 0.0, 0.0),
                cutting(3.0, 0.0, 0.0),
            ],
        };

        let simple = seg.simplified();
        assert_eq!(
            simple.points,
            vec![cutting(0.0, 0.0, 0.0), cutting(3.0, 0.0, 0.0)]
        );
    }

    #[test]
    fn test_simplify_keeps_inflections() {
        let seg = ToolpathSegment {
            points: vec![
                cutting(0.0, 0.0, 0.0),
                cutting(1.0, 0.0, 0.0),
                cutting(2.0, 0.0, -1.0),
                cutting(3.0, 0.0, -1.0),
            ],
        };

        let simple = seg.simplified();
        assert_eq!(simple.points.len(), 4);
    }

    #[test]
    fn test_simplify_idempotent() {
        let seg = ToolpathSegment {
            points: vec![
                cutting(0.0, 0.0, 0.0),
                cutting(1.0, 0.0, 0.0),
                cutting(2.0, 1.0, 0.0),
                cutting(3.0, 1.0, -2.0),
                cutting(4.0, 1.0, -2.0),
            ],
        };

        let once = seg.simplified();
        let twice = once.simplified();
        assert_eq!(once.points, twice.points);
    }

    #[test]
    fn test_simplify_short_segments() {
        assert!(ToolpathSegment::new().simplified().points.is_empty());

        let one = ToolpathSegment {
            points: vec![cutting(1.0, 2.0, 3.0)],
        };
        assert_eq!(one.simplified().points.len(), 1);
    }

    #[test]
    fn test_reversed() {
        let seg = ToolpathSegment {
            points: vec![
                cutting(0.0, 0.0, 0.0),
                cutting(1.0, 0.0, 0.0),
                cutting(2.0, 0.0, -1.0),
            ],
        };
        let rev = seg.reversed();
        assert_eq!(rev.points[0], cutting(2.0, 0.0, -1.0));
        assert_eq!(rev.points[2], cutting(0.0, 0.0, 0.0));
        assert_eq!(rev.reversed().points, seg.points);
    }

    #[test]
    fn test_sort_preserves_segments() {
        let seg1 = ToolpathSegment {
            points: vec![cutting(0.0, 0.0, 0.0), cutting(1.0, 0.0, 0.0)],
        };
        let seg2 = ToolpathSegment {
            points: vec![cutting(100.0, 100.0, 0.0), cutting(101.0, 100.0, 0.0)],
        };

        let mut tp = Toolpath::new();
        tp.append(seg1.clone());
        tp.append(seg2.clone());

        let sorted = tp.sorted();
        assert_eq!(sorted.segments.len(), 2);
        assert_eq!(sorted.segments[0], seg1);
        assert_eq!(sorted.segments[1], seg2);
    }

    #[test]
    fn test_sort_reverses_when_closer() {
        // segment 2's *end* is nearest to segment 1's end, so it comes out
        // reversed
        let seg1 = ToolpathSegment {
            points: vec![cutting(0.0, 0.0, 0.0), cutting(1.0, 0.0, 0.0)],
        };
        let seg2 = ToolpathSegment {
            points: vec![cutting(50.0, 0.0, 0.0), cutting(2.0, 0.0, 0.0)],
        };

        let mut tp = Toolpath::new();
        tp.append(seg1);
        tp.append(seg2.clone());

        let sorted = tp.sorted();
        assert_eq!(sorted.segments[1], seg2.reversed());
    }

    #[test]
    fn test_sort_skips_empty_segments() {
        let mut tp = Toolpath::new();
        tp.append(ToolpathSegment::new());
        tp.append(ToolpathSegment {
            points: vec![cutting(1.0, 1.0, 0.0)],
        });
        tp.append(ToolpathSegment::new());

        let sorted = tp.sorted();
        assert_eq!(sorted.segments.len(), 1);
    }

    #[test]
    fn test_omit_top() {
        let seg = ToolpathSegment {
            points: vec![
                cutting(0.0, 0.0, -1.0),
                cutting(1.0, 0.0, 0.0),
                cutting(2.0, 0.0, -0.5),
                cutting(3.0, 0.0, -0.5),
            ],
        };

        let tp = seg.omit_top();
        let nonempty: Vec<_> = tp
            .segments
            .iter()
            .filter(|s| !s.points.is_empty())
            .collect();
        assert_eq!(nonempty.len(), 2);
        assert_eq!(nonempty[0].points, vec![cutting(0.0, 0.0, -1.0)]);
        assert_eq!(nonempty[1].points.len(), 2);
    }

    #[test]
    fn test_omit_top_tolerance() {
        // points just below the surface count as top surface
        let seg = ToolpathSegment {
            points: vec![cutting(0.0, 0.0, -0.005), cutting(1.0, 0.0, -0.005)],
        };
        let tp = seg.omit_top();
        assert!(tp.segments.iter().all(|s| s.points.is_empty()));
    }

    #[test]
    fn test_as_one_segment_empty() {
        let opt = JobOptions::default();
        let tp = Toolpath::new();
        assert!(tp.as_one_segment(&opt).points.is_empty());
    }

    #[test]
    fn test_as_one_segment_single_point() {
        let opt = JobOptions {
            safe_z: 5.0,
            step_down: 2.0,
            ..Default::default()
        };

        let mut tp = Toolpath::new();
        tp.append(ToolpathSegment {
            points: vec![cutting(1.0, 2.0, -4.0)],
        });

        let seg = tp.as_one_segment(&opt);
        // rapid above, rapid down to step-down above, the point, retract
        assert_eq!(seg.points.len(), 4);
        assert_eq!(seg.points[0], Toolpoint::new(1.0, 2.0, 5.0, FeedKind::Rapid));
        assert_eq!(
            seg.points[1],
            Toolpoint::new(1.0, 2.0, -2.0, FeedKind::Rapid)
        );
        assert_eq!(seg.points[2], cutting(1.0, 2.0, -4.0));
        assert_eq!(seg.points[3], Toolpoint::new(1.0, 2.0, 5.0, FeedKind::Rapid));
    }

    #[test]
    fn test_ramp_entry_replaces_plunge() {
        // a vertical plunge followed by a long horizontal leg gets split
        // into two ramps meeting at half depth
        let seg = ToolpathSegment {
            points: vec![
                cutting(0.0, 0.0, 0.0),
                cutting(0.0, 0.0, -2.0),
                cutting(10.0, 0.0, -2.0),
                cutting(11.0, 0.0, -2.0),
            ],
        };

        let ramped = seg.ramp_entry();

        // the plunge point is preceded by a ramp point at half depth
        let half = ramped
            .points
            .iter()
            .find(|p| (p.z - -1.0).abs() < 1e-9)
            .expect("expected a half-depth ramp point");
        assert!(half.x > 0.0, "ramp must move along the next leg");
        assert!(ramped.points.contains(&cutting(0.0, 0.0, -2.0)));
    }

    #[test]
    fn test_ramp_entry_keeps_shallow_moves() {
        // a shallow descent is untouched
        let seg = ToolpathSegment {
            points: vec![
                cutting(0.0, 0.0, 0.0),
                cutting(10.0, 0.0, -1.0),
                cutting(20.0, 0.0, -1.0),
                cutting(30.0, 0.0, -1.0),
            ],
        };

        let ramped = seg.ramp_entry();
        assert_eq!(ramped.points.as_slice(), &seg.points[1..]);
    }

    #[test]
    fn test_cycle_time() {
        let opt = JobOptions {
            rapid_feed: 6000.0,
            xy_feed: 600.0,
            max_vel: 10000.0,
            ..Default::default()
        };

        // 10 units at 600/min = 1 sec; plus 10 units rapid at 6000/min = 0.1 sec
        let seg = ToolpathSegment {
            points: vec![
                cutting(0.0, 0.0, 0.0),
                cutting(10.0, 0.0, 0.0),
                Toolpoint::new(20.0, 0.0, 0.0, FeedKind::Rapid),
            ],
        };

        let t = seg.cycle_time(&opt);
        assert!((t - 1.1).abs() < 1e-9, "expected 1.1 secs, got {}", t);
    }

    #[test]
    fn test_cycle_time_caps_at_max_vel() {
        let opt = JobOptions {
            rapid_feed: 10000.0,
            max_vel: 1000.0,
            ..Default::default()
        };

        let seg = ToolpathSegment {
            points: vec![
                Toolpoint::new(0.0, 0.0, 0.0, FeedKind::Rapid),
                Toolpoint::new(100.0, 0.0, 0.0, FeedKind::Rapid),
            ],
        };

        let t = seg.cycle_time(&opt);
        assert!((t - 6.0).abs() < 1e-9);
    }
}
