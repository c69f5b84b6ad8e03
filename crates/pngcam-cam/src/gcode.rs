//! G-code emission.
//!
//! Serialises a finished toolpath into text: a preamble selecting units and
//! the work coordinate system and starting the spindle, one `G1` word per
//! toolpoint, and a stop/end postamble. Only straight-line moves are ever
//! emitted; rapids are `G1` at the rapid feed rate.

use crate::options::JobOptions;
use crate::toolpath::{FeedKind, Toolpath, ToolpathSegment};
use std::fmt::Write;

/// Serialises toolpaths against one set of job options.
pub struct GcodeEmitter<'a> {
    options: &'a JobOptions,
}

impl<'a> GcodeEmitter<'a> {
    /// Create an emitter.
    pub fn new(options: &'a JobOptions) -> Self {
        Self { options }
    }

    /// The complete program: preamble, every move, postamble.
    pub fn program(&self, path: &Toolpath) -> String {
        let mut gcode = self.preamble();
        gcode.push_str(&self.segment(&path.as_one_segment(self.options)));
        gcode.push_str(&self.postamble());
        gcode
    }

    /// Units, absolute mode, WCS select, spindle start, and a lift to safe Z.
    pub fn preamble(&self) -> String {
        let opt = self.options;
        let mut gcode = String::new();

        gcode.push_str(opt.units.gcode_units_word());
        gcode.push('\n');
        gcode.push_str("G90\n"); // absolute coordinates
        gcode.push_str("G54\n"); // work coordinate system

        let _ = writeln!(gcode, "M3 S{}", opt.rpm);

        let _ = writeln!(gcode, "G1 Z{:.4} F{}", opt.safe_z + opt.z_offset, opt.rapid_feed);

        gcode
    }

    /// Spindle stop and end of program.
    pub fn postamble(&self) -> String {
        "M5\nM2\n".to_string()
    }

    /// One `G1` line per point. The first point and every rapid take the
    /// rapid feed; cutting points take the feed selected for the move from
    /// their predecessor. In rotary mode the Y axis letter becomes `A`.
    pub fn segment(&self, seg: &ToolpathSegment) -> String {
        let opt = self.options;
        let mut gcode = String::new();

        // TODO: make the rotary axis name configurable
        let y_axis_name = if opt.rotary { "A" } else { "Y" };

        for (i, p) in seg.points.iter().enumerate() {
            let mut feed_rate = opt.rapid_feed;
            if p.feed == FeedKind::Cutting && i > 0 {
                feed_rate = opt.feed_rate(&seg.points[i - 1], p);
            }
            let _ = writeln!(
                gcode,
                "G1 X{:.4} {}{:.4} Z{:.4} F{}",
                p.x + opt.x_offset,
                y_axis_name,
                p.y + opt.y_offset,
                p.z + opt.z_offset,
                feed_rate
            );
        }

        gcode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolpath::Toolpoint;

    fn test_options() -> JobOptions {
        JobOptions {
            safe_z: 5.0,
            rapid_feed: 10000.0,
            xy_feed: 2000.0,
            z_feed: 200.0,
            rpm: 10000.0,
            step_down: 100.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_preamble() {
        let opt = test_options();
        let emitter = GcodeEmitter::new(&opt);

        let preamble = emitter.preamble();
        assert_eq!(preamble, "G21\nG90\nG54\nM3 S10000\nG1 Z5.0000 F10000\n");
    }

    #[test]
    fn test_imperial_preamble() {
        let opt = JobOptions {
            units: pngcam_core::MeasurementSystem::Imperial,
            ..test_options()
        };
        let emitter = GcodeEmitter::new(&opt);
        assert!(emitter.preamble().starts_with("G20\n"));
    }

    #[test]
    fn test_empty_path_is_preamble_and_postamble() {
        let opt = test_options();
        let emitter = GcodeEmitter::new(&opt);

        let program = emitter.program(&Toolpath::new());
        assert_eq!(program, format!("{}{}", emitter.preamble(), emitter.postamble()));
    }

    #[test]
    fn test_program_shape() {
        let opt = test_options();
        let emitter = GcodeEmitter::new(&opt);

        let mut path = Toolpath::new();
        path.append(ToolpathSegment {
            points: vec![Toolpoint::new(1.0, 2.0, -3.0, FeedKind::Cutting)],
        });
        path.append(ToolpathSegment {
            points: vec![Toolpoint::new(10.0, 2.0, -3.0, FeedKind::Cutting)],
        });

        let program = emitter.program(&path);
        let lines: Vec<&str> = program.lines().collect();

        // preamble lift
        assert_eq!(lines[4], "G1 Z5.0000 F10000");
        // rapid above the first point, the plunge to it, retract; the
        // plunge is a cutting move so it takes the scaled Z feed
        assert_eq!(lines[5], "G1 X1.0000 Y2.0000 Z5.0000 F10000");
        assert_eq!(lines[6], "G1 X1.0000 Y2.0000 Z-3.0000 F200");
        assert_eq!(lines[7], "G1 X1.0000 Y2.0000 Z5.0000 F10000");
        // same again for the second segment
        assert_eq!(lines[8], "G1 X10.0000 Y2.0000 Z5.0000 F10000");
        assert_eq!(lines[9], "G1 X10.0000 Y2.0000 Z-3.0000 F200");
        assert_eq!(lines[10], "G1 X10.0000 Y2.0000 Z5.0000 F10000");
        // postamble
        assert_eq!(lines[11], "M5");
        assert_eq!(lines[12], "M2");
    }

    #[test]
    fn test_offsets_are_applied() {
        let opt = JobOptions {
            x_offset: 1.0,
            y_offset: 2.0,
            z_offset: 3.0,
            ..test_options()
        };
        let emitter = GcodeEmitter::new(&opt);

        let seg = ToolpathSegment {
            points: vec![Toolpoint::new(0.0, 0.0, 0.0, FeedKind::Rapid)],
        };
        assert_eq!(emitter.segment(&seg), "G1 X1.0000 Y2.0000 Z3.0000 F10000\n");
    }

    #[test]
    fn test_rotary_axis_letter() {
        let opt = JobOptions {
            rotary: true,
            ..test_options()
        };
        let emitter = GcodeEmitter::new(&opt);

        let seg = ToolpathSegment {
            points: vec![Toolpoint::new(0.0, 90.0, 0.0, FeedKind::Rapid)],
        };
        let line = emitter.segment(&seg);
        assert!(line.contains(" A90.0000 "), "got {}", line);
        assert!(!line.contains(" Y"));
    }

    #[test]
    fn test_cutting_feed_selection() {
        let opt = test_options();
        let emitter = GcodeEmitter::new(&opt);

        let seg = ToolpathSegment {
            points: vec![
                Toolpoint::new(0.0, 0.0, 0.0, FeedKind::Cutting),
                Toolpoint::new(10.0, 0.0, 0.0, FeedKind::Cutting),
                Toolpoint::new(10.0, 0.0, -10.0, FeedKind::Cutting),
            ],
        };
        let lines: Vec<String> = emitter.segment(&seg).lines().map(String::from).collect();

        // first point takes the rapid feed, the horizontal move the XY
        // feed, the plunge the Z feed
        assert!(lines[0].ends_with("F10000"));
        assert!(lines[1].ends_with("F2000"));
        assert!(lines[2].ends_with("F200"));
    }
}
