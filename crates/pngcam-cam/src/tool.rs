//! Cutter geometry.
//!
//! A tool profile answers one question: at radial offset `r` from the tool
//! centreline, how far above the tool tip is the tool's lower surface? The
//! dilation of the heightmap by that profile is what turns a model surface
//! into achievable tool-tip positions, so `height_at_radius_sqr` is the
//! innermost call of the whole pipeline.

use pngcam_core::{Error, Result};

/// An end mill profile: ball-nose, flat, or V-bit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tool {
    /// Ball-nose end mill.
    Ball {
        /// Tool radius.
        radius: f64,
    },
    /// Flat (square) end mill.
    Flat {
        /// Tool radius.
        radius: f64,
    },
    /// V-bit engraving cutter.
    VBit {
        /// Radius at the widest point.
        radius: f64,
        /// Included angle in degrees.
        angle: f64,
    },
}

impl Tool {
    /// Create a tool from a shape name ("ball", "flat", or "vbit<angle>")
    /// and a diameter.
    pub fn from_shape(shape: &str, diameter: f64) -> Result<Self> {
        let radius = diameter / 2.0;
        if shape == "ball" {
            Ok(Tool::Ball { radius })
        } else if shape == "flat" {
            Ok(Tool::Flat { radius })
        } else if let Some(angle) = shape.strip_prefix("vbit") {
            let angle: f64 = angle
                .parse()
                .map_err(|_| Error::bad_argument(format!("unrecognised tool type: {}", shape)))?;
            Ok(Tool::VBit { radius, angle })
        } else {
            Err(Error::bad_argument(format!(
                "unrecognised tool type: {}",
                shape
            )))
        }
    }

    /// The tool radius.
    pub fn radius(&self) -> f64 {
        match *self {
            Tool::Ball { radius } | Tool::Flat { radius } | Tool::VBit { radius, .. } => radius,
        }
    }

    /// Height of the tool's lower surface above the tool tip at radial
    /// distance `r`, or +inf beyond the tool's footprint.
    pub fn height_at_radius(&self, r: f64) -> f64 {
        match *self {
            Tool::VBit { radius, angle } => {
                if r > radius {
                    return f64::INFINITY;
                }
                r / ((angle / 2.0).to_radians()).tan()
            }
            _ => self.height_at_radius_sqr(r * r),
        }
    }

    /// As [`height_at_radius`](Self::height_at_radius), but taking r² so the
    /// dilation loop can skip a square root per sample.
    #[inline]
    pub fn height_at_radius_sqr(&self, r_sqr: f64) -> f64 {
        match *self {
            Tool::Ball { radius } => {
                if r_sqr > radius * radius {
                    return f64::INFINITY;
                }
                radius - (radius * radius - r_sqr).sqrt()
            }
            Tool::Flat { radius } => {
                if r_sqr > radius * radius {
                    return f64::INFINITY;
                }
                0.0
            }
            Tool::VBit { .. } => self.height_at_radius(r_sqr.sqrt()),
        }
    }

    /// For rotary dilation: the length of the line segment from the origin,
    /// at `angle_deg` from vertical, to where the tool surface meets a
    /// workpiece whose bottom is at `z`. `x_offset` is the distance from the
    /// tool centreline along the rotational axis. NaN means the tool cannot
    /// touch the workpiece along this ray.
    pub fn length_to_intersection(&self, x_offset: f64, angle_deg: f64, z: f64) -> f64 {
        match *self {
            Tool::Ball { radius } => {
                // off-axis x offset shortens the effective tool radius
                let radius_change = radius - (radius * radius - x_offset * x_offset).sqrt();

                // sine law on the triangle with angle A at the origin,
                // side a along the tool radius and side b up the centreline
                let a_angle = (angle_deg.to_radians()).abs();
                let a = radius - radius_change;
                let b = z + radius + radius_change;

                // b/sin(B) = a/sin(A); of the 2 possible solutions for B we
                // want the larger angle
                let b_angle = (b * a_angle.sin() / a).asin();
                if b_angle.is_nan() {
                    // tool can not touch workpiece at this angle
                    return f64::NAN;
                }
                let b_angle = std::f64::consts::PI - b_angle;

                let c_angle = std::f64::consts::PI - (b_angle + a_angle);
                a * c_angle.sin() / a_angle.sin()
            }
            Tool::Flat { radius } => {
                let h = z / (angle_deg.to_radians()).cos();
                let y_offset = h * (angle_deg.to_radians()).sin();
                let r_sqr = x_offset * x_offset + y_offset * y_offset;
                if r_sqr > radius * radius {
                    return f64::NAN;
                }
                h
            }
            Tool::VBit { .. } => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_height_at_radius(tool: &Tool, r: f64, want: f64) {
        let h = tool.height_at_radius(r);
        if want.is_infinite() {
            assert!(h.is_infinite(), "height at radius {} should be inf", r);
        } else {
            assert!(
                (h - want).abs() < 1e-5,
                "height at radius {} should be {}, got {}",
                r,
                want,
                h
            );
        }
    }

    #[test]
    fn test_ball() {
        let tool = Tool::from_shape("ball", 10.0).unwrap();
        assert_eq!(tool.radius(), 5.0);

        check_height_at_radius(&tool, 0.0, 0.0);
        check_height_at_radius(&tool, 5.0, 5.0);
        check_height_at_radius(&tool, 1.0, 0.1010205);
        check_height_at_radius(&tool, 3.0, 1.0);
        check_height_at_radius(&tool, 6.0, f64::INFINITY);
    }

    #[test]
    fn test_flat() {
        let tool = Tool::from_shape("flat", 10.0).unwrap();
        assert_eq!(tool.radius(), 5.0);

        check_height_at_radius(&tool, 0.0, 0.0);
        check_height_at_radius(&tool, 5.0, 0.0);
        check_height_at_radius(&tool, 1.0, 0.0);
        check_height_at_radius(&tool, 3.0, 0.0);
        check_height_at_radius(&tool, 6.0, f64::INFINITY);
    }

    #[test]
    fn test_vbit() {
        let tool = Tool::from_shape("vbit90", 10.0).unwrap();
        assert_eq!(tool.radius(), 5.0);

        // 90 degree included angle: height equals radius
        check_height_at_radius(&tool, 0.0, 0.0);
        check_height_at_radius(&tool, 1.0, 1.0);
        check_height_at_radius(&tool, 3.0, 3.0);
        check_height_at_radius(&tool, 6.0, f64::INFINITY);

        // rotary is not supported for v-bits
        assert_eq!(tool.length_to_intersection(0.0, 10.0, 1.0), 0.0);
    }

    #[test]
    fn test_height_at_radius_monotonic() {
        for tool in [
            Tool::from_shape("ball", 10.0).unwrap(),
            Tool::from_shape("flat", 10.0).unwrap(),
            Tool::from_shape("vbit60", 10.0).unwrap(),
        ] {
            let mut prev = tool.height_at_radius(0.0);
            let mut r = 0.1;
            while r <= 5.0 {
                let h = tool.height_at_radius(r);
                assert!(h >= prev, "height must be non-decreasing in r");
                prev = h;
                r += 0.1;
            }
        }
    }

    #[test]
    fn test_unknown_tool_shape() {
        assert!(Tool::from_shape("drill", 10.0).is_err());
        assert!(Tool::from_shape("vbitfoo", 10.0).is_err());
    }

    #[test]
    fn test_ball_rotary_intersection() {
        let tool = Tool::from_shape("ball", 10.0).unwrap();

        // straight down the centreline the ray length is the distance from
        // the origin to the bottom of the workpiece plus the tool radius,
        // less the radius again where the ball surface meets it
        let l = tool.length_to_intersection(0.0, 0.0001, 3.0);
        assert!((l - 3.0).abs() < 1e-3, "expected about 3.0, got {}", l);

        // past vertical the ball can no longer reach the workpiece
        let l = tool.length_to_intersection(0.0, 89.0, 100.0);
        assert!(l.is_nan());
    }

    #[test]
    fn test_flat_rotary_intersection() {
        let tool = Tool::from_shape("flat", 10.0).unwrap();

        // straight down: length equals z
        let l = tool.length_to_intersection(0.0, 0.0, 3.0);
        assert!((l - 3.0).abs() < 1e-9);

        // outside the tool radius: no contact
        assert!(tool.length_to_intersection(0.0, 60.0, 100.0).is_nan());
    }
}
