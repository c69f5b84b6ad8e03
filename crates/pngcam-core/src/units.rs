//! Measurement system selection.
//!
//! The toolpath pipeline is unit-agnostic: every length flows through
//! unchanged, whether it was given in millimetres or inches. The selected
//! system only decides the units word in the G-code preamble and the labels
//! used in log output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Measurement system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementSystem {
    /// Metric system (mm, mm/min)
    Metric,
    /// Imperial system (inches, inches/min)
    Imperial,
}

impl Default for MeasurementSystem {
    fn default() -> Self {
        Self::Metric
    }
}

impl fmt::Display for MeasurementSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => write!(f, "Metric"),
            Self::Imperial => write!(f, "Imperial"),
        }
    }
}

impl FromStr for MeasurementSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" | "mm" => Ok(Self::Metric),
            "imperial" | "inch" | "in" => Ok(Self::Imperial),
            _ => Err(format!("Unknown measurement system: {}", s)),
        }
    }
}

impl MeasurementSystem {
    /// The label used for lengths in log output.
    pub fn unit_label(&self) -> &'static str {
        match self {
            Self::Metric => "mm",
            Self::Imperial => "inches",
        }
    }

    /// The G-code word that selects this measurement system.
    pub fn gcode_units_word(&self) -> &'static str {
        match self {
            Self::Metric => "G21",
            Self::Imperial => "G20",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_labels() {
        assert_eq!(MeasurementSystem::Metric.unit_label(), "mm");
        assert_eq!(MeasurementSystem::Imperial.unit_label(), "inches");
    }

    #[test]
    fn test_gcode_units_word() {
        assert_eq!(MeasurementSystem::Metric.gcode_units_word(), "G21");
        assert_eq!(MeasurementSystem::Imperial.gcode_units_word(), "G20");
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "imperial".parse::<MeasurementSystem>().unwrap(),
            MeasurementSystem::Imperial
        );
        assert_eq!(
            "mm".parse::<MeasurementSystem>().unwrap(),
            MeasurementSystem::Metric
        );
        assert!("furlongs".parse::<MeasurementSystem>().is_err());
    }
}
