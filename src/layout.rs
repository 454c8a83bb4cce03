use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::model::DelayLineId;
use crate::error::Error;

/// A point on the reference tunnel image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

/// Pixel geometry of one delay line's rail on the reference image: where
/// rail position 0 sits, which way positions grow, and the scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RailAxis {
    /// Pixel of rail position 0.
    pub origin: [f32; 2],
    /// Unit direction of increasing rail position.
    pub direction: [f32; 2],
    /// Image pixels per rail-position unit.
    pub pixels_per_unit: f32,
}

/// Versioned delay-line → image-coordinate calibration.
///
/// Pure lookup data: mapping is a function of the table and its arguments
/// only. A new survey of the tunnel ships a new version as JSON; the built-in
/// [`CalibrationTable::v1`] covers the six lines of the current reference
/// image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationTable {
    pub version: String,
    pub lines: BTreeMap<u32, RailAxis>,
}

impl CalibrationTable {
    /// Built-in calibration for the current reference image (six horizontal
    /// rails stacked top to bottom, 14 px per rail unit).
    pub fn v1() -> Self {
        let lines = (1..=6)
            .map(|n| {
                (
                    n,
                    RailAxis {
                        origin: [80.0, 60.0 + 64.0 * n as f32],
                        direction: [1.0, 0.0],
                        pixels_per_unit: 14.0,
                    },
                )
            })
            .collect();
        CalibrationTable {
            version: "v1".to_string(),
            lines,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn contains(&self, line: DelayLineId) -> bool {
        self.lines.contains_key(&line.0)
    }

    /// Image coordinates of `rail_position` on `line`.
    ///
    /// A line outside the table is an error; silently defaulting to some
    /// coordinate would paint data onto the wrong rail.
    pub fn map(&self, line: DelayLineId, rail_position: f64) -> Result<PixelPoint, Error> {
        let axis = self
            .lines
            .get(&line.0)
            .ok_or(Error::UnknownDelayLine(line))?;
        let d = rail_position as f32 * axis.pixels_per_unit;
        Ok(PixelPoint {
            x: axis.origin[0] + axis.direction[0] * d,
            y: axis.origin[1] + axis.direction[1] * d,
        })
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self::v1()
    }
}
