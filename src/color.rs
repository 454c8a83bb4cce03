use image::Rgba;
use palette::{Hsl, IntoColor, Srgb};

use crate::heatmap::HeatmapGrid;

/// Overlay alpha of a painted cell; the reference image stays visible.
const CELL_ALPHA: u8 = 200;

// ---------------------------------------------------------------------------
// Continuous colour ramp
// ---------------------------------------------------------------------------

/// Map a normalised value in `[0, 1]` to a cold→hot colour (blue → red)
/// using evenly spaced hues.
pub fn heat_color(t: f32) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let hue = 240.0 * (1.0 - t);
    let hsl = Hsl::new(hue, 0.85, 0.5);
    let rgb: Srgb = hsl.into_color();
    Rgba([
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
        CELL_ALPHA,
    ])
}

// ---------------------------------------------------------------------------
// Value scale: grid statistic → normalised ramp position
// ---------------------------------------------------------------------------

/// Linear scale over the non-missing cells of a grid. Missing cells have no
/// colour at all: they are skipped at render time, never painted as zero.
#[derive(Debug, Clone, Copy)]
pub struct ValueScale {
    min: f64,
    max: f64,
}

impl ValueScale {
    /// `None` when the grid has no data anywhere.
    pub fn from_grid(grid: &HeatmapGrid) -> Option<Self> {
        grid.value_range().map(|(min, max)| ValueScale { min, max })
    }

    pub fn normalise(&self, value: f64) -> f32 {
        let span = self.max - self.min;
        if span <= f64::EPSILON {
            return 0.5;
        }
        ((value - self.min) / span) as f32
    }

    pub fn color_for(&self, value: f64) -> Rgba<u8> {
        heat_color(self.normalise(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::Statistic;

    #[test]
    fn ramp_endpoints_are_blue_and_red() {
        let cold = heat_color(0.0);
        let hot = heat_color(1.0);
        assert!(cold[2] > cold[0], "t=0 should lean blue");
        assert!(hot[0] > hot[2], "t=1 should lean red");
    }

    #[test]
    fn scale_normalises_linearly() {
        let grid = HeatmapGrid {
            time_edges: vec!["2024-03-01".parse().unwrap(), "2024-03-02".parse().unwrap()],
            position_edges: vec![0.0, 1.0, 2.0],
            values: vec![Some(-1.0), Some(3.0)],
            statistic: Statistic::Mean,
        };
        let scale = ValueScale::from_grid(&grid).unwrap();
        assert_eq!(scale.normalise(-1.0), 0.0);
        assert_eq!(scale.normalise(3.0), 1.0);
        assert_eq!(scale.normalise(1.0), 0.5);
    }

    #[test]
    fn all_missing_grid_has_no_scale() {
        let grid = HeatmapGrid {
            time_edges: vec!["2024-03-01".parse().unwrap(), "2024-03-02".parse().unwrap()],
            position_edges: vec![0.0, 1.0],
            values: vec![None],
            statistic: Statistic::Mean,
        };
        assert!(ValueScale::from_grid(&grid).is_none());
    }

    #[test]
    fn flat_grid_sits_mid_ramp() {
        let scale = ValueScale { min: 2.0, max: 2.0 };
        assert_eq!(scale.normalise(2.0), 0.5);
    }
}
