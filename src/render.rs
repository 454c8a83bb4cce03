//! Thin overlay renderer: paints an aggregated grid onto the reference
//! tunnel image. Position buckets run along the calibrated rail axis, time
//! buckets stack perpendicular to it. The interactive front end owns
//! everything beyond this (legends, axes, interaction).

use image::{Rgba, RgbaImage};
use log::debug;

use crate::color::ValueScale;
use crate::data::model::DelayLineId;
use crate::error::Error;
use crate::heatmap::HeatmapGrid;
use crate::layout::CalibrationTable;

/// Paint `grid` for one delay line onto `base`. Each time row is a band of
/// `band_px` pixels; missing cells leave the underlying image untouched.
pub fn overlay_heatmap(
    base: &mut RgbaImage,
    grid: &HeatmapGrid,
    calibration: &CalibrationTable,
    line: DelayLineId,
    band_px: u32,
) -> Result<(), Error> {
    let Some(scale) = ValueScale::from_grid(grid) else {
        debug!("grid for {line} has no data, nothing to paint");
        // still validate the line so a bad id cannot pass silently
        calibration.map(line, 0.0)?;
        return Ok(());
    };

    for col in 0..grid.cols() {
        let start = calibration.map(line, grid.position_edges[col])?;
        let end = calibration.map(line, grid.position_edges[col + 1])?;

        let (dx, dy) = (end.x - start.x, end.y - start.y);
        let len = (dx * dx + dy * dy).sqrt();
        if len < 1.0 {
            continue;
        }
        // unit vectors along the rail and perpendicular to it
        let (ux, uy) = (dx / len, dy / len);
        let (px, py) = (-uy, ux);

        for row in 0..grid.rows() {
            let Some(value) = grid.get(row, col) else {
                continue;
            };
            let color = scale.color_for(value);
            let offset = (row as u32 * band_px) as f32;

            for t in 0..len as u32 {
                for w in 0..band_px {
                    let x = start.x + ux * t as f32 + px * (offset + w as f32);
                    let y = start.y + uy * t as f32 + py * (offset + w as f32);
                    blend_at(base, x, y, color);
                }
            }
        }
    }
    Ok(())
}

/// Standalone rendering of a grid as a plain cell image, for when no
/// reference image is at hand. Rows top to bottom, positions left to right.
pub fn render_grid(grid: &HeatmapGrid, cell_w: u32, cell_h: u32) -> RgbaImage {
    let w = (grid.cols() as u32 * cell_w).max(1);
    let h = (grid.rows() as u32 * cell_h).max(1);
    let mut img = RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]));

    let Some(scale) = ValueScale::from_grid(grid) else {
        return img;
    };

    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            let Some(value) = grid.get(row, col) else {
                continue;
            };
            let color = scale.color_for(value);
            for y in 0..cell_h {
                for x in 0..cell_w {
                    img.put_pixel(col as u32 * cell_w + x, row as u32 * cell_h + y, color);
                }
            }
        }
    }
    img
}

fn blend_at(img: &mut RgbaImage, x: f32, y: f32, src: Rgba<u8>) {
    if x < 0.0 || y < 0.0 {
        return;
    }
    let (xi, yi) = (x as u32, y as u32);
    if xi >= img.width() || yi >= img.height() {
        return;
    }
    let dst = img.get_pixel_mut(xi, yi);
    let a = src[3] as f32 / 255.0;
    for i in 0..3 {
        dst[i] = (src[i] as f32 * a + dst[i] as f32 * (1.0 - a)) as u8;
    }
    dst[3] = dst[3].max(src[3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::Statistic;

    fn grid(values: Vec<Option<f64>>) -> HeatmapGrid {
        HeatmapGrid {
            time_edges: vec!["2024-03-01".parse().unwrap(), "2024-03-02".parse().unwrap()],
            position_edges: vec![0.0, 5.0, 10.0],
            values,
            statistic: Statistic::Mean,
        }
    }

    #[test]
    fn painted_cells_change_pixels_missing_cells_do_not() {
        let g = grid(vec![Some(1.0), None]);
        let mut img = RgbaImage::from_pixel(400, 400, Rgba([0, 0, 0, 255]));
        overlay_heatmap(&mut img, &g, &CalibrationTable::v1(), DelayLineId(1), 6).unwrap();

        // first bucket: rail units 0..5 on line 1 → x 80..150, y ~124
        let painted = img.get_pixel(100, 124);
        assert_ne!(*painted, Rgba([0, 0, 0, 255]));
        // second bucket is missing → untouched
        let untouched = img.get_pixel(200, 124);
        assert_eq!(*untouched, Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn unknown_line_is_rejected_even_when_grid_is_empty() {
        let g = grid(vec![None, None]);
        let mut img = RgbaImage::new(10, 10);
        assert!(matches!(
            overlay_heatmap(&mut img, &g, &CalibrationTable::v1(), DelayLineId(42), 4),
            Err(Error::UnknownDelayLine(_))
        ));
    }

    #[test]
    fn standalone_grid_image_has_cell_dimensions() {
        let g = grid(vec![Some(0.0), Some(1.0)]);
        let img = render_grid(&g, 20, 10);
        assert_eq!((img.width(), img.height()), (40, 10));
        assert_ne!(img.get_pixel(5, 5), img.get_pixel(25, 5));
    }
}
