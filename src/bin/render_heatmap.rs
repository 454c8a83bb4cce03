//! End-to-end pipeline run: load a date range of reports, aggregate one
//! delay line into a daily grid, and write the heatmap PNG (overlaid on the
//! reference tunnel image when one is supplied).
//!
//! Usage:
//!   render_heatmap <reports-root> <start> <end> <line> <statistic> <out.png> [reference.png]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use railheat::{
    heatmap, render, CalibrationTable, DelayLineId, LineFilter, PositionBuckets, ReportStore,
    Statistic, TimeBucket,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 6 {
        bail!(
            "usage: render_heatmap <reports-root> <start> <end> <line> <statistic> <out.png> \
             [reference.png]"
        );
    }

    let root = PathBuf::from(&args[0]);
    let start: NaiveDate = args[1].parse().context("start date must be YYYY-MM-DD")?;
    let end: NaiveDate = args[2].parse().context("end date must be YYYY-MM-DD")?;
    let line = DelayLineId(args[3].parse().context("line must be a number")?);
    let statistic: Statistic = args[4].parse()?;
    let out = PathBuf::from(&args[5]);
    let reference = args.get(6).map(PathBuf::from);

    let store = ReportStore::new(&root);
    let (dataset, summary) = store.corrections_loader(start, end, Some(&LineFilter::One(line)))?;

    println!(
        "{} records from {} days ({} missing, {} failed, {} row warnings)",
        dataset.len(),
        summary.loaded.len(),
        summary.missing.len(),
        summary.failed.len(),
        summary.row_warnings.len()
    );
    if !summary.is_clean() {
        for (day, reason) in &summary.failed {
            println!("  failed {day}: {reason}");
        }
        for w in &summary.row_warnings {
            println!("  warning {}: {}", w.date, w.detail);
        }
    }

    let grid = heatmap(
        &dataset,
        TimeBucket::Daily,
        &PositionBuckets::Count(8),
        statistic,
    )?;

    let image = match reference {
        Some(path) => {
            let mut base = image::open(&path)
                .with_context(|| format!("opening reference image {}", path.display()))?
                .into_rgba8();
            render::overlay_heatmap(&mut base, &grid, &CalibrationTable::v1(), line, 6)?;
            base
        }
        None => render::render_grid(&grid, 24, 12),
    };

    image
        .save(&out)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("wrote {}", out.display());
    Ok(())
}
