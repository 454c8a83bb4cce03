use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use log::debug;

use crate::data::model::CorrectionDataset;
use crate::error::Error;

// ---------------------------------------------------------------------------
// Bucketing parameters
// ---------------------------------------------------------------------------

/// Time partition rule. Buckets are contiguous, non-overlapping and cover
/// exactly the date span present in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBucket {
    Daily,
    /// 7-day spans anchored at the dataset's earliest date (not calendar
    /// weeks), so the partition depends only on the data.
    Weekly,
}

impl TimeBucket {
    fn days(self) -> i64 {
        match self {
            TimeBucket::Daily => 1,
            TimeBucket::Weekly => 7,
        }
    }
}

/// Position partition along the rail axis.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionBuckets {
    /// Explicit ascending boundaries; bucket `c` covers `[edges[c], edges[c+1])`,
    /// the last bucket additionally includes its upper edge. Records outside
    /// the boundaries are ignored.
    Edges(Vec<f64>),
    /// Equal-width bins spanning the observed position range.
    Count(usize),
}

/// Reduction applied to each cell's correction values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Mean,
    Max,
    /// Signed value of largest magnitude; exact-|v| ties go to the earliest
    /// record in dataset order.
    AbsMax,
    Count,
}

impl FromStr for Statistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Statistic::Mean),
            "max" => Ok(Statistic::Max),
            "abs-max" | "absmax" => Ok(Statistic::AbsMax),
            "count" => Ok(Statistic::Count),
            other => Err(Error::UnsupportedStatistic(other.to_string())),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Statistic::Mean => "mean",
            Statistic::Max => "max",
            Statistic::AbsMax => "abs-max",
            Statistic::Count => "count",
        })
    }
}

// ---------------------------------------------------------------------------
// HeatmapGrid
// ---------------------------------------------------------------------------

/// Aggregated (time bucket × position bucket) grid, immutable once returned.
///
/// `values[row * cols + col]` is `None` when no record fell in the cell, so
/// "no measurement" is never conflated with a real 0.0 correction. The edge
/// vectors carry the exact bucket boundaries so a renderer can place cells
/// without re-deriving them.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapGrid {
    /// `rows + 1` date boundaries; row `r` covers `[time_edges[r], time_edges[r+1])`.
    pub time_edges: Vec<NaiveDate>,
    /// `cols + 1` position boundaries.
    pub position_edges: Vec<f64>,
    /// Row-major cell statistics.
    pub values: Vec<Option<f64>>,
    pub statistic: Statistic,
}

impl HeatmapGrid {
    pub fn rows(&self) -> usize {
        self.time_edges.len().saturating_sub(1)
    }

    pub fn cols(&self) -> usize {
        self.position_edges.len().saturating_sub(1)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row * self.cols() + col).copied().flatten()
    }

    /// Min and max over the non-missing cells.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut present = self.values.iter().flatten();
        let first = *present.next()?;
        let (mut lo, mut hi) = (first, first);
        for &v in present {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        Some((lo, hi))
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Bin `dataset` into a time × position grid and reduce each cell.
///
/// Deterministic: identical dataset and parameters yield a bit-identical
/// grid. Cell values are gathered in dataset order (itself canonical), and
/// mean/max/count are order-independent reductions; `AbsMax` tie-breaking is
/// the only order-sensitive spot and is pinned to that canonical order.
///
/// An empty dataset has no observable time span: the grid comes back with
/// zero time rows, and columns still honour explicit edges.
pub fn heatmap(
    dataset: &CorrectionDataset,
    time_bucket: TimeBucket,
    position_buckets: &PositionBuckets,
    statistic: Statistic,
) -> Result<HeatmapGrid, Error> {
    let position_edges = position_edges_for(dataset, position_buckets);

    let Some((min_date, max_date)) = dataset.date_span() else {
        return Ok(HeatmapGrid {
            time_edges: Vec::new(),
            position_edges,
            values: Vec::new(),
            statistic,
        });
    };

    let step = time_bucket.days();
    let mut time_edges = vec![min_date];
    while *time_edges.last().unwrap_or(&max_date) <= max_date {
        let last = time_edges[time_edges.len() - 1];
        time_edges.push(last + Duration::days(step));
    }

    let rows = time_edges.len() - 1;
    let cols = position_edges.len().saturating_sub(1);
    let mut cells: Vec<Vec<f64>> = vec![Vec::new(); rows * cols];

    for record in &dataset.records {
        let row = ((record.report_date - min_date).num_days() / step) as usize;
        let Some(col) = position_index(&position_edges, record.rail_position) else {
            continue;
        };
        cells[row * cols + col].push(record.correction);
    }

    let values = cells.iter().map(|vs| reduce(vs, statistic)).collect();
    debug!(
        "heatmap: {rows}x{cols} cells, {} records, statistic {statistic}",
        dataset.len()
    );

    Ok(HeatmapGrid {
        time_edges,
        position_edges,
        values,
        statistic,
    })
}

fn position_edges_for(dataset: &CorrectionDataset, buckets: &PositionBuckets) -> Vec<f64> {
    match buckets {
        PositionBuckets::Edges(edges) => edges.clone(),
        PositionBuckets::Count(n) => {
            let Some((lo, hi)) = dataset.position_range() else {
                return Vec::new();
            };
            if *n == 0 {
                return Vec::new();
            }
            // degenerate range (single position) still gets a usable bin
            let span = if hi > lo { hi - lo } else { 1.0 };
            (0..=*n).map(|i| lo + span * i as f64 / *n as f64).collect()
        }
    }
}

/// Index of the bucket containing `p`; `None` when outside the boundaries.
/// Half-open buckets, last one closed so the maximum observed position is
/// never dropped.
fn position_index(edges: &[f64], p: f64) -> Option<usize> {
    if edges.len() < 2 {
        return None;
    }
    let last = edges.len() - 2;
    for c in 0..=last {
        if p >= edges[c] && (p < edges[c + 1] || (c == last && p <= edges[c + 1])) {
            return Some(c);
        }
    }
    None
}

fn reduce(values: &[f64], statistic: Statistic) -> Option<f64> {
    if values.is_empty() {
        // zero matching records: "no data", never a default zero
        return None;
    }
    Some(match statistic {
        Statistic::Mean => values.iter().sum::<f64>() / values.len() as f64,
        Statistic::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Statistic::AbsMax => {
            let mut best = values[0];
            for &v in &values[1..] {
                if v.abs() > best.abs() {
                    best = v;
                }
            }
            best
        }
        Statistic::Count => values.len() as f64,
    })
}
