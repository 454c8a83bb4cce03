use chrono::NaiveDate;
use thiserror::Error;

use crate::data::model::DelayLineId;

/// Fatal, per-call failures of the pipeline.
///
/// Per-day and per-row trouble during a range load is deliberately *not*
/// represented here: it accumulates into a
/// [`LoadSummary`](crate::collector::LoadSummary) so a multi-day load never
/// aborts over one bad file or row.
#[derive(Debug, Error)]
pub enum Error {
    /// The document does not match the expected report structure at all:
    /// no tables, or no info/corrections table pair carrying the required
    /// fields. Distinct from a well-formed report with an empty corrections
    /// table, which parses to zero records.
    #[error("malformed report for {date}: {reason}")]
    MalformedReport { date: NaiveDate, reason: String },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Delay line id outside the known-line enumeration or the layout
    /// calibration table.
    #[error("unknown delay line {0}")]
    UnknownDelayLine(DelayLineId),

    #[error("unsupported statistic '{0}' (expected one of: mean, max, abs-max, count)")]
    UnsupportedStatistic(String),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("writing csv: {0}")]
    Csv(#[from] csv::Error),
}
