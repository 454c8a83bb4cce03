use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// DelayLineId – identifier of a physical delay line
// ---------------------------------------------------------------------------

/// Number of a delay line as printed in the reports ("Delay line number").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DelayLineId(pub u32);

impl fmt::Display for DelayLineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DL{}", self.0)
    }
}

impl DelayLineId {
    /// Parse a report cell such as `"3"`, `"DL3"` or `"dl 3"`.
    pub fn parse_cell(cell: &str) -> Option<Self> {
        let s = cell.trim();
        let s = s
            .strip_prefix("DL")
            .or_else(|| s.strip_prefix("dl"))
            .or_else(|| s.strip_prefix("Dl"))
            .unwrap_or(s)
            .trim();
        s.parse::<u32>().ok().map(DelayLineId)
    }
}

// ---------------------------------------------------------------------------
// MetadataValue – a single cell in a passthrough metadata column
// ---------------------------------------------------------------------------

/// A dynamically-typed value for report columns the pipeline does not
/// interpret. Required fields live as typed struct members on
/// [`CorrectionRecord`]; everything else passes through here untouched so a
/// future report version cannot break loading.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Timestamp-like text kept verbatim.
    Date(String),
    Null,
}

impl MetadataValue {
    /// Best-effort typing of a raw report cell.
    pub fn guess(s: &str) -> MetadataValue {
        let s = s.trim();
        if s.is_empty() {
            return MetadataValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return MetadataValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return MetadataValue::Float(f);
        }
        if s == "true" || s == "false" {
            return MetadataValue::Bool(s == "true");
        }
        MetadataValue::String(s.to_string())
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Date(d) => write!(f, "{d}"),
            MetadataValue::Null => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// CorrectionRecord – one corrected point on one day
// ---------------------------------------------------------------------------

/// One rail-position correction from one daily report. Never mutated after
/// creation; the same (date, line, position) triple may occur more than once
/// when several readings exist for a position.
#[derive(Debug, Clone)]
pub struct CorrectionRecord {
    /// Nominal date of the source report file.
    pub report_date: NaiveDate,
    pub delay_line: DelayLineId,
    /// Coordinate along the line's rail axis ("Rail number").
    pub rail_position: f64,
    /// Signed adjustment magnitude, unit as reported. Stored as-is.
    pub correction: f64,
    /// Open passthrough side-table: extra report columns, the report
    /// timestamp, tunnel humidity. Never required downstream.
    pub metadata: BTreeMap<String, MetadataValue>,
}

// ---------------------------------------------------------------------------
// CorrectionDataset – the consolidated table of one load call
// ---------------------------------------------------------------------------

/// All records produced by one `corrections_loader` call, sorted ascending by
/// `(report_date, delay_line, rail_position)`. Built fresh per load; the
/// loader keeps no reference after returning.
#[derive(Debug, Clone, Default)]
pub struct CorrectionDataset {
    pub records: Vec<CorrectionRecord>,
    /// Delay lines actually present in `records`.
    pub delay_lines: BTreeSet<DelayLineId>,
}

impl CorrectionDataset {
    /// Build the dataset index and establish the canonical record order.
    pub fn from_records(mut records: Vec<CorrectionRecord>) -> Self {
        records.sort_by(|a, b| {
            (a.report_date, a.delay_line)
                .cmp(&(b.report_date, b.delay_line))
                .then(a.rail_position.total_cmp(&b.rail_position))
        });
        let delay_lines = records.iter().map(|r| r.delay_line).collect();
        CorrectionDataset {
            records,
            delay_lines,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest report date present, if any.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        // records are sorted by date first
        let first = self.records.first()?.report_date;
        let last = self.records.last()?.report_date;
        Some((first, last))
    }

    /// Observed `[min, max]` rail position across all records.
    pub fn position_range(&self) -> Option<(f64, f64)> {
        let mut it = self.records.iter().map(|r| r.rail_position);
        let first = it.next()?;
        let (mut lo, mut hi) = (first, first);
        for p in it {
            lo = lo.min(p);
            hi = hi.max(p);
        }
        Some((lo, hi))
    }

    /// Sorted union of metadata column names across all records.
    pub fn metadata_columns(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .records
            .iter()
            .flat_map(|r| r.metadata.keys().map(|k| k.as_str()))
            .collect();
        set.into_iter().map(str::to_string).collect()
    }
}
