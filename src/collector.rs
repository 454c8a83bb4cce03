use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{info, warn};

use crate::data::model::{CorrectionDataset, CorrectionRecord, DelayLineId};
use crate::error::Error;
use crate::report::parser::{parse_report, RowWarning};
use crate::report::schema::ReportSchema;

/// File-name prefix of a daily report, per the report generator contract.
pub const REPORT_BASENAME: &str = "corrections_report";

// ---------------------------------------------------------------------------
// Delay-line filter
// ---------------------------------------------------------------------------

/// Optional delay-line restriction applied *during* load, so a long date
/// range over a big corpus never materialises records it will discard.
#[derive(Debug, Clone)]
pub enum LineFilter {
    One(DelayLineId),
    Set(BTreeSet<DelayLineId>),
}

impl LineFilter {
    pub fn matches(&self, line: DelayLineId) -> bool {
        match self {
            LineFilter::One(id) => *id == line,
            LineFilter::Set(ids) => ids.contains(&line),
        }
    }

    fn ids(&self) -> Vec<DelayLineId> {
        match self {
            LineFilter::One(id) => vec![*id],
            LineFilter::Set(ids) => ids.iter().copied().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Load summary
// ---------------------------------------------------------------------------

/// What happened to each requested day. Missing days are expected (weekends,
/// maintenance) and informational; failed days carry the parse error text.
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub loaded: Vec<NaiveDate>,
    pub missing: Vec<NaiveDate>,
    pub failed: Vec<(NaiveDate, String)>,
    pub row_warnings: Vec<RowWarning>,
}

impl LoadSummary {
    /// No malformed days and no dropped rows.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.row_warnings.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Report store
// ---------------------------------------------------------------------------

/// The on-disk report corpus: `<root>/<YYYY>/<MM>/corrections_report_<date>.html`.
/// Read-only; nothing here mutates source files.
#[derive(Debug, Clone)]
pub struct ReportStore {
    root: PathBuf,
    schema: ReportSchema,
}

impl ReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ReportStore {
            root: root.into(),
            schema: ReportSchema::default(),
        }
    }

    pub fn with_schema(root: impl Into<PathBuf>, schema: ReportSchema) -> Self {
        ReportStore {
            root: root.into(),
            schema,
        }
    }

    pub fn schema(&self) -> &ReportSchema {
        &self.schema
    }

    /// Canonical path of one day's report.
    pub fn report_path(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(date.format("%Y").to_string())
            .join(date.format("%m").to_string())
            .join(format!("{REPORT_BASENAME}_{date}.html"))
    }

    /// Load every report in the inclusive `[start, end]` range.
    ///
    /// Missing days are skipped; malformed days are collected into the
    /// summary; both leave the rest of the range intact. Two calls with the
    /// same arguments over an unchanged corpus return row-set-equal datasets
    /// in the same order.
    pub fn corrections_loader(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        delay_line: Option<&LineFilter>,
    ) -> Result<(CorrectionDataset, LoadSummary), Error> {
        // Parameter validation happens before any I/O.
        if start > end {
            return Err(Error::InvalidDateRange { start, end });
        }
        if let Some(filter) = delay_line {
            for id in filter.ids() {
                if !self.schema.line_is_known(id) {
                    return Err(Error::UnknownDelayLine(id));
                }
            }
        }

        let mut records: Vec<CorrectionRecord> = Vec::new();
        let mut summary = LoadSummary::default();

        let mut day = start;
        loop {
            self.load_day(day, delay_line, &mut records, &mut summary);
            if day >= end {
                break;
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        Ok((CorrectionDataset::from_records(records), summary))
    }

    fn load_day(
        &self,
        day: NaiveDate,
        filter: Option<&LineFilter>,
        records: &mut Vec<CorrectionRecord>,
        summary: &mut LoadSummary,
    ) {
        let path = self.report_path(day);
        if !path.exists() {
            info!("no report for {day} ({})", path.display());
            summary.missing.push(day);
            return;
        }

        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                // present but unreadable counts as a failed day, not an abort
                warn!("unreadable report {}: {e}", path.display());
                summary.failed.push((day, e.to_string()));
                return;
            }
        };

        match parse_report(&text, day, &self.schema) {
            Ok(parsed) => {
                summary.loaded.push(day);
                summary.row_warnings.extend(parsed.warnings);
                records.extend(
                    parsed
                        .records
                        .into_iter()
                        .filter(|r| filter.map_or(true, |f| f.matches(r.delay_line))),
                );
            }
            Err(e) => {
                warn!("{e}");
                summary.failed.push((day, e.to_string()));
            }
        }
    }
}

/// Convenience wrapper mirroring the original tool's entry point: default
/// schema, corpus rooted at `root`.
pub fn corrections_loader(
    root: impl AsRef<Path>,
    start: NaiveDate,
    end: NaiveDate,
    delay_line: Option<&LineFilter>,
) -> Result<(CorrectionDataset, LoadSummary), Error> {
    ReportStore::new(root.as_ref()).corrections_loader(start, end, delay_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_path_follows_corpus_layout() {
        let store = ReportStore::new("/corpus");
        let d: NaiveDate = "2024-03-04".parse().unwrap();
        assert_eq!(
            store.report_path(d),
            PathBuf::from("/corpus/2024/03/corrections_report_2024-03-04.html")
        );
    }

    #[test]
    fn reversed_range_fails_before_io() {
        let store = ReportStore::new("/nonexistent");
        let start: NaiveDate = "2024-03-05".parse().unwrap();
        let end: NaiveDate = "2024-03-01".parse().unwrap();
        assert!(matches!(
            store.corrections_loader(start, end, None),
            Err(Error::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn filter_outside_known_lines_fails_before_io() {
        let schema = ReportSchema {
            known_lines: vec![1, 2, 3],
            ..ReportSchema::default()
        };
        let store = ReportStore::with_schema("/nonexistent", schema);
        let d: NaiveDate = "2024-03-01".parse().unwrap();
        let err = store
            .corrections_loader(d, d, Some(&LineFilter::One(DelayLineId(9))))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownDelayLine(DelayLineId(9))));
    }

    #[test]
    fn discovery_mode_accepts_any_filter_line() {
        // empty known_lines = discovery mode; an empty corpus just yields
        // missing days
        let store = ReportStore::new("/nonexistent");
        let d: NaiveDate = "2024-03-01".parse().unwrap();
        let (ds, summary) = store
            .corrections_loader(d, d, Some(&LineFilter::One(DelayLineId(9))))
            .unwrap();
        assert!(ds.is_empty());
        assert_eq!(summary.missing, vec![d]);
    }
}
