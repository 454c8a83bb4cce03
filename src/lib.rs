//! Ingestion and heatmap aggregation for daily delay-line rail-correction
//! reports.
//!
//! An external generator drops one HTML report per calendar day into a
//! corpus on disk. This crate walks a date range of that corpus, parses each
//! report into [`CorrectionRecord`]s, consolidates them into a
//! [`CorrectionDataset`], and bins the result into a time × rail-position
//! [`HeatmapGrid`] that the front end overlays on the reference tunnel image.
//!
//! The two stable entry points the front end depends on:
//! [`ReportStore::corrections_loader`] and [`heatmap()`](heatmap::heatmap).
//! Their signatures are covered by the integration tests; everything else is
//! free to move.

pub mod collector;
pub mod color;
pub mod data;
pub mod error;
pub mod heatmap;
pub mod layout;
pub mod render;
pub mod report;

pub use collector::{corrections_loader, LineFilter, LoadSummary, ReportStore};
pub use data::export::{export_csv, export_csv_file};
pub use data::model::{CorrectionDataset, CorrectionRecord, DelayLineId, MetadataValue};
pub use error::Error;
pub use heatmap::{heatmap, HeatmapGrid, PositionBuckets, Statistic, TimeBucket};
pub use layout::{CalibrationTable, PixelPoint, RailAxis};
pub use report::parser::{parse_report, ParsedReport, RowWarning, WarningKind};
pub use report::schema::ReportSchema;
