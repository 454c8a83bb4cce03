/// Data layer: the consolidated correction table and its export.
///
/// ```text
///   report::parser (per day)
///        │
///        ▼
///   ┌────────────────────┐
///   │ CorrectionDataset   │  Vec<CorrectionRecord>, line index,
///   │                     │  canonical (date, line, position) order
///   └────────────────────┘
///        │                ▼
///        ▼           export (csv hand-off)
///    heatmap
/// ```
pub mod export;
pub mod model;
