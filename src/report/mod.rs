/// Report layer: one daily HTML document → correction records.
///
/// ```text
///  corrections_report_<date>.html
///        │
///        ▼
///   ┌──────────┐
///   │   html    │  tolerant tag scanning → tables of text cells
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  schema   │  versioned column mapping + numeric conventions
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  parser   │  table pairs → CorrectionRecord + RowWarning
///   └──────────┘
/// ```
pub mod html;
pub mod parser;
pub mod schema;
