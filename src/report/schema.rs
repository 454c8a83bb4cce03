use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::data::model::DelayLineId;
use crate::error::Error;

/// Column mapping and numeric conventions of the report generator.
///
/// The report HTML is a versioned contract with an external generator, so the
/// mapping is supplied as configuration rather than inferred from the data.
/// [`ReportSchema::default`] is the `v1` contract of the current generator;
/// a newer generator ships a JSON override loaded with
/// [`ReportSchema::from_json_str`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSchema {
    pub version: String,
    /// Accepted labels for the info-table timestamp row.
    pub timestamp_labels: Vec<String>,
    /// Accepted labels for the info-table delay-line row.
    pub delay_line_labels: Vec<String>,
    /// Accepted labels for the rail-position column of a corrections table.
    pub rail_labels: Vec<String>,
    /// Accepted labels for the correction-value column.
    pub correction_labels: Vec<String>,
    /// Numeric cells use `,` as the decimal separator.
    pub decimal_comma: bool,
    /// Authoritative delay-line enumeration. Empty = discover from data
    /// (and skip filter validation).
    pub known_lines: Vec<u32>,
}

impl Default for ReportSchema {
    fn default() -> Self {
        ReportSchema {
            version: "v1".to_string(),
            timestamp_labels: vec!["Timestamp".into()],
            delay_line_labels: vec!["Delay line number".into(), "Delay line".into()],
            rail_labels: vec!["Rail number".into(), "Rail".into()],
            correction_labels: vec!["Correction".into(), "Applied correction".into()],
            decimal_comma: false,
            known_lines: Vec::new(),
        }
    }
}

impl ReportSchema {
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_timestamp_label(&self, header: &str) -> bool {
        matches_any(&self.timestamp_labels, header)
    }

    pub fn is_delay_line_label(&self, header: &str) -> bool {
        matches_any(&self.delay_line_labels, header)
    }

    pub fn is_rail_label(&self, header: &str) -> bool {
        matches_any(&self.rail_labels, header)
    }

    pub fn is_correction_label(&self, header: &str) -> bool {
        matches_any(&self.correction_labels, header)
    }

    /// Whether a delay line belongs to the known enumeration.
    /// Always true in discovery mode (empty `known_lines`).
    pub fn line_is_known(&self, line: DelayLineId) -> bool {
        self.known_lines.is_empty() || self.known_lines.contains(&line.0)
    }

    /// Parse a numeric report cell.
    ///
    /// Tolerates surrounding whitespace, an explicit sign, and a trailing
    /// unit suffix (`µm`, `mm`, `%`, bracketed units). Anything ambiguous
    /// returns `None` so the caller can drop the row instead of storing a
    /// wrong value: a comma in non-comma locale (thousands vs decimal),
    /// several numeric tokens, or no numeric token at all.
    pub fn parse_number(&self, cell: &str) -> Option<f64> {
        static TOKEN: OnceLock<Regex> = OnceLock::new();
        let re = TOKEN.get_or_init(|| {
            // number token, then an optional unit tail
            Regex::new(r"^\s*([+-]?\d+(?:[.,]\d+)?(?:[eE][+-]?\d+)?)\s*(?:[%µ°a-zA-Z/\[\]]*)\s*$")
                .unwrap_or_else(|e| panic!("numeric token regex: {e}"))
        });
        let token = re.captures(cell)?.get(1)?.as_str();
        if token.contains(',') {
            if !self.decimal_comma {
                return None;
            }
            return token.replace(',', ".").parse().ok();
        }
        token.parse().ok()
    }
}

/// Case-insensitive match against accepted labels; a header may carry a unit
/// tail (e.g. `Correction [µm]`).
fn matches_any(labels: &[String], header: &str) -> bool {
    let h = header.trim().to_lowercase();
    labels.iter().any(|l| {
        let l = l.trim().to_lowercase();
        h == l || h.starts_with(&format!("{l} ")) || h.starts_with(&format!("{l}["))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_labels_match_v1_reports() {
        let s = ReportSchema::default();
        assert!(s.is_timestamp_label("Timestamp"));
        assert!(s.is_delay_line_label("delay line number"));
        assert!(s.is_rail_label("Rail Number"));
        assert!(s.is_correction_label("Correction [µm]"));
        assert!(!s.is_correction_label("Humidity"));
    }

    #[test]
    fn numeric_cells_with_sign_and_unit() {
        let s = ReportSchema::default();
        assert_eq!(s.parse_number(" -0.25 µm "), Some(-0.25));
        assert_eq!(s.parse_number("+3"), Some(3.0));
        assert_eq!(s.parse_number("41.5%"), Some(41.5));
        assert_eq!(s.parse_number("1.2e-3"), Some(0.0012));
        assert_eq!(s.parse_number("n/a"), None);
        assert_eq!(s.parse_number("1.2 3.4"), None);
    }

    #[test]
    fn decimal_comma_is_locale_dependent() {
        let mut s = ReportSchema::default();
        assert_eq!(s.parse_number("-0,25"), None);
        s.decimal_comma = true;
        assert_eq!(s.parse_number("-0,25"), Some(-0.25));
    }

    #[test]
    fn json_override_keeps_defaults_for_missing_fields() {
        let s = ReportSchema::from_json_str(
            r#"{ "version": "v2", "correction_labels": ["Offset"], "known_lines": [1, 2] }"#,
        )
        .unwrap();
        assert_eq!(s.version, "v2");
        assert!(s.is_correction_label("Offset"));
        assert!(!s.is_correction_label("Correction"));
        assert!(s.is_timestamp_label("Timestamp"));
        assert!(s.line_is_known(DelayLineId(2)));
        assert!(!s.line_is_known(DelayLineId(9)));
    }
}
