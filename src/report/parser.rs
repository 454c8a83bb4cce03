use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use log::debug;
use regex::Regex;

use crate::data::model::{CorrectionRecord, DelayLineId, MetadataValue};
use crate::error::Error;
use crate::report::html::{self, Table};
use crate::report::schema::ReportSchema;

/// Metadata keys written by the parser itself (on top of passthrough columns).
pub const META_TIMESTAMP: &str = "Timestamp";
pub const META_HUMIDITY: &str = "Tunnel Relative Humidity";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A cell failed numeric/field parsing; the row was dropped.
    BadCell,
    /// The report's embedded date differs from the nominal day being loaded.
    DateMismatch,
}

/// A recoverable per-row or per-report issue. Collected, never thrown.
#[derive(Debug, Clone)]
pub struct RowWarning {
    pub date: NaiveDate,
    pub kind: WarningKind,
    pub detail: String,
}

/// Outcome of parsing one structurally valid report.
#[derive(Debug, Clone, Default)]
pub struct ParsedReport {
    pub records: Vec<CorrectionRecord>,
    pub warnings: Vec<RowWarning>,
}

/// Parse one daily HTML report into correction records.
///
/// The report carries table *pairs*: an info table (key/value rows holding at
/// least the timestamp and the delay-line number) followed by a corrections
/// table (rail position and correction value in columns located by their
/// schema labels, anything else passed through as metadata).
///
/// A report whose tables are entirely absent, or in which no pair carries the
/// required info fields, is malformed. A valid pair with an empty corrections
/// table is a quiet day and parses to zero records.
pub fn parse_report(
    html_text: &str,
    nominal_date: NaiveDate,
    schema: &ReportSchema,
) -> Result<ParsedReport, Error> {
    let tables = html::extract_tables(html_text);
    if tables.is_empty() {
        return Err(Error::MalformedReport {
            date: nominal_date,
            reason: "no tables in document".into(),
        });
    }

    let humidity = extract_humidity(html_text);
    let mut out = ParsedReport::default();
    let mut info_pairs = 0usize;

    // Tables come in (info, corrections) pairs.
    let mut i = 0;
    while i + 1 < tables.len() {
        let Some(info) = read_info(&tables[i], schema) else {
            i += 1; // resynchronise on the next candidate info table
            continue;
        };
        info_pairs += 1;

        check_embedded_date(&info, nominal_date, &mut out.warnings);
        parse_corrections(
            &tables[i + 1],
            &info,
            humidity,
            nominal_date,
            schema,
            &mut out,
        );
        i += 2;
    }

    if info_pairs == 0 {
        return Err(Error::MalformedReport {
            date: nominal_date,
            reason: "no table pair with timestamp and delay-line fields".into(),
        });
    }

    debug!(
        "report {nominal_date}: {} records, {} warnings",
        out.records.len(),
        out.warnings.len()
    );
    Ok(out)
}

// ---------------------------------------------------------------------------
// Info table
// ---------------------------------------------------------------------------

struct InfoBlock {
    timestamp: Option<String>,
    delay_line: DelayLineId,
}

/// Read the key/value info table. Returns `None` when this table is not an
/// info table (wrong labels), in which case the pair window slides by one.
fn read_info(table: &Table, schema: &ReportSchema) -> Option<InfoBlock> {
    let mut timestamp = None;
    let mut delay_line = None;

    for row in &table.rows {
        let (label, value) = match row.as_slice() {
            [label, value, ..] => (label, value),
            _ => continue,
        };
        if schema.is_timestamp_label(label) {
            timestamp = Some(value.clone());
        } else if schema.is_delay_line_label(label) {
            delay_line = DelayLineId::parse_cell(value);
        }
    }

    // Both fields must be present for this to count as an info table.
    timestamp.as_ref()?;
    Some(InfoBlock {
        timestamp,
        delay_line: delay_line?,
    })
}

fn check_embedded_date(info: &InfoBlock, nominal_date: NaiveDate, warnings: &mut Vec<RowWarning>) {
    let Some(ts) = info.timestamp.as_deref() else {
        return;
    };
    let Some(embedded) = ts
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    else {
        return;
    };
    if embedded != nominal_date {
        warnings.push(RowWarning {
            date: nominal_date,
            kind: WarningKind::DateMismatch,
            detail: format!("report timestamp {ts} does not match nominal day {nominal_date}"),
        });
    }
}

// ---------------------------------------------------------------------------
// Corrections table
// ---------------------------------------------------------------------------

fn parse_corrections(
    table: &Table,
    info: &InfoBlock,
    humidity: Option<f64>,
    nominal_date: NaiveDate,
    schema: &ReportSchema,
    out: &mut ParsedReport,
) {
    let Some(header) = table.rows.first() else {
        return; // empty table: quiet day for this line
    };

    // Locate the rail column by label; a headerless first column (pandas
    // index style) also counts as the rail column.
    let rail_col = header
        .iter()
        .position(|h| schema.is_rail_label(h))
        .or_else(|| header.first().is_some_and(|h| h.is_empty()).then_some(0));
    let correction_col = header
        .iter()
        .enumerate()
        .position(|(idx, h)| Some(idx) != rail_col && schema.is_correction_label(h));

    let (Some(rail_col), Some(correction_col)) = (rail_col, correction_col) else {
        if table.rows.len() > 1 {
            out.warnings.push(RowWarning {
                date: nominal_date,
                kind: WarningKind::BadCell,
                detail: format!(
                    "{}: corrections table lacks a rail or correction column (headers: {})",
                    info.delay_line,
                    header.join(", ")
                ),
            });
        }
        return;
    };

    for (row_no, row) in table.rows.iter().enumerate().skip(1) {
        let rail_cell = row.get(rail_col).map(String::as_str).unwrap_or("");
        let corr_cell = row.get(correction_col).map(String::as_str).unwrap_or("");

        let (Some(rail_position), Some(correction)) =
            (schema.parse_number(rail_cell), schema.parse_number(corr_cell))
        else {
            out.warnings.push(RowWarning {
                date: nominal_date,
                kind: WarningKind::BadCell,
                detail: format!(
                    "{} row {row_no}: unparsable rail '{rail_cell}' or correction '{corr_cell}'",
                    info.delay_line
                ),
            });
            continue;
        };

        let mut metadata = BTreeMap::new();
        if let Some(ts) = &info.timestamp {
            metadata.insert(META_TIMESTAMP.to_string(), MetadataValue::Date(ts.clone()));
        }
        if let Some(h) = humidity {
            metadata.insert(META_HUMIDITY.to_string(), MetadataValue::Float(h));
        }
        // Unknown extra columns pass through untouched.
        for (idx, (col, cell)) in header.iter().zip(row.iter()).enumerate() {
            if idx == rail_col || idx == correction_col || col.is_empty() {
                continue;
            }
            metadata.insert(col.clone(), MetadataValue::guess(cell));
        }

        out.records.push(CorrectionRecord {
            report_date: nominal_date,
            delay_line: info.delay_line,
            rail_position,
            correction,
            metadata,
        });
    }
}

// ---------------------------------------------------------------------------
// Humidity heading
// ---------------------------------------------------------------------------

/// Tunnel relative humidity from the `<h3>` headings, e.g. `"… 41.5% …"`.
fn extract_humidity(html_text: &str) -> Option<f64> {
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    let re = PERCENT.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)\s*%").unwrap_or_else(|e| panic!("humidity regex: {e}"))
    });

    html::extract_tag_texts(html_text, "h3")
        .iter()
        .find_map(|text| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        "2024-03-04".parse().unwrap()
    }

    fn report(body: &str) -> String {
        format!("<html><body><h3>Tunnel relative humidity: 41.5%</h3>{body}</body></html>")
    }

    const BLOCK_DL2: &str = r#"
        <table>
          <tr><td>Timestamp</td><td>2024-03-04 08:12:00</td></tr>
          <tr><td>Delay line number</td><td>2</td></tr>
        </table>
        <table>
          <tr><th>Rail number</th><th>Correction [µm]</th><th>Operator</th></tr>
          <tr><td>5</td><td>-0.25</td><td>ops</td></tr>
          <tr><td>6</td><td>0.75</td><td>ops</td></tr>
        </table>"#;

    #[test]
    fn parses_a_pair_into_records() {
        let parsed = parse_report(&report(BLOCK_DL2), day(), &ReportSchema::default()).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert!(parsed.warnings.is_empty());

        let r = &parsed.records[0];
        assert_eq!(r.delay_line, DelayLineId(2));
        assert_eq!(r.rail_position, 5.0);
        assert_eq!(r.correction, -0.25);
        assert_eq!(r.report_date, day());
        assert_eq!(
            r.metadata.get(META_HUMIDITY),
            Some(&MetadataValue::Float(41.5))
        );
        assert_eq!(
            r.metadata.get("Operator"),
            Some(&MetadataValue::String("ops".into()))
        );
        assert_eq!(
            r.metadata.get(META_TIMESTAMP),
            Some(&MetadataValue::Date("2024-03-04 08:12:00".into()))
        );
    }

    #[test]
    fn bad_numeric_row_is_skipped_with_warning() {
        let body = r#"
            <table>
              <tr><td>Timestamp</td><td>2024-03-04 08:12:00</td></tr>
              <tr><td>Delay line number</td><td>1</td></tr>
            </table>
            <table>
              <tr><th>Rail number</th><th>Correction</th></tr>
              <tr><td>5</td><td>n/a</td></tr>
              <tr><td>6</td><td>0.5</td></tr>
            </table>"#;
        let parsed = parse_report(&report(body), day(), &ReportSchema::default()).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].rail_position, 6.0);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].kind, WarningKind::BadCell);
    }

    #[test]
    fn empty_corrections_table_is_a_quiet_day() {
        let body = r#"
            <table>
              <tr><td>Timestamp</td><td>2024-03-04 08:12:00</td></tr>
              <tr><td>Delay line number</td><td>3</td></tr>
            </table>
            <table></table>"#;
        let parsed = parse_report(&report(body), day(), &ReportSchema::default()).unwrap();
        assert!(parsed.records.is_empty());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn missing_structure_is_malformed() {
        let no_tables = "<html><body><p>maintenance</p></body></html>";
        assert!(matches!(
            parse_report(no_tables, day(), &ReportSchema::default()),
            Err(Error::MalformedReport { .. })
        ));

        let wrong_tables = "<table><tr><td>a</td><td>b</td></tr></table>\
                            <table><tr><td>c</td></tr></table>";
        assert!(matches!(
            parse_report(wrong_tables, day(), &ReportSchema::default()),
            Err(Error::MalformedReport { .. })
        ));
    }

    #[test]
    fn embedded_date_mismatch_is_a_warning_not_a_failure() {
        let body = BLOCK_DL2.replace("2024-03-04 08:12:00", "2024-03-03 23:58:00");
        let parsed = parse_report(&report(&body), day(), &ReportSchema::default()).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert!(parsed
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::DateMismatch));
        // records keep the nominal date
        assert!(parsed.records.iter().all(|r| r.report_date == day()));
    }

    #[test]
    fn rail_column_is_located_by_schema_label() {
        let schema = ReportSchema {
            rail_labels: vec!["Position".into()],
            ..ReportSchema::default()
        };
        let body = |headers: &str| {
            format!(
                r#"
                <table>
                  <tr><td>Timestamp</td><td>2024-03-04 08:12:00</td></tr>
                  <tr><td>Delay line number</td><td>1</td></tr>
                </table>
                <table>
                  <tr>{headers}</tr>
                  <tr><td>7</td><td>0.5</td></tr>
                </table>"#
            )
        };

        // headers that carry the configured rail label parse normally
        let ok = parse_report(
            &report(&body("<th>Position</th><th>Correction</th>")),
            day(),
            &schema,
        )
        .unwrap();
        assert_eq!(ok.records.len(), 1);
        assert_eq!(ok.records[0].rail_position, 7.0);

        // a table whose columns never mention the rail label must not have
        // some unrelated numeric column smuggled in as the rail position
        let rejected = parse_report(
            &report(&body("<th>Operator id</th><th>Correction</th>")),
            day(),
            &schema,
        )
        .unwrap();
        assert!(rejected.records.is_empty());
        assert_eq!(rejected.warnings.len(), 1);
        assert_eq!(rejected.warnings[0].kind, WarningKind::BadCell);
    }

    #[test]
    fn headerless_first_column_counts_as_the_rail_column() {
        let body = r#"
            <table>
              <tr><td>Timestamp</td><td>2024-03-04 08:12:00</td></tr>
              <tr><td>Delay line number</td><td>1</td></tr>
            </table>
            <table>
              <tr><th></th><th>Correction</th></tr>
              <tr><td>4</td><td>-0.1</td></tr>
            </table>"#;
        let parsed = parse_report(&report(body), day(), &ReportSchema::default()).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].rail_position, 4.0);
    }

    #[test]
    fn multiple_pairs_accumulate() {
        let second = BLOCK_DL2.replace(
            "<tr><td>Delay line number</td><td>2</td></tr>",
            "<tr><td>Delay line number</td><td>4</td></tr>",
        );
        let parsed = parse_report(
            &report(&format!("{BLOCK_DL2}{second}")),
            day(),
            &ReportSchema::default(),
        )
        .unwrap();
        assert_eq!(parsed.records.len(), 4);
        let lines: Vec<u32> = parsed.records.iter().map(|r| r.delay_line.0).collect();
        assert!(lines.contains(&2) && lines.contains(&4));
    }
}
