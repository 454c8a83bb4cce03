use std::io::Write;
use std::path::Path;

use log::info;

use crate::data::model::CorrectionDataset;
use crate::error::Error;

/// Write the consolidated dataset as CSV: the fixed columns first, then the
/// union of metadata columns in sorted order. Records missing a metadata
/// column get an empty cell.
pub fn export_csv<W: Write>(dataset: &CorrectionDataset, writer: W) -> Result<(), Error> {
    let meta_columns = dataset.metadata_columns();
    let mut w = csv::Writer::from_writer(writer);

    let mut header = vec![
        "report_date".to_string(),
        "delay_line".to_string(),
        "rail_position".to_string(),
        "correction".to_string(),
    ];
    header.extend(meta_columns.iter().cloned());
    w.write_record(&header)?;

    for record in &dataset.records {
        let mut row = vec![
            record.report_date.to_string(),
            record.delay_line.0.to_string(),
            record.rail_position.to_string(),
            record.correction.to_string(),
        ];
        for col in &meta_columns {
            row.push(
                record
                    .metadata
                    .get(col)
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            );
        }
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

/// [`export_csv`] straight to a file.
pub fn export_csv_file(dataset: &CorrectionDataset, path: impl AsRef<Path>) -> Result<(), Error> {
    let file = std::fs::File::create(path.as_ref())?;
    export_csv(dataset, file)?;
    info!(
        "wrote {} records to {}",
        dataset.len(),
        path.as_ref().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::{CorrectionRecord, DelayLineId, MetadataValue};

    #[test]
    fn fixed_columns_then_sorted_metadata_union() {
        let mut m1 = BTreeMap::new();
        m1.insert("Operator".to_string(), MetadataValue::String("ops".into()));
        let mut m2 = BTreeMap::new();
        m2.insert(
            "Tunnel Relative Humidity".to_string(),
            MetadataValue::Float(41.5),
        );

        let ds = CorrectionDataset::from_records(vec![
            CorrectionRecord {
                report_date: "2024-03-01".parse().unwrap(),
                delay_line: DelayLineId(1),
                rail_position: 2.0,
                correction: -0.25,
                metadata: m1,
            },
            CorrectionRecord {
                report_date: "2024-03-02".parse().unwrap(),
                delay_line: DelayLineId(2),
                rail_position: 3.0,
                correction: 0.5,
                metadata: m2,
            },
        ]);

        let mut buf = Vec::new();
        export_csv(&ds, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some(
                "report_date,delay_line,rail_position,correction,\
                 Operator,Tunnel Relative Humidity"
            )
        );
        assert_eq!(lines.next(), Some("2024-03-01,1,2,-0.25,ops,"));
        assert_eq!(lines.next(), Some("2024-03-02,2,3,0.5,,41.5"));
    }
}
