//! Input collaborator and schema normalizer.
//!
//! Reads the accident export (CSV, one sheet's worth of rows), validates the
//! column layout, renames columns positionally to the canonical scheme,
//! drops the two trailing columns that are known to carry no information,
//! and pulls out the expediente number as the record key.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{PipelineError, Result};
use crate::types::RawRecord;
use crate::util::cell;

/// Expected width of the raw file: the key column, the eleven canonical
/// data columns, and two empty trailing columns the export always carries.
pub const RAW_COLUMN_COUNT: usize = 14;

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    /// Rows excluded because the key cell was empty. Records without an
    /// expediente are invalid at the source, not a cleaning concern.
    pub skipped_missing_key: usize,
}

pub fn load_from_path(path: &Path) -> Result<(Vec<RawRecord>, LoadReport)> {
    let file = File::open(path)?;
    load_from_reader(file)
}

pub fn load_from_reader<R: Read>(reader: R) -> Result<(Vec<RawRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

    // The rename is positional, so the only thing the original headers are
    // good for is checking that the file has the shape we expect.
    let headers = rdr.headers()?;
    if headers.len() != RAW_COLUMN_COUNT {
        return Err(PipelineError::SchemaMismatch {
            expected: RAW_COLUMN_COUNT,
            found: headers.len(),
        });
    }

    let mut report = LoadReport::default();
    let mut rows: Vec<RawRecord> = Vec::new();

    for record in rdr.records() {
        let record = record?;
        report.total_rows += 1;

        let Some(id) = record.get(0).and_then(cell) else {
            report.skipped_missing_key += 1;
            continue;
        };

        let field = |i: usize| record.get(i).and_then(cell);
        rows.push(RawRecord {
            id,
            date: field(1),
            time_of_day: field(2),
            street: field(3),
            street_number: field(4),
            district: field(5),
            accident_type: field(6),
            vehicle_type: field(7),
            person_role: field(8),
            age_band: field(9),
            sex: field(10),
            severity: field(11),
            // columns 12 and 13 are the known-empty trailing pair, dropped
        });
        report.kept_rows += 1;
    }

    Ok((rows, report))
}
