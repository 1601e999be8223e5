//! Batch cleaning and reporting for one year of a city's traffic-accident
//! involvement records.
//!
//! The run is a single synchronous pass: load → normalize → coerce →
//! deduplicate → resolve nulls → derive months → aggregate → render.
//! Cleaning either fully succeeds or the run aborts before any aggregate
//! is computed.

pub mod aggregate;
pub mod clean;
pub mod error;
pub mod loader;
pub mod render;
pub mod types;
pub mod util;

use std::io::Read;
use std::path::Path;

use clean::CleanReport;
use error::Result;
use loader::LoadReport;
use types::Accident;

/// Load and clean the accident file at `path`.
pub fn run_pipeline(path: &Path) -> Result<(Vec<Accident>, LoadReport, CleanReport)> {
    let (raw, load_report) = loader::load_from_path(path)?;
    let (records, clean_report) = clean::clean(raw)?;
    Ok((records, load_report, clean_report))
}

/// Same as [`run_pipeline`] but over any reader, for callers that already
/// hold the file contents (and for the integration tests).
pub fn run_pipeline_from_reader<R: Read>(
    reader: R,
) -> Result<(Vec<Accident>, LoadReport, CleanReport)> {
    let (raw, load_report) = loader::load_from_reader(reader)?;
    let (records, clean_report) = clean::clean(raw)?;
    Ok((records, load_report, clean_report))
}
