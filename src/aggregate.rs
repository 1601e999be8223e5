//! Read-only reducers over the cleaned table. Nothing here mutates the
//! records; each function builds the one summary its chart needs.

use std::collections::{BTreeMap, HashMap};

use crate::types::Accident;

/// Severity display window for the box plot. Values above this stay in the
/// cleaned table; they are only excluded from the chart's sample.
pub const SEVERITY_DISPLAY_MAX: i64 = 15;

/// Accident count per district.
pub fn by_district(records: &[Accident]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for r in records {
        *counts.entry(r.district.clone()).or_insert(0) += 1;
    }
    counts
}

/// Accident count per calendar month. Every month 1..=12 is present, so a
/// month without accidents shows up as 0 rather than a gap in the line.
pub fn by_month(records: &[Accident]) -> BTreeMap<u32, usize> {
    let mut counts: BTreeMap<u32, usize> = (1..=12).map(|m| (m, 0)).collect();
    for r in records {
        if let Some(c) = counts.get_mut(&r.month) {
            *c += 1;
        }
    }
    counts
}

/// Accident count per accident type. Proportions are derived at render
/// time as count / total.
pub fn by_type(records: &[Accident]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for r in records {
        *counts.entry(r.accident_type.clone()).or_insert(0) += 1;
    }
    counts
}

/// Severity sample per accident type, clipped to the display window
/// `0..=SEVERITY_DISPLAY_MAX`.
pub fn severity_by_type(records: &[Accident]) -> BTreeMap<String, Vec<i64>> {
    let mut samples: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for r in records {
        if (0..=SEVERITY_DISPLAY_MAX).contains(&r.severity) {
            samples
                .entry(r.accident_type.clone())
                .or_default()
                .push(r.severity);
        }
    }
    samples
}
