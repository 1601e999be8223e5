// Parsing and small-statistics helpers shared by the pipeline stages.
//
// This module centralizes the "dirty" cell handling so the stages can work
// with clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Normalize one CSV cell: trim whitespace and map empty cells to `None`.
pub fn cell(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Parse a date cell. The municipal exports flip between ISO dates and the
/// Spanish day-first form, so both are accepted.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

/// Parse a severity code. Some exports write codes as "3.0", so a trailing
/// `.0` fraction is tolerated.
pub fn parse_severity(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let v = s.parse::<f64>().ok()?;
    if v.fract() == 0.0 {
        Some(v as i64)
    } else {
        None
    }
}

/// Linear-interpolation quantile over an already sorted sample.
/// Returns 0 for an empty slice to avoid NaNs in the rendered summary.
pub fn quantile(sorted: &[i64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0] as f64;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `41,870 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
