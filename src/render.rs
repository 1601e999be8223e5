//! Output collaborator: turns the four aggregates into console charts and
//! optional file exports. Everything here is presentation; the numbers are
//! fixed by the aggregators.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::aggregate::SEVERITY_DISPLAY_MAX;
use crate::error::Result;
use crate::types::{DistrictCountRow, MonthCountRow, SeveritySummaryRow, TypeShareRow};
use crate::util::{format_int, quantile};

/// Calendar month names in the dataset's locale.
pub const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

const BAR_WIDTH: usize = 40;

pub fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

fn preview_table<T: Tabled + Clone>(rows: &[T]) {
    if rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(rows.to_vec()).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (count * BAR_WIDTH).div_ceil(max).min(BAR_WIDTH);
    "#".repeat(len)
}

/// District counts sorted by count descending, ties by name.
pub fn district_rows(counts: &HashMap<String, usize>) -> Vec<DistrictCountRow> {
    let mut rows: Vec<DistrictCountRow> = counts
        .iter()
        .map(|(district, n)| DistrictCountRow {
            district: district.clone(),
            accidents: *n,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.accidents
            .cmp(&a.accidents)
            .then_with(|| a.district.cmp(&b.district))
    });
    rows
}

/// Chart (a): horizontal bar chart of accidents per district.
pub fn render_district_bars(counts: &HashMap<String, usize>) {
    println!("Accidentes por distrito");
    let rows = district_rows(counts);
    let max = rows.first().map(|r| r.accidents).unwrap_or(0);
    let label_width = rows.iter().map(|r| r.district.len()).max().unwrap_or(0);
    for r in &rows {
        println!(
            "  {:<label_width$}  {:>7}  {}",
            r.district,
            format_int(r.accidents as i64),
            bar(r.accidents, max),
        );
    }
    println!();
}

pub fn month_rows(counts: &BTreeMap<u32, usize>) -> Vec<MonthCountRow> {
    counts
        .iter()
        .map(|(month, n)| MonthCountRow {
            month: MONTH_NAMES[(*month as usize) - 1].to_string(),
            accidents: *n,
        })
        .collect()
}

/// Chart (b): accidents over the months of the year, spelled-out names.
pub fn render_month_series(counts: &BTreeMap<u32, usize>) {
    println!("Accidentes a lo largo del año");
    let rows = month_rows(counts);
    let max = rows.iter().map(|r| r.accidents).max().unwrap_or(0);
    for r in &rows {
        println!(
            "  {:<12}  {:>7}  {}",
            r.month,
            format_int(r.accidents as i64),
            bar(r.accidents, max),
        );
    }
    println!();
}

/// Accident-type counts with percentage labels, sorted by count descending.
pub fn type_rows(counts: &HashMap<String, usize>) -> Vec<TypeShareRow> {
    let total: usize = counts.values().sum();
    let mut rows: Vec<TypeShareRow> = counts
        .iter()
        .map(|(accident_type, n)| TypeShareRow {
            accident_type: accident_type.clone(),
            accidents: *n,
            share: if total == 0 {
                "0.0%".to_string()
            } else {
                format!("{:.1}%", *n as f64 * 100.0 / total as f64)
            },
        })
        .collect();
    rows.sort_by(|a, b| {
        b.accidents
            .cmp(&a.accidents)
            .then_with(|| a.accident_type.cmp(&b.accident_type))
    });
    rows
}

/// Chart (c): proportion of each accident type, table standing in for the
/// donut with its percentage labels and legend.
pub fn render_type_shares(counts: &HashMap<String, usize>) {
    println!("Proporción de tipos de accidentes");
    preview_table(&type_rows(counts));
}

/// Five-number summaries over the clipped severity samples.
pub fn severity_rows(samples: &BTreeMap<String, Vec<i64>>) -> Vec<SeveritySummaryRow> {
    samples
        .iter()
        .map(|(accident_type, sample)| {
            let mut sorted = sample.clone();
            sorted.sort_unstable();
            SeveritySummaryRow {
                accident_type: accident_type.clone(),
                n: sorted.len(),
                min: sorted.first().copied().unwrap_or(0),
                q1: format!("{:.1}", quantile(&sorted, 0.25)),
                median: format!("{:.1}", quantile(&sorted, 0.5)),
                q3: format!("{:.1}", quantile(&sorted, 0.75)),
                max: sorted.last().copied().unwrap_or(0),
            }
        })
        .collect()
}

/// One box-and-whisker line on a 0..=SEVERITY_DISPLAY_MAX axis, two
/// character cells per severity unit.
fn box_line(min: f64, q1: f64, median: f64, q3: f64, max: f64) -> String {
    let cells = (SEVERITY_DISPLAY_MAX as usize) * 2 + 1;
    let pos = |v: f64| ((v.clamp(0.0, SEVERITY_DISPLAY_MAX as f64) * 2.0).round() as usize).min(cells - 1);
    let mut line = vec![' '; cells];
    for c in line.iter_mut().take(pos(max) + 1).skip(pos(min)) {
        *c = '-';
    }
    for c in line.iter_mut().take(pos(q3) + 1).skip(pos(q1)) {
        *c = '=';
    }
    line[pos(median)] = '|';
    line.into_iter().collect()
}

/// Chart (d): severity distribution per accident type, axis clipped to
/// [0, SEVERITY_DISPLAY_MAX].
pub fn render_severity_boxes(samples: &BTreeMap<String, Vec<i64>>) {
    println!(
        "Distribución de la lesividad por tipo de accidente (0..={})",
        SEVERITY_DISPLAY_MAX
    );
    let rows = severity_rows(samples);
    let label_width = rows
        .iter()
        .map(|r| r.accident_type.len())
        .max()
        .unwrap_or(0);
    for r in &rows {
        let line = box_line(
            r.min as f64,
            r.q1.parse().unwrap_or(0.0),
            r.median.parse().unwrap_or(0.0),
            r.q3.parse().unwrap_or(0.0),
            r.max as f64,
        );
        println!("  {:<label_width$}  [{}]", r.accident_type, line);
    }
    println!();
    preview_table(&rows);
}
