// Entry point: run the whole batch once and print the four charts.
//
// No CLI flags and no environment variables; the data file is resolved
// relative to the executable's own directory, like the original analysis
// resolved its spreadsheet next to the script.

use std::path::PathBuf;

use anyhow::{Context, Result};

use accident_report::{aggregate, render, run_pipeline, types::RunSummary, util::format_int};

const DATA_FILE: &str = "2020_accidentalidad.csv";

fn data_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the running executable")?;
    let dir = exe
        .parent()
        .context("executable has no parent directory")?;
    Ok(dir.join(DATA_FILE))
}

fn main() -> Result<()> {
    let path = data_path()?;
    let (records, load_report, clean_report) = run_pipeline(&path)
        .with_context(|| format!("cleaning {} failed", path.display()))?;

    println!(
        "Processing dataset... ({} rows loaded, {} kept)",
        format_int(load_report.total_rows as i64),
        format_int(load_report.kept_rows as i64)
    );
    if load_report.skipped_missing_key > 0 {
        println!(
            "Note: {} rows skipped for a missing expediente key.",
            format_int(load_report.skipped_missing_key as i64)
        );
    }
    println!(
        "Cleaning: {} duplicates removed, {} rows dropped, {} values imputed, {} values set to a sentinel.",
        format_int(clean_report.duplicates_removed as i64),
        format_int(clean_report.rows_dropped as i64),
        format_int(clean_report.values_imputed as i64),
        format_int(clean_report.values_sentineled as i64)
    );
    println!(
        "{} cleaned records.\n",
        format_int(records.len() as i64)
    );

    let districts = aggregate::by_district(&records);
    let months = aggregate::by_month(&records);
    let types = aggregate::by_type(&records);
    let severities = aggregate::severity_by_type(&records);

    render::render_district_bars(&districts);
    render::render_month_series(&months);
    render::render_type_shares(&types);
    render::render_severity_boxes(&severities);

    // File export is an extension over the on-screen charts; each aggregate
    // lands next to the binary as CSV, plus a JSON run summary.
    render::write_csv("accidentes_por_distrito.csv", &render::district_rows(&districts))
        .context("writing district export")?;
    render::write_csv("accidentes_por_mes.csv", &render::month_rows(&months))
        .context("writing month export")?;
    render::write_csv("tipos_de_accidente.csv", &render::type_rows(&types))
        .context("writing accident-type export")?;
    render::write_csv("lesividad_por_tipo.csv", &render::severity_rows(&severities))
        .context("writing severity export")?;

    let summary = RunSummary {
        total_records: records.len(),
        districts: districts.len(),
        accident_types: types.len(),
        duplicates_removed: clean_report.duplicates_removed,
        rows_dropped: clean_report.rows_dropped,
        values_imputed: clean_report.values_imputed,
        values_sentineled: clean_report.values_sentineled,
    };
    render::write_json("resumen.json", &summary).context("writing run summary")?;

    Ok(())
}
