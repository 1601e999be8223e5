//! The cleaning pipeline core: type coercion, deduplication, the
//! four-policy null-resolution engine, and month derivation.
//!
//! Stages run strictly in that order and each one owns the table while it
//! works. Cleaning either fully succeeds or the run aborts; no aggregate is
//! computed over a partially cleaned table.

use std::collections::{HashMap, HashSet};

use chrono::Datelike;

use crate::error::{PipelineError, Result};
use crate::types::{
    Accident, CategoricalDomains, CleanTable, Column, RawRecord, StagedRecord, CANONICAL_COLUMNS,
};
use crate::util::{parse_date, parse_severity};

/// Label used by the sentinel-category policy. "Unknown" is a first-class
/// answer in this dataset, not a guess.
pub const SENTINEL_LABEL: &str = "Desconocido";

/// Columns coerced to categorical label sets.
pub const CATEGORICAL_COLUMNS: [Column; 7] = [
    Column::District,
    Column::AccidentType,
    Column::TimeOfDay,
    Column::VehicleType,
    Column::PersonRole,
    Column::AgeBand,
    Column::Sex,
];

/// How the null-resolution engine treats missing values in one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// No defensible default exists; the whole row goes.
    DropRow,
    /// Fill with the column's most frequent non-null value.
    ImputeMode,
    /// Fill with an explicit "Desconocido" category member.
    SentinelCategory,
    /// Fill with 0, meaning "no recorded injury".
    SentinelValue,
}

/// Column-group → policy dispatch table. Policies execute grouped, in the
/// order the variants are listed above; row drops must precede mode
/// computation so modes are not skewed by rows already known invalid.
pub const POLICIES: &[(Column, NullPolicy)] = &[
    (Column::StreetNumber, NullPolicy::DropRow),
    (Column::District, NullPolicy::DropRow),
    (Column::PersonRole, NullPolicy::ImputeMode),
    (Column::AccidentType, NullPolicy::ImputeMode),
    (Column::VehicleType, NullPolicy::ImputeMode),
    (Column::Sex, NullPolicy::SentinelCategory),
    (Column::TimeOfDay, NullPolicy::SentinelCategory),
    (Column::Severity, NullPolicy::SentinelValue),
];

/// What the cleaning stages did, for the end-of-run console summary.
#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    pub duplicates_removed: usize,
    pub rows_dropped: usize,
    pub values_imputed: usize,
    pub values_sentineled: usize,
}

/// Run the whole cleaning pipeline over normalized rows.
pub fn clean(raw: Vec<RawRecord>) -> Result<(Vec<Accident>, CleanReport)> {
    let mut report = CleanReport::default();
    let mut table = coerce(raw)?;
    report.duplicates_removed = dedup(&mut table);
    resolve_nulls(&mut table, &mut report)?;
    let mut records = finalize(table);
    derive_months(&mut records);
    Ok((records, report))
}

/// Type coercion: parse the date and severity cells, and discover the
/// categorical domain of every labelled column from the observed values.
pub fn coerce(raw: Vec<RawRecord>) -> Result<CleanTable> {
    let mut domains = CategoricalDomains::default();
    let mut records = Vec::with_capacity(raw.len());

    for row in raw {
        let date_cell = row.date.unwrap_or_default();
        let date = parse_date(&date_cell).ok_or_else(|| PipelineError::DateParse {
            id: row.id.clone(),
            value: date_cell.clone(),
        })?;

        let severity = match row.severity {
            None => None,
            Some(s) => Some(parse_severity(&s).ok_or_else(|| PipelineError::SeverityParse {
                id: row.id.clone(),
                value: s.clone(),
            })?),
        };

        let staged = StagedRecord {
            id: row.id,
            date,
            time_of_day: row.time_of_day,
            street: row.street,
            street_number: row.street_number,
            district: row.district,
            accident_type: row.accident_type,
            vehicle_type: row.vehicle_type,
            person_role: row.person_role,
            age_band: row.age_band,
            sex: row.sex,
            severity,
        };

        for col in CATEGORICAL_COLUMNS {
            if let Some(Some(label)) = staged.text_field(col) {
                domains.observe(col, label);
            }
        }
        records.push(staged);
    }

    Ok(CleanTable {
        records,
        columns: CANONICAL_COLUMNS.to_vec(),
        domains,
    })
}

/// Remove rows whose full content (key excluded) repeats an earlier row,
/// keeping the first occurrence. Idempotent.
pub fn dedup(table: &mut CleanTable) -> usize {
    let before = table.records.len();
    let mut seen = HashSet::new();
    table.records.retain(|r| seen.insert(r.content_key()));
    before - table.records.len()
}

/// Apply the four null policies from `POLICIES`, in policy order.
///
/// Postcondition: no nulls remain in any policy-covered column.
pub fn resolve_nulls(table: &mut CleanTable, report: &mut CleanReport) -> Result<()> {
    for (col, _) in POLICIES {
        if !table.columns.contains(col) {
            return Err(PipelineError::MissingRequiredColumn { column: col.name() });
        }
    }

    let targets = |policy: NullPolicy| {
        POLICIES
            .iter()
            .filter(move |(_, p)| *p == policy)
            .map(|(c, _)| *c)
    };

    // 1. Drop rows missing a value that cannot be defaulted.
    let drop_cols: Vec<Column> = targets(NullPolicy::DropRow).collect();
    let before = table.records.len();
    table.records.retain(|r| {
        drop_cols
            .iter()
            .all(|c| matches!(r.text_field(*c), Some(Some(_))))
    });
    report.rows_dropped += before - table.records.len();

    // 2. Modal imputation. All modes are taken from the post-drop,
    //    pre-imputation state; the columns are independent of each other.
    let modes: Vec<(Column, String)> = targets(NullPolicy::ImputeMode)
        .map(|col| column_mode(table, col).map(|m| (col, m)))
        .collect::<Result<_>>()?;
    for (col, mode) in modes {
        for r in &mut table.records {
            if let Some(field) = r.text_field_mut(col) {
                if field.is_none() {
                    *field = Some(mode.clone());
                    report.values_imputed += 1;
                }
            }
        }
    }

    // 3. Sentinel category.
    for col in targets(NullPolicy::SentinelCategory) {
        if !table.domains.contains(col, SENTINEL_LABEL) {
            table.domains.observe(col, SENTINEL_LABEL);
        }
        for r in &mut table.records {
            if let Some(field) = r.text_field_mut(col) {
                if field.is_none() {
                    *field = Some(SENTINEL_LABEL.to_string());
                    report.values_sentineled += 1;
                }
            }
        }
    }

    // 4. Sentinel value: a missing severity means no recorded injury.
    for r in &mut table.records {
        if r.severity.is_none() {
            r.severity = Some(0);
            report.values_sentineled += 1;
        }
    }

    Ok(())
}

/// Most frequent non-null value of `col`; ties break to the
/// lexicographically smallest label so the result is deterministic.
fn column_mode(table: &CleanTable, col: Column) -> Result<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in &table.records {
        if let Some(Some(v)) = r.text_field(col) {
            *counts.entry(v.as_str()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(label, _)| label.to_string())
        .ok_or(PipelineError::ModeUndefined { column: col.name() })
}

/// Narrow the staged rows into `Accident` values. The policy passes above
/// leave every covered column `Some`, so the fallbacks are unreachable.
pub fn finalize(table: CleanTable) -> Vec<Accident> {
    table
        .records
        .into_iter()
        .map(|r| Accident {
            id: r.id,
            date: r.date,
            time_of_day: r.time_of_day.unwrap_or_default(),
            street: r.street,
            street_number: r.street_number.unwrap_or_default(),
            district: r.district.unwrap_or_default(),
            accident_type: r.accident_type.unwrap_or_default(),
            vehicle_type: r.vehicle_type.unwrap_or_default(),
            person_role: r.person_role.unwrap_or_default(),
            age_band: r.age_band,
            sex: r.sex.unwrap_or_default(),
            severity: r.severity.unwrap_or(0),
            month: 0,
        })
        .collect()
}

/// Derivation step: month-of-year from the accident date.
pub fn derive_months(records: &mut [Accident]) {
    for r in records {
        r.month = r.date.month();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn staged(id: &str) -> StagedRecord {
        StagedRecord {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2020, 6, 15).unwrap(),
            time_of_day: Some("DE 10:00 A 10:59".into()),
            street: Some("CALLE MAYOR".into()),
            street_number: Some("12".into()),
            district: Some("CENTRO".into()),
            accident_type: Some("ALCANCE".into()),
            vehicle_type: Some("TURISMO".into()),
            person_role: Some("CONDUCTOR".into()),
            age_band: Some("DE 25 A 29 AÑOS".into()),
            sex: Some("HOMBRE".into()),
            severity: Some(1),
        }
    }

    fn table(records: Vec<StagedRecord>) -> CleanTable {
        let mut domains = CategoricalDomains::default();
        for r in &records {
            for col in CATEGORICAL_COLUMNS {
                if let Some(Some(label)) = r.text_field(col) {
                    domains.observe(col, label);
                }
            }
        }
        CleanTable {
            records,
            columns: CANONICAL_COLUMNS.to_vec(),
            domains,
        }
    }

    fn raw(id: &str, date: &str) -> RawRecord {
        RawRecord {
            id: id.to_string(),
            date: Some(date.to_string()),
            time_of_day: Some("DE 10:00 A 10:59".into()),
            street: Some("CALLE MAYOR".into()),
            street_number: Some("12".into()),
            district: Some("CENTRO".into()),
            accident_type: Some("ALCANCE".into()),
            vehicle_type: Some("TURISMO".into()),
            person_role: Some("CONDUCTOR".into()),
            age_band: Some("DE 25 A 29 AÑOS".into()),
            sex: Some("HOMBRE".into()),
            severity: Some("1".into()),
        }
    }

    #[test]
    fn coerce_reports_bad_dates_with_the_record_key() {
        let err = coerce(vec![raw("2020S000777", "pronto")]).unwrap_err();
        match err {
            PipelineError::DateParse { id, value } => {
                assert_eq!(id, "2020S000777");
                assert_eq!(value, "pronto");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn coerce_discovers_categorical_domains() {
        let mut second = raw("2", "2020-01-02");
        second.district = Some("MORATALAZ".into());
        let t = coerce(vec![raw("1", "2020-01-01"), second]).unwrap();
        let members: Vec<&str> = t.domains.members(Column::District).collect();
        assert_eq!(members, vec!["CENTRO", "MORATALAZ"]);
    }

    #[test]
    fn dedup_drops_content_duplicates_keeping_first() {
        let a = staged("2020S000001");
        let mut b = staged("2020S000002");
        b.district = Some("RETIRO".into());
        // same content as `a`, different key: still a duplicate
        let c = staged("2020S000003");
        let mut t = table(vec![a, b, c]);

        assert_eq!(dedup(&mut t), 1);
        let ids: Vec<&str> = t.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2020S000001", "2020S000002"]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let mut t = table(vec![staged("1"), staged("1"), staged("2")]);
        dedup(&mut t);
        let snapshot: Vec<_> = t.records.iter().map(StagedRecord::content_key).collect();
        assert_eq!(dedup(&mut t), 0);
        let again: Vec<_> = t.records.iter().map(StagedRecord::content_key).collect();
        assert_eq!(snapshot, again);
    }

    #[test]
    fn drop_policy_removes_rows_missing_district_or_number() {
        let mut no_district = staged("1");
        no_district.district = None;
        let mut no_number = staged("2");
        no_number.street_number = None;
        let mut t = table(vec![no_district, staged("3"), no_number]);
        let mut report = CleanReport::default();

        resolve_nulls(&mut t, &mut report).unwrap();
        assert_eq!(report.rows_dropped, 2);
        assert_eq!(t.records.len(), 1);
        assert_eq!(t.records[0].id, "3");
    }

    #[test]
    fn modal_imputation_uses_most_frequent_value() {
        let mut a = staged("1");
        a.vehicle_type = Some("MOTOCICLETA".into());
        let b = staged("2");
        let c = staged("3");
        let mut missing = staged("4");
        missing.vehicle_type = None;
        let mut t = table(vec![a, b, c, missing]);
        let mut report = CleanReport::default();

        resolve_nulls(&mut t, &mut report).unwrap();
        assert_eq!(t.records[3].vehicle_type.as_deref(), Some("TURISMO"));
        assert_eq!(report.values_imputed, 1);
    }

    #[test]
    fn modal_imputation_ties_break_lexicographically() {
        let mut a = staged("1");
        a.accident_type = Some("CAIDA".into());
        let mut b = staged("2");
        b.accident_type = Some("ALCANCE".into());
        let mut missing = staged("3");
        missing.accident_type = None;
        let mut t = table(vec![a, b, missing]);
        let mut report = CleanReport::default();

        resolve_nulls(&mut t, &mut report).unwrap();
        assert_eq!(t.records[2].accident_type.as_deref(), Some("ALCANCE"));
    }

    #[test]
    fn modal_imputation_with_no_observed_values_fails() {
        let mut a = staged("1");
        a.person_role = None;
        let mut b = staged("2");
        b.person_role = None;
        let mut t = table(vec![a, b]);
        let mut report = CleanReport::default();

        let err = resolve_nulls(&mut t, &mut report).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ModeUndefined {
                column: "person_role"
            }
        ));
    }

    #[test]
    fn sentinel_category_fills_exactly_the_null_entries() {
        let mut a = staged("1");
        a.sex = None;
        let mut b = staged("2");
        b.sex = None;
        let c = staged("3");
        let mut t = table(vec![a, b, c]);
        let mut report = CleanReport::default();

        resolve_nulls(&mut t, &mut report).unwrap();
        let unknown = t
            .records
            .iter()
            .filter(|r| r.sex.as_deref() == Some(SENTINEL_LABEL))
            .count();
        assert_eq!(unknown, 2);
        assert_eq!(t.records[2].sex.as_deref(), Some("HOMBRE"));
        assert!(t.domains.contains(Column::Sex, SENTINEL_LABEL));
    }

    #[test]
    fn severity_nulls_become_zero() {
        let mut a = staged("1");
        a.severity = None;
        let mut t = table(vec![a, staged("2")]);
        let mut report = CleanReport::default();

        resolve_nulls(&mut t, &mut report).unwrap();
        assert_eq!(t.records[0].severity, Some(0));
        assert_eq!(t.records[1].severity, Some(1));
    }

    #[test]
    fn resolve_nulls_requires_policy_target_columns() {
        let mut t = table(vec![staged("1")]);
        t.columns.retain(|c| *c != Column::District);
        let mut report = CleanReport::default();

        let err = resolve_nulls(&mut t, &mut report).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingRequiredColumn { column: "district" }
        ));
    }

    #[test]
    fn null_resolution_leaves_no_nulls_in_covered_columns() {
        let mut a = staged("1");
        a.sex = None;
        a.time_of_day = None;
        a.severity = None;
        let mut b = staged("2");
        b.person_role = None;
        b.accident_type = None;
        b.vehicle_type = None;
        let mut t = table(vec![a, b, staged("3")]);
        let mut report = CleanReport::default();

        resolve_nulls(&mut t, &mut report).unwrap();
        for r in &t.records {
            for (col, policy) in POLICIES {
                if *policy == NullPolicy::SentinelValue {
                    assert!(r.severity.is_some());
                } else if let Some(field) = r.text_field(*col) {
                    assert!(field.is_some(), "{} still null", col.name());
                }
            }
        }
    }

    #[test]
    fn months_derive_from_dates_and_stay_in_range() {
        let mut jan = staged("1");
        jan.date = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        let mut dec = staged("2");
        dec.date = NaiveDate::from_ymd_opt(2020, 12, 1).unwrap();
        let mut records = finalize(table(vec![jan, dec]));

        derive_months(&mut records);
        assert_eq!(records[0].month, 1);
        assert_eq!(records[1].month, 12);
        for r in &records {
            assert!((1..=12).contains(&r.month));
            assert_eq!(r.month, r.date.month());
        }
    }
}
