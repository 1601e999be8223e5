use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use tabled::Tabled;

/// Canonical column identifiers for the normalized table.
///
/// The record key (`id`, the expediente number) is the table index, not a
/// column, so it does not appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Date,
    TimeOfDay,
    Street,
    StreetNumber,
    District,
    AccidentType,
    VehicleType,
    PersonRole,
    AgeBand,
    Sex,
    Severity,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::TimeOfDay => "time_of_day",
            Column::Street => "street",
            Column::StreetNumber => "street_number",
            Column::District => "district",
            Column::AccidentType => "accident_type",
            Column::VehicleType => "vehicle_type",
            Column::PersonRole => "person_role",
            Column::AgeBand => "age_band",
            Column::Sex => "sex",
            Column::Severity => "severity",
        }
    }
}

/// All canonical columns, in source-file order.
pub const CANONICAL_COLUMNS: [Column; 11] = [
    Column::Date,
    Column::TimeOfDay,
    Column::Street,
    Column::StreetNumber,
    Column::District,
    Column::AccidentType,
    Column::VehicleType,
    Column::PersonRole,
    Column::AgeBand,
    Column::Sex,
    Column::Severity,
];

/// One row as it comes out of the schema normalizer: canonical column names,
/// key extracted, everything else still an optional raw string.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub id: String,
    pub date: Option<String>,
    pub time_of_day: Option<String>,
    pub street: Option<String>,
    pub street_number: Option<String>,
    pub district: Option<String>,
    pub accident_type: Option<String>,
    pub vehicle_type: Option<String>,
    pub person_role: Option<String>,
    pub age_band: Option<String>,
    pub sex: Option<String>,
    pub severity: Option<String>,
}

/// A row after type coercion: date and severity are typed, categorical
/// columns are still nullable until the null-resolution engine runs.
#[derive(Debug, Clone)]
pub struct StagedRecord {
    pub id: String,
    pub date: NaiveDate,
    pub time_of_day: Option<String>,
    pub street: Option<String>,
    pub street_number: Option<String>,
    pub district: Option<String>,
    pub accident_type: Option<String>,
    pub vehicle_type: Option<String>,
    pub person_role: Option<String>,
    pub age_band: Option<String>,
    pub sex: Option<String>,
    pub severity: Option<i64>,
}

impl StagedRecord {
    /// Shared access to the text columns by identifier. Returns `None` for
    /// the typed columns (`date`, `severity`), which have no text cell.
    pub fn text_field(&self, col: Column) -> Option<&Option<String>> {
        match col {
            Column::TimeOfDay => Some(&self.time_of_day),
            Column::Street => Some(&self.street),
            Column::StreetNumber => Some(&self.street_number),
            Column::District => Some(&self.district),
            Column::AccidentType => Some(&self.accident_type),
            Column::VehicleType => Some(&self.vehicle_type),
            Column::PersonRole => Some(&self.person_role),
            Column::AgeBand => Some(&self.age_band),
            Column::Sex => Some(&self.sex),
            Column::Date | Column::Severity => None,
        }
    }

    pub fn text_field_mut(&mut self, col: Column) -> Option<&mut Option<String>> {
        match col {
            Column::TimeOfDay => Some(&mut self.time_of_day),
            Column::Street => Some(&mut self.street),
            Column::StreetNumber => Some(&mut self.street_number),
            Column::District => Some(&mut self.district),
            Column::AccidentType => Some(&mut self.accident_type),
            Column::VehicleType => Some(&mut self.vehicle_type),
            Column::PersonRole => Some(&mut self.person_role),
            Column::AgeBand => Some(&mut self.age_band),
            Column::Sex => Some(&mut self.sex),
            Column::Date | Column::Severity => None,
        }
    }

    /// Full content tuple excluding the key. Deduplication compares rows on
    /// this, so rows are matched on what they say, not on which expediente
    /// they belong to.
    pub fn content_key(&self) -> ContentKey {
        (
            self.date,
            self.time_of_day.clone(),
            self.street.clone(),
            self.street_number.clone(),
            self.district.clone(),
            self.accident_type.clone(),
            self.vehicle_type.clone(),
            self.person_role.clone(),
            self.age_band.clone(),
            self.sex.clone(),
            self.severity,
        )
    }
}

pub type ContentKey = (
    NaiveDate,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<i64>,
);

/// Per-column categorical domains, discovered from the data at coercion
/// time. Open-world: any label observed in the file is a member, and the
/// sentinel policy may add one more.
#[derive(Debug, Default, Clone)]
pub struct CategoricalDomains {
    map: BTreeMap<Column, BTreeSet<String>>,
}

impl CategoricalDomains {
    pub fn observe(&mut self, col: Column, label: &str) {
        let members = self.map.entry(col).or_default();
        if !members.contains(label) {
            members.insert(label.to_string());
        }
    }

    pub fn contains(&self, col: Column, label: &str) -> bool {
        self.map.get(&col).is_some_and(|m| m.contains(label))
    }

    pub fn members(&self, col: Column) -> impl Iterator<Item = &str> {
        self.map.get(&col).into_iter().flatten().map(String::as_str)
    }
}

/// The in-memory table threaded through the cleaning stages. Each stage
/// owns it exclusively for the duration of its transformation.
#[derive(Debug, Clone)]
pub struct CleanTable {
    pub records: Vec<StagedRecord>,
    pub columns: Vec<Column>,
    pub domains: CategoricalDomains,
}

/// A fully cleaned involvement record. No column covered by a null policy
/// is optional any more; `street` and `age_band` sit outside every policy's
/// contract and stay nullable.
#[derive(Debug, Clone)]
pub struct Accident {
    pub id: String,
    pub date: NaiveDate,
    pub time_of_day: String,
    pub street: Option<String>,
    pub street_number: String,
    pub district: String,
    pub accident_type: String,
    pub vehicle_type: String,
    pub person_role: String,
    pub age_band: Option<String>,
    pub sex: String,
    pub severity: i64,
    /// Calendar month of `date`, 1..=12, set by the derivation step.
    pub month: u32,
}

// ---------------------------------------------------------------------------
// Rendered/exported report rows.

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DistrictCountRow {
    #[serde(rename = "District")]
    #[tabled(rename = "District")]
    pub district: String,
    #[serde(rename = "Accidents")]
    #[tabled(rename = "Accidents")]
    pub accidents: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MonthCountRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Accidents")]
    #[tabled(rename = "Accidents")]
    pub accidents: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TypeShareRow {
    #[serde(rename = "AccidentType")]
    #[tabled(rename = "AccidentType")]
    pub accident_type: String,
    #[serde(rename = "Accidents")]
    #[tabled(rename = "Accidents")]
    pub accidents: usize,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SeveritySummaryRow {
    #[serde(rename = "AccidentType")]
    #[tabled(rename = "AccidentType")]
    pub accident_type: String,
    #[serde(rename = "N")]
    #[tabled(rename = "N")]
    pub n: usize,
    #[serde(rename = "Min")]
    #[tabled(rename = "Min")]
    pub min: i64,
    #[serde(rename = "Q1")]
    #[tabled(rename = "Q1")]
    pub q1: String,
    #[serde(rename = "Median")]
    #[tabled(rename = "Median")]
    pub median: String,
    #[serde(rename = "Q3")]
    #[tabled(rename = "Q3")]
    pub q3: String,
    #[serde(rename = "Max")]
    #[tabled(rename = "Max")]
    pub max: i64,
}

/// End-of-run summary written to `resumen.json`.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub total_records: usize,
    pub districts: usize,
    pub accident_types: usize,
    pub duplicates_removed: usize,
    pub rows_dropped: usize,
    pub values_imputed: usize,
    pub values_sentineled: usize,
}
