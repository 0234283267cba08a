//! Flight-record table loading and column validation.

use crate::error::{Result, ScorecardError};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub const CARRIER_COLUMN: &str = "CarrierName";
pub const YEAR_COLUMN: &str = "Year";
pub const MONTH_COLUMN: &str = "Month";
pub const DELAY_FLAG_COLUMN: &str = "ArrDelay15";
pub const DELAY_MINUTES_COLUMN: &str = "ArrDelayMinutes";
pub const CANCELLED_COLUMN: &str = "Cancelled";

/// Columns every input file must carry, in the order they are reported when missing.
pub const REQUIRED_COLUMNS: &[&str] = &[
    CARRIER_COLUMN,
    YEAR_COLUMN,
    MONTH_COLUMN,
    DELAY_FLAG_COLUMN,
    DELAY_MINUTES_COLUMN,
    CANCELLED_COLUMN,
];

/// One flight, deserialized from a CSV row by header name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlightRecord {
    #[serde(rename = "CarrierName")]
    pub carrier: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    /// 1 when the flight arrived 15+ minutes late; null for cancelled flights.
    #[serde(rename = "ArrDelay15", deserialize_with = "nullable_f64")]
    pub arr_delay15: Option<f64>,
    #[serde(rename = "ArrDelayMinutes", deserialize_with = "nullable_f64")]
    pub arr_delay_minutes: Option<f64>,
    #[serde(rename = "Cancelled", deserialize_with = "nullable_f64")]
    pub cancelled: Option<f64>,
}

/// Cell spellings read as a missing value, besides the empty cell.
pub const NULL_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A",
    "#N/A N/A", "#NA", "<NA>", "1.#IND", "-1.#IND", "1.#QNAN", "-1.#QNAN",
];

/// True for empty cells and the usual spellings of a missing value.
pub fn is_null_cell(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || NULL_TOKENS.contains(&cell)
}

/// Numeric cell where null tokens and non-finite numbers become `None`.
fn nullable_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = String::deserialize(deserializer)?;
    if is_null_cell(&cell) {
        return Ok(None);
    }
    let value: f64 = cell
        .trim()
        .parse()
        .map_err(|_| D::Error::custom(format!("invalid number {cell:?}")))?;
    Ok(value.is_finite().then_some(value))
}

impl FlightRecord {
    pub fn new(carrier: &str, year: i32, month: u32) -> Self {
        FlightRecord {
            carrier: carrier.to_string(),
            year,
            month,
            arr_delay15: Some(0.0),
            arr_delay_minutes: Some(0.0),
            cancelled: Some(0.0),
        }
    }

    /// Marks the flight delayed by `minutes`.
    pub fn delayed(mut self, minutes: f64) -> Self {
        self.arr_delay15 = Some(1.0);
        self.arr_delay_minutes = Some(minutes);
        self
    }

    /// Marks the flight cancelled; delay fields become null.
    pub fn cancelled(mut self) -> Self {
        self.cancelled = Some(1.0);
        self.arr_delay15 = None;
        self.arr_delay_minutes = None;
        self
    }

    pub fn is_delayed(&self) -> bool {
        flag_is_set(self.arr_delay15)
    }

    pub fn is_cancelled(&self) -> bool {
        flag_is_set(self.cancelled)
    }

    /// True only when the cancellation flag is present and clear.
    pub fn is_completed(&self) -> bool {
        self.cancelled == Some(0.0)
    }

    /// Calendar period of the flight as `(year, month)`.
    pub fn period(&self) -> (i32, u32) {
        (self.year, self.month)
    }
}

pub(crate) fn flag_is_set(flag: Option<f64>) -> bool {
    flag == Some(1.0)
}

/// Key used to partition flights before aggregating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Carrier,
    Year,
    Month,
    YearMonth,
    CarrierYear,
}

impl GroupBy {
    /// Group label for a record.
    pub fn key(&self, record: &FlightRecord) -> String {
        match self {
            GroupBy::Carrier => record.carrier.clone(),
            GroupBy::Year => record.year.to_string(),
            GroupBy::Month => format!("{:02}", record.month),
            GroupBy::YearMonth => format!("{}-{:02}", record.year, record.month),
            GroupBy::CarrierYear => format!("{} / {}", record.carrier, record.year),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupBy::Carrier => "carrier",
            GroupBy::Year => "year",
            GroupBy::Month => "month",
            GroupBy::YearMonth => "year-month",
            GroupBy::CarrierYear => "carrier-year",
        };
        f.write_str(name)
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "carrier" => Ok(GroupBy::Carrier),
            "year" => Ok(GroupBy::Year),
            "month" => Ok(GroupBy::Month),
            "year-month" => Ok(GroupBy::YearMonth),
            "carrier-year" => Ok(GroupBy::CarrierYear),
            other => Err(format!(
                "unknown grouping '{other}' (expected carrier, year, month, year-month or carrier-year)"
            )),
        }
    }
}

/// An in-memory flight table: typed records plus the raw rows they came from.
#[derive(Debug, Clone)]
pub struct FlightTable {
    headers: StringRecord,
    records: Vec<FlightRecord>,
    raw: Vec<StringRecord>,
}

impl FlightTable {
    /// Reads a CSV table, failing if any required column is absent.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();

        let missing = missing_columns(&headers);
        if !missing.is_empty() {
            return Err(ScorecardError::MissingColumns(missing));
        }

        let mut records = Vec::new();
        let mut raw = Vec::new();
        for result in rdr.records() {
            let row = result?;
            let record: FlightRecord = row.deserialize(Some(&headers))?;
            records.push(record);
            raw.push(row);
        }

        debug!(rows = records.len(), columns = headers.len(), "CSV table parsed");
        Ok(FlightTable {
            headers,
            records,
            raw,
        })
    }

    /// Builds a table holding only the required columns.
    pub fn from_records(records: Vec<FlightRecord>) -> Self {
        let headers = StringRecord::from(REQUIRED_COLUMNS.to_vec());
        let raw = records.iter().map(raw_row).collect();
        FlightTable {
            headers,
            records,
            raw,
        }
    }

    pub fn records(&self) -> &[FlightRecord] {
        &self.records
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    /// Raw string cells of each row, in header order.
    pub fn raw_rows(&self) -> &[StringRecord] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct labels under `group_by`.
    pub fn distinct_groups(&self, group_by: GroupBy) -> usize {
        self.records
            .iter()
            .map(|r| group_by.key(r))
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Smallest and largest `Year`, or `None` for an empty table.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        let min = self.records.iter().map(|r| r.year).min()?;
        let max = self.records.iter().map(|r| r.year).max()?;
        Some((min, max))
    }

    /// Earliest and latest `(year, month)` periods.
    pub fn period_range(&self) -> Option<((i32, u32), (i32, u32))> {
        let min = self.records.iter().map(FlightRecord::period).min()?;
        let max = self.records.iter().map(FlightRecord::period).max()?;
        Some((min, max))
    }
}

fn missing_columns(headers: &StringRecord) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect()
}

fn raw_row(record: &FlightRecord) -> StringRecord {
    let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    StringRecord::from(vec![
        record.carrier.clone(),
        record.year.to_string(),
        record.month.to_string(),
        cell(record.arr_delay15),
        cell(record.arr_delay_minutes),
        cell(record.cancelled),
    ])
}

/// Loads a flight table from `path` and checks the required columns are present.
///
/// # Errors
///
/// Returns [`ScorecardError::Io`] if the file cannot be opened and
/// [`ScorecardError::MissingColumns`] naming every absent required column.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<FlightTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ScorecardError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let table = FlightTable::from_reader(file)?;

    let (first_year, last_year) = table.year_range().unwrap_or_default();
    info!(
        path = %path.display(),
        records = table.len(),
        first_year,
        last_year,
        carriers = table.distinct_groups(GroupBy::Carrier),
        "Data loaded"
    );

    Ok(table)
}
