//! Console reports for flight tables and scorecards.
//!
//! Every report renders through `fmt::Display`, with a `format_*` function
//! returning the text and a `print_*` function writing it to stdout.

use crate::analyzers::scorecard::{best_performers, worst_performers};
use crate::analyzers::types::{ScorecardReport, ScorecardRow};
use crate::analyzers::utility::{mean, pct};
use crate::error::Result;
use crate::records::{
    CANCELLED_COLUMN, DELAY_FLAG_COLUMN, FlightRecord, FlightTable, GroupBy, is_null_cell,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

const WIDE_RULE: usize = 80;
const NARROW_RULE: usize = 60;

/// Headline numbers for a whole flight table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_flights: usize,
    pub carriers: usize,
    pub first_period: Option<(i32, u32)>,
    pub last_period: Option<(i32, u32)>,
    /// Mean of the non-null delay flags, as a percentage.
    pub delay_rate_pct: Option<f64>,
    pub cancellation_rate_pct: Option<f64>,
    /// Mean minutes over delayed, completed flights.
    pub avg_delay_minutes: Option<f64>,
}

/// Missing-cell count for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingColumn {
    pub column: String,
    pub count: usize,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub total_rows: usize,
    /// Columns with at least one null cell, most missing first.
    pub missing: Vec<MissingColumn>,
    /// Rows identical to an earlier row.
    pub duplicate_rows: usize,
    pub invalid_delay_flags: usize,
    pub invalid_cancelled_flags: usize,
}

pub fn summarize(table: &FlightTable) -> SummaryStats {
    let records = table.records();
    let (first_period, last_period) = table.period_range().unzip();

    let flags = |f: fn(&FlightRecord) -> Option<f64>| -> Vec<f64> {
        records.iter().filter_map(f).collect()
    };
    let delay_flags = flags(|r| r.arr_delay15);
    let cancelled_flags = flags(|r| r.cancelled);

    let delayed_minutes: Vec<f64> = records
        .iter()
        .filter(|r| r.is_completed() && r.is_delayed())
        .filter_map(|r| r.arr_delay_minutes)
        .collect();

    SummaryStats {
        total_flights: table.len(),
        carriers: table.distinct_groups(GroupBy::Carrier),
        first_period,
        last_period,
        delay_rate_pct: mean(&delay_flags).map(|m| m * 100.0),
        cancellation_rate_pct: mean(&cancelled_flags).map(|m| m * 100.0),
        avg_delay_minutes: mean(&delayed_minutes),
    }
}

impl fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(WIDE_RULE);

        writeln!(f, "{rule}")?;
        writeln!(f, "DATASET SUMMARY STATISTICS")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total flights: {}", thousands(self.total_flights))?;
        writeln!(f, "Airlines: {}", self.carriers)?;
        if let (Some(first), Some(last)) = (self.first_period, self.last_period) {
            writeln!(f, "Date range: {} to {}", period(first), period(last))?;
        }
        writeln!(f, "\nOverall Metrics:")?;
        writeln!(
            f,
            "  - Delay rate (≥15 min): {}",
            percent_or_na(self.delay_rate_pct)
        )?;
        writeln!(
            f,
            "  - Cancellation rate: {}",
            percent_or_na(self.cancellation_rate_pct)
        )?;
        if let Some(minutes) = self.avg_delay_minutes {
            writeln!(f, "  - Avg delay (for delayed flights): {minutes:.1} minutes")?;
        }
        writeln!(f, "{rule}")
    }
}

pub fn format_summary_stats(stats: &SummaryStats) -> String {
    stats.to_string()
}

pub fn print_summary_stats(table: &FlightTable) {
    print!("{}", format_summary_stats(&summarize(table)));
}

/// Ranked listing of scorecard rows under a banner.
pub struct PerformerListing<'a> {
    pub banner: &'a str,
    pub rows: &'a [ScorecardRow],
}

impl fmt::Display for PerformerListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(NARROW_RULE);

        writeln!(f, "\n{}", self.banner)?;
        writeln!(f, "{rule}")?;
        for (rank, row) in self.rows.iter().enumerate() {
            writeln!(
                f,
                "{}. {:<25} {:.2}% delay rate",
                rank + 1,
                row.group,
                row.delay_rate_pct
            )?;
        }
        writeln!(f, "{rule}")
    }
}

pub fn format_performers(banner: &str, rows: &[ScorecardRow]) -> String {
    PerformerListing { banner, rows }.to_string()
}

/// Prints and returns the `n` groups most likely to arrive late.
pub fn identify_worst_performers(scorecard: &[ScorecardRow], n: usize) -> Vec<ScorecardRow> {
    let worst = worst_performers(scorecard, n);
    let banner = format!("TOP {n} AIRLINES MOST LIKELY TO MAKE YOU LATE:");
    print!("{}", format_performers(&banner, &worst));
    worst
}

/// Prints and returns the `n` groups least likely to arrive late.
pub fn identify_best_performers(scorecard: &[ScorecardRow], n: usize) -> Vec<ScorecardRow> {
    let best = best_performers(scorecard, n);
    let banner = format!("TOP {n} MOST RELIABLE AIRLINES:");
    print!("{}", format_performers(&banner, &best));
    best
}

/// Counts null cells, duplicate rows, and flag values other than 0 or 1.
pub fn check_data_quality(table: &FlightTable) -> DataQualityReport {
    let rows = table.raw_rows();
    let total_rows = rows.len();

    let mut missing: Vec<MissingColumn> = table
        .headers()
        .enumerate()
        .map(|(idx, column)| {
            let count = rows
                .iter()
                .filter(|row| row.get(idx).is_none_or(is_null_cell))
                .count();
            MissingColumn {
                column: column.to_string(),
                count,
                pct: pct(count, total_rows),
            }
        })
        .filter(|m| m.count > 0)
        .collect();
    missing.sort_by(|a, b| b.count.cmp(&a.count));

    let mut seen = HashSet::new();
    let mut duplicate_rows = 0;
    for row in rows {
        if !seen.insert(row.iter().collect::<Vec<&str>>()) {
            duplicate_rows += 1;
        }
    }

    let invalid = |flag: fn(&FlightRecord) -> Option<f64>| {
        table
            .records()
            .iter()
            .filter_map(flag)
            .filter(|v| *v != 0.0 && *v != 1.0)
            .count()
    };

    let report = DataQualityReport {
        total_rows,
        missing,
        duplicate_rows,
        invalid_delay_flags: invalid(|r| r.arr_delay15),
        invalid_cancelled_flags: invalid(|r| r.cancelled),
    };
    debug!(
        rows = total_rows,
        columns_with_missing = report.missing.len(),
        duplicates = report.duplicate_rows,
        "Data quality checked"
    );
    report
}

impl fmt::Display for DataQualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(WIDE_RULE);

        writeln!(f, "\n{rule}")?;
        writeln!(f, "DATA QUALITY CHECK")?;
        writeln!(f, "{rule}")?;

        writeln!(f, "\n1. Missing Values:")?;
        if self.missing.is_empty() {
            writeln!(f, "   No missing values found")?;
        } else {
            writeln!(f, "   {:<25} {:>13} {:>10}", "Column", "Missing Count", "Percentage")?;
            for m in &self.missing {
                writeln!(
                    f,
                    "   {:<25} {:>13} {:>9.2}%",
                    m.column,
                    thousands(m.count),
                    m.pct
                )?;
            }
        }

        writeln!(f, "\n2. Duplicate Rows:")?;
        writeln!(
            f,
            "   Total duplicates: {} ({:.2}%)",
            thousands(self.duplicate_rows),
            pct(self.duplicate_rows, self.total_rows)
        )?;

        writeln!(f, "\n3. Value Range Checks:")?;
        writeln!(
            f,
            "   - Invalid {DELAY_FLAG_COLUMN} values (not 0/1): {}",
            self.invalid_delay_flags
        )?;
        writeln!(
            f,
            "   - Invalid {CANCELLED_COLUMN} values (not 0/1): {}",
            self.invalid_cancelled_flags
        )?;
        writeln!(f, "{rule}")
    }
}

pub fn format_data_quality(report: &DataQualityReport) -> String {
    report.to_string()
}

pub fn print_data_quality(table: &FlightTable) -> DataQualityReport {
    let report = check_data_quality(table);
    print!("{}", format_data_quality(&report));
    report
}

/// Fixed-width table of scorecard rows.
pub struct ScorecardTable<'a>(pub &'a [ScorecardRow]);

impl fmt::Display for ScorecardTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<28} {:>10} {:>10} {:>10} {:>10}",
            "Group", "Flights", "Delay %", "Cancel %", "Avg delay"
        )?;
        writeln!(f, "{}", "-".repeat(72))?;
        for row in self.0 {
            let avg = row
                .avg_delay_minutes
                .map(|m| format!("{m:.1}"))
                .unwrap_or_else(|| "n/a".to_string());
            writeln!(
                f,
                "{:<28} {:>10} {:>10.2} {:>10.2} {:>10}",
                row.group,
                thousands(row.total_flights),
                row.delay_rate_pct,
                row.cancellation_rate_pct,
                avg
            )?;
        }
        Ok(())
    }
}

pub fn format_scorecard(rows: &[ScorecardRow]) -> String {
    ScorecardTable(rows).to_string()
}

pub fn print_scorecard(rows: &[ScorecardRow]) {
    print!("{}", format_scorecard(rows));
}

/// Pretty JSON of a scorecard stamped with the current time.
pub fn render_scorecard_json(rows: &[ScorecardRow], group_by: GroupBy) -> Result<String> {
    let report = ScorecardReport {
        generated_at: Utc::now(),
        group_by,
        rows,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn period((year, month): (i32, u32)) -> String {
    format!("{year}-{month:02}")
}

fn percent_or_na(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}%"))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Formats an integer with comma thousands separators.
fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> FlightTable {
        FlightTable::from_records(vec![
            FlightRecord::new("Delta", 2022, 11).delayed(30.0),
            FlightRecord::new("Delta", 2023, 2),
            FlightRecord::new("United", 2023, 4).delayed(60.0),
            FlightRecord::new("United", 2023, 4).cancelled(),
        ])
    }

    fn row(group: &str, delay_rate_pct: f64) -> ScorecardRow {
        ScorecardRow {
            group: group.to_string(),
            total_flights: 1200,
            delay_rate_pct,
            cancellation_rate_pct: 1.5,
            avg_delay_minutes: Some(48.25),
        }
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_summarize() {
        let stats = summarize(&sample_table());

        assert_eq!(stats.total_flights, 4);
        assert_eq!(stats.carriers, 2);
        assert_eq!(stats.first_period, Some((2022, 11)));
        assert_eq!(stats.last_period, Some((2023, 4)));
        // three non-null delay flags, two set
        assert!((stats.delay_rate_pct.unwrap() - 66.666_666).abs() < 1e-4);
        assert_eq!(stats.cancellation_rate_pct, Some(25.0));
        assert_eq!(stats.avg_delay_minutes, Some(45.0));
    }

    #[test]
    fn test_format_summary_stats() {
        let text = format_summary_stats(&summarize(&sample_table()));

        assert!(text.contains("DATASET SUMMARY STATISTICS"));
        assert!(text.contains("Total flights: 4"));
        assert!(text.contains("Date range: 2022-11 to 2023-04"));
        assert!(text.contains("Cancellation rate: 25.00%"));
        assert!(text.contains("Avg delay (for delayed flights): 45.0 minutes"));
    }

    #[test]
    fn test_summary_of_empty_table() {
        let stats = summarize(&FlightTable::from_records(Vec::new()));
        assert_eq!(stats.first_period, None);
        assert_eq!(stats.delay_rate_pct, None);

        let text = format_summary_stats(&stats);
        assert!(!text.contains("Date range"));
        assert!(!text.contains("Avg delay"));
        assert!(text.contains("Delay rate (≥15 min): n/a"));
    }

    #[test]
    fn test_format_performers_ranks_rows() {
        let text = format_performers("WORST", &[row("Frontier", 55.56), row("Delta", 20.0)]);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[1], "WORST");
        assert_eq!(lines[3], format!("1. {:<25} 55.56% delay rate", "Frontier"));
        assert_eq!(lines[4], format!("2. {:<25} 20.00% delay rate", "Delta"));
    }

    #[test]
    fn test_identify_performers_return_selection() {
        let scorecard = vec![row("B", 55.56), row("A", 20.0), row("C", 0.0)];

        let worst = identify_worst_performers(&scorecard, 1);
        let best = identify_best_performers(&scorecard, 2);

        assert_eq!(worst[0].group, "B");
        assert_eq!(best.iter().map(|r| r.group.as_str()).collect::<Vec<_>>(), vec!["C", "A"]);
    }

    #[test]
    fn test_data_quality_clean_table() {
        let table = FlightTable::from_records(vec![
            FlightRecord::new("Delta", 2023, 1),
            FlightRecord::new("Delta", 2023, 2),
        ]);
        let report = check_data_quality(&table);

        assert!(report.missing.is_empty());
        assert_eq!(report.duplicate_rows, 0);
        assert!(format_data_quality(&report).contains("No missing values found"));
    }

    #[test]
    fn test_data_quality_flags_problems() {
        let csv = "CarrierName,Year,Month,ArrDelay15,ArrDelayMinutes,Cancelled\n\
                   Delta,2023,1,1,20,0\n\
                   Delta,2023,1,1,20,0\n\
                   Delta,2023,1,,,1\n\
                   United,2023,1,2,,0\n\
                   United,2023,1,0,0,5\n";
        let table = FlightTable::from_reader(csv.as_bytes()).unwrap();
        let report = check_data_quality(&table);

        assert_eq!(report.total_rows, 5);
        assert_eq!(report.duplicate_rows, 1);
        assert_eq!(report.invalid_delay_flags, 1);
        assert_eq!(report.invalid_cancelled_flags, 1);

        assert_eq!(report.missing.len(), 2);
        assert_eq!(report.missing[0].column, "ArrDelayMinutes");
        assert_eq!(report.missing[0].count, 2);
        assert_eq!(report.missing[1].column, "ArrDelay15");
        assert_eq!(report.missing[1].pct, 20.0);

        let text = format_data_quality(&report);
        assert!(text.contains("Total duplicates: 1 (20.00%)"));
        assert!(text.contains("Invalid ArrDelay15 values (not 0/1): 1"));
        assert!(text.contains("Invalid Cancelled values (not 0/1): 1"));
    }

    #[test]
    fn test_data_quality_counts_null_tokens() {
        let csv = "CarrierName,Year,Month,ArrDelay15,ArrDelayMinutes,Cancelled\n\
                   Delta,2023,1,1,30,0\n\
                   Delta,2023,1,NaN,NaN,0\n\
                   Delta,2023,2,1,NaN,0\n\
                   United,2023,1,NA,N/A,null\n";
        let table = FlightTable::from_reader(csv.as_bytes()).unwrap();
        let report = check_data_quality(&table);

        let missing: Vec<_> = report
            .missing
            .iter()
            .map(|m| (m.column.as_str(), m.count))
            .collect();
        assert_eq!(
            missing,
            vec![("ArrDelayMinutes", 3), ("ArrDelay15", 2), ("Cancelled", 1)]
        );
        assert_eq!(report.invalid_delay_flags, 0);
        assert_eq!(report.invalid_cancelled_flags, 0);
    }

    #[test]
    fn test_format_scorecard() {
        let mut no_avg = row("Hawaiian", 0.0);
        no_avg.avg_delay_minutes = None;
        let text = format_scorecard(&[row("Frontier", 55.56), no_avg]);

        assert!(text.contains("Frontier"));
        assert!(text.contains("1,200"));
        assert!(text.contains("55.56"));
        assert!(text.contains("48.2") || text.contains("48.3"));
        assert!(text.lines().nth(3).unwrap().trim_end().ends_with("n/a"));
    }

    #[test]
    fn test_render_scorecard_json() {
        let json = render_scorecard_json(&[row("Frontier", 55.56)], GroupBy::Carrier).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["group_by"], "carrier");
        assert_eq!(value["rows"][0]["group"], "Frontier");
        assert_eq!(value["rows"][0]["delay_rate_pct"], 55.56);
        assert!(value["generated_at"].is_string());
    }
}
