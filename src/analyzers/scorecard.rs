use crate::analyzers::aggregate::{
    compute_average_delay, compute_cancellation_rate, compute_delay_rate,
};
use crate::analyzers::types::ScorecardRow;
use crate::analyzers::utility::round_to;
use crate::records::{FlightTable, GroupBy};
use std::collections::HashMap;
use tracing::debug;

/// Decimal places kept for the rate columns.
pub const PCT_DECIMALS: i32 = 2;
/// Decimal places kept for average delay minutes.
pub const MINUTES_DECIMALS: i32 = 1;

/// Per-carrier scorecard. See [`create_scorecard_by`].
pub fn create_scorecard(table: &FlightTable) -> Vec<ScorecardRow> {
    create_scorecard_by(table, GroupBy::Carrier)
}

/// Joins delay rate, cancellation rate and average delay into one row per group.
///
/// Only groups present in all three aggregates are kept. Cancelled flights
/// are excluded from the delay figures and average delay covers delayed
/// flights only. Rates are rounded to two decimals, minutes to one, and the
/// result is ordered by delay rate, worst first.
pub fn create_scorecard_by(table: &FlightTable, group_by: GroupBy) -> Vec<ScorecardRow> {
    let delay = compute_delay_rate(table, group_by, true);

    let cancellation: HashMap<String, f64> = compute_cancellation_rate(table, group_by)
        .into_iter()
        .map(|r| (r.group, r.cancellation_rate_pct))
        .collect();
    let average: HashMap<String, Option<f64>> = compute_average_delay(table, group_by, true)
        .into_iter()
        .map(|r| (r.group, r.avg_delay_minutes))
        .collect();

    let mut rows: Vec<ScorecardRow> = delay
        .into_iter()
        .filter_map(|d| {
            let cancellation_rate_pct = *cancellation.get(&d.group)?;
            let avg_delay_minutes = *average.get(&d.group)?;
            Some(ScorecardRow {
                total_flights: d.total_flights,
                delay_rate_pct: round_to(d.delay_rate_pct, PCT_DECIMALS),
                cancellation_rate_pct: round_to(cancellation_rate_pct, PCT_DECIMALS),
                avg_delay_minutes: avg_delay_minutes.map(|m| round_to(m, MINUTES_DECIMALS)),
                group: d.group,
            })
        })
        .collect();

    rows.sort_by(|a, b| b.delay_rate_pct.total_cmp(&a.delay_rate_pct));

    debug!(%group_by, groups = rows.len(), "Scorecard assembled");
    rows
}

/// The `n` groups with the highest delay rate, worst first.
///
/// Ties keep their scorecard order.
pub fn worst_performers(scorecard: &[ScorecardRow], n: usize) -> Vec<ScorecardRow> {
    let mut rows = scorecard.to_vec();
    rows.sort_by(|a, b| b.delay_rate_pct.total_cmp(&a.delay_rate_pct));
    rows.truncate(n);
    rows
}

/// The `n` groups with the lowest delay rate, best first.
///
/// Ties keep their scorecard order.
pub fn best_performers(scorecard: &[ScorecardRow], n: usize) -> Vec<ScorecardRow> {
    let mut rows = scorecard.to_vec();
    rows.sort_by(|a, b| a.delay_rate_pct.total_cmp(&b.delay_rate_pct));
    rows.truncate(n);
    rows
}
