//! Row types produced by the aggregation pipeline.

use crate::records::GroupBy;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-group share of flights arriving 15+ minutes late.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayRateRow {
    pub group: String,
    pub total_flights: usize,
    pub delayed_flights: usize,
    pub delay_rate_pct: f64,
}

/// Per-group share of cancelled flights.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancellationRateRow {
    pub group: String,
    pub total_flights: usize,
    pub cancelled_flights: usize,
    pub cancellation_rate_pct: f64,
}

/// Delay magnitude statistics in minutes. Each value is `None` when the
/// group has no minutes to summarize; `std_delay_minutes` also needs two.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageDelayRow {
    pub group: String,
    pub avg_delay_minutes: Option<f64>,
    pub median_delay_minutes: Option<f64>,
    pub max_delay_minutes: Option<f64>,
    pub std_delay_minutes: Option<f64>,
}

/// One line of the composite scorecard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorecardRow {
    pub group: String,
    pub total_flights: usize,
    pub delay_rate_pct: f64,
    pub cancellation_rate_pct: f64,
    pub avg_delay_minutes: Option<f64>,
}

/// A scorecard together with how it was grouped, rendered as JSON.
#[derive(Debug, Serialize)]
pub struct ScorecardReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub group_by: GroupBy,
    pub rows: &'a [ScorecardRow],
}
