//! Group-wise flight aggregation and scorecards.
//!
//! Each aggregate groups the flight table by a [`GroupBy`](crate::records::GroupBy)
//! key and returns fresh rows sorted worst first. The scorecard joins the
//! three aggregates into one row per group.

pub mod aggregate;
pub mod scorecard;
pub mod types;
pub mod utility;
