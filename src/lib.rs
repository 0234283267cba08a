//! Delay and cancellation scorecards for airline flight records.

pub mod analyzers;
pub mod charts;
pub mod error;
pub mod output;
pub mod records;

pub use error::{Result, ScorecardError};
pub use records::{FlightRecord, FlightTable, GroupBy, load_and_validate};
