//! Error types shared across duka4x.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Result type alias for duka4x core operations.
pub type Result<T> = std::result::Result<T, Duka4xError>;

/// Errors that can occur during data download and processing.
#[derive(Error, Debug)]
pub enum Duka4xError {
    /// Instrument not found in the registry.
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    /// Invalid date range.
    #[error(transparent)]
    DateRange(#[from] DateRangeError),

    /// A cursor seek target fell outside `[start, end]`.
    #[error("seek target {target} outside range [{start}, {end}]")]
    OutOfRange {
        /// The rejected seek target.
        target: DateTime<Utc>,
        /// Range start (inclusive).
        start: DateTime<Utc>,
        /// Range end (inclusive).
        end: DateTime<Utc>,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error for invalid date ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateRangeError {
    /// Start date is after end date.
    #[error("invalid date range: {start} > {end}")]
    InvalidRange {
        /// The start date.
        start: NaiveDate,
        /// The end date.
        end: NaiveDate,
    },
}
