//! Instrument metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable instrument metadata, as loaded from the registry.
///
/// Created once at registry load and never mutated afterward; a forced
/// reload replaces the whole table rather than individual records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Uppercased ASCII code, e.g. `EURUSD`.
    code: String,
    /// Vendor display name, e.g. `EUR/USD`.
    name: String,
    /// Vendor description.
    description: String,
    /// Integer power of ten: 100000 for 5-dp FX, 1000 for 3-dp JPY/gold.
    decimal_factor: u32,
    /// Earliest date for which minute candles are available.
    earliest_minute_date: Option<DateTime<Utc>>,
    /// Earliest date for which daily candles are available.
    earliest_daily_date: Option<DateTime<Utc>>,
}

impl Instrument {
    /// Creates a new instrument record.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        decimal_factor: u32,
        earliest_minute_date: Option<DateTime<Utc>>,
        earliest_daily_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            code: code.into().to_uppercase(),
            name: name.into(),
            description: description.into(),
            decimal_factor,
            earliest_minute_date,
            earliest_daily_date,
        }
    }

    /// Returns the uppercased instrument code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the vendor display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the vendor description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the decimal factor used to convert stored integer price
    /// units to real price (`real_price = int_price / decimal_factor`).
    #[must_use]
    pub const fn decimal_factor(&self) -> u32 {
        self.decimal_factor
    }

    /// Returns the decimal factor as `f64` for price calculations.
    #[must_use]
    pub fn decimal_factor_f64(&self) -> f64 {
        f64::from(self.decimal_factor)
    }

    /// Returns the number of fractional digits implied by the decimal
    /// factor (e.g. factor 100000 → 5, factor 1000 → 3).
    #[must_use]
    pub fn price_precision(&self) -> usize {
        (self.decimal_factor as f64).log10().round() as usize
    }

    /// Returns the earliest date minute candles are available for.
    #[must_use]
    pub const fn earliest_minute_date(&self) -> Option<DateTime<Utc>> {
        self.earliest_minute_date
    }

    /// Returns the earliest date daily candles are available for.
    #[must_use]
    pub const fn earliest_daily_date(&self) -> Option<DateTime<Utc>> {
        self.earliest_daily_date
    }

    /// Formats a real price with exactly `log10(decimal_factor)`
    /// fractional digits.
    #[must_use]
    pub fn format_price(&self, real_price: f64) -> String {
        format!("{:.*}", self.price_precision(), real_price)
    }

    /// Returns `round(close * factor) - round(open * factor)` as a signed
    /// pip difference.
    #[must_use]
    pub fn diff_in_pips(&self, open: f64, close: f64) -> i64 {
        let factor = self.decimal_factor_f64();
        (close * factor).round() as i64 - (open * factor).round() as i64
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_instrument_creation() {
        let start = Utc.with_ymd_and_hms(2003, 5, 5, 0, 0, 0).unwrap();
        let instrument = Instrument::new(
            "eurusd",
            "EUR/USD",
            "Euro vs US Dollar",
            100_000,
            Some(start),
            Some(start),
        );

        assert_eq!(instrument.code(), "EURUSD");
        assert_eq!(instrument.name(), "EUR/USD");
        assert_eq!(instrument.decimal_factor(), 100_000);
    }

    #[test]
    fn test_format_price() {
        let eurusd = Instrument::new("eurusd", "EUR/USD", "", 100_000, None, None);
        assert_eq!(eurusd.format_price(1.123_45), "1.12345");

        let usdjpy = Instrument::new("usdjpy", "USD/JPY", "", 1_000, None, None);
        assert_eq!(usdjpy.format_price(110.123), "110.123");
    }

    #[test]
    fn test_diff_in_pips() {
        let eurusd = Instrument::new("eurusd", "EUR/USD", "", 100_000, None, None);
        assert_eq!(eurusd.diff_in_pips(1.10000, 1.10010), 10);
    }

    #[test]
    fn format_price_round_trips_through_the_decimal_factor() {
        use approx::assert_relative_eq;

        for (factor, price) in [
            (100_000u32, 1.224_64),
            (100_000, 1.0),
            (1_000, 110.123),
            (100, 2352.68),
        ] {
            let instrument = Instrument::new("x", "x", "", factor, None, None);
            let formatted = instrument.format_price(price);
            let parsed: f64 = formatted.parse().unwrap();
            assert_relative_eq!(
                (parsed * instrument.decimal_factor_f64()).round(),
                (price * instrument.decimal_factor_f64()).round(),
                epsilon = 0.5
            );
        }
    }
}
