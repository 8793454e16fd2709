//! OHLCV aggregation timeframe definitions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// OHLCV aggregation timeframe, named after the MT4 period constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    /// 1-minute bars.
    #[serde(rename = "m1")]
    Minute1,
    /// 5-minute bars.
    #[serde(rename = "m5")]
    Minute5,
    /// 15-minute bars.
    #[serde(rename = "m15")]
    Minute15,
    /// 30-minute bars.
    #[serde(rename = "m30")]
    Minute30,
    /// 1-hour bars.
    #[serde(rename = "h1")]
    Hour1,
    /// 4-hour bars.
    #[serde(rename = "h4")]
    Hour4,
    /// Daily bars.
    #[serde(rename = "d1")]
    Day1,
    /// Weekly bars.
    #[serde(rename = "w1")]
    Week1,
    /// Monthly bars.
    #[serde(rename = "mn")]
    Month1,
}

impl Timeframe {
    /// Returns the bar width in minutes, as written into the HST header's
    /// `period` field.
    #[must_use]
    pub const fn minutes(self) -> u32 {
        match self {
            Self::Minute1 => 1,
            Self::Minute5 => 5,
            Self::Minute15 => 15,
            Self::Minute30 => 30,
            Self::Hour1 => 60,
            Self::Hour4 => 240,
            Self::Day1 => 1440,
            Self::Week1 => 10080,
            Self::Month1 => 43200,
        }
    }

    /// Returns the bar width in seconds.
    #[must_use]
    pub const fn seconds(self) -> u64 {
        self.minutes() as u64 * 60
    }

    /// Returns the bar width in milliseconds.
    #[must_use]
    pub const fn milliseconds(self) -> u64 {
        self.seconds() * 1000
    }

    /// Returns the timeframe as a string identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute1 => "M1",
            Self::Minute5 => "M5",
            Self::Minute15 => "M15",
            Self::Minute30 => "M30",
            Self::Hour1 => "H1",
            Self::Hour4 => "H4",
            Self::Day1 => "D1",
            Self::Week1 => "W1",
            Self::Month1 => "MN",
        }
    }

    /// Returns all available timeframes.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Minute1,
            Self::Minute5,
            Self::Minute15,
            Self::Minute30,
            Self::Hour1,
            Self::Hour4,
            Self::Day1,
            Self::Week1,
            Self::Month1,
        ]
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "M1" => Ok(Self::Minute1),
            "M5" => Ok(Self::Minute5),
            "M15" => Ok(Self::Minute15),
            "M30" => Ok(Self::Minute30),
            "H1" => Ok(Self::Hour1),
            "H4" => Ok(Self::Hour4),
            "D1" => Ok(Self::Day1),
            "W1" => Ok(Self::Week1),
            "MN" => Ok(Self::Month1),
            _ => Err(TimeframeParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid timeframe string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeframeParseError(String);

impl std::fmt::Display for TimeframeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid timeframe '{}', expected one of: M1, M5, M15, M30, H1, H4, D1, W1, MN",
            self.0
        )
    }
}

impl std::error::Error for TimeframeParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_minutes() {
        assert_eq!(Timeframe::Minute1.minutes(), 1);
        assert_eq!(Timeframe::Hour1.minutes(), 60);
        assert_eq!(Timeframe::Day1.minutes(), 1440);
        assert_eq!(Timeframe::Week1.minutes(), 10080);
        assert_eq!(Timeframe::Month1.minutes(), 43200);
    }

    #[test]
    fn test_timeframe_parse() {
        assert_eq!("m1".parse::<Timeframe>().unwrap(), Timeframe::Minute1);
        assert_eq!("H4".parse::<Timeframe>().unwrap(), Timeframe::Hour4);
        assert_eq!("mn".parse::<Timeframe>().unwrap(), Timeframe::Month1);
        assert!("invalid".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_all_covers_nine_widths() {
        assert_eq!(Timeframe::all().len(), 9);
    }
}
