//! Dukascopy URL and on-disk cache path construction.
//!
//! The remote feed and the local cache layout disagree on month encoding:
//! the URL uses a zero-based month (vendor quirk), the on-disk path uses
//! the natural month number. Both helpers live here side by side so the
//! asymmetry stays visible rather than being buried in two call sites.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::path::PathBuf;

/// Base URL for the Dukascopy data feed.
pub const BASE_URL: &str = "https://datafeed.dukascopy.com/datafeed";

/// Builds the remote URL for a specific hour's tick data.
///
/// URL format: `{BASE_URL}/{CODE}/{YYYY}/{MM-1}/{DD}/{HH}h_ticks.bi5`, where
/// the month segment is zero-based (January = `00`).
#[must_use]
pub fn tick_url(code: &str, hour_utc: DateTime<Utc>) -> String {
    format!(
        "{BASE_URL}/{}/{}/{:02}/{:02}/{:02}h_ticks.bi5",
        code.to_uppercase(),
        hour_utc.year(),
        hour_utc.month() - 1,
        hour_utc.day(),
        hour_utc.hour()
    )
}

/// Builds the on-disk cache path for a specific hour's tick data, under
/// `<root>/download/<CODE>/<YYYY>/<MM>/<DD>/<HH>h_ticks.bi5`.
///
/// Unlike [`tick_url`], the month segment here is natural (January = `01`):
/// this split between remote and local month encoding is a vendor quirk
/// preserved intentionally, not a bug.
#[must_use]
pub fn cache_path(root: &std::path::Path, code: &str, hour_utc: DateTime<Utc>) -> PathBuf {
    root.join("download")
        .join(code.to_uppercase())
        .join(format!("{:04}", hour_utc.year()))
        .join(format!("{:02}", hour_utc.month()))
        .join(format!("{:02}", hour_utc.day()))
        .join(format!("{:02}h_ticks.bi5", hour_utc.hour()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tick_url_uses_zero_based_month() {
        let hour = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(
            tick_url("eurusd", hour),
            "https://datafeed.dukascopy.com/datafeed/EURUSD/2024/00/15/12h_ticks.bi5"
        );
    }

    #[test]
    fn tick_url_december_rolls_to_eleven() {
        let hour = Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(
            tick_url("btcusd", hour),
            "https://datafeed.dukascopy.com/datafeed/BTCUSD/2024/11/31/23h_ticks.bi5"
        );
    }

    #[test]
    fn cache_path_uses_natural_month() {
        let hour = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let path = cache_path(std::path::Path::new("/tmp/duka4x"), "eurusd", hour);
        assert_eq!(
            path,
            std::path::PathBuf::from("/tmp/duka4x/download/EURUSD/2024/01/15/12h_ticks.bi5")
        );
    }
}
