//! Groups a day's ticks into per-timeframe-bar batches.
//!
//! The HST and FXT writers each compute their own OHLCV state directly from
//! a bar's raw ticks (bid-based, per their own internal logic); this module
//! only does the grouping, handing each writer `(bar_start, ticks)` in bar
//! order.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use duka4x_types::{Tick, Timeframe};

/// A timeframe bar's worth of raw ticks, in timestamp order.
#[derive(Debug, Clone)]
pub struct TickBatch {
    /// Start of the bar, UTC.
    pub bar_start: DateTime<Utc>,
    /// Ticks whose timestamp falls within this bar, in order.
    pub ticks: Vec<Tick>,
}

/// Splits `ticks` (assumed already sorted non-decreasing by timestamp) into
/// consecutive per-bar batches for `timeframe`, in ascending bar order.
///
/// An input tick stream with gaps (e.g. a closed market) simply produces no
/// batch for the empty bars — only bars with at least one tick are emitted,
/// matching the writers' "for each non-empty batch" contract.
#[must_use]
pub fn batch_ticks(ticks: &[Tick], timeframe: Timeframe) -> Vec<TickBatch> {
    let mut batches: Vec<TickBatch> = Vec::new();

    for &tick in ticks {
        let bar_start = bar_start_for(tick.timestamp, timeframe);
        match batches.last_mut() {
            Some(batch) if batch.bar_start == bar_start => batch.ticks.push(tick),
            _ => batches.push(TickBatch {
                bar_start,
                ticks: vec![tick],
            }),
        }
    }

    batches
}

/// Computes the start of the bar containing `timestamp` for `timeframe`.
#[must_use]
fn bar_start_for(timestamp: DateTime<Utc>, timeframe: Timeframe) -> DateTime<Utc> {
    match timeframe {
        Timeframe::Month1 => Utc
            .with_ymd_and_hms(timestamp.year(), timestamp.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(timestamp),
        Timeframe::Week1 => {
            let day_start = truncate_to_day(timestamp);
            let days_since_monday = i64::from(timestamp.weekday().num_days_from_monday());
            day_start - Duration::days(days_since_monday)
        }
        _ => truncate_to_millis(timestamp, timeframe.milliseconds()),
    }
}

/// Truncates a timestamp down to the start of the day, UTC.
fn truncate_to_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_hour(0)
        .and_then(|dt| dt.with_minute(0))
        .and_then(|dt| dt.with_second(0))
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(dt)
}

/// Truncates a timestamp down to the nearest multiple of `width_ms`
/// milliseconds since the Unix epoch.
fn truncate_to_millis(dt: DateTime<Utc>, width_ms: u64) -> DateTime<Utc> {
    let ms = dt.timestamp_millis();
    let width = width_ms as i64;
    let floored = ms.div_euclid(width) * width;
    DateTime::from_timestamp_millis(floored).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn make_tick(hour: u32, minute: u32, second: u32, millis: u32) -> Tick {
        let timestamp =
            Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, second).unwrap() + TimeDelta::milliseconds(i64::from(millis));
        Tick::new(timestamp, 1.0, 1.0, 1.0, 1.0)
    }

    #[test]
    fn batches_split_on_bar_boundary() {
        let ticks = vec![
            make_tick(12, 0, 0, 0),
            make_tick(12, 0, 30, 0),
            make_tick(12, 1, 0, 0),
            make_tick(12, 1, 59, 999),
            make_tick(12, 2, 0, 0),
        ];

        let batches = batch_ticks(&ticks, Timeframe::Minute1);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].ticks.len(), 2);
        assert_eq!(batches[1].ticks.len(), 2);
        assert_eq!(batches[2].ticks.len(), 1);
        assert_eq!(batches[0].bar_start.minute(), 0);
        assert_eq!(batches[1].bar_start.minute(), 1);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert!(batch_ticks(&[], Timeframe::Hour1).is_empty());
    }

    #[test]
    fn week_bar_starts_on_monday() {
        use chrono::Datelike;
        // 2024-01-03 is a Wednesday.
        let tick = Tick::new(
            Utc.with_ymd_and_hms(2024, 1, 3, 15, 0, 0).unwrap(),
            1.0,
            1.0,
            1.0,
            1.0,
        );
        let batches = batch_ticks(&[tick], Timeframe::Week1);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].bar_start.weekday(), chrono::Weekday::Mon);
        assert_eq!(batches[0].bar_start.day(), 1);
    }

    #[test]
    fn month_bar_starts_on_first() {
        let tick = Tick::new(
            Utc.with_ymd_and_hms(2024, 3, 17, 8, 0, 0).unwrap(),
            1.0,
            1.0,
            1.0,
            1.0,
        );
        let batches = batch_ticks(&[tick], Timeframe::Month1);
        assert_eq!(batches[0].bar_start.day(), 1);
        assert_eq!(batches[0].bar_start.month(), 3);
    }
}
