//! Day aggregator: fans a UTC calendar day's 24 hours out across a fixed
//! worker pool, then presents the results in hour order.

use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Utc};
use duka4x_types::Tick;
use tokio::sync::mpsc;

use crate::bi5::{DecodeError, decode_hour};
use crate::cache::{CacheError, HourCache};

/// Number of hours fanned out to workers per [`fetch_day`] call. Matches the
/// original `noParallelDownloads`: a politeness/throughput tradeoff against
/// the public feed.
const WORKER_COUNT: usize = 3;

/// Outcome of ensuring and decoding a single hour within a day.
#[derive(Debug, Clone)]
pub struct HourResult {
    /// Start of the hour, UTC.
    pub hour: DateTime<Utc>,
    /// Decoded ticks for the hour, or an error if the hour could not be
    /// fetched/decoded. An hour with no trades (market closed) yields
    /// `Ok(vec![])`, not an error.
    pub ticks: Result<Vec<Tick>, DayError>,
}

/// Error recorded against a single hour. Individual hour failures do not
/// abort the day; they show up in that hour's [`HourResult`].
#[derive(Debug, Clone)]
pub enum DayError {
    /// The hour cache could not ensure this hour (fetch failed after
    /// retries, or a filesystem error).
    Cache(String),
    /// The cached file existed but failed to decode.
    Decode(String),
}

impl std::fmt::Display for DayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache(msg) | Self::Decode(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DayError {}

impl From<CacheError> for DayError {
    fn from(e: CacheError) -> Self {
        Self::Cache(e.to_string())
    }
}

impl From<DecodeError> for DayError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e.to_string())
    }
}

/// A UTC calendar day's worth of hourly results, ordered ascending by hour.
#[derive(Debug, Clone)]
pub struct Day {
    hours: Vec<HourResult>,
}

impl Day {
    /// Iterates hours in order, delivering each hour's ticks (batched) to
    /// `cb`. Stops as soon as `cb` returns `false`.
    pub fn each_hour<F>(&self, mut cb: F)
    where
        F: FnMut(&HourResult) -> bool,
    {
        for hour in &self.hours {
            if !cb(hour) {
                break;
            }
        }
    }

    /// Iterates every successfully decoded tick across the day, in order.
    /// Stops as soon as `cb` returns `false`. Hours that errored are
    /// skipped (their ticks, if any were recoverable, are not emitted).
    pub fn each_tick<F>(&self, mut cb: F)
    where
        F: FnMut(Tick) -> bool,
    {
        for hour in &self.hours {
            let Ok(ticks) = &hour.ticks else { continue };
            for &tick in ticks {
                if !cb(tick) {
                    return;
                }
            }
        }
    }

    /// Returns the underlying per-hour results.
    #[must_use]
    pub fn hours(&self) -> &[HourResult] {
        &self.hours
    }
}

/// Fetches and decodes every hour of `day_utc`'s UTC calendar day.
///
/// Spawns exactly [`WORKER_COUNT`] worker tasks consuming hour indices from
/// a shared bounded queue; each worker calls [`HourCache::ensure`] then
/// decodes the result. After all workers finish, results are sorted by hour
/// ascending.
pub async fn fetch_day(cache: &HourCache, code: &str, day_utc: DateTime<Utc>, decimal_factor: f64) -> Day {
    let day_start = Utc
        .with_ymd_and_hms(day_utc.year(), day_utc.month(), day_utc.day(), 0, 0, 0)
        .single()
        .unwrap_or(day_utc);

    let (work_tx, work_rx) = mpsc::channel::<u32>(24);
    let (result_tx, mut result_rx) = mpsc::channel::<HourResult>(24);

    for hour_index in 0..24u32 {
        // Channel capacity matches the queue length; this never awaits.
        work_tx.send(hour_index).await.ok();
    }
    drop(work_tx);

    let work_rx = std::sync::Arc::new(tokio::sync::Mutex::new(work_rx));
    let mut workers = Vec::with_capacity(WORKER_COUNT);
    for _ in 0..WORKER_COUNT {
        let work_rx = std::sync::Arc::clone(&work_rx);
        let result_tx = result_tx.clone();
        let cache = cache.clone();
        let code = code.to_string();

        workers.push(tokio::spawn(async move {
            loop {
                let hour_index = {
                    let mut guard = work_rx.lock().await;
                    guard.recv().await
                };
                let Some(hour_index) = hour_index else { break };

                let hour = day_start + TimeDelta::hours(i64::from(hour_index));
                let result = ensure_and_decode(&cache, &code, hour, decimal_factor).await;
                if result_tx.send(HourResult { hour, ticks: result }).await.is_err() {
                    break;
                }
            }
        }));
    }
    drop(result_tx);

    let mut hours = Vec::with_capacity(24);
    while let Some(result) = result_rx.recv().await {
        hours.push(result);
    }
    for worker in workers {
        let _ = worker.await;
    }

    hours.sort_by_key(|h| h.hour);
    Day { hours }
}

async fn ensure_and_decode(
    cache: &HourCache,
    code: &str,
    hour: DateTime<Utc>,
    decimal_factor: f64,
) -> Result<Vec<Tick>, DayError> {
    let state = cache.ensure(code, hour).await?;
    let path = cache.path(code, hour);
    let ticks = decode_hour(&path, state, hour, decimal_factor).await?;
    Ok(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn fetch_day_covers_all_24_hours_even_when_all_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HourCache::new(dir.path()).unwrap();

        // Pre-seed every hour as not-found so no network call happens.
        let day = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for hour_index in 0..24i64 {
            let hour = day + TimeDelta::hours(hour_index);
            let dest = cache.path("eurusd", hour);
            std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
            let mut marker = dest.into_os_string();
            marker.push(".notFound");
            std::fs::write(marker, b"").unwrap();
        }

        let result = fetch_day(&cache, "eurusd", day, 100_000.0).await;
        assert_eq!(result.hours().len(), 24);
        for (i, hour_result) in result.hours().iter().enumerate() {
            assert_eq!(hour_result.hour, day + TimeDelta::hours(i as i64));
            assert!(hour_result.ticks.as_ref().unwrap().is_empty());
        }
    }
}
