//! Decodes a cached hour's bi5 file into normalized ticks.
//!
//! Combines [`crate::decompress`] and [`crate::parse`] with the hour's
//! decimal factor and wall-clock origin, and exposes both a push-style
//! (per-tick callback with a continue flag) and a pull-style (collect into
//! a vector, with an optional time window) mode over the same decoded data.

use chrono::{DateTime, Timelike, Utc};
use duka4x_types::Tick;
use thiserror::Error;

use crate::cache::CacheState;
use crate::decompress::{DecompressError, decompress_bi5};
use crate::parse::{ParseError, parse_ticks};

/// Truncates a timestamp down to its containing hour boundary, UTC.
#[must_use]
pub(crate) fn truncate_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Errors that can occur while decoding an hour's ticks.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Reading the cached file from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The file's contents were not a valid LZMA1 stream.
    #[error(transparent)]
    Decompress(#[from] DecompressError),
    /// The decompressed data was not an exact multiple of the tick record
    /// size — a truncated record, which is a fatal decode error rather than
    /// a silently dropped tick.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The blocking task running the LZMA decompression panicked or was
    /// cancelled.
    #[error("decode task failed: {0}")]
    Join(String),
}

/// Decodes an hour's cached file (if any) into normalized ticks, in order.
///
/// `state` is whatever [`crate::cache::HourCache::ensure`] returned for this
/// hour. A hole in the cache (`Empty` or `NotFound`) silently yields zero
/// ticks — it is not an error, matching a market-closed or vendor-absent
/// hour.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, decompressed, or
/// parsed as whole 20-byte tick records.
pub async fn decode_hour(
    path: &std::path::Path,
    state: CacheState,
    hour_start: DateTime<Utc>,
    decimal_factor: f64,
) -> Result<Vec<Tick>, DecodeError> {
    if state != CacheState::HasData {
        return Ok(Vec::new());
    }
    let compressed = tokio::fs::read(path).await?;
    // LZMA decompression is CPU-bound; offload it so it doesn't stall the
    // runtime's worker thread while other hours are being fetched.
    tokio::task::spawn_blocking(move || decode_bytes(&compressed, hour_start, decimal_factor))
        .await
        .map_err(|e| DecodeError::Join(e.to_string()))?
}

/// Decodes already-read compressed bytes into normalized ticks.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid LZMA1 stream, or the
/// decompressed data is not a whole multiple of the tick record size.
pub fn decode_bytes(
    compressed: &[u8],
    hour_start: DateTime<Utc>,
    decimal_factor: f64,
) -> Result<Vec<Tick>, DecodeError> {
    let raw = decompress_bi5(compressed)?;
    let ticks = parse_ticks(&raw)?
        .map(|raw_tick| raw_tick.normalize(hour_start, decimal_factor))
        .collect();
    Ok(ticks)
}

/// Pull-style collection of an hour's ticks, filtered to `[from, to]`
/// (either bound optional, both inclusive).
///
/// Used by the stream and cursor to avoid materializing ticks outside the
/// requested range. Stops scanning as soon as a tick's timestamp exceeds
/// `to`, since ticks within an hour are non-decreasing by timestamp.
#[must_use]
pub fn ticks_in_range(
    ticks: Vec<Tick>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Vec<Tick> {
    ticks
        .into_iter()
        .skip_while(|t| from.is_some_and(|from| t.timestamp < from))
        .take_while(|t| to.is_none_or(|to| t.timestamp <= to))
        .collect()
}

/// Push-style iteration: invokes `on_tick` for every decoded tick in order,
/// stopping early the moment it returns `false`.
///
/// Returns whether the caller should keep iterating past this hour (i.e.
/// `on_tick` never returned `false`).
///
/// # Errors
///
/// Returns an error under the same conditions as [`decode_hour`].
pub async fn each_tick<F>(
    path: &std::path::Path,
    state: CacheState,
    hour_start: DateTime<Utc>,
    decimal_factor: f64,
    mut on_tick: F,
) -> Result<bool, DecodeError>
where
    F: FnMut(Tick) -> bool,
{
    let ticks = decode_hour(path, state, hour_start, decimal_factor).await?;
    for tick in ticks {
        if !on_tick(tick) {
            return Ok(false);
        }
    }
    Ok(true)
}
