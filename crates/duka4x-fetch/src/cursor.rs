//! Seekable cursor over a `[start, end]` tick range.

use chrono::{DateTime, TimeDelta, Utc};
use duka4x_types::Tick;
use thiserror::Error;

use crate::bi5::{DecodeError, decode_hour, truncate_to_hour};
use crate::cache::{CacheError, HourCache};

/// Errors a cursor operation can return.
#[derive(Error, Debug)]
pub enum CursorError {
    /// `goto` was asked for a timestamp outside `[start, end]`. Does not
    /// alter cursor state.
    #[error("target is outside the cursor's configured range")]
    OutOfRange,
    /// The underlying hour cache failed to ensure the target hour.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The cached file existed but failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A seekable, positional cursor over ticks in `[start, end]`.
///
/// Loads at most one hour's worth of ticks at a time. Not `Send`-shared;
/// intended for single-consumer use, matching the stream it is drawn from.
pub struct Cursor {
    cache: HourCache,
    code: String,
    decimal_factor: f64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    loaded_hour: Option<DateTime<Utc>>,
    buffer: Vec<Tick>,
    index: usize,
    complete: bool,
}

impl Cursor {
    /// Creates a cursor over `[start, end]` (both inclusive, normalized to
    /// UTC by the caller). Nothing is fetched until the first `next`/`goto`.
    #[must_use]
    pub fn new(
        cache: HourCache,
        code: impl Into<String>,
        decimal_factor: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            cache,
            code: code.into(),
            decimal_factor,
            start,
            end,
            loaded_hour: None,
            buffer: Vec::new(),
            index: 0,
            complete: false,
        }
    }

    /// Returns the tick the cursor is currently positioned at, if any.
    #[must_use]
    pub fn current(&self) -> Option<Tick> {
        if self.complete {
            return None;
        }
        self.buffer.get(self.index).copied()
    }

    /// Returns true once the cursor has exhausted `[start, end]`.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Advances to the next tick. Returns `Ok(true)` if it advanced,
    /// `Ok(false)` if the cursor is now (or already was) complete.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the next hour fails.
    pub async fn next(&mut self) -> Result<bool, CursorError> {
        if self.complete {
            return Ok(false);
        }

        if self.loaded_hour.is_some() {
            if let Some(tick) = self.buffer.get(self.index + 1) {
                if tick.timestamp <= self.end {
                    self.index += 1;
                    return Ok(true);
                }
            }
        }

        let next_hour = match self.current() {
            Some(tick) => truncate_to_hour(tick.timestamp) + TimeDelta::hours(1),
            None => truncate_to_hour(self.start),
        };

        if next_hour > self.end {
            self.complete = true;
            return Ok(false);
        }

        self.seek_hour_at_or_after_start(next_hour).await
    }

    /// Walks hours forward from `hour` (inclusive, **not** validated against
    /// `start`) until a non-empty one is found, then positions on the first
    /// tick whose time is `>= start`.
    ///
    /// Unlike [`Cursor::goto`], this never rejects `hour` for falling below
    /// `start` — `hour` is `hourOf(start)` truncated down, which is less
    /// than `start` itself whenever `start` isn't hour-aligned. Anchoring
    /// the in-buffer search on `start` rather than on `hour` mirrors the
    /// original `Ticks.Next`'s `searchTickIdx`, which always searches
    /// relative to the cursor's fixed `start` regardless of which hour is
    /// currently being loaded (hours loaded after the first are entirely
    /// past `start`, so the search trivially lands on index 0 there).
    async fn seek_hour_at_or_after_start(
        &mut self,
        mut hour: DateTime<Utc>,
    ) -> Result<bool, CursorError> {
        let last_hour = truncate_to_hour(self.end);

        loop {
            if hour > last_hour {
                self.complete = true;
                return Ok(false);
            }

            if self.loaded_hour != Some(hour) {
                let ticks = self.ensure_and_decode(hour).await?;
                if ticks.is_empty() {
                    hour += TimeDelta::hours(1);
                    continue;
                }
                self.buffer = ticks;
                self.loaded_hour = Some(hour);
            }

            let idx = first_index_at_or_after(&self.buffer, self.start);
            if idx >= self.buffer.len() {
                // Every tick loaded for this hour precedes `start`; the next
                // hour may still hold ticks `>= start`.
                hour += TimeDelta::hours(1);
                continue;
            }

            self.index = idx;
            self.complete = false;
            return Ok(true);
        }
    }

    /// Seeks the cursor so that `current().time <= target` whenever
    /// possible, walking forward hour by hour from `hourOf(target)` until a
    /// non-empty hour is found or `end` is passed.
    ///
    /// Rejects `target` outside `[start, end]` with [`CursorError::OutOfRange`]
    /// without altering cursor state. If the target hour is already loaded,
    /// repositions within the existing buffer instead of re-fetching.
    ///
    /// # Errors
    ///
    /// Returns an error if ensuring/decoding an hour fails, or if `target`
    /// is out of range.
    pub async fn goto(&mut self, target: DateTime<Utc>) -> Result<bool, CursorError> {
        if target < self.start || target > self.end {
            return Err(CursorError::OutOfRange);
        }

        let mut hour = truncate_to_hour(target);
        let last_hour = truncate_to_hour(self.end);

        loop {
            if hour > last_hour {
                self.complete = true;
                return Ok(false);
            }

            if self.loaded_hour != Some(hour) {
                let ticks = self.ensure_and_decode(hour).await?;
                if ticks.is_empty() {
                    hour += TimeDelta::hours(1);
                    continue;
                }
                self.buffer = ticks;
                self.loaded_hour = Some(hour);
            }

            self.index = seek_index(&self.buffer, target);
            self.complete = false;
            return Ok(true);
        }
    }

    async fn ensure_and_decode(&self, hour: DateTime<Utc>) -> Result<Vec<Tick>, CursorError> {
        let state = self.cache.ensure(&self.code, hour).await?;
        let path = self.cache.path(&self.code, hour);
        let ticks = decode_hour(&path, state, hour, self.decimal_factor).await?;
        Ok(ticks)
    }
}

/// Returns the largest index whose tick time is `<= target`, clamped to 0
/// if every tick in `buffer` is already past `target`.
fn seek_index(buffer: &[Tick], target: DateTime<Utc>) -> usize {
    let past_target = buffer.partition_point(|t| t.timestamp <= target);
    past_target.saturating_sub(1)
}

/// Returns the smallest index whose tick time is `>= anchor`, or
/// `buffer.len()` if every tick in `buffer` precedes `anchor`.
fn first_index_at_or_after(buffer: &[Tick], anchor: DateTime<Utc>) -> usize {
    buffer.partition_point(|t| t.timestamp < anchor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_ticks(hour: DateTime<Utc>, offsets_ms: &[i64]) -> Vec<Tick> {
        offsets_ms
            .iter()
            .map(|&ms| Tick::new(hour + TimeDelta::milliseconds(ms), 1.0, 1.0, 1.0, 1.0))
            .collect()
    }

    #[test]
    fn seek_index_lands_on_last_tick_at_or_before_target() {
        let hour = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ticks = make_ticks(hour, &[0, 500, 1000, 1500]);
        let target = hour + TimeDelta::milliseconds(1000);
        assert_eq!(seek_index(&ticks, target), 2);
    }

    #[test]
    fn seek_index_clamps_to_zero_when_all_ticks_are_later() {
        let hour = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ticks = make_ticks(hour, &[500, 1000]);
        assert_eq!(seek_index(&ticks, hour), 0);
    }

    #[tokio::test]
    async fn goto_rejects_targets_outside_range() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HourCache::new(dir.path()).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap();
        let mut cursor = Cursor::new(cache, "eurusd", 100_000.0, start, end);

        let before = end + TimeDelta::hours(1);
        let result = cursor.goto(before).await;
        assert!(matches!(result, Err(CursorError::OutOfRange)));
        assert!(!cursor.is_complete());
    }

    #[test]
    fn first_index_at_or_after_lands_on_first_qualifying_tick() {
        let hour = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ticks = make_ticks(hour, &[0, 500, 1000, 1500]);
        let anchor = hour + TimeDelta::milliseconds(700);
        assert_eq!(first_index_at_or_after(&ticks, anchor), 2);
    }

    #[test]
    fn first_index_at_or_after_is_exact_on_an_exact_match() {
        let hour = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ticks = make_ticks(hour, &[0, 500, 1000]);
        let anchor = hour + TimeDelta::milliseconds(500);
        assert_eq!(first_index_at_or_after(&ticks, anchor), 1);
    }

    #[test]
    fn first_index_at_or_after_returns_len_when_nothing_qualifies() {
        let hour = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ticks = make_ticks(hour, &[0, 500]);
        let anchor = hour + TimeDelta::hours(1);
        assert_eq!(first_index_at_or_after(&ticks, anchor), ticks.len());
    }

    fn lzma_compress(raw: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        lzma_rs::lzma_compress(&mut std::io::Cursor::new(raw), &mut out).unwrap();
        out
    }

    fn write_hour_file(cache: &HourCache, code: &str, hour: DateTime<Utc>, offsets_ms: &[i32]) {
        use byteorder::{BigEndian, ByteOrder};
        let mut raw = Vec::with_capacity(offsets_ms.len() * 20);
        for &ms in offsets_ms {
            let mut chunk = [0u8; 20];
            BigEndian::write_i32(&mut chunk[0..4], ms);
            BigEndian::write_i32(&mut chunk[4..8], 110_010);
            BigEndian::write_i32(&mut chunk[8..12], 110_000);
            BigEndian::write_f32(&mut chunk[12..16], 1.0);
            BigEndian::write_f32(&mut chunk[16..20], 1.0);
            raw.extend_from_slice(&chunk);
        }
        let dest = cache.path(code, hour);
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(dest, lzma_compress(&raw)).unwrap();
    }

    /// A `start` that isn't hour-aligned must not make the cursor's very
    /// first `next()` fail: it used to delegate to the range-checked
    /// `goto()` with an hour-truncated (and thus sub-`start`) target.
    #[tokio::test]
    async fn next_succeeds_on_first_call_with_a_non_hour_aligned_start() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HourCache::new(dir.path()).unwrap();
        let hour = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        // Ticks at :00, :10, :20 past the hour; start sits between the
        // first two, at a non-hour-aligned instant.
        write_hour_file(&cache, "eurusd", hour, &[0, 600_000, 1_200_000]);

        let start = hour + TimeDelta::minutes(5);
        let end = hour + TimeDelta::hours(1);
        let mut cursor = Cursor::new(cache, "eurusd", 100_000.0, start, end);

        assert!(cursor.next().await.unwrap());
        let current = cursor.current().unwrap();
        assert_eq!(current.timestamp, hour + TimeDelta::minutes(10));

        assert!(cursor.next().await.unwrap());
        assert_eq!(
            cursor.current().unwrap().timestamp,
            hour + TimeDelta::minutes(20)
        );
    }

    /// When every tick in the bootstrap hour precedes `start`, the search
    /// must carry over into the next hour rather than landing past the
    /// end of the (empty-for-`start`) buffer.
    #[tokio::test]
    async fn next_carries_the_start_search_into_the_next_hour() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HourCache::new(dir.path()).unwrap();
        let first_hour = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let second_hour = first_hour + TimeDelta::hours(1);
        // All of the first hour's ticks are before `start`.
        write_hour_file(&cache, "eurusd", first_hour, &[0, 60_000]);
        write_hour_file(&cache, "eurusd", second_hour, &[0]);

        let start = first_hour + TimeDelta::minutes(30);
        let end = second_hour + TimeDelta::hours(1);
        let mut cursor = Cursor::new(cache, "eurusd", 100_000.0, start, end);

        assert!(cursor.next().await.unwrap());
        assert_eq!(cursor.current().unwrap().timestamp, second_hour);
    }
}
