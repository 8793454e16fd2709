//! Forward-only tick stream over a `[start, end]` range.

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use duka4x_types::Tick;
use futures::Stream;
use futures::stream;
use thiserror::Error;

use crate::bi5::{DecodeError, decode_hour, ticks_in_range, truncate_to_hour};
use crate::cache::{CacheError, HourCache};

/// Error surfaced once by the stream when an hour cannot be fetched or
/// decoded. Per the stream's "typical policy is abort", the stream
/// terminates after yielding this item.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The hour cache failed to ensure this hour.
    #[error("fetching hour {hour}: {source}")]
    Cache {
        /// The hour that failed.
        hour: DateTime<Utc>,
        /// Underlying cache error.
        #[source]
        source: CacheError,
    },
    /// The cached file existed but failed to decode.
    #[error("decoding hour {hour}: {source}")]
    Decode {
        /// The hour that failed.
        hour: DateTime<Utc>,
        /// Underlying decode error.
        #[source]
        source: DecodeError,
    },
}

struct State {
    cache: HourCache,
    code: String,
    decimal_factor: f64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    next_hour: Option<DateTime<Utc>>,
    buffer: VecDeque<Tick>,
    done: bool,
}

/// Builds a lazy, forward-only stream of ticks across `[start, end]`
/// (inclusive, UTC), ensuring and decoding one hour's cache entry at a
/// time. Hours absent from the cache (empty body, 404, or a recovered
/// fetch failure) silently contribute zero ticks; a hard fetch/decode
/// error is yielded once and then the stream ends.
pub fn tick_stream(
    cache: HourCache,
    code: impl Into<String>,
    decimal_factor: f64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> impl Stream<Item = Result<Tick, StreamError>> {
    let state = State {
        cache,
        code: code.into(),
        decimal_factor,
        start,
        end,
        next_hour: None,
        buffer: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(tick) = state.buffer.pop_front() {
                return Some((Ok(tick), state));
            }
            if state.done {
                return None;
            }

            let hour = state.next_hour.unwrap_or_else(|| truncate_to_hour(state.start));
            if hour > truncate_to_hour(state.end) {
                state.done = true;
                return None;
            }
            state.next_hour = Some(hour + TimeDelta::hours(1));

            match state.cache.ensure(&state.code, hour).await {
                Ok(cache_state) => {
                    let path = state.cache.path(&state.code, hour);
                    match decode_hour(&path, cache_state, hour, state.decimal_factor).await {
                        Ok(ticks) => {
                            let ticks = ticks_in_range(ticks, Some(state.start), Some(state.end));
                            state.buffer.extend(ticks);
                        }
                        Err(source) => {
                            state.done = true;
                            return Some((Err(StreamError::Decode { hour, source }), state));
                        }
                    }
                }
                Err(source) => {
                    state.done = true;
                    return Some((Err(StreamError::Cache { hour, source }), state));
                }
            }
        }
    })
}
