//! HTTP fetch, on-disk hour cache, bi5 decode, day aggregation, and the
//! tick stream/cursor for duka4x.
//!
//! - [`url::tick_url`] / [`url::cache_path`] — remote and on-disk path
//!   construction
//! - [`client::FetchClient`] — retryable HTTP GET with atomic rename
//! - [`cache::HourCache`] — sentinel-gated per-hour on-disk cache
//! - [`decompress::decompress_bi5`] / [`parse::parse_ticks`] / [`bi5`] —
//!   LZMA decode and binary tick parsing
//! - [`day::fetch_day`] — bounded-concurrency day aggregator
//! - [`stream::tick_stream`] — lazy forward-only tick stream
//! - [`cursor::Cursor`] — seekable tick cursor

#![doc(issue_tracker_base_url = "https://github.com/duka4x/duka4x/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bi5;
pub mod cache;
pub mod client;
pub mod cursor;
pub mod day;
pub mod decompress;
pub mod parse;
pub mod stream;
pub mod url;

pub use bi5::{DecodeError, decode_bytes, decode_hour, each_tick, ticks_in_range};
pub use cache::{CacheError, CacheState, HourCache};
pub use client::{FetchClient, FetchError, FetchOutcome};
pub use cursor::{Cursor, CursorError};
pub use day::{Day, DayError, HourResult, fetch_day};
pub use decompress::{DecompressError, decompress_bi5};
pub use parse::{ParseError, parse_ticks, tick_count};
pub use stream::{StreamError, tick_stream};
