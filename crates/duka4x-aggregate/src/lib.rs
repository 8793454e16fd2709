//! Per-timeframe-bar tick batching for duka4x.
//!
//! - [`batch_ticks`] - Splits a day's ticks into bar-aligned batches
//! - [`TickBatch`] - A single bar's worth of raw ticks

#![doc(issue_tracker_base_url = "https://github.com/duka4x/duka4x/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod batcher;

pub use batcher::{TickBatch, batch_ticks};
