//! Shared transcoder contract implemented by the CSV/HST/FXT writers.

use std::future::Future;

use chrono::{DateTime, Utc};
use duka4x_types::Tick;

use crate::error::TranscodeError;

/// Producer-side contract for a tick/bar output writer.
///
/// Each implementation owns a background worker task fed by a bounded
/// channel — the producer calls [`Transcoder::pack_ticks`] per bar (or per
/// day, for the tick-level CSV writer) and [`Transcoder::finish`] exactly
/// once to close the channel, wait for the worker to drain, and finalize
/// the output file.
pub trait Transcoder {
    /// Queues one bar's worth of ticks (or, for a tick-level writer, one
    /// batch of ticks sharing a single timestamp tag) for the background
    /// writer. An empty `ticks` is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the background writer has already stopped.
    fn pack_ticks(
        &mut self,
        bar_start: DateTime<Utc>,
        ticks: Vec<Tick>,
    ) -> impl Future<Output = Result<(), TranscodeError>> + Send;

    /// Closes the input channel and waits for the background writer to
    /// drain and finalize the output file.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer task failed.
    fn finish(self) -> impl Future<Output = Result<(), TranscodeError>> + Send;
}
