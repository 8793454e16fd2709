//! Shared error type for the CSV/HST/FXT transcoders.

use thiserror::Error;

/// Errors that can occur while transcoding ticks to an output file.
#[derive(Error, Debug)]
pub enum TranscodeError {
    /// A filesystem operation (create, write, seek, rename) failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The background writer task panicked or was cancelled.
    #[error("writer task failed: {0}")]
    Join(String),

    /// `pack_ticks` was called after the writer had already stopped
    /// consuming (the channel's receiver was dropped).
    #[error("writer is no longer accepting data")]
    WriterClosed,
}
