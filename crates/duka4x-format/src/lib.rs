//! Bit-exact output transcoders for duka4x tick data.
//!
//! - [`transcoder::Transcoder`] - shared producer/worker contract
//! - [`csv::CsvTranscoder`] - comma-separated tick-level export
//! - [`hst::HstTranscoder`] - MT4 HST 401 bar history
//! - [`fxt::FxtTranscoder`] - MT4 FXT 405 strategy-tester history, plus
//!   [`fxt::dump_file`] for inspecting an existing `.fxt` file

#![doc(issue_tracker_base_url = "https://github.com/duka4x/duka4x/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod csv;
mod error;
mod fxt;
mod hst;
mod transcoder;

pub use crate::csv::{CsvTranscoder, csv_filename};
pub use error::TranscodeError;
pub use fxt::{
    FxtHeaderSummary, FxtParams, FxtTickRecord, FxtTranscoder, PriceModel, dump_file, fxt_filename,
};
pub use hst::{HstTranscoder, hst_filename};
pub use transcoder::Transcoder;
