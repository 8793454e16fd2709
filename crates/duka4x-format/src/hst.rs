//! MT4 HST 401 bar-history writer (bit-exact).

use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{DateTime, Utc};
use duka4x_types::Tick;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TranscodeError;
use crate::transcoder::Transcoder;

/// Channel capacity between the producer and the background writer.
const CHANNEL_CAPACITY: usize = 128;

/// Total size of the HST 401 header, in bytes.
const HEADER_SIZE: usize = 148;

/// Size of a single HST bar record, in bytes.
const BAR_SIZE: usize = 60;

/// Builds the spec-mandated filename `<CODE><periodMinutes>.hst`.
#[must_use]
pub fn hst_filename(code: &str, period_minutes: u32) -> String {
    format!("{}{}.hst", code.to_uppercase(), period_minutes)
}

/// One bar's worth of ticks, already known to be non-empty.
struct HstBar {
    bar_time: DateTime<Utc>,
    ticks: Vec<Tick>,
}

fn bar_to_bytes(bar: &HstBar) -> Result<[u8; BAR_SIZE], TranscodeError> {
    let open = bar.ticks[0].bid;
    let close = bar.ticks[bar.ticks.len() - 1].bid;
    let mut low = open;
    let mut high = open;
    let mut total_volume = 0.0f64;
    for tick in &bar.ticks {
        low = low.min(tick.bid);
        high = high.max(tick.bid);
        total_volume += tick.bid_volume;
    }
    let tick_volume = total_volume.max(1.0) as u64;

    let mut buf = Vec::with_capacity(BAR_SIZE);
    buf.write_i64::<LittleEndian>(bar.bar_time.timestamp())?;
    buf.write_f64::<LittleEndian>(open)?;
    buf.write_f64::<LittleEndian>(high)?;
    buf.write_f64::<LittleEndian>(low)?;
    buf.write_f64::<LittleEndian>(close)?;
    buf.write_u64::<LittleEndian>(tick_volume)?;
    buf.write_i32::<LittleEndian>(0)?; // spread
    buf.write_u64::<LittleEndian>(0)?; // realVolume

    let mut out = [0u8; BAR_SIZE];
    out.copy_from_slice(&buf);
    Ok(out)
}

fn header_bytes(symbol: &str, period_minutes: u32, digits: u32, time_sign: u32) -> [u8; HEADER_SIZE] {
    let mut buf = Vec::with_capacity(HEADER_SIZE);
    buf.write_u32::<LittleEndian>(401).unwrap();

    let mut copyright = [0u8; 64];
    let bytes = b"duka4x";
    copyright[..bytes.len()].copy_from_slice(bytes);
    buf.extend_from_slice(&copyright);

    let mut symbol_bytes = [0u8; 12];
    let upper = symbol.to_uppercase();
    let src = upper.as_bytes();
    let len = src.len().min(12);
    symbol_bytes[..len].copy_from_slice(&src[..len]);
    buf.extend_from_slice(&symbol_bytes);

    buf.write_u32::<LittleEndian>(period_minutes).unwrap();
    buf.write_u32::<LittleEndian>(digits).unwrap();
    buf.write_u32::<LittleEndian>(time_sign).unwrap();
    buf.write_u32::<LittleEndian>(0).unwrap(); // lastSync
    buf.extend_from_slice(&[0u8; 52]);

    let mut out = [0u8; HEADER_SIZE];
    out.copy_from_slice(&buf);
    out
}

/// Writes a sequence of `(barTimestamp, ticks)` batches as HST 401 bars.
#[derive(Debug)]
pub struct HstTranscoder {
    sender: Option<mpsc::Sender<HstBar>>,
    worker: JoinHandle<Result<(), TranscodeError>>,
}

impl std::fmt::Debug for HstBar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HstBar")
            .field("bar_time", &self.bar_time)
            .field("tick_count", &self.ticks.len())
            .finish()
    }
}

impl HstTranscoder {
    /// Creates an HST transcoder writing to `path`, emitting the 148-byte
    /// header immediately using `time_sign` as the creation timestamp
    /// (epoch seconds).
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be created or the header
    /// cannot be written.
    pub async fn create(
        path: impl Into<std::path::PathBuf>,
        symbol: &str,
        period_minutes: u32,
        digits: u32,
        time_sign: u32,
    ) -> Result<Self, TranscodeError> {
        let path = path.into();
        let file = tokio::fs::File::create(&path).await?;
        let mut writer = BufWriter::new(file);
        let header = header_bytes(symbol, period_minutes, digits, time_sign);

        let (tx, mut rx) = mpsc::channel::<HstBar>(CHANNEL_CAPACITY);

        let worker = tokio::spawn(async move {
            writer.write_all(&header).await?;
            while let Some(bar) = rx.recv().await {
                let bytes = bar_to_bytes(&bar)?;
                writer.write_all(&bytes).await?;
            }
            writer.flush().await?;
            Ok(())
        });

        Ok(Self {
            sender: Some(tx),
            worker,
        })
    }
}

impl Transcoder for HstTranscoder {
    async fn pack_ticks(
        &mut self,
        bar_start: DateTime<Utc>,
        ticks: Vec<Tick>,
    ) -> Result<(), TranscodeError> {
        if ticks.is_empty() {
            return Ok(());
        }
        let Some(sender) = &self.sender else {
            return Err(TranscodeError::WriterClosed);
        };
        sender
            .send(HstBar {
                bar_time: bar_start,
                ticks,
            })
            .await
            .map_err(|_| TranscodeError::WriterClosed)
    }

    async fn finish(mut self) -> Result<(), TranscodeError> {
        self.sender.take();
        self.worker
            .await
            .map_err(|e| TranscodeError::Join(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ReadBytesExt;
    use chrono::TimeZone;
    use std::io::Cursor as IoCursor;

    #[test]
    fn filename_matches_spec_pattern() {
        assert_eq!(hst_filename("eurusd", 60), "EURUSD60.hst");
    }

    #[tokio::test]
    async fn writes_header_and_single_bar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.hst");
        let mut transcoder = HstTranscoder::create(path.clone(), "eurusd", 60, 5, 1_700_000_000)
            .await
            .unwrap();

        let bar_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let ticks = vec![
            Tick::new(bar_time, 1.1002, 1.1000, 1.0, 2.0),
            Tick::new(bar_time, 1.1003, 1.1005, 1.0, 3.0),
        ];
        transcoder.pack_ticks(bar_time, ticks).await.unwrap();
        transcoder.finish().await.unwrap();

        let contents = tokio::fs::read(&path).await.unwrap();
        assert_eq!(contents.len(), HEADER_SIZE + BAR_SIZE);

        let mut reader = IoCursor::new(&contents[HEADER_SIZE..]);
        let bar_time_read = reader.read_i64::<LittleEndian>().unwrap();
        let open = reader.read_f64::<LittleEndian>().unwrap();
        let high = reader.read_f64::<LittleEndian>().unwrap();
        let low = reader.read_f64::<LittleEndian>().unwrap();
        let close = reader.read_f64::<LittleEndian>().unwrap();
        let volume = reader.read_u64::<LittleEndian>().unwrap();

        assert_eq!(bar_time_read, bar_time.timestamp());
        assert!((open - 1.1000).abs() < 1e-9);
        assert!((close - 1.1005).abs() < 1e-9);
        assert!((high - 1.1005).abs() < 1e-9);
        assert!((low - 1.1000).abs() < 1e-9);
        assert_eq!(volume, 5);
    }

    #[tokio::test]
    async fn empty_batch_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.hst");
        let mut transcoder = HstTranscoder::create(path.clone(), "eurusd", 60, 5, 0)
            .await
            .unwrap();
        transcoder
            .pack_ticks(Utc::now(), Vec::new())
            .await
            .unwrap();
        transcoder.finish().await.unwrap();

        let contents = tokio::fs::read(&path).await.unwrap();
        assert_eq!(contents.len(), HEADER_SIZE);
    }
}
