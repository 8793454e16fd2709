//! MT4 FXT 405 strategy-tester history writer (bit-exact), plus a reader
//! used by the `-dump` inspection command.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use duka4x_types::Tick;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufWriter, SeekFrom};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TranscodeError;
use crate::transcoder::Transcoder;

/// Channel capacity between the producer and the background writer.
const CHANNEL_CAPACITY: usize = 1024;

/// Total size of the FXT 405 header, in bytes.
pub const HEADER_SIZE: usize = 728;

/// Size of a single FXT tick record, in bytes.
pub const TICK_SIZE: usize = 56;

/// Byte offset of the `barCount`/`firstBarTime`/`lastBarTime` patch region.
const PATCH_OFFSET_PRIMARY: u64 = 216;

/// Byte offset of the mirrored `firstBarTime`/`lastBarTime` patch region.
const PATCH_OFFSET_MIRROR: u64 = 472;

/// Builds the spec-mandated filename `<CODE><periodMinutes>_<model>.fxt`.
#[must_use]
pub fn fxt_filename(code: &str, period_minutes: u32, model: u32) -> String {
    format!("{}{}_{}.fxt", code.to_uppercase(), period_minutes, model)
}

/// Tester price model, mirroring MT4's `modelType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceModel {
    /// Every real tick is replayed.
    EveryTick = 0,
    /// Only control points (the batch boundaries) are replayed.
    ControlPoints = 1,
    /// Only open prices are replayed.
    OpenPrices = 2,
}

impl PriceModel {
    const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Broker/model parameters needed to populate the FXT header's default
/// fields. Values mirror what MT4's tester expects as sensible defaults.
#[derive(Debug, Clone, Copy)]
pub struct FxtParams {
    /// Spread, in points.
    pub spread: u32,
    /// Number of price decimals.
    pub digits: u32,
    /// Account leverage, e.g. 100 for 1:100.
    pub leverage: u32,
    /// Tester price model.
    pub model: PriceModel,
}

impl Default for FxtParams {
    fn default() -> Self {
        Self {
            spread: 20,
            digits: 5,
            leverage: 100,
            model: PriceModel::EveryTick,
        }
    }
}

/// Running OHLC state for the bar currently being packed.
struct RunningBar {
    bar_time: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
}

fn header_bytes(symbol: &str, period_minutes: u32, params: FxtParams, point_size: f64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE);
    buf.write_u32::<LittleEndian>(405).unwrap(); // offset 0: version

    let mut copyright = [0u8; 64];
    let bytes = b"duka4x";
    copyright[..bytes.len()].copy_from_slice(bytes);
    buf.extend_from_slice(&copyright); // offset 4

    let mut symbol_bytes = [0u8; 12];
    let upper = symbol.to_uppercase();
    let src = upper.as_bytes();
    let len = src.len().min(12);
    symbol_bytes[..len].copy_from_slice(&src[..len]);
    buf.extend_from_slice(&symbol_bytes); // offset 68

    buf.write_u32::<LittleEndian>(period_minutes).unwrap(); // offset 80
    buf.write_u32::<LittleEndian>(params.model.as_u32()).unwrap(); // offset 84

    // barCount / firstBarTime / lastBarTime: placeholder, patched in finish().
    buf.write_i32::<LittleEndian>(0).unwrap(); // offset 88: barCount (pre-patch copy, unused by loader)
    buf.write_u32::<LittleEndian>(0).unwrap(); // offset 92
    buf.write_u32::<LittleEndian>(0).unwrap(); // offset 96

    buf.write_u32::<LittleEndian>(params.spread).unwrap(); // offset 100
    buf.write_u32::<LittleEndian>(params.digits).unwrap(); // offset 104
    buf.write_f64::<LittleEndian>(point_size).unwrap(); // offset 108
    buf.write_u32::<LittleEndian>(params.leverage).unwrap(); // offset 116

    // Remaining broker/model parameters (freeze level, lot step, swap and
    // margin rules, commission) default to zero; MT4's tester treats a zero
    // field as "use platform default" for every one of these.
    debug_assert!(buf.len() <= PATCH_OFFSET_PRIMARY as usize);
    buf.extend(std::iter::repeat(0u8).take(PATCH_OFFSET_PRIMARY as usize - buf.len()));

    // Reserve the two patch regions so the overall length still lands on
    // HEADER_SIZE; patched for real once the first/last bar are known.
    debug_assert_eq!(buf.len(), PATCH_OFFSET_PRIMARY as usize);
    buf.extend_from_slice(&[0u8; 12]); // offset 216: barCount + firstBarTime + lastBarTime

    buf.extend(std::iter::repeat(0u8).take(PATCH_OFFSET_MIRROR as usize - buf.len()));
    buf.extend_from_slice(&[0u8; 8]); // offset 472: firstBarTime + lastBarTime mirror

    buf.extend(std::iter::repeat(0u8).take(HEADER_SIZE - buf.len()));
    buf
}

fn tick_record_bytes(
    bar: &RunningBar,
    close: f64,
    volume: u64,
    tick_time: DateTime<Utc>,
) -> Result<[u8; TICK_SIZE], TranscodeError> {
    let mut buf = Vec::with_capacity(TICK_SIZE);
    buf.write_i64::<LittleEndian>(bar.bar_time.timestamp())?;
    buf.write_f64::<LittleEndian>(bar.open)?;
    buf.write_f64::<LittleEndian>(bar.high)?;
    buf.write_f64::<LittleEndian>(bar.low)?;
    buf.write_f64::<LittleEndian>(close)?;
    buf.write_u64::<LittleEndian>(volume)?;
    #[allow(clippy::cast_sign_loss)]
    buf.write_u32::<LittleEndian>((tick_time.timestamp_millis() / 1000) as u32)?;
    buf.write_u32::<LittleEndian>(3)?; // launchExpert

    let mut out = [0u8; TICK_SIZE];
    out.copy_from_slice(&buf);
    Ok(out)
}

enum WorkItem {
    Batch {
        bar_start: DateTime<Utc>,
        ticks: Vec<Tick>,
    },
}

/// Writes a sequence of `(barTimestamp, ticks)` batches as FXT 405 tick
/// records, patching the header's bar-range fields on `finish()`.
#[derive(Debug)]
pub struct FxtTranscoder {
    sender: Option<mpsc::Sender<WorkItem>>,
    worker: JoinHandle<Result<(), TranscodeError>>,
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Batch { bar_start, ticks } => f
                .debug_struct("Batch")
                .field("bar_start", bar_start)
                .field("tick_count", &ticks.len())
                .finish(),
        }
    }
}

impl FxtTranscoder {
    /// Creates an FXT transcoder writing to `path`, emitting the 728-byte
    /// header immediately with placeholder bar-range fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be created or the header
    /// cannot be written.
    pub async fn create(
        path: impl Into<std::path::PathBuf>,
        symbol: &str,
        period_minutes: u32,
        decimal_factor: f64,
        params: FxtParams,
    ) -> Result<Self, TranscodeError> {
        let path = path.into();
        let point_size = 1.0 / decimal_factor;
        let header = header_bytes(symbol, period_minutes, params, point_size);

        let file = File::create(&path).await?;
        let mut writer = BufWriter::new(file);

        let (tx, mut rx) = mpsc::channel::<WorkItem>(CHANNEL_CAPACITY);
        let patch_path = path.clone();

        let worker = tokio::spawn(async move {
            writer.write_all(&header).await?;

            let mut bar_count: i32 = 0;
            let mut first_bar_time: Option<DateTime<Utc>> = None;
            let mut last_bar_time: Option<DateTime<Utc>> = None;

            while let Some(WorkItem::Batch { bar_start, ticks }) = rx.recv().await {
                if ticks.is_empty() {
                    continue;
                }
                if first_bar_time.is_none() {
                    first_bar_time = Some(bar_start);
                }
                last_bar_time = Some(bar_start);
                bar_count += 1;

                let mut running = RunningBar {
                    bar_time: bar_start,
                    open: ticks[0].bid,
                    high: ticks[0].bid,
                    low: ticks[0].bid,
                };
                for tick in &ticks {
                    running.high = running.high.max(tick.bid);
                    running.low = running.low.min(tick.bid);
                    let volume = (tick.bid_volume * 100.0).max(1.0) as u64;
                    let record = tick_record_bytes(&running, tick.bid, volume, tick.timestamp)?;
                    writer.write_all(&record).await?;
                }
            }
            writer.flush().await?;
            drop(writer);

            patch_header(&patch_path, bar_count, first_bar_time, last_bar_time).await
        });

        Ok(Self {
            sender: Some(tx),
            worker,
        })
    }
}

async fn patch_header(
    path: &std::path::Path,
    bar_count: i32,
    first_bar_time: Option<DateTime<Utc>>,
    last_bar_time: Option<DateTime<Utc>>,
) -> Result<(), TranscodeError> {
    let Some(first) = first_bar_time else {
        return Ok(());
    };
    let last = last_bar_time.unwrap_or(first);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let first_secs = first.timestamp() as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let last_secs = last.timestamp() as u32;

    let mut file = tokio::fs::OpenOptions::new().write(true).open(path).await?;

    let mut primary = Vec::with_capacity(12);
    primary.write_i32::<LittleEndian>(bar_count)?;
    primary.write_u32::<LittleEndian>(first_secs)?;
    primary.write_u32::<LittleEndian>(last_secs)?;
    file.seek(SeekFrom::Start(PATCH_OFFSET_PRIMARY)).await?;
    file.write_all(&primary).await?;

    let mut mirror = Vec::with_capacity(8);
    mirror.write_u32::<LittleEndian>(first_secs)?;
    mirror.write_u32::<LittleEndian>(last_secs)?;
    file.seek(SeekFrom::Start(PATCH_OFFSET_MIRROR)).await?;
    file.write_all(&mirror).await?;

    file.flush().await?;
    Ok(())
}

impl Transcoder for FxtTranscoder {
    async fn pack_ticks(
        &mut self,
        bar_start: DateTime<Utc>,
        ticks: Vec<Tick>,
    ) -> Result<(), TranscodeError> {
        let Some(sender) = &self.sender else {
            return Err(TranscodeError::WriterClosed);
        };
        sender
            .send(WorkItem::Batch { bar_start, ticks })
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

/// A decoded FXT tick record, as produced by the `-dump` command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FxtTickRecord {
    /// Bar timestamp (epoch seconds) this tick belongs to.
    pub bar_time: i64,
    /// Running open price for the bar.
    pub open: f64,
    /// Running high price for the bar.
    pub high: f64,
    /// Running low price for the bar.
    pub low: f64,
    /// Current price (this tick's bid).
    pub close: f64,
    /// This tick's volume.
    pub volume: u64,
    /// Tick timestamp, epoch seconds.
    pub tick_time: u32,
}

/// Decoded header fields relevant to inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FxtHeaderSummary {
    /// File format version (expected 405).
    pub version: u32,
    /// Bar period in minutes.
    pub period_minutes: u32,
    /// Number of bars recorded by the writer.
    pub bar_count: i32,
    /// First bar's timestamp, epoch seconds.
    pub first_bar_time: u32,
    /// Last bar's timestamp, epoch seconds.
    pub last_bar_time: u32,
}

/// Reads an FXT file's header and, unless `header_only`, every tick record.
///
/// Mirrors the inspection behavior used by the `-dump` CLI flag.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is shorter than the
/// fixed header/record sizes require.
pub async fn dump_file(
    path: impl AsRef<std::path::Path>,
    header_only: bool,
) -> Result<(FxtHeaderSummary, Vec<FxtTickRecord>), TranscodeError> {
    let mut file = File::open(path).await?;
    let mut header = vec![0u8; HEADER_SIZE];
    file.read_exact(&mut header).await?;

    let mut cursor = std::io::Cursor::new(&header);
    let version = cursor.read_u32::<LittleEndian>()?;
    cursor.set_position(80);
    let period_minutes = cursor.read_u32::<LittleEndian>()?;
    cursor.set_position(PATCH_OFFSET_PRIMARY);
    let bar_count = cursor.read_i32::<LittleEndian>()?;
    let first_bar_time = cursor.read_u32::<LittleEndian>()?;
    let last_bar_time = cursor.read_u32::<LittleEndian>()?;

    let summary = FxtHeaderSummary {
        version,
        period_minutes,
        bar_count,
        first_bar_time,
        last_bar_time,
    };

    let mut records = Vec::new();
    if header_only {
        return Ok((summary, records));
    }

    let mut buf = [0u8; TICK_SIZE];
    loop {
        match file.read_exact(&mut buf).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let mut reader = std::io::Cursor::new(&buf[..]);
        let bar_time = reader.read_i64::<LittleEndian>()?;
        let open = reader.read_f64::<LittleEndian>()?;
        let high = reader.read_f64::<LittleEndian>()?;
        let low = reader.read_f64::<LittleEndian>()?;
        let close = reader.read_f64::<LittleEndian>()?;
        let volume = reader.read_u64::<LittleEndian>()?;
        let tick_time = reader.read_u32::<LittleEndian>()?;
        records.push(FxtTickRecord {
            bar_time,
            open,
            high,
            low,
            close,
            volume,
            tick_time,
        });
    }

    Ok((summary, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn filename_matches_spec_pattern() {
        assert_eq!(fxt_filename("eurusd", 60, 0), "EURUSD60_0.fxt");
    }

    #[test]
    fn header_bytes_are_exactly_header_size() {
        let bytes = header_bytes("eurusd", 60, FxtParams::default(), 1.0 / 100_000.0);
        assert_eq!(bytes.len(), HEADER_SIZE);
    }

    #[tokio::test]
    async fn writes_ticks_and_patches_header_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.fxt");
        let mut transcoder = FxtTranscoder::create(
            path.clone(),
            "eurusd",
            60,
            100_000.0,
            FxtParams::default(),
        )
        .await
        .unwrap();

        let bar_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let ticks = vec![
            Tick::new(bar_time, 1.1002, 1.1000, 1.0, 2.0),
            Tick::new(bar_time, 1.1003, 1.1005, 1.0, 3.0),
        ];
        transcoder.pack_ticks(bar_time, ticks).await.unwrap();
        transcoder.finish().await.unwrap();

        let (summary, records) = dump_file(&path, false).await.unwrap();
        assert_eq!(summary.version, 405);
        assert_eq!(summary.bar_count, 1);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let expected_secs = bar_time.timestamp() as u32;
        assert_eq!(summary.first_bar_time, expected_secs);
        assert_eq!(summary.last_bar_time, expected_secs);

        assert_eq!(records.len(), 2);
        assert!((records[0].open - 1.1000).abs() < 1e-9);
        assert!((records[1].close - 1.1005).abs() < 1e-9);
        assert_eq!(records[0].volume, 200);
        assert_eq!(records[1].volume, 300);
    }

    #[tokio::test]
    async fn header_only_dump_skips_tick_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.fxt");
        let transcoder = FxtTranscoder::create(
            path.clone(),
            "eurusd",
            60,
            100_000.0,
            FxtParams::default(),
        )
        .await
        .unwrap();
        transcoder.finish().await.unwrap();

        let (_summary, records) = dump_file(&path, true).await.unwrap();
        assert!(records.is_empty());
    }
}
