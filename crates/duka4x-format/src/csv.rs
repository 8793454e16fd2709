//! CSV tick transcoder.

use chrono::NaiveDate;
use duka4x_types::{Instrument, Tick};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TranscodeError;
use crate::transcoder::Transcoder;

/// Channel capacity between the producer and the background writer.
const CHANNEL_CAPACITY: usize = 1024;

/// Header row written when the caller requests one.
const HEADER_ROW: &str = "time,ask,bid,ask_volume,bid_volume\n";

/// Builds the spec-mandated filename `<CODE>-<startDate>-<endDate>.CSV`.
#[must_use]
pub fn csv_filename(code: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}-{}-{}.CSV",
        code.to_uppercase(),
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    )
}

/// Writes one row per tick as `time,ask,bid,ask_volume,bid_volume`.
#[derive(Debug)]
pub struct CsvTranscoder {
    sender: Option<mpsc::Sender<Tick>>,
    worker: JoinHandle<Result<(), TranscodeError>>,
}

impl CsvTranscoder {
    /// Creates a CSV transcoder writing to `path`, using `instrument`'s
    /// decimal factor for price formatting. Writes the header row
    /// immediately if `header` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be created.
    pub async fn create(
        path: impl Into<std::path::PathBuf>,
        instrument: Instrument,
        header: bool,
    ) -> Result<Self, TranscodeError> {
        let path = path.into();
        let file = tokio::fs::File::create(&path).await?;
        let mut writer = BufWriter::new(file);

        let (tx, mut rx) = mpsc::channel::<Tick>(CHANNEL_CAPACITY);

        let worker = tokio::spawn(async move {
            if header {
                writer.write_all(HEADER_ROW.as_bytes()).await?;
            }
            while let Some(tick) = rx.recv().await {
                let line = format!(
                    "{},{},{},{:.2},{:.2}\n",
                    tick.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                    instrument.format_price(tick.ask),
                    instrument.format_price(tick.bid),
                    tick.ask_volume,
                    tick.bid_volume,
                );
                writer.write_all(line.as_bytes()).await?;
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

impl Transcoder for CsvTranscoder {
    async fn pack_ticks(
        &mut self,
        _bar_start: chrono::DateTime<chrono::Utc>,
        ticks: Vec<Tick>,
    ) -> Result<(), TranscodeError> {
        let Some(sender) = &self.sender else {
            return Err(TranscodeError::WriterClosed);
        };
        for tick in ticks {
            sender
                .send(tick)
                .await
                .map_err(|_| TranscodeError::WriterClosed)?;
        }
        Ok(())
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
    use chrono::{TimeZone, Utc};

    #[test]
    fn filename_matches_spec_pattern() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            csv_filename("eurusd", start, end),
            "EURUSD-2024-01-01-2024-01-31.CSV"
        );
    }

    #[tokio::test]
    async fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let instrument = Instrument::new("eurusd", "EUR/USD", "", 100_000, None, None);
        let mut transcoder = CsvTranscoder::create(path.clone(), instrument, true)
            .await
            .unwrap();

        let tick = Tick::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45).unwrap(),
            1.1001,
            1.1000,
            100.0,
            200.0,
        );
        transcoder
            .pack_ticks(tick.timestamp, vec![tick])
            .await
            .unwrap();
        transcoder.finish().await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.starts_with("time,ask,bid,ask_volume,bid_volume\n"));
        assert!(contents.contains("2024-01-15 12:30:45.000,1.10010,1.10000,100.00,200.00"));
    }
}
