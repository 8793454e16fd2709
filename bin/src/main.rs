//! duka4x CLI - Dukascopy FX/CFD tick data downloader and MT4 history
//! transcoder.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, TimeDelta, TimeZone, Utc};
use clap::{Parser, ValueEnum};

use duka4x_aggregate::batch_ticks;
use duka4x_fetch::{HourCache, fetch_day};
use duka4x_format::{
    CsvTranscoder, FxtParams, FxtTranscoder, HstTranscoder, PriceModel, Transcoder, csv_filename,
    dump_file, fxt_filename, hst_filename,
};
use duka4x_instruments::InstrumentRegistry;
use duka4x_types::{Tick, Timeframe};

/// Output format for a download run.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Tick-level CSV export.
    Csv,
    /// MT4 HST 401 bar history.
    Hst,
    /// MT4 FXT 405 strategy-tester history.
    Fxt,
}

/// MT4 tester price model, mirrored from `FxtParams`'s `PriceModel`.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Model {
    /// Every real tick is replayed.
    EveryTick = 0,
    /// Only control points are replayed.
    ControlPoints = 1,
    /// Only open prices are replayed.
    OpenPrices = 2,
}

impl From<Model> for PriceModel {
    fn from(model: Model) -> Self {
        match model {
            Model::EveryTick => Self::EveryTick,
            Model::ControlPoints => Self::ControlPoints,
            Model::OpenPrices => Self::OpenPrices,
        }
    }
}

/// Dukascopy FX/CFD tick data downloader and MT4 history transcoder.
#[derive(Parser, Debug)]
#[command(name = "duka4x")]
#[command(about = "Dukascopy FX/CFD tick data downloader and MT4 history transcoder")]
#[command(version)]
struct Args {
    /// Instrument code (e.g. eurusd). Required unless `--dump` is given.
    #[arg(short = 's', long)]
    symbol: Option<String>,

    /// Start date, YYYY-MM-DD (inclusive, UTC).
    #[arg(long)]
    start: Option<String>,

    /// End date, YYYY-MM-DD (inclusive, UTC).
    #[arg(long)]
    end: Option<String>,

    /// Output file path, or directory when multiple timeframes are given.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Bar timeframe(s), comma-separated (e.g. `m1,h1,d1`). Ignored for csv.
    #[arg(short, long, value_delimiter = ',')]
    timeframe: Vec<String>,

    /// Spread, in points, written into the FXT header.
    #[arg(long, default_value_t = 20)]
    spread: u32,

    /// Tester price model, for FXT output.
    #[arg(long, value_enum, default_value = "every-tick")]
    model: Model,

    /// Write a leading header row for CSV output; for `--dump`, print only
    /// the file header and skip tick records.
    #[arg(long)]
    header: bool,

    /// Inspect an existing FXT file instead of downloading.
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Directory backing the on-disk hour cache.
    #[arg(long, default_value = ".duka4x-cache")]
    cache_dir: PathBuf,

    /// Verbose progress output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.dump {
        return run_dump(path, args.header).await;
    }

    run_download(&args).await
}

async fn run_dump(path: &std::path::Path, header_only: bool) -> Result<()> {
    let (summary, records) = dump_file(path, header_only)
        .await
        .with_context(|| format!("reading FXT file: {}", path.display()))?;

    println!("{summary:?}");
    for record in &records {
        println!("{record:?}");
    }
    Ok(())
}

async fn run_download(args: &Args) -> Result<()> {
    let symbol = args
        .symbol
        .as_deref()
        .context("--symbol is required unless --dump is given")?;

    let registry = InstrumentRegistry::global();
    let instrument = registry
        .get(symbol)
        .await
        .with_context(|| format!("unknown instrument: {symbol}"))?;

    let start_date = match &args.start {
        Some(s) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid --start: {s}"))?
        }
        None => instrument
            .earliest_minute_date()
            .map(|dt| dt.date_naive())
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(2003, 5, 5).expect("valid date")),
    };
    let end_date = match &args.end {
        Some(s) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid --end: {s}"))?
        }
        None => Utc::now().date_naive(),
    };
    if start_date > end_date {
        bail!("--start ({start_date}) is after --end ({end_date})");
    }

    let start = Utc
        .from_utc_datetime(&start_date.and_hms_opt(0, 0, 0).expect("valid time"));
    let end = Utc
        .from_utc_datetime(&end_date.and_hms_opt(23, 59, 59).expect("valid time"));

    let cache = HourCache::new(&args.cache_dir).context("failed to initialize hour cache")?;

    let mut all_ticks: Vec<Tick> = Vec::new();
    let mut day = start;
    while day <= end {
        if args.verbose {
            eprintln!("fetching {}", day.date_naive());
        }
        let result = fetch_day(&cache, instrument.code(), day, instrument.decimal_factor_f64()).await;
        result.each_tick(|tick| {
            if tick.timestamp >= start && tick.timestamp <= end {
                all_ticks.push(tick);
            }
            true
        });
        day += TimeDelta::days(1);
    }

    match args.format {
        OutputFormat::Csv => write_csv(args, &instrument, &all_ticks, start_date, end_date).await,
        OutputFormat::Hst => write_hst(args, &instrument, &all_ticks, start_date, end_date).await,
        OutputFormat::Fxt => write_fxt(args, &instrument, &all_ticks, start_date, end_date).await,
    }
}

async fn write_csv(
    args: &Args,
    instrument: &duka4x_types::Instrument,
    ticks: &[Tick],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<()> {
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(csv_filename(instrument.code(), start_date, end_date)));

    let mut transcoder = CsvTranscoder::create(path.clone(), instrument.clone(), args.header)
        .await
        .with_context(|| format!("creating CSV output: {}", path.display()))?;

    transcoder.pack_ticks(Utc::now(), ticks.to_vec()).await?;
    transcoder.finish().await?;

    if args.verbose {
        eprintln!("wrote {} ticks to {}", ticks.len(), path.display());
    }
    Ok(())
}

async fn write_hst(
    args: &Args,
    instrument: &duka4x_types::Instrument,
    ticks: &[Tick],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<()> {
    let timeframes = parse_timeframes(&args.timeframe)?;
    let time_sign = current_epoch_seconds();
    let timeframe_count = timeframes.len();

    for timeframe in timeframes {
        let path = output_path_for(
            args,
            &hst_filename(instrument.code(), timeframe.minutes()),
            timeframe_count,
        );

        let mut transcoder = HstTranscoder::create(
            path.clone(),
            instrument.code(),
            timeframe.minutes(),
            u32::try_from(instrument.price_precision()).unwrap_or(5),
            time_sign,
        )
        .await
        .with_context(|| format!("creating HST output: {}", path.display()))?;

        for batch in batch_ticks(ticks, timeframe) {
            transcoder.pack_ticks(batch.bar_start, batch.ticks).await?;
        }
        transcoder.finish().await?;

        if args.verbose {
            eprintln!("wrote {} ({} .. {})", path.display(), start_date, end_date);
        }
    }
    Ok(())
}

async fn write_fxt(
    args: &Args,
    instrument: &duka4x_types::Instrument,
    ticks: &[Tick],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<()> {
    let timeframes = parse_timeframes(&args.timeframe)?;
    let params = FxtParams {
        spread: args.spread,
        digits: u32::try_from(instrument.price_precision()).unwrap_or(5),
        leverage: 100,
        model: args.model.into(),
    };
    let model_id = args.model as u32;
    let timeframe_count = timeframes.len();

    for timeframe in timeframes {
        let path = output_path_for(
            args,
            &fxt_filename(instrument.code(), timeframe.minutes(), model_id),
            timeframe_count,
        );

        let mut transcoder = FxtTranscoder::create(
            path.clone(),
            instrument.code(),
            timeframe.minutes(),
            instrument.decimal_factor_f64(),
            params,
        )
        .await
        .with_context(|| format!("creating FXT output: {}", path.display()))?;

        for batch in batch_ticks(ticks, timeframe) {
            transcoder.pack_ticks(batch.bar_start, batch.ticks).await?;
        }
        transcoder.finish().await?;

        if args.verbose {
            eprintln!("wrote {} ({} .. {})", path.display(), start_date, end_date);
        }
    }
    Ok(())
}

fn parse_timeframes(raw: &[String]) -> Result<Vec<Timeframe>> {
    if raw.is_empty() {
        bail!("--timeframe is required for hst/fxt output");
    }
    raw.iter()
        .map(|s| s.parse::<Timeframe>().map_err(|e| anyhow::anyhow!("{e}")))
        .collect()
}

fn output_path_for(args: &Args, default_name: &str, timeframe_count: usize) -> PathBuf {
    match &args.output {
        Some(path) if timeframe_count > 1 && path.is_dir() => path.join(default_name),
        Some(path) if timeframe_count <= 1 => path.clone(),
        Some(dir) => dir.join(default_name),
        None => PathBuf::from(default_name),
    }
}

fn current_epoch_seconds() -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let secs = Utc::now().timestamp() as u32;
    secs
}
