//! Instrument registry for duka4x.
//!
//! Loads the vendor's instrument metadata table (decimal factors, earliest
//! available dates) from a well-known URL, lazily and once per process. The
//! table is guarded by a readers-writer lock so that concurrent lookups
//! never block each other, and a forced reload swaps both lookup maps
//! atomically.
//!
//! # Example
//!
//! ```no_run
//! # async fn run() {
//! use duka4x_instruments::InstrumentRegistry;
//!
//! let registry = InstrumentRegistry::global();
//! if let Some(instrument) = registry.get("eurusd").await {
//!     println!("{}: {}", instrument.name(), instrument.decimal_factor());
//! }
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use duka4x_types::Instrument;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

/// The vendor mirror this registry loads its instrument table from.
///
/// Ported from `go-duka`'s `api/instrument` package, which in turn credits
/// `dukascopy-node`'s generated metadata table.
pub const METADATA_URL: &str = "https://raw.githubusercontent.com/Leo4815162342/dukascopy-tools/master/packages/dukascopy-node/src/utils/instrument-meta-data/generated/instrument-meta-data.json";

/// Errors that can occur while loading the instrument table.
#[derive(Error, Debug)]
pub enum InstrumentError {
    /// The HTTP request to the metadata mirror failed.
    #[error("failed to fetch instrument metadata: {0}")]
    Request(#[from] reqwest::Error),
    /// The response body was not valid instrument metadata JSON.
    #[error("failed to parse instrument metadata: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct InstrumentJson {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "decimalFactor")]
    decimal_factor: u32,
    #[serde(rename = "startDayForMinuteCandles", default)]
    start_day_for_minute_candles: Option<DateTime<Utc>>,
    #[serde(rename = "startYearForDailyCandles", default)]
    start_year_for_daily_candles: Option<DateTime<Utc>>,
}

struct Tables {
    by_code: HashMap<String, Instrument>,
    by_name: HashMap<String, Instrument>,
}

impl Tables {
    fn empty() -> Self {
        Self {
            by_code: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    fn from_json(raw: &str) -> Result<Self, InstrumentError> {
        let parsed: HashMap<String, InstrumentJson> = serde_json::from_str(raw)?;
        let mut by_code = HashMap::with_capacity(parsed.len());
        let mut by_name = HashMap::with_capacity(parsed.len());

        for (code, entry) in parsed {
            let instrument = Instrument::new(
                code,
                entry.name.clone(),
                entry.description,
                entry.decimal_factor,
                entry.start_day_for_minute_candles,
                entry.start_year_for_daily_candles,
            );
            by_code.insert(instrument.code().to_string(), instrument.clone());
            by_name.insert(entry.name, instrument);
        }

        Ok(Self { by_code, by_name })
    }
}

/// Process-wide registry of Dukascopy instrument metadata.
#[derive(Debug)]
pub struct InstrumentRegistry {
    tables: RwLock<Option<Tables>>,
    url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for Tables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tables")
            .field("len", &self.by_code.len())
            .finish()
    }
}

static REGISTRY: OnceLock<InstrumentRegistry> = OnceLock::new();

impl InstrumentRegistry {
    /// Returns the global instrument registry.
    ///
    /// The underlying table is not fetched until the first lookup or an
    /// explicit [`InstrumentRegistry::reload`].
    #[must_use]
    pub fn global() -> &'static Self {
        REGISTRY.get_or_init(|| Self::new(METADATA_URL))
    }

    fn new(url: impl Into<String>) -> Self {
        Self {
            tables: RwLock::new(None),
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Looks up an instrument by its uppercased code.
    ///
    /// Triggers the one-shot lazy load on first call. A failed load leaves
    /// the table empty rather than propagating an error: callers simply see
    /// "not found".
    pub async fn get(&self, code: &str) -> Option<Instrument> {
        self.ensure_loaded().await;
        let guard = self.tables.read().await;
        guard
            .as_ref()
            .and_then(|t| t.by_code.get(&code.to_uppercase()))
            .cloned()
    }

    /// Looks up an instrument by its vendor display name (case-sensitive).
    pub async fn get_by_name(&self, name: &str) -> Option<Instrument> {
        self.ensure_loaded().await;
        let guard = self.tables.read().await;
        guard.as_ref().and_then(|t| t.by_name.get(name)).cloned()
    }

    /// Forces a reload of the instrument table from the metadata URL.
    ///
    /// The two lookup maps are swapped atomically: readers never observe a
    /// half-updated table.
    pub async fn reload(&self) -> Result<(), InstrumentError> {
        let tables = self.fetch().await?;
        *self.tables.write().await = Some(tables);
        Ok(())
    }

    async fn ensure_loaded(&self) {
        if self.tables.read().await.is_some() {
            return;
        }
        let tables = self.fetch().await.unwrap_or_else(|_| Tables::empty());
        let mut guard = self.tables.write().await;
        if guard.is_none() {
            *guard = Some(tables);
        }
    }

    async fn fetch(&self) -> Result<Tables, InstrumentError> {
        let body = self.client.get(&self.url).send().await?.text().await?;
        Tables::from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "eurusd": {
            "name": "EUR/USD",
            "description": "Euro vs US Dollar",
            "decimalFactor": 100000,
            "startDayForMinuteCandles": "2003-05-05T00:00:00Z",
            "startYearForDailyCandles": "2003-05-05T00:00:00Z"
        },
        "usdjpy": {
            "name": "USD/JPY",
            "description": "US Dollar vs Japanese Yen",
            "decimalFactor": 1000,
            "startDayForMinuteCandles": "2003-05-05T00:00:00Z",
            "startYearForDailyCandles": "2003-05-05T00:00:00Z"
        }
    }"#;

    #[test]
    fn test_tables_from_json() {
        let tables = Tables::from_json(SAMPLE).unwrap();
        assert_eq!(tables.by_code.len(), 2);
        let eurusd = tables.by_code.get("EURUSD").unwrap();
        assert_eq!(eurusd.decimal_factor(), 100_000);
        assert_eq!(tables.by_name.get("EUR/USD").unwrap().code(), "EURUSD");
    }

    #[test]
    fn test_tables_empty() {
        let tables = Tables::empty();
        assert!(tables.by_code.is_empty());
        assert!(tables.by_name.is_empty());
    }
}
