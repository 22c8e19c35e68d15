//! CSV file market-data adapter.
//!
//! Reads `<SYMBOL>.csv` histories and a shared `reference.csv` from one
//! directory. The reference table is loaded once and cached.

use crate::domain::error::EquiscoreError;
use crate::domain::market::MarketReference;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::market_data_port::MarketDataPort;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::OnceCell;

pub const REFERENCE_FILE: &str = "reference.csv";

#[derive(Debug, Deserialize)]
struct BarRecord {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

pub struct CsvAdapter {
    base_path: PathBuf,
    references: OnceCell<HashMap<String, MarketReference>>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            references: OnceCell::new(),
        }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    async fn load_references(&self) -> Result<HashMap<String, MarketReference>, EquiscoreError> {
        let path = self.base_path.join(REFERENCE_FILE);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            EquiscoreError::Retrieval {
                symbol: "*".to_string(),
                reason: format!("failed to read {}: {}", path.display(), e),
            }
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut references = HashMap::new();
        for (line, result) in rdr.deserialize::<MarketReference>().enumerate() {
            let mut reference = result.map_err(|e| EquiscoreError::Retrieval {
                symbol: "*".to_string(),
                reason: format!("{} row {}: {}", REFERENCE_FILE, line + 1, e),
            })?;
            reference.symbol = reference.symbol.trim().to_uppercase();
            references.insert(reference.symbol.clone(), reference);
        }
        Ok(references)
    }
}

fn parse_bars(symbol: &str, content: &str) -> Result<Vec<OhlcvBar>, EquiscoreError> {
    let retrieval = |reason: String| EquiscoreError::Retrieval {
        symbol: symbol.to_string(),
        reason,
    };

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut bars = Vec::new();
    for result in rdr.deserialize::<BarRecord>() {
        let record = result.map_err(|e| retrieval(format!("CSV parse error: {e}")))?;
        let date = NaiveDate::parse_from_str(record.date.trim(), "%Y-%m-%d")
            .map_err(|e| retrieval(format!("invalid date '{}': {e}", record.date)))?;
        bars.push(OhlcvBar {
            symbol: symbol.to_string(),
            date,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

#[async_trait]
impl MarketDataPort for CsvAdapter {
    async fn get_history(
        &self,
        symbol: &str,
        lookback: usize,
    ) -> Result<Vec<OhlcvBar>, EquiscoreError> {
        let path = self.csv_path(symbol);
        let content =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| EquiscoreError::Retrieval {
                    symbol: symbol.to_string(),
                    reason: format!("failed to read {}: {}", path.display(), e),
                })?;

        let mut bars = parse_bars(symbol, &content)?;
        if bars.len() > lookback {
            bars.drain(..bars.len() - lookback);
        }
        Ok(bars)
    }

    async fn get_reference(&self, symbol: &str) -> Result<MarketReference, EquiscoreError> {
        let references = self
            .references
            .get_or_try_init(|| self.load_references())
            .await?;
        references
            .get(symbol)
            .cloned()
            .ok_or_else(|| EquiscoreError::Retrieval {
                symbol: symbol.to_string(),
                reason: format!("no row in {REFERENCE_FILE}"),
            })
    }
}
