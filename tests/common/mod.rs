#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use equiscore::domain::error::EquiscoreError;
use equiscore::domain::market::MarketReference;
pub use equiscore::domain::ohlcv::OhlcvBar;
use equiscore::ports::market_data_port::MarketDataPort;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockMarketDataPort {
    pub references: HashMap<String, MarketReference>,
    pub histories: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub history_calls: AtomicUsize,
}

impl MockMarketDataPort {
    pub fn new() -> Self {
        Self {
            references: HashMap::new(),
            histories: HashMap::new(),
            errors: HashMap::new(),
            history_calls: AtomicUsize::new(0),
        }
    }

    /// Register a symbol with a generated 120-bar history.
    pub fn with_symbol(self, symbol: &str, sector: &str, market_cap: f64) -> Self {
        let bars = generate_bars(symbol, 120, 100.0);
        self.with_history(make_reference(symbol, sector, market_cap), bars)
    }

    pub fn with_history(mut self, reference: MarketReference, bars: Vec<OhlcvBar>) -> Self {
        self.histories.insert(reference.symbol.clone(), bars);
        self.references.insert(reference.symbol.clone(), reference);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataPort for MockMarketDataPort {
    async fn get_history(
        &self,
        symbol: &str,
        lookback: usize,
    ) -> Result<Vec<OhlcvBar>, EquiscoreError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(EquiscoreError::Retrieval {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self.histories.get(symbol).cloned().unwrap_or_default();
        let skip = bars.len().saturating_sub(lookback);
        Ok(bars.into_iter().skip(skip).collect())
    }

    async fn get_reference(&self, symbol: &str) -> Result<MarketReference, EquiscoreError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(EquiscoreError::Retrieval {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        self.references
            .get(symbol)
            .cloned()
            .ok_or_else(|| EquiscoreError::Retrieval {
                symbol: symbol.to_string(),
                reason: "unknown symbol".to_string(),
            })
    }
}

pub fn make_reference(symbol: &str, sector: &str, market_cap: f64) -> MarketReference {
    MarketReference {
        symbol: symbol.to_string(),
        price: 100.0,
        change_percent: 1.2,
        volume: 1_500_000,
        market_cap,
        sector: sector.to_string(),
        industry: "General".to_string(),
        beta: 1.0,
        pe_ratio: Some(18.0),
        dividend_yield: None,
        price_to_book: None,
        debt_to_equity: None,
    }
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000_000,
    }
}

/// Oscillating upward series, deterministic per `base`.
pub fn generate_bars(symbol: &str, n: usize, base: f64) -> Vec<OhlcvBar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let close = base + (i as f64 * 0.2).sin() * 4.0 + i as f64 * 0.1;
            OhlcvBar {
                symbol: symbol.to_string(),
                date: start + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000 + (i as i64 % 5) * 100_000,
            }
        })
        .collect()
}

pub const SECTORS: [&str; 9] = [
    "Technology",
    "Healthcare",
    "Energy",
    "Utilities",
    "Materials",
    "Industrials",
    "Real Estate",
    "Financial Services",
    "Consumer Defensive",
];
