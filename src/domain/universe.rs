//! Symbol universe for a scoring pass.
//!
//! Parses symbol lists from configuration and enforces the minimum history
//! a symbol needs before it is scored.

use crate::domain::error::EquiscoreError;
use crate::domain::ohlcv::OhlcvBar;
use std::collections::HashSet;

pub const MIN_HISTORY_BARS: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub symbols: Vec<String>,
}

impl Universe {
    pub fn parse(input: &str) -> Result<Self, UniverseError> {
        Ok(Self {
            symbols: parse_symbols(input)?,
        })
    }

    pub fn count(&self) -> usize {
        self.symbols.len()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("symbol list is empty")]
    Empty,
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Err(UniverseError::Empty);
    }

    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Reject histories too short to score.
pub fn ensure_history(symbol: &str, bars: &[OhlcvBar]) -> Result<(), EquiscoreError> {
    if bars.len() < MIN_HISTORY_BARS {
        return Err(EquiscoreError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
            minimum: MIN_HISTORY_BARS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(n: usize) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| OhlcvBar {
                symbol: "TEST".into(),
                date: start + chrono::Duration::days(i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn parse_single_symbol() {
        assert_eq!(parse_symbols("AAPL").unwrap(), vec!["AAPL"]);
    }

    #[test]
    fn parse_trims_and_uppercases() {
        assert_eq!(
            parse_symbols(" aapl , msft,nvda ").unwrap(),
            vec!["AAPL", "MSFT", "NVDA"]
        );
    }

    #[test]
    fn parse_empty_token() {
        assert_eq!(parse_symbols("AAPL,,MSFT"), Err(UniverseError::EmptyToken));
        assert_eq!(parse_symbols("AAPL,"), Err(UniverseError::EmptyToken));
    }

    #[test]
    fn parse_duplicate_is_case_insensitive() {
        assert_eq!(
            parse_symbols("AAPL,msft,aapl"),
            Err(UniverseError::DuplicateSymbol("AAPL".into()))
        );
    }

    #[test]
    fn parse_blank_input() {
        assert_eq!(parse_symbols("   "), Err(UniverseError::Empty));
    }

    #[test]
    fn universe_count() {
        let universe = Universe::parse("A,B,C").unwrap();
        assert_eq!(universe.count(), 3);
    }

    #[test]
    fn history_minimum() {
        assert!(ensure_history("OK", &make_bars(30)).is_ok());
        match ensure_history("SHORT", &make_bars(29)) {
            Err(EquiscoreError::InsufficientData {
                symbol,
                bars,
                minimum,
            }) => {
                assert_eq!(symbol, "SHORT");
                assert_eq!(bars, 29);
                assert_eq!(minimum, MIN_HISTORY_BARS);
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }
}
