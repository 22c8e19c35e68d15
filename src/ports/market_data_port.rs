//! Market data port trait.

use crate::domain::error::EquiscoreError;
use crate::domain::market::MarketReference;
use crate::domain::ohlcv::OhlcvBar;
use async_trait::async_trait;

/// Source of price history and static reference fields.
///
/// Both calls are fallible per symbol; a failure drops that symbol from
/// the current pass without affecting the others.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// The most recent `lookback` bars, oldest first.
    async fn get_history(
        &self,
        symbol: &str,
        lookback: usize,
    ) -> Result<Vec<OhlcvBar>, EquiscoreError>;

    async fn get_reference(&self, symbol: &str) -> Result<MarketReference, EquiscoreError>;
}
