use async_trait::async_trait;

use crate::market_data::error::FetchError;
use crate::market_data::timeframe::Timeframe;
use crate::market_data::types::{HistoricalResponse, MarketResponse};

/// The two backend endpoints the viewer reads from.
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// `GET /api/market?tickers=<comma-separated>`.
    async fn market(&self, symbols: &[&str]) -> Result<MarketResponse, FetchError>;

    /// `GET /api/historical?symbol=&period=&interval=`.
    async fn historical(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<HistoricalResponse, FetchError>;
}
