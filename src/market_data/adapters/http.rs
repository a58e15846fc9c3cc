use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::market_data::error::FetchError;
use crate::market_data::timeframe::Timeframe;
use crate::market_data::traits::MarketApi;
use crate::market_data::types::{HistoricalResponse, MarketResponse};
use crate::metrics::prometheus;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `MarketApi` over HTTP against the viewer backend.
#[derive(Debug, Clone)]
pub struct HttpMarketApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMarketApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, &str)],
        parse_error_body: bool,
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        prometheus::record_fetch_latency_ms(endpoint, started.elapsed().as_secs_f64() * 1000.0);
        debug!(endpoint, status = status.as_u16(), bytes = body.len(), "response received");

        if !status.is_success() {
            return Err(if parse_error_body {
                FetchError::status_with_body(status.as_u16(), &body)
            } else {
                FetchError::status(status.as_u16())
            });
        }

        serde_json::from_str(&body).map_err(|err| FetchError::Decode(err.to_string()))
    }
}

#[async_trait]
impl MarketApi for HttpMarketApi {
    async fn market(&self, symbols: &[&str]) -> Result<MarketResponse, FetchError> {
        let tickers = symbols.join(",");
        // watchlist errors are reported by status alone
        self.get_json(
            prometheus::MARKET_ENDPOINT,
            "/api/market",
            &[("tickers", tickers.as_str())],
            false,
        )
        .await
    }

    async fn historical(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<HistoricalResponse, FetchError> {
        let query = [
            ("symbol", symbol),
            ("period", timeframe.period.as_str()),
            ("interval", timeframe.interval.as_str()),
        ];
        self.get_json(prometheus::HISTORICAL_ENDPOINT, "/api/historical", &query, true)
            .await
    }
}
