//! Fakes shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::chart::traits::{ChartContainer, ChartHandle, ChartSink, ChartTheme};
use crate::market_data::error::FetchError;
use crate::market_data::timeframe::Timeframe;
use crate::market_data::traits::MarketApi;
use crate::market_data::types::{BarTime, HistoricalResponse, MarketResponse, OhlcPoint, Quote};

type Scripted<T> = (Duration, Result<T, FetchError>);

/// Scripted `MarketApi`. Market responses are consumed in order (the last
/// one repeats); historical responses are keyed by symbol and timeframe.
#[derive(Default)]
pub struct FakeApi {
    market_script: Mutex<VecDeque<Scripted<MarketResponse>>>,
    historical_script: Mutex<HashMap<(String, Timeframe), Scripted<HistoricalResponse>>>,
    historical_log: Mutex<Vec<(String, Timeframe)>>,
    market_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_market(&self, delay: Duration, outcome: Result<MarketResponse, FetchError>) {
        self.market_script.lock().unwrap().push_back((delay, outcome));
    }

    pub fn set_historical(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        delay: Duration,
        outcome: Result<HistoricalResponse, FetchError>,
    ) {
        self.historical_script
            .lock()
            .unwrap()
            .insert((symbol.to_string(), timeframe), (delay, outcome));
    }

    pub fn market_calls(&self) -> usize {
        self.market_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn historical_calls(&self) -> Vec<(String, Timeframe)> {
        self.historical_log.lock().unwrap().clone()
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarketApi for FakeApi {
    async fn market(&self, _symbols: &[&str]) -> Result<MarketResponse, FetchError> {
        self.market_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, outcome) = {
            let mut script = self.market_script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script
                    .front()
                    .cloned()
                    .unwrap_or((Duration::ZERO, Ok(market_response(&[]))))
            }
        };

        self.enter();
        tokio::time::sleep(delay).await;
        self.leave();
        outcome
    }

    async fn historical(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<HistoricalResponse, FetchError> {
        self.historical_log
            .lock()
            .unwrap()
            .push((symbol.to_string(), timeframe));
        let (delay, outcome) = self
            .historical_script
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), timeframe))
            .cloned()
            .unwrap_or((Duration::ZERO, Ok(historical_response(vec![]))));

        tokio::time::sleep(delay).await;
        outcome
    }
}

pub fn quote(symbol: &str, price: Option<f64>, volume: Option<f64>) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        price,
        volume,
        error: None,
        price_error: None,
    }
}

pub fn market_response(tickers: &[Quote]) -> MarketResponse {
    MarketResponse {
        timestamp: None,
        tickers: tickers.to_vec(),
    }
}

pub fn historical_response(data: Vec<OhlcPoint>) -> HistoricalResponse {
    HistoricalResponse {
        symbol: None,
        period: None,
        interval: None,
        timestamp: None,
        data,
    }
}

/// `count` daily bars starting 2024-01-01 whose closes start at `base`.
pub fn daily_bars(count: usize, base: f64) -> Vec<OhlcPoint> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..count)
        .map(|i| {
            let close = base + i as f64;
            OhlcPoint {
                time: BarTime::Date(start + chrono::Days::new(i as u64)),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: Some(1_000),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartEvent {
    Create {
        handle: ChartHandle,
        container: String,
        width: u32,
        height: u32,
        theme: ChartTheme,
    },
    SetSeries { handle: ChartHandle, points: usize },
    FitContent(ChartHandle),
    Resize { handle: ChartHandle, width: u32 },
    Dispose(ChartHandle),
}

/// `ChartSink` that records every call and panics on use of a disposed handle.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<ChartEvent>,
    live: HashSet<ChartHandle>,
    next: u64,
}

impl RecordingSink {
    pub fn live_charts(&self) -> usize {
        self.live.len()
    }

    fn assert_live(&self, handle: ChartHandle) {
        assert!(self.live.contains(&handle), "chart {handle:?} used after dispose");
    }
}

impl ChartSink for RecordingSink {
    fn create(&mut self, container: &ChartContainer, theme: &ChartTheme) -> ChartHandle {
        self.next += 1;
        let handle = ChartHandle(self.next);
        self.live.insert(handle);
        self.events.push(ChartEvent::Create {
            handle,
            container: container.id.clone(),
            width: container.width,
            height: container.height,
            theme: theme.clone(),
        });
        handle
    }

    fn set_series(&mut self, handle: ChartHandle, points: &[OhlcPoint]) {
        self.assert_live(handle);
        self.events.push(ChartEvent::SetSeries { handle, points: points.len() });
    }

    fn fit_content(&mut self, handle: ChartHandle) {
        self.assert_live(handle);
        self.events.push(ChartEvent::FitContent(handle));
    }

    fn resize(&mut self, handle: ChartHandle, width: u32) {
        self.assert_live(handle);
        self.events.push(ChartEvent::Resize { handle, width });
    }

    fn dispose(&mut self, handle: ChartHandle) {
        self.assert_live(handle);
        self.live.remove(&handle);
        self.events.push(ChartEvent::Dispose(handle));
    }
}

/// Lets spawned tasks on the current-thread runtime run until `done` holds.
pub async fn settle(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if done() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    done()
}
