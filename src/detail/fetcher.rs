use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{Id, JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::market_data::error::FetchError;
use crate::market_data::timeframe::Timeframe;
use crate::market_data::traits::MarketApi;
use crate::market_data::types::{HistoricalResponse, normalize_series};
use crate::metrics::prometheus;
use crate::state::DetailState;

/// The inputs a historical fetch depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetailQuery {
    pub symbol: String,
    pub timeframe: Timeframe,
}

/// Fetches the historical series for the current symbol and timeframe.
///
/// Every change to either input issues one new request and supersedes the
/// previous one: a response is applied only if its sequence number is still
/// the latest when it arrives. Superseded requests run to completion and
/// are dropped. Failures clear the series; an empty series is not an error.
pub struct DetailFetcher {
    symbol: watch::Sender<String>,
    state: watch::Receiver<DetailState>,
    task: JoinHandle<()>,
}

type Completed = (u64, DetailQuery, Result<HistoricalResponse, FetchError>);

impl DetailFetcher {
    pub fn activate(
        api: Arc<dyn MarketApi>,
        symbol: impl Into<String>,
        timeframe: watch::Receiver<Timeframe>,
    ) -> Self {
        let (symbol_tx, symbol_rx) = watch::channel(symbol.into());
        let (state_tx, state_rx) = watch::channel(DetailState::loading());
        let task = tokio::spawn(run_fetch_loop(api, symbol_rx, timeframe, state_tx));

        Self {
            symbol: symbol_tx,
            state: state_rx,
            task,
        }
    }

    /// Returns whether the symbol changed.
    pub fn set_symbol(&self, symbol: &str) -> bool {
        self.symbol.send_if_modified(|current| {
            if current == symbol {
                return false;
            }
            *current = symbol.to_string();
            true
        })
    }

    pub fn symbol(&self) -> String {
        self.symbol.borrow().clone()
    }

    pub fn state(&self) -> watch::Receiver<DetailState> {
        self.state.clone()
    }

    pub fn current(&self) -> DetailState {
        self.state.borrow().clone()
    }
}

impl Drop for DetailFetcher {
    fn drop(&mut self) {
        // aborting the loop drops its JoinSet, which aborts in-flight requests
        self.task.abort();
        debug!("detail fetcher deactivated");
    }
}

struct FetchLoop {
    api: Arc<dyn MarketApi>,
    state: watch::Sender<DetailState>,
    in_flight: JoinSet<Completed>,
    seq: u64,
    latest_task: Option<Id>,
    active: Option<DetailQuery>,
}

impl FetchLoop {
    fn issue(&mut self, query: DetailQuery) {
        if self.active.as_ref() == Some(&query) {
            return;
        }

        self.seq += 1;
        let issued = self.seq;
        info!(
            seq = issued,
            symbol = %query.symbol,
            period = %query.timeframe.period,
            interval = %query.timeframe.interval,
            "fetching historical data"
        );
        prometheus::record_fetch_issued(prometheus::HISTORICAL_ENDPOINT);

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let api = self.api.clone();
        let request = query.clone();
        let task = self.in_flight.spawn(async move {
            let outcome = api.historical(&request.symbol, request.timeframe).await;
            (issued, request, outcome)
        });
        self.latest_task = Some(task.id());
        self.active = Some(query);
    }

    fn complete(&mut self, (issued, query, outcome): Completed) {
        if issued != self.seq {
            debug!(seq = issued, latest = self.seq, symbol = %query.symbol, "discarding superseded response");
            prometheus::record_stale_discard("detail");
            return;
        }

        self.state.send_modify(|state| {
            match outcome {
                Ok(response) => {
                    prometheus::record_fetch_outcome(prometheus::HISTORICAL_ENDPOINT, "ok");
                    let points = normalize_series(response.data);
                    debug!(symbol = %query.symbol, bars = points.len(), "historical data applied");
                    state.data = Some(points);
                    state.error = None;
                }
                Err(err) => {
                    prometheus::record_fetch_outcome(prometheus::HISTORICAL_ENDPOINT, err.kind());
                    warn!(symbol = %query.symbol, error = %err, "historical fetch failed");
                    // never leave an old chart under an error
                    state.data = Some(Vec::new());
                    state.error = Some(err.to_string());
                }
            }
            state.loading = false;
        });
    }

    /// A request task died without a result. Only the latest one matters.
    fn abandon(&mut self, err: JoinError) {
        if self.latest_task != Some(err.id()) {
            debug!(error = %err, "superseded historical fetch task failed");
            return;
        }

        prometheus::record_fetch_outcome(prometheus::HISTORICAL_ENDPOINT, "panic");
        warn!(error = %err, "historical fetch task failed");
        self.state.send_modify(|state| {
            state.data = Some(Vec::new());
            state.error = Some("Request failed unexpectedly".to_string());
            state.loading = false;
        });
    }
}

async fn run_fetch_loop(
    api: Arc<dyn MarketApi>,
    mut symbol: watch::Receiver<String>,
    mut timeframe: watch::Receiver<Timeframe>,
    state: watch::Sender<DetailState>,
) {
    let mut fetches = FetchLoop {
        api,
        state,
        in_flight: JoinSet::new(),
        seq: 0,
        latest_task: None,
        active: None,
    };

    let mut symbol_open = true;
    let mut timeframe_open = true;

    loop {
        let query = DetailQuery {
            symbol: symbol.borrow_and_update().clone(),
            timeframe: *timeframe.borrow_and_update(),
        };
        fetches.issue(query);

        // wait for the next input change, applying responses meanwhile
        loop {
            tokio::select! {
                changed = symbol.changed(), if symbol_open => {
                    if changed.is_ok() {
                        break;
                    }
                    symbol_open = false;
                }
                changed = timeframe.changed(), if timeframe_open => {
                    if changed.is_ok() {
                        break;
                    }
                    timeframe_open = false;
                }
                Some(joined) = fetches.in_flight.join_next() => {
                    match joined {
                        Ok(completed) => fetches.complete(completed),
                        Err(err) => fetches.abandon(err),
                    }
                }
                else => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::detail::selector::TimeframeSelector;
    use crate::market_data::timeframe::{Interval, Period};
    use crate::market_data::types::MarketResponse;
    use crate::testing::{FakeApi, daily_bars, historical_response};

    const MONTH_DAILY: Timeframe = Timeframe { period: Period::OneMonth, interval: Interval::OneDay };
    const QUARTER_DAILY: Timeframe = Timeframe { period: Period::ThreeMonths, interval: Interval::OneDay };
    const YEAR_WEEKLY: Timeframe = Timeframe { period: Period::OneYear, interval: Interval::OneWeek };

    #[tokio::test(start_paused = true)]
    async fn fetches_on_activation_with_loading() {
        let api = FakeApi::new();
        api.set_historical("AAPL", MONTH_DAILY, Duration::from_millis(50), Ok(historical_response(daily_bars(3, 100.0))));
        let selector = TimeframeSelector::default();

        let fetcher = DetailFetcher::activate(api.clone(), "AAPL", selector.subscribe());
        assert!(fetcher.current().loading);

        let mut rx = fetcher.state();
        let state = rx.wait_for(|s| !s.loading).await.unwrap().clone();
        assert_eq!(state.error, None);
        assert_eq!(state.data.unwrap().len(), 3);
        assert_eq!(api.historical_calls(), vec![("AAPL".to_string(), MONTH_DAILY)]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_series_is_not_an_error() {
        let api = FakeApi::new();
        api.set_historical("AAPL", MONTH_DAILY, Duration::ZERO, Ok(historical_response(vec![])));
        let selector = TimeframeSelector::default();

        let fetcher = DetailFetcher::activate(api.clone(), "AAPL", selector.subscribe());
        let mut rx = fetcher.state();
        let state = rx.wait_for(|s| !s.loading).await.unwrap().clone();
        assert_eq!(state.error, None);
        assert_eq!(state.data, Some(vec![]));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_clears_series_and_reports_status() {
        let api = FakeApi::new();
        api.set_historical("AAPL", MONTH_DAILY, Duration::ZERO, Ok(historical_response(daily_bars(3, 1.0))));
        api.set_historical("AAPL", YEAR_WEEKLY, Duration::ZERO, Err(FetchError::status_with_body(500, "not json")));
        let selector = TimeframeSelector::default();

        let fetcher = DetailFetcher::activate(api.clone(), "AAPL", selector.subscribe());
        let mut rx = fetcher.state();
        rx.wait_for(|s| !s.loading).await.unwrap();

        selector.select_period(Period::OneYear);
        selector.select_interval(Interval::OneWeek);
        let state = rx.wait_for(|s| !s.loading && s.error.is_some()).await.unwrap().clone();
        assert_eq!(state.error.as_deref(), Some("HTTP 500"));
        assert_eq!(state.data, Some(vec![]));
    }

    #[tokio::test(start_paused = true)]
    async fn refetch_sets_loading_and_clears_error() {
        let api = FakeApi::new();
        api.set_historical("AAPL", MONTH_DAILY, Duration::ZERO, Err(FetchError::status(404)));
        api.set_historical("AAPL", QUARTER_DAILY, Duration::from_secs(1), Ok(historical_response(daily_bars(2, 1.0))));
        let selector = TimeframeSelector::default();

        let fetcher = DetailFetcher::activate(api.clone(), "AAPL", selector.subscribe());
        let mut rx = fetcher.state();
        rx.wait_for(|s| s.error.is_some()).await.unwrap();

        selector.select_period(Period::ThreeMonths);
        let pending = rx.wait_for(|s| s.loading).await.unwrap().clone();
        assert_eq!(pending.error, None);

        let done = rx.wait_for(|s| !s.loading).await.unwrap().clone();
        assert_eq!(done.data.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn last_selection_wins_over_late_responses() {
        let api = FakeApi::new();
        api.set_historical("AAPL", MONTH_DAILY, Duration::from_millis(300), Ok(historical_response(daily_bars(1, 1.0))));
        api.set_historical("AAPL", QUARTER_DAILY, Duration::from_millis(200), Ok(historical_response(daily_bars(2, 2.0))));
        api.set_historical("AAPL", YEAR_WEEKLY, Duration::from_millis(50), Ok(historical_response(daily_bars(3, 3.0))));
        let selector = TimeframeSelector::default();

        let fetcher = DetailFetcher::activate(api.clone(), "AAPL", selector.subscribe());
        tokio::time::sleep(Duration::from_millis(10)).await;
        selector.select_period(Period::ThreeMonths);
        tokio::time::sleep(Duration::from_millis(10)).await;
        selector.select_period(Period::OneYear);
        selector.select_interval(Interval::OneWeek);

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(api.historical_calls().len(), 3);
        let state = fetcher.current();
        assert!(!state.loading);
        let data = state.data.unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[0].close, 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn reselecting_active_timeframe_does_not_refetch() {
        let api = FakeApi::new();
        let selector = TimeframeSelector::default();
        let fetcher = DetailFetcher::activate(api.clone(), "MSFT", selector.subscribe());
        let mut rx = fetcher.state();
        rx.wait_for(|s| !s.loading).await.unwrap();

        selector.select_period(Period::OneMonth);
        selector.select_interval(Interval::OneDay);
        assert!(!fetcher.set_symbol("MSFT"));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(api.historical_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn symbol_change_refetches() {
        let api = FakeApi::new();
        let selector = TimeframeSelector::default();
        let fetcher = DetailFetcher::activate(api.clone(), "MSFT", selector.subscribe());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(fetcher.set_symbol("GOOGL"));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let symbols: Vec<String> = api.historical_calls().into_iter().map(|(s, _)| s).collect();
        assert_eq!(symbols, ["MSFT", "GOOGL"]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_state_change_after_deactivation() {
        let api = FakeApi::new();
        api.set_historical("AAPL", MONTH_DAILY, Duration::from_secs(1), Ok(historical_response(daily_bars(3, 1.0))));
        let selector = TimeframeSelector::default();

        let fetcher = DetailFetcher::activate(api.clone(), "AAPL", selector.subscribe());
        let rx = fetcher.state();
        tokio::time::sleep(Duration::from_millis(100)).await;

        drop(fetcher);
        selector.select_period(Period::OneYear);
        tokio::time::sleep(Duration::from_secs(5)).await;

        let state = rx.borrow().clone();
        assert!(state.loading);
        assert_eq!(state.data, None);
        assert!(rx.has_changed().is_err());
        assert_eq!(api.historical_calls().len(), 1);
    }

    /// Client whose historical call panics for one symbol and defers to a
    /// fake for the rest.
    struct PanicsOn {
        symbol: &'static str,
        inner: Arc<FakeApi>,
    }

    #[async_trait::async_trait]
    impl MarketApi for PanicsOn {
        async fn market(&self, symbols: &[&str]) -> Result<MarketResponse, FetchError> {
            self.inner.market(symbols).await
        }

        async fn historical(
            &self,
            symbol: &str,
            timeframe: Timeframe,
        ) -> Result<HistoricalResponse, FetchError> {
            if symbol == self.symbol {
                tokio::time::sleep(Duration::from_millis(20)).await;
                panic!("client bug for {symbol}");
            }
            self.inner.historical(symbol, timeframe).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_latest_request_ends_loading_with_error() {
        let api = Arc::new(PanicsOn { symbol: "BAD", inner: FakeApi::new() });
        let selector = TimeframeSelector::default();

        let fetcher = DetailFetcher::activate(api, "BAD", selector.subscribe());
        let mut rx = fetcher.state();
        let state = rx.wait_for(|s| !s.loading).await.unwrap().clone();

        assert_eq!(state.error.as_deref(), Some("Request failed unexpectedly"));
        assert_eq!(state.data, Some(vec![]));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_superseded_request_is_ignored() {
        let inner = FakeApi::new();
        inner.set_historical("AAPL", MONTH_DAILY, Duration::from_millis(100), Ok(historical_response(daily_bars(2, 1.0))));
        let api = Arc::new(PanicsOn { symbol: "BAD", inner });
        let selector = TimeframeSelector::default();

        let fetcher = DetailFetcher::activate(api, "BAD", selector.subscribe());
        tokio::time::sleep(Duration::from_millis(5)).await;
        fetcher.set_symbol("AAPL");

        tokio::time::sleep(Duration::from_millis(50)).await;
        let pending = fetcher.current();
        assert!(pending.loading);
        assert_eq!(pending.error, None);

        let mut rx = fetcher.state();
        let state = rx.wait_for(|s| !s.loading).await.unwrap().clone();
        assert_eq!(state.error, None);
        assert_eq!(state.data.unwrap().len(), 2);
    }
}
