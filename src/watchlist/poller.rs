use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::market_data::error::FetchError;
use crate::market_data::traits::MarketApi;
use crate::market_data::types::{MarketResponse, WatchlistSnapshot};
use crate::metrics::prometheus;
use crate::state::WatchlistState;

/// Symbols shown on the dashboard.
pub const WATCHLIST: [&str; 5] = ["SPY", "AAPL", "MSFT", "GOOGL", "AMZN"];

pub const REFRESH_INTERVAL: Duration = Duration::from_millis(15_000);

/// Keeps the watchlist snapshot fresh while the dashboard is shown.
///
/// The first fetch goes out immediately, then one per `REFRESH_INTERVAL`.
/// A tick never fires while the previous fetch is still outstanding.
/// Failed refreshes keep the last good snapshot and only set `error`.
/// Dropping the poller cancels the timer and any in-flight fetch.
pub struct WatchlistPoller {
    task: JoinHandle<()>,
    state: watch::Receiver<WatchlistState>,
}

impl WatchlistPoller {
    pub fn activate(api: Arc<dyn MarketApi>) -> Self {
        let (tx, rx) = watch::channel(WatchlistState::loading());
        let task = tokio::spawn(run_poll_loop(api, tx));

        info!(symbols = %WATCHLIST.join(","), interval_ms = REFRESH_INTERVAL.as_millis() as u64, "watchlist poller activated");
        Self { task, state: rx }
    }

    pub fn state(&self) -> watch::Receiver<WatchlistState> {
        self.state.clone()
    }

    pub fn current(&self) -> WatchlistState {
        self.state.borrow().clone()
    }
}

impl Drop for WatchlistPoller {
    fn drop(&mut self) {
        self.task.abort();
        debug!("watchlist poller deactivated");
    }
}

async fn run_poll_loop(api: Arc<dyn MarketApi>, tx: watch::Sender<WatchlistState>) {
    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
    // a slow fetch pushes the schedule back instead of bunching ticks
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        prometheus::record_fetch_issued(prometheus::MARKET_ENDPOINT);
        let outcome = api.market(&WATCHLIST).await;
        let now = Utc::now();
        tx.send_modify(|state| apply_outcome(state, outcome, now));
    }
}

fn apply_outcome(
    state: &mut WatchlistState,
    outcome: Result<MarketResponse, FetchError>,
    now: DateTime<Utc>,
) {
    match outcome {
        Ok(response) => {
            prometheus::record_fetch_outcome(prometheus::MARKET_ENDPOINT, "ok");
            debug!(tickers = response.tickers.len(), "watchlist refreshed");
            state.data = Some(WatchlistSnapshot::from_response(response, now));
            state.error = None;
        }
        Err(err) => {
            prometheus::record_fetch_outcome(prometheus::MARKET_ENDPOINT, err.kind());
            warn!(error = %err, stale = state.data.is_some(), "watchlist refresh failed");
            // last good snapshot stays visible under the error
            state.error = Some(err.to_string());
        }
    }
    state.loading = false;
}
