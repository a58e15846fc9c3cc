use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::chart::binder::ChartBinder;
use crate::chart::traits::SharedSink;
use crate::chart::viewport::Viewport;
use crate::detail::fetcher::DetailFetcher;
use crate::detail::selector::TimeframeSelector;
use crate::market_data::timeframe::{Interval, Period, Timeframe};
use crate::market_data::traits::MarketApi;
use crate::market_data::types::OhlcPoint;
use crate::state::DetailState;

/// What the detail page shows below the timeframe buttons.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailDisplay {
    Loading,
    Error(String),
    Chart(Vec<OhlcPoint>),
    NoData,
}

impl DetailDisplay {
    pub fn from_state(state: &DetailState) -> Self {
        if state.loading {
            return DetailDisplay::Loading;
        }
        if let Some(error) = &state.error {
            return DetailDisplay::Error(error.clone());
        }
        match &state.data {
            Some(points) if !points.is_empty() => DetailDisplay::Chart(points.clone()),
            _ => DetailDisplay::NoData,
        }
    }

    pub fn shows_chart(&self) -> bool {
        matches!(self, DetailDisplay::Chart(_))
    }
}

impl fmt::Display for DetailDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailDisplay::Loading => write!(f, "Loading chart..."),
            DetailDisplay::Error(error) => write!(f, "Error: {error}"),
            DetailDisplay::Chart(points) => write!(f, "Chart: {} bars", points.len()),
            DetailDisplay::NoData => write!(f, "No data available for this timeframe"),
        }
    }
}

/// The mounted chart, if any. Once `closed` the slot never takes a binder
/// again, so a chart task that outlives its view cannot remount.
#[derive(Default)]
struct ChartSlot {
    binder: Option<ChartBinder>,
    closed: bool,
}

type SharedSlot = Arc<Mutex<ChartSlot>>;

fn lock_slot(slot: &SharedSlot) -> MutexGuard<'_, ChartSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The `/ticker/:symbol` page: timeframe selector, historical fetcher and chart.
///
/// The chart is mounted only while there is a series to show; loading,
/// error and empty states tear it down, as leaving the page does.
pub struct DetailView {
    symbol: String,
    selector: TimeframeSelector,
    fetcher: DetailFetcher,
    chart: SharedSlot,
    chart_task: JoinHandle<()>,
}

impl DetailView {
    pub fn activate(
        api: Arc<dyn MarketApi>,
        sink: SharedSink,
        viewport: Viewport,
        symbol: impl Into<String>,
    ) -> Self {
        let symbol = symbol.into();
        let selector = TimeframeSelector::default();
        let fetcher = DetailFetcher::activate(api, symbol.clone(), selector.subscribe());

        let chart: SharedSlot = Arc::default();
        let chart_task = tokio::spawn(drive_chart(
            fetcher.state(),
            chart.clone(),
            sink,
            viewport,
            format!("chart-{symbol}"),
        ));

        info!(symbol = %symbol, "detail view activated");
        Self {
            symbol,
            selector,
            fetcher,
            chart,
            chart_task,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.selector.current()
    }

    pub fn selector(&self) -> &TimeframeSelector {
        &self.selector
    }

    pub fn select_period(&self, period: Period) -> bool {
        self.selector.select_period(period)
    }

    pub fn select_interval(&self, interval: Interval) -> bool {
        self.selector.select_interval(interval)
    }

    pub fn state(&self) -> watch::Receiver<DetailState> {
        self.fetcher.state()
    }

    pub fn display(&self) -> DetailDisplay {
        DetailDisplay::from_state(&self.fetcher.current())
    }

    pub fn chart_mounted(&self) -> bool {
        lock_slot(&self.chart).binder.as_ref().is_some_and(ChartBinder::is_mounted)
    }
}

impl Drop for DetailView {
    fn drop(&mut self) {
        self.chart_task.abort();
        // release the chart now rather than whenever the aborted task is reaped
        let mut slot = lock_slot(&self.chart);
        slot.closed = true;
        if let Some(mut binder) = slot.binder.take() {
            binder.unmount();
        }
        drop(slot);
        debug!(symbol = %self.symbol, "detail view deactivated");
    }
}

async fn drive_chart(
    mut state: watch::Receiver<DetailState>,
    slot: SharedSlot,
    sink: SharedSink,
    viewport: Viewport,
    container_id: String,
) {
    loop {
        let display = DetailDisplay::from_state(&state.borrow_and_update());
        if !render(&slot, display, || {
            ChartBinder::new(sink.clone(), viewport.clone(), container_id.clone())
        }) {
            break;
        }

        if state.changed().await.is_err() {
            break;
        }
    }
}

/// Mounts, rebuilds or drops the chart for `display`. Returns false once
/// the view has been torn down.
fn render(
    slot: &SharedSlot,
    display: DetailDisplay,
    new_binder: impl FnOnce() -> ChartBinder,
) -> bool {
    let mut chart = lock_slot(slot);
    if chart.closed {
        return false;
    }
    match display {
        DetailDisplay::Chart(points) => {
            chart.binder.get_or_insert_with(new_binder).set_data(&points)
        }
        _ => {
            // dropping the binder unmounts it
            chart.binder.take();
        }
    }
    true
}
