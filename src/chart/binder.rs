use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chart::traits::{
    CHART_HEIGHT, ChartContainer, ChartHandle, ChartTheme, SharedSink, lock_sink,
};
use crate::chart::viewport::{ResizeSubscription, Viewport};
use crate::market_data::types::OhlcPoint;
use crate::metrics::prometheus;

/// Binds an OHLC series to one live chart instance at a time.
///
/// Lifecycle: uninitialized → mounted → (data replaced → re-rendered)* → unmounted.
/// Every data change disposes the current instance and builds a fresh one,
/// along with a fresh resize subscription. Once unmounted the binder is inert.
/// Must be used inside a tokio runtime: each instance spawns its resize listener.
pub struct ChartBinder {
    sink: SharedSink,
    viewport: Viewport,
    container_id: String,
    state: BinderState,
}

enum BinderState {
    Uninitialized,
    Mounted(MountedChart),
    Unmounted,
}

struct MountedChart {
    handle: ChartHandle,
    live: Arc<AtomicBool>,
    // dropped before dispose so no resize is queued for a dead chart
    subscription: ResizeSubscription,
    listener: JoinHandle<()>,
}

impl ChartBinder {
    pub fn new(sink: SharedSink, viewport: Viewport, container_id: impl Into<String>) -> Self {
        Self {
            sink,
            viewport,
            container_id: container_id.into(),
            state: BinderState::Uninitialized,
        }
    }

    pub fn is_mounted(&self) -> bool {
        matches!(self.state, BinderState::Mounted(_))
    }

    pub fn handle(&self) -> Option<ChartHandle> {
        match &self.state {
            BinderState::Mounted(chart) => Some(chart.handle),
            _ => None,
        }
    }

    pub fn mount(&mut self, points: &[OhlcPoint]) {
        self.set_data(points);
    }

    /// Renders `points`, mounting on first use and rebuilding the chart afterwards.
    pub fn set_data(&mut self, points: &[OhlcPoint]) {
        match std::mem::replace(&mut self.state, BinderState::Unmounted) {
            BinderState::Uninitialized => {
                let chart = self.build(points);
                info!(container = %self.container_id, handle = chart.handle.0, bars = points.len(), "chart mounted");
                self.state = BinderState::Mounted(chart);
            }
            BinderState::Mounted(previous) => {
                self.release(previous);
                let chart = self.build(points);
                debug!(container = %self.container_id, handle = chart.handle.0, bars = points.len(), "chart rebuilt");
                self.state = BinderState::Mounted(chart);
            }
            BinderState::Unmounted => {
                warn!(container = %self.container_id, "data change after unmount ignored");
            }
        }
    }

    pub fn unmount(&mut self) {
        if let BinderState::Mounted(chart) =
            std::mem::replace(&mut self.state, BinderState::Unmounted)
        {
            info!(container = %self.container_id, handle = chart.handle.0, "chart unmounted");
            self.release(chart);
        }
    }

    fn build(&self, points: &[OhlcPoint]) -> MountedChart {
        let container = ChartContainer {
            id: self.container_id.clone(),
            width: self.viewport.width(),
            height: CHART_HEIGHT,
        };

        let handle = {
            let mut sink = lock_sink(&self.sink);
            let handle = sink.create(&container, &ChartTheme::dark());
            sink.set_series(handle, points);
            sink.fit_content(handle);
            handle
        };
        prometheus::record_chart_created();

        let live = Arc::new(AtomicBool::new(true));
        let (subscription, widths) = self.viewport.subscribe();
        let listener = tokio::spawn(follow_viewport(
            self.sink.clone(),
            handle,
            live.clone(),
            widths,
        ));

        MountedChart {
            handle,
            live,
            subscription,
            listener,
        }
    }

    fn release(&self, chart: MountedChart) {
        chart.live.store(false, Ordering::SeqCst);
        drop(chart.subscription);
        chart.listener.abort();
        lock_sink(&self.sink).dispose(chart.handle);
        prometheus::record_chart_disposed();
    }
}

impl Drop for ChartBinder {
    fn drop(&mut self) {
        self.unmount();
    }
}

async fn follow_viewport(
    sink: SharedSink,
    handle: ChartHandle,
    live: Arc<AtomicBool>,
    mut widths: mpsc::UnboundedReceiver<u32>,
) {
    while let Some(width) = widths.recv().await {
        // release() flips `live` before it takes the sink lock to dispose
        let mut engine = lock_sink(&sink);
        if !live.load(Ordering::SeqCst) {
            break;
        }
        engine.resize(handle, width);
    }
}
