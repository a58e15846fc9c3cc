use std::collections::HashMap;

use tracing::{info, warn};

use crate::chart::traits::{ChartContainer, ChartHandle, ChartSink, ChartTheme};
use crate::market_data::types::OhlcPoint;

/// Headless `ChartSink` that reports what would be drawn through tracing.
#[derive(Debug, Default)]
pub struct TracingChartSink {
    next_id: u64,
    charts: HashMap<ChartHandle, String>,
}

impl TracingChartSink {
    fn container(&self, handle: ChartHandle) -> Option<&str> {
        let container = self.charts.get(&handle).map(String::as_str);
        if container.is_none() {
            warn!(handle = handle.0, "unknown chart handle");
        }
        container
    }
}

impl ChartSink for TracingChartSink {
    fn create(&mut self, container: &ChartContainer, theme: &ChartTheme) -> ChartHandle {
        self.next_id += 1;
        let handle = ChartHandle(self.next_id);
        self.charts.insert(handle, container.id.clone());
        info!(
            handle = handle.0,
            container = %container.id,
            width = container.width,
            height = container.height,
            background = theme.background,
            "chart created"
        );
        handle
    }

    fn set_series(&mut self, handle: ChartHandle, points: &[OhlcPoint]) {
        let Some(container) = self.container(handle) else {
            return;
        };
        let first = points.first().map(|p| p.time.unix_seconds());
        let last = points.last().map(|p| p.time.unix_seconds());
        let last_close = points.last().map(|p| p.close);
        info!(container, bars = points.len(), ?first, ?last, ?last_close, "candlestick series set");
    }

    fn fit_content(&mut self, handle: ChartHandle) {
        if let Some(container) = self.container(handle) {
            info!(container, "time axis fitted");
        }
    }

    fn resize(&mut self, handle: ChartHandle, width: u32) {
        if let Some(container) = self.container(handle) {
            info!(container, width, "chart resized");
        }
    }

    fn dispose(&mut self, handle: ChartHandle) {
        if let Some(container) = self.charts.remove(&handle) {
            info!(container = %container, handle = handle.0, "chart disposed");
        } else {
            warn!(handle = handle.0, "dispose of unknown chart handle");
        }
    }
}
