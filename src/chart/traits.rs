use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::market_data::types::OhlcPoint;

pub const CHART_HEIGHT: u32 = 400;

/// Opaque id for one chart instance owned by a `ChartSink`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartHandle(pub u64);

/// Screen region a chart is drawn into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartContainer {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartTheme {
    pub background: &'static str,
    pub text: &'static str,
    pub grid: &'static str,
    pub border: &'static str,
    pub up: &'static str,
    pub down: &'static str,
    pub time_visible: bool,
}

impl ChartTheme {
    pub const fn dark() -> Self {
        Self {
            background: "#1a1a2e",
            text: "#eee",
            grid: "#2a2a4e",
            border: "#2a2a4e",
            up: "#4caf50",
            down: "#ff6b6b",
            time_visible: true,
        }
    }
}

impl Default for ChartTheme {
    fn default() -> Self {
        Self::dark()
    }
}

/// Rendering engine the chart binder drives.
///
/// Calls are synchronous and infallible: the engine draws into memory
/// and owns any failure reporting itself.
pub trait ChartSink: Send {
    /// Builds a chart with a single, empty candlestick series.
    fn create(&mut self, container: &ChartContainer, theme: &ChartTheme) -> ChartHandle;

    /// Replaces the candlestick series contents.
    fn set_series(&mut self, handle: ChartHandle, points: &[OhlcPoint]);

    /// Fits the time axis to the loaded bars.
    fn fit_content(&mut self, handle: ChartHandle);

    fn resize(&mut self, handle: ChartHandle, width: u32);

    fn dispose(&mut self, handle: ChartHandle);
}

pub type SharedSink = Arc<Mutex<dyn ChartSink>>;

pub fn lock_sink(sink: &SharedSink) -> MutexGuard<'_, dyn ChartSink + 'static> {
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}
