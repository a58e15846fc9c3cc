use strum::IntoEnumIterator;
use tokio::sync::watch;
use tracing::debug;

use crate::market_data::timeframe::{Interval, Period, Timeframe};

/// Holds the detail view's period/interval choice.
///
/// Subscribers are notified only when a value actually changes, so
/// re-selecting the active button never triggers a refetch.
#[derive(Debug)]
pub struct TimeframeSelector {
    tx: watch::Sender<Timeframe>,
}

impl TimeframeSelector {
    pub fn new(initial: Timeframe) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> Timeframe {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Timeframe> {
        self.tx.subscribe()
    }

    /// Returns whether the selection changed.
    pub fn select_period(&self, period: Period) -> bool {
        let changed = self.tx.send_if_modified(|tf| {
            if tf.period == period {
                return false;
            }
            tf.period = period;
            true
        });
        debug!(%period, changed, "period selected");
        changed
    }

    /// Returns whether the selection changed.
    pub fn select_interval(&self, interval: Interval) -> bool {
        let changed = self.tx.send_if_modified(|tf| {
            if tf.interval == interval {
                return false;
            }
            tf.interval = interval;
            true
        });
        debug!(%interval, changed, "interval selected");
        changed
    }

    /// Period buttons in display order, flagged when active.
    pub fn period_options(&self) -> Vec<(Period, bool)> {
        let active = self.current().period;
        Period::iter().map(|p| (p, p == active)).collect()
    }

    /// Interval buttons in display order, flagged when active.
    pub fn interval_options(&self) -> Vec<(Interval, bool)> {
        let active = self.current().interval;
        Interval::iter().map(|i| (i, i == active)).collect()
    }
}

impl Default for TimeframeSelector {
    fn default() -> Self {
        Self::new(Timeframe::default())
    }
}
