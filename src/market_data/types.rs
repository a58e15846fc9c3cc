use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Latest quote for one symbol as returned by `/api/market`.
/// Replaced wholesale on every refresh, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
    /// Older backends report price lookup failures separately.
    #[serde(default)]
    pub price_error: Option<String>,
}

impl Quote {
    /// The message a card should show, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().or(self.price_error.as_deref())
    }
}

/// Body of a successful `/api/market` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketResponse {
    #[serde(default)]
    pub timestamp: Option<String>,
    pub tickers: Vec<Quote>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchlistSnapshot {
    pub tickers: Vec<Quote>,
    /// Server-side generation time, as sent.
    pub server_timestamp: Option<String>,
    /// Client wall-clock time at which the snapshot was applied.
    pub last_updated: DateTime<Utc>,
}

impl WatchlistSnapshot {
    pub fn from_response(response: MarketResponse, last_updated: DateTime<Utc>) -> Self {
        Self {
            tickers: response.tickers,
            server_timestamp: response.timestamp,
            last_updated,
        }
    }
}

/// Bar open time. Daily and coarser bars carry a calendar date,
/// intraday bars carry Unix seconds. Equality, hashing and ordering all
/// go through `unix_seconds`, so a date equals its midnight UTC instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BarTime {
    Unix(i64),
    Date(NaiveDate),
}

impl BarTime {
    pub fn unix_seconds(&self) -> i64 {
        match self {
            BarTime::Unix(secs) => *secs,
            BarTime::Date(date) => date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp())
                .unwrap_or_default(),
        }
    }
}

impl PartialEq for BarTime {
    fn eq(&self, other: &Self) -> bool {
        self.unix_seconds() == other.unix_seconds()
    }
}

impl Eq for BarTime {}

impl Hash for BarTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unix_seconds().hash(state);
    }
}

impl Ord for BarTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.unix_seconds().cmp(&other.unix_seconds())
    }
}

impl PartialOrd for BarTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcPoint {
    pub time: BarTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<u64>,
}

/// Body of a successful `/api/historical` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalResponse {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub data: Vec<OhlcPoint>,
}

/// Error body the backend sends alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Sorts bars ascending by time and drops duplicate timestamps,
/// keeping the last bar received for each time.
pub fn normalize_series(mut points: Vec<OhlcPoint>) -> Vec<OhlcPoint> {
    let already_ordered = points.windows(2).all(|w| w[0].time < w[1].time);
    if already_ordered {
        return points;
    }

    let received = points.len();
    // stable sort keeps arrival order among equal timestamps
    points.sort_by(|a, b| a.time.cmp(&b.time));

    let mut out: Vec<OhlcPoint> = Vec::with_capacity(points.len());
    for point in points {
        match out.last_mut() {
            Some(last) if last.time == point.time => *last = point,
            _ => out.push(point),
        }
    }

    warn!(received, kept = out.len(), "historical series was out of order or had duplicates");
    out
}
