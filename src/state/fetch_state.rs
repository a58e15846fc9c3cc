use crate::market_data::types::{OhlcPoint, WatchlistSnapshot};

/// Loading/error/data triple owned by each fetching component.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub loading: bool,
    pub error: Option<String>,
    pub data: Option<T>,
}

impl<T> FetchState<T> {
    /// State before the first response has been applied.
    pub fn loading() -> Self {
        Self {
            loading: true,
            error: None,
            data: None,
        }
    }
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self::loading()
    }
}

pub type WatchlistState = FetchState<WatchlistSnapshot>;

pub type DetailState = FetchState<Vec<OhlcPoint>>;
