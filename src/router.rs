use std::sync::Arc;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use tracing::{info, warn};

use crate::chart::traits::SharedSink;
use crate::chart::viewport::Viewport;
use crate::detail::view::DetailView;
use crate::market_data::traits::MarketApi;
use crate::watchlist::poller::WatchlistPoller;

/// Characters escaped when a symbol is written back into a path segment.
const SEGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'/').add(b'%').add(b'?').add(b'#');

/// Client-side navigation target. `Ticker` holds the decoded symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Watchlist,
    Ticker(String),
    NotFound(String),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Watchlist,
            ["ticker", symbol] => {
                Route::Ticker(percent_decode_str(symbol).decode_utf8_lossy().into_owned())
            }
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Watchlist => "/".to_string(),
            Route::Ticker(symbol) => format!("/ticker/{}", utf8_percent_encode(symbol, SEGMENT)),
            Route::NotFound(path) => path.clone(),
        }
    }
}

pub enum ActiveView {
    Watchlist(WatchlistPoller),
    Detail(DetailView),
}

/// Owns whichever view the current route shows. Navigating tears the old
/// view down (timers, fetches, chart) before the new one starts.
pub struct ViewHost {
    api: Arc<dyn MarketApi>,
    sink: SharedSink,
    viewport: Viewport,
    route: Option<Route>,
    active: Option<ActiveView>,
}

impl ViewHost {
    pub fn new(api: Arc<dyn MarketApi>, sink: SharedSink, viewport: Viewport) -> Self {
        Self {
            api,
            sink,
            viewport,
            route: None,
            active: None,
        }
    }

    /// Shows the view for `path`. Unknown paths fall back to the watchlist.
    pub fn navigate(&mut self, path: &str) -> &ActiveView {
        let route = match Route::parse(path) {
            Route::NotFound(path) => {
                warn!(path = %path, "no view for path, showing watchlist");
                Route::Watchlist
            }
            route => route,
        };

        if self.route.as_ref() != Some(&route) || self.active.is_none() {
            // drop the old view before the new one starts fetching
            self.active = None;
            info!(path = %route.path(), "navigating");

            let view = match &route {
                Route::Ticker(symbol) => ActiveView::Detail(DetailView::activate(
                    self.api.clone(),
                    self.sink.clone(),
                    self.viewport.clone(),
                    symbol.clone(),
                )),
                _ => ActiveView::Watchlist(WatchlistPoller::activate(self.api.clone())),
            };
            self.route = Some(route);
            self.active = Some(view);
        }

        self.active
            .get_or_insert_with(|| ActiveView::Watchlist(WatchlistPoller::activate(self.api.clone())))
    }

    /// The detail page's back button.
    pub fn back(&mut self) -> &ActiveView {
        self.navigate("/")
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn active(&self) -> Option<&ActiveView> {
        self.active.as_ref()
    }
}
