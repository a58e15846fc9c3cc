use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use market_viewer::chart::{SharedSink, TracingChartSink, Viewport};
use market_viewer::config::Config;
use market_viewer::detail::DetailDisplay;
use market_viewer::market_data::MarketApi;
use market_viewer::market_data::adapters::HttpMarketApi;
use market_viewer::metrics;
use market_viewer::router::{ActiveView, ViewHost};
use market_viewer::state::{DetailState, WatchlistState};
use market_viewer::watchlist::WatchlistDisplay;

fn init_tracing(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .init();
}

/// Logs the dashboard every time the watchlist state changes.
async fn report_watchlist(mut state: watch::Receiver<WatchlistState>) {
    loop {
        let dashboard = WatchlistDisplay::from_state(&state.borrow_and_update());
        info!("\n{dashboard}");
        if state.changed().await.is_err() {
            break;
        }
    }
}

/// Logs the detail page status every time the historical state changes.
async fn report_detail(symbol: String, mut state: watch::Receiver<DetailState>) {
    loop {
        let status = DetailDisplay::from_state(&state.borrow_and_update());
        info!(symbol = %symbol, "{status}");
        if state.changed().await.is_err() {
            break;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config);

    if let Some(port) = config.metrics_port {
        metrics::init_metrics_server(port)?;
        info!(port, "metrics exporter listening");
    }

    info!(api = %config.api_base_url, path = %config.start_path, "market-viewer starting");

    let api: Arc<dyn MarketApi> = Arc::new(HttpMarketApi::new(config.api_base_url.clone())?);
    let sink: SharedSink = Arc::new(Mutex::new(TracingChartSink::default()));
    let viewport = Viewport::new(config.viewport_width);

    let mut host = ViewHost::new(api, sink, viewport);
    let reporter = match host.navigate(&config.start_path) {
        ActiveView::Watchlist(poller) => tokio::spawn(report_watchlist(poller.state())),
        ActiveView::Detail(view) => {
            tokio::spawn(report_detail(view.symbol().to_string(), view.state()))
        }
    };

    tokio::select! {
        res = reporter => {
            if let Err(err) = res {
                warn!(error = %err, "reporter task panicked");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl-C, shutting down");
        }
    }

    Ok(())
}
