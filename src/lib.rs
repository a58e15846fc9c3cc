pub mod chart;
pub mod config;
pub mod detail;
pub mod market_data;
pub mod metrics;
pub mod router;
pub mod state;
pub mod watchlist;

#[cfg(test)]
mod testing;
