pub mod fetch_state;

pub use fetch_state::{DetailState, FetchState, WatchlistState};
