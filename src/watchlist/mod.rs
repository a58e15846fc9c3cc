pub mod card;
pub mod poller;

pub use card::{QuoteCard, WatchlistDisplay};
pub use poller::{REFRESH_INTERVAL, WATCHLIST, WatchlistPoller};
