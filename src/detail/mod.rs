pub mod fetcher;
pub mod selector;
pub mod view;

pub use fetcher::{DetailFetcher, DetailQuery};
pub use selector::TimeframeSelector;
pub use view::{DetailDisplay, DetailView};
