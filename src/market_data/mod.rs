pub mod adapters;
pub mod error;
pub mod timeframe;
pub mod traits;
pub mod types;

pub use error::FetchError;
pub use timeframe::{Interval, Period, Timeframe};
pub use traits::MarketApi;
