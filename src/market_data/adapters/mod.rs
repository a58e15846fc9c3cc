pub mod http;

pub use http::HttpMarketApi;
