use thiserror::Error;

use crate::market_data::types::ErrorBody;

/// Everything that can go wrong fetching from the market backend.
/// Components turn these into their own `error` string; nothing escalates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// No HTTP response at all (connect failure, timeout, reset).
    #[error("{0}")]
    Transport(String),

    /// Non-2xx status. `message` is `HTTP <status>` unless the body said more.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// 2xx response whose body did not have the expected shape.
    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Status error whose message is the bare status code.
    pub fn status(status: u16) -> Self {
        FetchError::Status {
            status,
            message: format!("HTTP {status}"),
        }
    }

    /// Status error refined by a structured `{ "error": ... }` body.
    /// Non-JSON bodies (proxy error pages) fall back to `HTTP <status>`.
    pub fn status_with_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody { error: Some(message) }) if !message.trim().is_empty() => {
                FetchError::Status { status, message }
            }
            _ => FetchError::status(status),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Decode(_) => "decode",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}
