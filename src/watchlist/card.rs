use std::fmt;

use chrono::{DateTime, Local, Utc};

use crate::market_data::types::Quote;
use crate::state::WatchlistState;

/// Text content of one dashboard card.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteCard {
    pub symbol: String,
    pub price: String,
    pub volume: Option<String>,
    pub error: Option<String>,
}

impl QuoteCard {
    pub fn from_quote(quote: &Quote) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            price: format_price(quote.price),
            volume: quote.volume.map(format_volume),
            error: quote.error_message().map(str::to_string),
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for QuoteCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<6} {:>12}", self.symbol, self.price)?;
        if let Some(volume) = &self.volume {
            write!(f, "  {volume}")?;
        }
        if let Some(error) = &self.error {
            write!(f, "  [{error}]")?;
        }
        Ok(())
    }
}

/// `$512.30`, or `--` when there is no price.
pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(price) => format!("${price:.2}"),
        None => "--".to_string(),
    }
}

/// `Vol: 1,234,567`. Fractional volumes are rounded.
pub fn format_volume(volume: f64) -> String {
    format!("Vol: {}", group_thousands(volume.round() as i64))
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatchlistBody {
    /// Nothing fetched successfully yet.
    Nothing,
    Empty,
    Cards(Vec<QuoteCard>),
}

/// Everything the dashboard shows for one watchlist state.
/// The error banner and the (possibly stale) cards appear together.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchlistDisplay {
    pub loading: bool,
    pub banner: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub body: WatchlistBody,
}

impl WatchlistDisplay {
    pub fn from_state(state: &WatchlistState) -> Self {
        let body = match &state.data {
            None => WatchlistBody::Nothing,
            Some(snapshot) if snapshot.tickers.is_empty() => WatchlistBody::Empty,
            Some(snapshot) => {
                WatchlistBody::Cards(snapshot.tickers.iter().map(QuoteCard::from_quote).collect())
            }
        };

        Self {
            loading: state.loading,
            banner: state.error.as_ref().map(|err| format!("Error: {err}")),
            last_updated: state.data.as_ref().map(|s| s.last_updated),
            body,
        }
    }
}

impl fmt::Display for WatchlistDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Market Data Dashboard")?;
        if let Some(at) = self.last_updated {
            writeln!(f, "Last updated: {}", at.with_timezone(&Local).format("%H:%M:%S"))?;
        }
        if self.loading {
            writeln!(f, "Loading...")?;
        }
        if let Some(banner) = &self.banner {
            writeln!(f, "{banner}")?;
        }
        match &self.body {
            WatchlistBody::Nothing => {}
            WatchlistBody::Empty => writeln!(f, "No ticker data available")?,
            WatchlistBody::Cards(cards) => {
                for card in cards {
                    writeln!(f, "{card}")?;
                }
            }
        }
        Ok(())
    }
}
