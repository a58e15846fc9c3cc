use anyhow::Context;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_VIEWPORT_WIDTH: u32 = 960;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_base_url: String,
    pub metrics_port: Option<u16>,
    pub start_path: String,
    pub viewport_width: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // dotenvy loads .env, but doesn't override already-set env vars
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());
        let api_base_url =
            lookup("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let start_path = lookup("START_PATH").unwrap_or_else(|| "/".to_string());

        let metrics_port = match lookup("METRICS_PORT") {
            Some(raw) => Some(
                raw.parse::<u16>()
                    .with_context(|| format!("METRICS_PORT is not a valid port: {raw}"))?,
            ),
            None => None,
        };

        let viewport_width = match lookup("VIEWPORT_WIDTH") {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("VIEWPORT_WIDTH is not a valid width: {raw}"))?,
            None => DEFAULT_VIEWPORT_WIDTH,
        };

        Ok(Self {
            log_level,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            metrics_port,
            start_path,
            viewport_width,
        })
    }
}
