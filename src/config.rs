use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::fetch::FETCH_CONCURRENCY_LIMIT;
use crate::services::symbols::Market;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

const LISTED_SYMBOLS_URL: &str = "https://openapi.twse.com.tw/v1/opendata/t187ap03_L";
const OTC_SYMBOLS_URL: &str = "https://www.tpex.org.tw/openapi/v1/mopsfin_t187ap03_O";
const BROKER_TRADES_BASE: &str =
    "https://tw.stock.yahoo.com/_td-stock/api/resource/StockServices.brokerTrades";

/// Runtime configuration, environment variables over built-in defaults.
/// The upstream URLs are overridable so tests can point at local fixtures.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub fetch_concurrency: usize,
    /// Applied to every outbound request so a stalled upstream cannot
    /// wedge a whole batch.
    pub request_timeout: Duration,
    pub listed_symbols_url: String,
    pub otc_symbols_url: String,
    pub broker_trades_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3000))),
            fetch_concurrency: FETCH_CONCURRENCY_LIMIT,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            listed_symbols_url: LISTED_SYMBOLS_URL.to_string(),
            otc_symbols_url: OTC_SYMBOLS_URL.to_string(),
            broker_trades_base: BROKER_TRADES_BASE.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(value) = env::var("HOLDINGS_LISTEN_ADDR") {
            config.listen_addr = value
                .parse()
                .map_err(|_| AppError::message(format!("Invalid HOLDINGS_LISTEN_ADDR: {value}")))?;
        }
        if let Ok(value) = env::var("HOLDINGS_FETCH_CONCURRENCY") {
            config.fetch_concurrency = value.parse().map_err(|_| {
                AppError::message(format!("Invalid HOLDINGS_FETCH_CONCURRENCY: {value}"))
            })?;
        }
        if let Ok(value) = env::var("HOLDINGS_REQUEST_TIMEOUT_MS") {
            let millis: u64 = value.parse().map_err(|_| {
                AppError::message(format!("Invalid HOLDINGS_REQUEST_TIMEOUT_MS: {value}"))
            })?;
            config.request_timeout = Duration::from_millis(millis);
        }
        if let Ok(value) = env::var("HOLDINGS_LISTED_SYMBOLS_URL") {
            config.listed_symbols_url = value;
        }
        if let Ok(value) = env::var("HOLDINGS_OTC_SYMBOLS_URL") {
            config.otc_symbols_url = value;
        }
        if let Ok(value) = env::var("HOLDINGS_BROKER_TRADES_BASE") {
            config.broker_trades_base = value;
        }

        Ok(config)
    }

    pub fn symbols_url(&self, market: Market) -> &str {
        match market {
            Market::Listed => &self.listed_symbols_url,
            Market::Otc => &self.otc_symbols_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.fetch_concurrency, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.listed_symbols_url.contains("t187ap03_L"));
        assert!(config.otc_symbols_url.contains("t187ap03_O"));
    }

    #[test]
    fn resolves_symbol_url_per_market() {
        let config = Config::default();
        assert_eq!(config.symbols_url(Market::Listed), config.listed_symbols_url);
        assert_eq!(config.symbols_url(Market::Otc), config.otc_symbols_url);
    }
}
