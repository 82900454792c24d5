use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{AppError, Result};
use crate::fetch::{bounded_map, ensure_concurrency_limit};

/// The remote source caps each history at its 20 most recent days,
/// descending by date.
pub const TRADE_DAY_LIMIT: usize = 20;

/// Literal cell value standing in for metrics that could not be computed.
pub const FAILED_MARKER: &str = "failed";

/// Column order of the exported sheet.
pub const SUMMARY_FIELDS: [&str; 8] = [
    "symbol",
    "totalOverbuyVolK",
    "totalOversellVolK",
    "tradeVolumeRate",
    "totalDifferenceVolK1D",
    "totalDifferenceVolK5D",
    "totalDifferenceVolK10D",
    "totalDifferenceVolK20D",
];

/// A derived figure: either a clean number or the failed marker for a
/// symbol whose fetch did not go through. Keeping this a sum type means a
/// failed cell can never be confused with a genuine zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    Failed,
}

impl Metric {
    pub fn is_failed(&self) -> bool {
        matches!(self, Metric::Failed)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            Metric::Failed => None,
        }
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Value(0.0)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{v}"),
            Metric::Failed => f.write_str(FAILED_MARKER),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Metric::Value(v) => serializer.serialize_f64(*v),
            Metric::Failed => serializer.serialize_str(FAILED_MARKER),
        }
    }
}

/// One day of broker-trades observations as the remote endpoint reports
/// it. The payload omits fields freely, hence everything is optional;
/// which absences fail the symbol is decided during reduction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDayRecord {
    pub total_difference_vol_k: Option<f64>,
    pub total_overbuy_vol_k: Option<f64>,
    pub total_oversell_vol_k: Option<f64>,
    pub trade_volume_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BrokerTradesResponse {
    #[serde(default)]
    list: Vec<TradeDayRecord>,
}

/// Fixed reduction of one symbol's newest-first day sequence.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSummary {
    pub symbol: String,
    pub total_overbuy_vol_k: Metric,
    pub total_oversell_vol_k: Metric,
    pub trade_volume_rate: Metric,
    pub total_difference_vol_k1_d: Metric,
    pub total_difference_vol_k5_d: Metric,
    pub total_difference_vol_k10_d: Metric,
    pub total_difference_vol_k20_d: Metric,
}

impl SymbolSummary {
    /// Row recorded for a symbol whose fetch or parse failed.
    pub fn failed(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            total_overbuy_vol_k: Metric::Failed,
            total_oversell_vol_k: Metric::Failed,
            trade_volume_rate: Metric::Failed,
            total_difference_vol_k1_d: Metric::Failed,
            total_difference_vol_k5_d: Metric::Failed,
            total_difference_vol_k10_d: Metric::Failed,
            total_difference_vol_k20_d: Metric::Failed,
        }
    }

    /// Walks the day records from most recent to oldest, accumulating the
    /// net difference volume and snapshotting the running sum at the 5, 10
    /// and 20 day horizons. Horizons the history never reaches keep their
    /// zero default. A missing required field fails the whole symbol.
    pub fn reduce(symbol: impl Into<String>, days: &[TradeDayRecord]) -> Result<Self> {
        let symbol = symbol.into();
        let Some(latest) = days.first() else {
            return Err(AppError::message(format!(
                "No trade-day records returned for {symbol}"
            )));
        };

        let mut summary = Self {
            symbol,
            ..Self::default()
        };

        let mut running_sum = 0.0;
        for (i, day) in days.iter().take(TRADE_DAY_LIMIT).enumerate() {
            let difference = day.total_difference_vol_k.ok_or_else(|| {
                AppError::message(format!("Day record {i} is missing totalDifferenceVolK"))
            })?;
            running_sum += difference;
            match i {
                4 => summary.total_difference_vol_k5_d = Metric::Value(running_sum),
                9 => summary.total_difference_vol_k10_d = Metric::Value(running_sum),
                19 => summary.total_difference_vol_k20_d = Metric::Value(running_sum),
                _ => {}
            }
        }

        let require = |field: Option<f64>, name: &str| {
            field.map(Metric::Value).ok_or_else(|| {
                AppError::message(format!("Most recent day record is missing {name}"))
            })
        };
        summary.total_difference_vol_k1_d =
            require(latest.total_difference_vol_k, "totalDifferenceVolK")?;
        summary.total_overbuy_vol_k = require(latest.total_overbuy_vol_k, "totalOverbuyVolK")?;
        summary.total_oversell_vol_k = require(latest.total_oversell_vol_k, "totalOversellVolK")?;
        summary.trade_volume_rate = require(latest.trade_volume_rate, "tradeVolumeRate")?;

        Ok(summary)
    }

    /// Metric fields in sheet column order, symbol excluded.
    pub fn metrics(&self) -> [Metric; 7] {
        [
            self.total_overbuy_vol_k,
            self.total_oversell_vol_k,
            self.trade_volume_rate,
            self.total_difference_vol_k1_d,
            self.total_difference_vol_k5_d,
            self.total_difference_vol_k10_d,
            self.total_difference_vol_k20_d,
        ]
    }

    pub fn is_failed(&self) -> bool {
        self.metrics().iter().all(Metric::is_failed)
    }
}

/// Fetches broker-trades histories for a whole symbol list under a
/// concurrency cap and reduces each into a summary row. Per-symbol
/// failures are encoded into the row rather than raised, so one bad
/// symbol never takes the batch down.
pub struct BrokerTradesFetcher {
    client: Client,
    base_url: String,
    concurrency_limit: usize,
}

impl BrokerTradesFetcher {
    pub fn new(client: Client, base_url: impl Into<String>, concurrency_limit: usize) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            concurrency_limit: ensure_concurrency_limit(concurrency_limit),
        }
    }

    /// One summary per input symbol, in input order, regardless of the
    /// order in which the fetches complete or whether they succeed.
    pub async fn fetch_all(&self, symbols: Vec<String>) -> Vec<SymbolSummary> {
        bounded_map(symbols, self.concurrency_limit, |symbol| async move {
            self.fetch_summary(&symbol).await
        })
        .await
    }

    /// Never errors towards the caller; any failure becomes a sentinel row.
    pub async fn fetch_summary(&self, symbol: &str) -> SymbolSummary {
        log::info!("Fetching {symbol} data...");

        match self.fetch_day_records(symbol).await {
            Ok(days) => match SymbolSummary::reduce(symbol, &days) {
                Ok(summary) => summary,
                Err(err) => {
                    log::warn!("Reducing {symbol} history failed: {err}");
                    SymbolSummary::failed(symbol)
                }
            },
            Err(err) => {
                log::warn!("Fetching {symbol} data failed: {err}");
                SymbolSummary::failed(symbol)
            }
        }
    }

    async fn fetch_day_records(&self, symbol: &str) -> Result<Vec<TradeDayRecord>> {
        let url = format!(
            "{base};limit={limit};sortBy=-date;symbol={symbol}.TW",
            base = self.base_url,
            limit = TRADE_DAY_LIMIT,
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::message(format!(
                "Broker-trades request for {} failed with status {}",
                symbol,
                response.status()
            )));
        }

        let body: BrokerTradesResponse = response.json().await?;
        Ok(body.list)
    }
}
