use chrono::Local;
use reqwest::Client;

use crate::config::Config;
use crate::error::{Context, Result};
use crate::export;
use crate::fetch::BrokerTradesFetcher;
use crate::services::symbols::{self, Market};

/// A finished export: the workbook bytes plus the attachment filename
/// they should be served under.
pub struct MarketExport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Runs the whole pipeline for one market universe: symbol list, bounded
/// fan-out over the broker-trades endpoint, workbook serialization. A
/// failed symbol retrieval short-circuits before any broker-trades
/// request is issued; per-symbol failures surface as sentinel rows in an
/// otherwise complete workbook.
pub async fn export_market(
    client: &Client,
    config: &Config,
    market: Market,
) -> Result<MarketExport> {
    let symbols = symbols::fetch_symbols(client, market, config.symbols_url(market)).await?;
    log::info!("Retrieved {} symbols for the {} market", symbols.len(), market);

    let fetcher = BrokerTradesFetcher::new(
        client.clone(),
        &config.broker_trades_base,
        config.fetch_concurrency,
    );
    let summaries = fetcher.fetch_all(symbols).await;

    let bytes = export::write_workbook(&summaries)
        .with_context(|| format!("Failed to serialize the {market} market workbook"))?;
    log::info!("Serialized {} rows for the {} market", summaries.len(), market);

    Ok(MarketExport {
        filename: export_filename(market),
        bytes,
    })
}

/// `<ISO date><urlencoded market label>.xlsx`, e.g.
/// `2024-01-05%E4%B8%8A%E5%B8%82%E4%B8%BB%E5%8A%9B%E8%B3%87%E6%96%99.xlsx`.
pub fn export_filename(market: Market) -> String {
    let date = Local::now().format("%Y-%m-%d");
    format!("{}{}.xlsx", date, urlencoding::encode(market.export_label()))
}
