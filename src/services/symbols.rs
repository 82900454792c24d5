use std::fmt;

use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Context, Result};

/// One listing venue whose whole symbol universe gets exported per
/// request. Both venues run the identical pipeline; only the symbol
/// source, the code field of its payload and the attachment label differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    Listed,
    Otc,
}

impl Market {
    /// JSON field carrying the company code in the open-data payload.
    pub fn code_field(&self) -> &'static str {
        match self {
            Market::Listed => "公司代號",
            Market::Otc => "SecuritiesCompanyCode",
        }
    }

    /// Human-readable label appended to the export filename.
    pub fn export_label(&self) -> &'static str {
        match self {
            Market::Listed => "上市主力資料",
            Market::Otc => "上櫃主力資料",
        }
    }

    pub fn route_path(&self) -> &'static str {
        match self {
            Market::Listed => "/stock/holdings",
            Market::Otc => "/stock/OTCholdings",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Listed => f.write_str("listed"),
            Market::Otc => f.write_str("OTC"),
        }
    }
}

/// Downloads the market's company register and projects the symbol codes,
/// keeping the order the register returns them in. Any failure here is
/// fatal to the request; there is nothing sensible to export without the
/// symbol list.
pub async fn fetch_symbols(client: &Client, market: Market, url: &str) -> Result<Vec<String>> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to request the {market} market symbol list"))?;

    if !response.status().is_success() {
        return Err(AppError::message(format!(
            "Symbol list request for the {} market failed with status {}",
            market,
            response.status()
        )));
    }

    let companies: Vec<Value> = response
        .json()
        .await
        .with_context(|| format!("Failed to decode the {market} market symbol list"))?;

    project_symbols(&companies, market)
}

fn project_symbols(companies: &[Value], market: Market) -> Result<Vec<String>> {
    let field = market.code_field();
    let mut symbols = Vec::with_capacity(companies.len());

    for company in companies {
        let code = company.get(field).and_then(Value::as_str).ok_or_else(|| {
            AppError::message(format!("Symbol list entry is missing the {field} field"))
        })?;
        symbols.push(code.trim().to_string());
    }

    Ok(symbols)
}
