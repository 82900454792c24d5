use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use reqwest::Client;

use crate::config::Config;
use crate::error::Result;
use crate::pipeline;
use crate::services::symbols::Market;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Clone)]
pub struct AppState {
    pub client: Client,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(client: Client, config: Config) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route(Market::Listed.route_path(), get(listed_holdings))
        .route(Market::Otc.route_path(), get(otc_holdings))
        .with_state(state)
}

async fn listed_holdings(State(state): State<AppState>) -> Result<Response> {
    holdings_response(&state, Market::Listed).await
}

async fn otc_holdings(State(state): State<AppState>) -> Result<Response> {
    holdings_response(&state, Market::Otc).await
}

/// Streams the finished workbook back as a dated attachment. Errors map
/// to a plain 500 via the `IntoResponse` impl on the error type.
async fn holdings_response(state: &AppState, market: Market) -> Result<Response> {
    let export = pipeline::export_market(&state.client, &state.config, market).await?;

    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", export.filename),
        ),
    ];

    Ok((headers, export.bytes).into_response())
}
