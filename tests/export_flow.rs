use std::io::Cursor;
use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use calamine::{Data, Reader, Xlsx};
use serde_json::json;

use holdings_exporter::api::{app_router, AppState, XLSX_CONTENT_TYPE};
use holdings_exporter::config::Config;

/// Upstream fixture standing in for the exchange open-data and the
/// broker-trades endpoints.
fn upstream_router() -> Router {
    Router::new()
        .route(
            "/listed-symbols",
            get(|| async {
                Json(json!([
                    {"公司代號": "2330", "公司名稱": "台積電"},
                    {"公司代號": "0050", "公司名稱": "元大台灣50"},
                    {"公司代號": "2317", "公司名稱": "鴻海"}
                ]))
            }),
        )
        .route(
            "/failing-symbols",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        // The broker-trades URL carries matrix parameters in its path
        // segment, so match it in a fallback instead of a route.
        .fallback(broker_trades)
}

async fn broker_trades(uri: Uri) -> axum::response::Response {
    let symbol = uri
        .path()
        .split("symbol=")
        .nth(1)
        .and_then(|rest| rest.strip_suffix(".TW"))
        .unwrap_or_default()
        .to_string();

    // 0050 plays the symbol whose upstream lookup fails.
    if symbol == "0050" {
        return StatusCode::NOT_FOUND.into_response();
    }

    let base = if symbol == "2330" { 1.0 } else { 2.0 };
    let days: Vec<serde_json::Value> = (0..20)
        .map(|i| {
            if i == 0 {
                json!({
                    "totalDifferenceVolK": base,
                    "totalOverbuyVolK": 100.0,
                    "totalOversellVolK": 40.0,
                    "tradeVolumeRate": 2.5
                })
            } else {
                json!({ "totalDifferenceVolK": base })
            }
        })
        .collect();

    Json(json!({ "list": days })).into_response()
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn read_sheet(bytes: &[u8]) -> Vec<Vec<Data>> {
    let mut workbook = Xlsx::new(Cursor::new(bytes.to_vec())).expect("workbook parses");
    let range = workbook.worksheet_range("Sheet1").expect("Sheet1 exists");
    range.rows().map(|row| row.to_vec()).collect()
}

#[tokio::test]
async fn exports_a_complete_workbook_with_sentinel_rows_in_place() {
    let upstream = spawn(upstream_router()).await;

    let config = Config {
        listed_symbols_url: format!("http://{upstream}/listed-symbols"),
        broker_trades_base: format!("http://{upstream}/broker"),
        fetch_concurrency: 2,
        ..Config::default()
    };
    let app = spawn(app_router(AppState::new(test_client(), config))).await;

    let response = test_client()
        .get(format!("http://{app}/stock/holdings"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .unwrap(),
        XLSX_CONTENT_TYPE
    );
    let disposition = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename="));
    assert!(disposition.ends_with(".xlsx"));

    let bytes = response.bytes().await.unwrap();
    let rows = read_sheet(&bytes);

    // Header plus one row per input symbol, in input order.
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1][0], Data::String("2330".to_string()));
    assert_eq!(rows[2][0], Data::String("0050".to_string()));
    assert_eq!(rows[3][0], Data::String("2317".to_string()));

    // 2330: constant difference of 1.0 per day.
    assert_eq!(rows[1][4], Data::Float(1.0));
    assert_eq!(rows[1][5], Data::Float(5.0));
    assert_eq!(rows[1][6], Data::Float(10.0));
    assert_eq!(rows[1][7], Data::Float(20.0));
    assert_eq!(rows[1][1], Data::Float(100.0));

    // The failed symbol is a full sentinel row, siblings untouched.
    for cell in &rows[2][1..] {
        assert_eq!(*cell, Data::String("failed".to_string()));
    }
    assert_eq!(rows[3][7], Data::Float(40.0));
}

#[tokio::test]
async fn symbol_retrieval_failure_returns_a_plain_500() {
    let upstream = spawn(upstream_router()).await;

    let config = Config {
        listed_symbols_url: format!("http://{upstream}/failing-symbols"),
        broker_trades_base: format!("http://{upstream}/broker"),
        ..Config::default()
    };
    let app = spawn(app_router(AppState::new(test_client(), config))).await;

    let response = test_client()
        .get(format!("http://{app}/stock/holdings"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(response.text().await.unwrap(), "Error");
}

#[tokio::test]
async fn otc_route_uses_its_own_symbol_source() {
    let upstream_addr = spawn(
        Router::new()
            .route(
                "/otc-symbols",
                get(|| async { Json(json!([{"SecuritiesCompanyCode": "5483"}])) }),
            )
            .fallback(broker_trades),
    )
    .await;

    let config = Config {
        otc_symbols_url: format!("http://{upstream_addr}/otc-symbols"),
        broker_trades_base: format!("http://{upstream_addr}/broker"),
        ..Config::default()
    };
    let app = spawn(app_router(AppState::new(test_client(), config))).await;

    let response = test_client()
        .get(format!("http://{app}/stock/OTCholdings"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let bytes = response.bytes().await.unwrap();
    let rows = read_sheet(&bytes);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][0], Data::String("5483".to_string()));
}
