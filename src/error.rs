use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }
}

/// Only request-fatal errors reach the router: a failed symbol-list
/// retrieval or a workbook that would not serialize. Per-symbol fetch
/// failures never get here; they are encoded into the summary rows.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        log::error!("Request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Error").into_response()
    }
}
