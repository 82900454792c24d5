pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod pipeline;
pub mod services;

pub use error::{AppError, Result};
