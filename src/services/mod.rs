pub mod symbols;

pub use symbols::{fetch_symbols, Market};
