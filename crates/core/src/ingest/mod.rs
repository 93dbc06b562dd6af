pub mod file;
pub mod provider;
pub mod types;

pub use file::JsonFilePriceProvider;
pub use provider::{normalize_tickers, HttpJsonPriceProvider, PriceHistoryProvider};
