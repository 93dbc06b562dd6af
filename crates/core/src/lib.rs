pub mod analysis;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod request;
pub mod time;
pub mod viz;

pub use analysis::correlation::{compute_correlation_matrix, CorrelationResult};
pub use analysis::returns::compute_returns;
pub use domain::price::{PriceHistory, PricePoint, ReturnPoint, ReturnType};
pub use error::{CorrelError, CorrelResult};
pub use pipeline::{run_request, CorrelationReport};
pub use viz::color::correlation_to_hex;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    const DEFAULT_PRICE_PROVIDER_BASE_URL: &str = "https://query1.finance.yahoo.com";
    const DEFAULT_LOOKBACK_DAYS: i64 = 365;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub price_provider_base_url: Option<String>,
        pub price_provider_timeout_secs: Option<u64>,
        pub price_provider_retries: Option<u32>,
        pub prices_file: Option<PathBuf>,
        pub default_lookback_days: i64,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let default_lookback_days = match std::env::var("DEFAULT_LOOKBACK_DAYS") {
                Ok(s) => s
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("DEFAULT_LOOKBACK_DAYS is not an integer: {s}"))?,
                Err(_) => DEFAULT_LOOKBACK_DAYS,
            };
            anyhow::ensure!(
                default_lookback_days >= 1,
                "DEFAULT_LOOKBACK_DAYS must be >= 1 (got {default_lookback_days})"
            );

            Ok(Self {
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                price_provider_base_url: non_empty_var("PRICE_PROVIDER_BASE_URL"),
                price_provider_timeout_secs: non_empty_var("PRICE_PROVIDER_TIMEOUT_SECS")
                    .and_then(|s| s.parse::<u64>().ok()),
                price_provider_retries: non_empty_var("PRICE_PROVIDER_RETRIES")
                    .and_then(|s| s.parse::<u32>().ok()),
                prices_file: non_empty_var("PRICES_FILE").map(PathBuf::from),
                default_lookback_days,
            })
        }

        pub fn price_provider_base_url(&self) -> &str {
            self.price_provider_base_url
                .as_deref()
                .unwrap_or(DEFAULT_PRICE_PROVIDER_BASE_URL)
        }
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                sentry_dsn: None,
                price_provider_base_url: None,
                price_provider_timeout_secs: None,
                price_provider_retries: None,
                prices_file: None,
                default_lookback_days: DEFAULT_LOOKBACK_DAYS,
            }
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn falls_back_to_default_base_url() {
            let settings = Settings::default();
            assert_eq!(
                settings.price_provider_base_url(),
                "https://query1.finance.yahoo.com"
            );
            assert_eq!(settings.default_lookback_days, 365);
        }
    }
}
