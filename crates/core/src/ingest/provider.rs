use crate::config::Settings;
use crate::domain::price::{PriceHistory, PricePoint};
use crate::error::{CorrelError, CorrelResult};
use crate::ingest::types::{ChartEnvelope, ChartResult};
use crate::time::range::{exchange_date, to_unix_bounds};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 1;
const MAX_BACKOFF_EXPONENT: u32 = 5;
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; correlheat/0.1)";

/// Source of daily closing prices.
///
/// Implementors fetch one symbol at a time; `fetch_daily_closes` handles ticker
/// normalization and the "nothing came back" check.
#[async_trait::async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Closes for `symbol` on dates in `[start, end)`. An empty vec means no data.
    async fn fetch_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CorrelResult<Vec<PricePoint>>;

    async fn fetch_daily_closes(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> CorrelResult<PriceHistory> {
        let symbols = requested_symbols(tickers)?;

        let mut history = PriceHistory::new();
        for symbol in symbols {
            let closes = self.fetch_symbol(&symbol, start, end).await?;
            if closes.is_empty() {
                tracing::warn!(provider = self.provider_name(), %symbol, %start, %end, "no price data");
                continue;
            }
            tracing::debug!(provider = self.provider_name(), %symbol, points = closes.len(), "fetched closes");
            history.insert(symbol, closes);
        }

        non_empty_history(history)
    }
}

/// Normalized symbols for a fetch; an all-blank list is rejected.
pub(crate) fn requested_symbols(tickers: &[String]) -> CorrelResult<Vec<String>> {
    let symbols = normalize_tickers(tickers);
    if symbols.is_empty() {
        return Err(CorrelError::invalid_parameter(
            "At least one ticker symbol must be provided.",
        ));
    }
    Ok(symbols)
}

pub(crate) fn non_empty_history(history: PriceHistory) -> CorrelResult<PriceHistory> {
    if history.is_empty() {
        return Err(CorrelError::data_unavailable(
            "No price data was retrieved for the requested tickers.",
        ));
    }
    Ok(history)
}

/// Trims, upper-cases, drops empties and duplicates, keeping first-seen order.
pub fn normalize_tickers(tickers: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tickers.len());
    for t in tickers {
        let symbol = t.trim().to_uppercase();
        if !symbol.is_empty() && !out.contains(&symbol) {
            out.push(symbol);
        }
    }
    out
}

/// Daily adjusted closes from a Yahoo-Finance-compatible chart endpoint.
#[derive(Debug, Clone)]
pub struct HttpJsonPriceProvider {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl HttpJsonPriceProvider {
    pub fn from_settings(settings: &Settings) -> CorrelResult<Self> {
        let timeout_secs = settings
            .price_provider_timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let retries = settings.price_provider_retries.unwrap_or(DEFAULT_RETRIES).max(1);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| {
                CorrelError::missing_dependency(format!(
                    "failed to build price provider http client: {e}"
                ))
            })?;

        Ok(Self {
            http,
            base_url: settings.price_provider_base_url().to_string(),
            retries,
        })
    }

    fn url(&self, symbol: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            symbol
        )
    }

    async fn fetch_once(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        let (period1, period2) = to_unix_bounds(start, end);

        let res = self
            .http
            .get(self.url(symbol))
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .context("price provider request failed")?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let text = res
            .text()
            .await
            .context("failed to read price provider response")?;
        if !status.is_success() {
            anyhow::bail!("price provider HTTP {status}: {text}");
        }

        let envelope = serde_json::from_str::<ChartEnvelope>(&text)
            .context("failed to parse price provider response")?;
        if let Some(err) = envelope.chart.error {
            tracing::debug!(%symbol, code = %err.code, description = ?err.description, "chart error");
            return Ok(Vec::new());
        }

        let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };
        Ok(closes_from_chart(&result, start, end))
    }
}

#[async_trait::async_trait]
impl PriceHistoryProvider for HttpJsonPriceProvider {
    fn provider_name(&self) -> &'static str {
        "http_json_chart"
    }

    async fn fetch_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CorrelResult<Vec<PricePoint>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(symbol, start, end).await {
                Ok(closes) => return Ok(closes),
                Err(err) if attempt < self.retries => {
                    let backoff = backoff_for(attempt);
                    tracing::warn!(attempt, ?backoff, %symbol, error = %err, "price fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(err) if is_unreachable(&err) => {
                    return Err(CorrelError::missing_dependency(format!(
                        "Price data source is unreachable ({}): {err:#}",
                        self.base_url
                    )));
                }
                Err(err) => {
                    // Treat like a symbol with no data; the caller decides if nothing is left.
                    tracing::warn!(%symbol, error = %err, "price fetch failed; skipping symbol");
                    return Ok(Vec::new());
                }
            }
        }
    }
}

/// Delay after failed `attempt` (1-based): 1s, 2s, 4s, ... capped at 32s.
fn backoff_for(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    Duration::from_secs(1u64 << exponent)
}

fn is_unreachable(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_connect() || e.is_timeout())
    })
}

/// Extracts `[start, end)` closes from a chart result, preferring adjusted closes.
/// Bars with a null close are dropped.
pub fn closes_from_chart(result: &ChartResult, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
    let adjusted = result
        .indicators
        .adjclose
        .first()
        .map(|a| &a.adjclose)
        .filter(|v| v.len() == result.timestamp.len());
    let closes = match adjusted {
        Some(v) => v,
        None => match result.indicators.quote.first() {
            Some(q) => &q.close,
            None => return Vec::new(),
        },
    };

    result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let price = (*close)?;
            let date = exchange_date(*ts, result.meta.gmtoffset)?;
            (start <= date && date < end).then_some(PricePoint::new(date, price))
        })
        .collect()
}
