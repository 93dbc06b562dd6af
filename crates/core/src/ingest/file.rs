use crate::domain::price::{PriceHistory, PricePoint};
use crate::error::{CorrelError, CorrelResult};
use crate::ingest::provider::{non_empty_history, requested_symbols, PriceHistoryProvider};
use chrono::NaiveDate;
use std::path::PathBuf;

/// Reads closes from a JSON file shaped like
/// `{"AAPL": [{"date": "2024-01-02", "price": 185.6}, ...], ...}`.
///
/// Each `fetch_daily_closes` reads the file once and serves every ticker from that read;
/// nothing is cached between calls. Keys are matched case-insensitively, so two keys that
/// only differ by case or surrounding whitespace make the file invalid.
#[derive(Debug, Clone)]
pub struct JsonFilePriceProvider {
    path: PathBuf,
}

impl JsonFilePriceProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> CorrelResult<PriceHistory> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CorrelError::missing_dependency(format!(
                "Unable to read price file {}: {e}",
                self.path.display()
            ))
        })?;
        let raw: PriceHistory = serde_json::from_str(&text).map_err(|e| {
            CorrelError::invalid_parameter(format!(
                "Price file {} is not valid price JSON: {e}",
                self.path.display()
            ))
        })?;

        let mut history = PriceHistory::new();
        for (key, series) in raw {
            let ticker = key.trim().to_uppercase();
            if history.contains_key(&ticker) {
                return Err(CorrelError::invalid_parameter(format!(
                    "Price file {} lists ticker {ticker} more than once.",
                    self.path.display()
                )));
            }
            history.insert(ticker, series);
        }
        Ok(history)
    }
}

fn in_range(series: Vec<PricePoint>, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
    series
        .into_iter()
        .filter(|p| start <= p.date && p.date < end)
        .collect()
}

/// Picks `symbols` out of one loaded snapshot, dropping symbols with nothing in range.
fn select(
    mut all: PriceHistory,
    symbols: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
) -> PriceHistory {
    let mut history = PriceHistory::new();
    for symbol in symbols {
        let closes = in_range(all.remove(&symbol).unwrap_or_default(), start, end);
        if closes.is_empty() {
            tracing::warn!(provider = "json_file", %symbol, %start, %end, "no price data");
            continue;
        }
        history.insert(symbol, closes);
    }
    history
}

#[async_trait::async_trait]
impl PriceHistoryProvider for JsonFilePriceProvider {
    fn provider_name(&self) -> &'static str {
        "json_file"
    }

    async fn fetch_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CorrelResult<Vec<PricePoint>> {
        let mut all = self.load().await?;
        Ok(in_range(all.remove(symbol).unwrap_or_default(), start, end))
    }

    async fn fetch_daily_closes(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> CorrelResult<PriceHistory> {
        let symbols = requested_symbols(tickers)?;
        let all = self.load().await?;
        non_empty_history(select(all, symbols, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn write_fixture(name: &str, v: serde_json::Value) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "correlheat-{name}-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, v.to_string()).unwrap();
        path
    }

    #[tokio::test]
    async fn loads_and_filters_by_range() {
        let path = write_fixture(
            "range",
            json!({
                "aaa": [
                    {"date": "2024-01-01", "price": 100.0},
                    {"date": "2024-01-02", "price": 101.0},
                    {"date": "2024-01-03", "price": 102.0}
                ],
                "BBB": [
                    {"date": "2024-01-02", "price": 50.0}
                ]
            }),
        );
        let provider = JsonFilePriceProvider::new(&path);

        let history = provider
            .fetch_daily_closes(&["AAA".to_string(), "bbb".to_string()], d(1, 2), d(1, 3))
            .await
            .unwrap();
        assert_eq!(history["AAA"], vec![PricePoint::new(d(1, 2), 101.0)]);
        assert_eq!(history["BBB"], vec![PricePoint::new(d(1, 2), 50.0)]);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn unknown_tickers_are_unavailable() {
        let path = write_fixture("unknown", json!({"AAA": []}));
        let provider = JsonFilePriceProvider::new(&path);

        let err = provider
            .fetch_daily_closes(&["AAA".to_string(), "QQQ".to_string()], d(1, 1), d(2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CorrelError::DataUnavailable(_)));

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn missing_file_is_a_missing_dependency() {
        let provider = JsonFilePriceProvider::new("/nonexistent/correlheat/prices.json");
        let err = provider
            .fetch_daily_closes(&["AAA".to_string()], d(1, 1), d(2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CorrelError::MissingDependency(_)));
    }

    #[tokio::test]
    async fn case_colliding_keys_are_rejected() {
        let path = write_fixture(
            "collide",
            json!({
                "aaa": [{"date": "2024-01-02", "price": 100.0}],
                "AAA ": [{"date": "2024-01-02", "price": 200.0}],
                "BBB": [{"date": "2024-01-02", "price": 50.0}]
            }),
        );
        let provider = JsonFilePriceProvider::new(&path);

        let err = provider
            .fetch_daily_closes(&["AAA".to_string(), "BBB".to_string()], d(1, 1), d(2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CorrelError::InvalidParameter(_)));
        assert!(err.message().contains("lists ticker AAA more than once"));

        let err = provider.fetch_symbol("BBB", d(1, 1), d(2, 1)).await.unwrap_err();
        assert!(matches!(err, CorrelError::InvalidParameter(_)));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn one_snapshot_serves_every_ticker() {
        let mut all = PriceHistory::new();
        all.insert(
            "AAA".to_string(),
            vec![
                PricePoint::new(d(1, 1), 10.0),
                PricePoint::new(d(1, 2), 11.0),
                PricePoint::new(d(3, 1), 12.0),
            ],
        );
        all.insert("BBB".to_string(), vec![PricePoint::new(d(3, 1), 5.0)]);
        all.insert("CCC".to_string(), vec![PricePoint::new(d(1, 5), 7.0)]);

        let symbols = ["CCC", "AAA", "BBB", "ZZZ"].map(String::from).to_vec();
        let history = select(all, symbols, d(1, 1), d(2, 1));

        assert_eq!(history.keys().collect::<Vec<_>>(), vec!["AAA", "CCC"]);
        assert_eq!(
            history["AAA"],
            vec![PricePoint::new(d(1, 1), 10.0), PricePoint::new(d(1, 2), 11.0)]
        );
        assert_eq!(history["CCC"], vec![PricePoint::new(d(1, 5), 7.0)]);
    }
}
