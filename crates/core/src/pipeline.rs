use crate::analysis::correlation::{align_returns, CorrelationResult};
use crate::domain::price::ReturnType;
use crate::error::CorrelResult;
use crate::ingest::provider::PriceHistoryProvider;
use crate::request::CorrelationRequest;
use crate::viz::heatmap::HeatmapTable;
use chrono::NaiveDate;
use serde::Serialize;

/// Everything a front-end needs to draw one heatmap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationReport {
    #[serde(flatten)]
    pub result: CorrelationResult,
    pub colors: Vec<Vec<String>>,
    pub return_type: ReturnType,
    #[serde(rename = "start")]
    pub requested_start: NaiveDate,
    #[serde(rename = "end")]
    pub requested_end: NaiveDate,
    pub first_observation: Option<NaiveDate>,
    pub last_observation: Option<NaiveDate>,
    pub missing_tickers: Vec<String>,
    #[serde(skip)]
    pub table: HeatmapTable,
}

impl CorrelationReport {
    pub fn status_message(&self) -> String {
        let mut msg = format!(
            "Computed correlations using {} overlapping daily returns.",
            self.result.observation_count
        );
        if let (Some(first), Some(last)) = (self.first_observation, self.last_observation) {
            msg.push_str(&format!(" Aligned dates: {first} to {last}."));
        }
        if !self.missing_tickers.is_empty() {
            msg.push_str(&format!(
                " No data for: {}.",
                self.missing_tickers.join(", ")
            ));
        }
        msg
    }
}

/// Fetches prices once for `request` and computes the heatmap. Nothing is cached.
pub async fn run_request(
    provider: &dyn PriceHistoryProvider,
    request: &CorrelationRequest,
) -> CorrelResult<CorrelationReport> {
    let history = provider
        .fetch_daily_closes(&request.tickers, request.start, request.end)
        .await?;

    let missing_tickers: Vec<String> = crate::ingest::normalize_tickers(&request.tickers)
        .into_iter()
        .filter(|t| !history.contains_key(t))
        .collect();

    let aligned = align_returns(&history, request.return_type)?;
    let result = aligned.correlate();
    let table = HeatmapTable::from_result(&result);

    tracing::info!(
        provider = provider.provider_name(),
        tickers = result.tickers.len(),
        observations = result.observation_count,
        return_type = %request.return_type,
        missing = missing_tickers.len(),
        "correlation request complete"
    );

    Ok(CorrelationReport {
        colors: table.colors(),
        return_type: request.return_type,
        requested_start: request.start,
        requested_end: request.end,
        first_observation: aligned.first_date(),
        last_observation: aligned.last_date(),
        missing_tickers,
        table,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PricePoint;
    use crate::error::CorrelError;
    use chrono::Duration;
    use std::collections::BTreeMap;

    struct Fixed(BTreeMap<String, Vec<PricePoint>>);

    #[async_trait::async_trait]
    impl PriceHistoryProvider for Fixed {
        fn provider_name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_symbol(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> CorrelResult<Vec<PricePoint>> {
            Ok(self.0.get(symbol).cloned().unwrap_or_default())
        }
    }

    fn d0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn provider() -> Fixed {
        let mut m = BTreeMap::new();
        for (t, prices) in [
            ("AAA", vec![100.0, 102.0, 104.0, 103.0, 105.0]),
            ("BBB", vec![50.0, 51.0, 52.0, 51.0, 53.0]),
            ("CCC", vec![200.0, 198.0, 202.0, 205.0, 207.0]),
        ] {
            let series = prices
                .into_iter()
                .enumerate()
                .map(|(i, p)| PricePoint::new(d0() + Duration::days(i as i64), p))
                .collect();
            m.insert(t.to_string(), series);
        }
        Fixed(m)
    }

    fn request(tickers: &[&str]) -> CorrelationRequest {
        CorrelationRequest {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            start: d0(),
            end: d0() + Duration::days(10),
            return_type: ReturnType::Pct,
        }
    }

    #[tokio::test]
    async fn builds_report() {
        let report = run_request(&provider(), &request(&["CCC", "AAA", "BBB", "XYZ"]))
            .await
            .unwrap();
        assert_eq!(report.result.tickers, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(report.result.observation_count, 4);
        assert_eq!(report.colors.len(), 3);
        assert_eq!(report.colors[0][0], "#b2182b");
        assert_eq!(report.missing_tickers, vec!["XYZ"]);
        assert_eq!(report.first_observation, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(report.last_observation, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(
            report.status_message(),
            "Computed correlations using 4 overlapping daily returns. \
             Aligned dates: 2024-01-02 to 2024-01-05. No data for: XYZ."
        );
    }

    #[tokio::test]
    async fn one_ticker_with_data_is_invalid() {
        let err = run_request(&provider(), &request(&["AAA", "NOPE"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CorrelError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn serializes_flat_json() {
        let report = run_request(&provider(), &request(&["AAA", "BBB"]))
            .await
            .unwrap();
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["tickers"], serde_json::json!(["AAA", "BBB"]));
        assert_eq!(v["observation_count"], 4);
        assert_eq!(v["return_type"], "pct");
        assert_eq!(v["start"], "2024-01-01");
        assert_eq!(v["end"], "2024-01-11");
        assert!(v.get("requested_start").is_none());
        assert!(v.get("table").is_none());
        for key in ["matrix", "colors"] {
            assert_eq!(v[key].as_array().map(Vec::len), Some(2), "{key}");
        }
    }
}
