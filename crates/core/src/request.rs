use crate::domain::price::ReturnType;
use crate::error::{CorrelError, CorrelResult};
use crate::time::range::default_range;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TICKERS: &str = "AAPL, MSFT, GOOGL, NVDA";

/// Raw, user-entered form values. Kept as strings so a failed submission can be
/// redisplayed exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationForm {
    pub tickers: String,
    pub start: String,
    pub end: String,
    pub return_type: String,
}

/// A validated request, ready for the price provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationRequest {
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub return_type: ReturnType,
}

impl CorrelationForm {
    pub fn with_defaults(lookback_days: i64) -> Self {
        let (start, end) = default_range(lookback_days);
        Self {
            tickers: DEFAULT_TICKERS.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            return_type: ReturnType::default().as_str().to_string(),
        }
    }

    /// Overlays submitted fields on top of `self`; absent fields keep their current value.
    pub fn merge(self, submitted: PartialForm) -> Self {
        Self {
            tickers: submitted.tickers.unwrap_or(self.tickers),
            start: submitted.start.unwrap_or(self.start),
            end: submitted.end.unwrap_or(self.end),
            return_type: submitted.return_type.unwrap_or(self.return_type),
        }
    }

    pub fn validate(&self) -> CorrelResult<CorrelationRequest> {
        let tickers = parse_tickers(&self.tickers);
        if tickers.len() < 2 {
            return Err(CorrelError::invalid_parameter(
                "Enter at least two ticker symbols separated by spaces or commas.",
            ));
        }

        let return_type: ReturnType = self.return_type.parse()?;
        let start = parse_date(&self.start, "start")?;
        let end = parse_date(&self.end, "end")?;
        if start >= end {
            return Err(CorrelError::invalid_parameter(
                "Start date must be earlier than end date.",
            ));
        }

        Ok(CorrelationRequest {
            tickers,
            start,
            end,
            return_type,
        })
    }
}

/// Form fields as submitted; any may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartialForm {
    pub tickers: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub return_type: Option<String>,
}

/// Splits on commas and whitespace, upper-cases, drops empties. Order and duplicates are
/// preserved; the provider dedupes.
pub fn parse_tickers(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn parse_date(raw: &str, label: &str) -> CorrelResult<NaiveDate> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Err(CorrelError::invalid_parameter(format!(
            "{} date is required.",
            capitalize(label)
        )));
    }
    NaiveDate::parse_from_str(cleaned, "%Y-%m-%d").map_err(|_| {
        CorrelError::invalid_parameter(format!("Invalid {label} date: '{raw}'. Use YYYY-MM-DD."))
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
