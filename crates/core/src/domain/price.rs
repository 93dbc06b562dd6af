use crate::error::CorrelError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One daily closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }

    pub fn is_valid(&self) -> bool {
        self.price > 0.0
    }
}

/// Closing prices keyed by upper-cased ticker symbol. Series are not assumed sorted.
pub type PriceHistory = BTreeMap<String, Vec<PricePoint>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    /// `ln(current / previous)`
    #[default]
    Log,
    /// `(current - previous) / previous`
    Pct,
}

impl ReturnType {
    pub const ALL: [ReturnType; 2] = [ReturnType::Log, ReturnType::Pct];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Pct => "pct",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Log => "Log returns",
            Self::Pct => "Percentage returns",
        }
    }

    pub(crate) fn apply(self, previous: f64, current: f64) -> f64 {
        match self {
            Self::Log => (current / previous).ln(),
            Self::Pct => (current - previous) / previous,
        }
    }
}

impl FromStr for ReturnType {
    type Err = CorrelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(Self::Log),
            "pct" => Ok(Self::Pct),
            _ => Err(CorrelError::invalid_parameter(
                "Return type must be 'log' or 'pct'.",
            )),
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
