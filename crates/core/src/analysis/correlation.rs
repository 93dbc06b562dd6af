use crate::analysis::returns::compute_returns;
use crate::domain::price::{PriceHistory, ReturnType};
use crate::error::{CorrelError, CorrelResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// Standard deviations at or below this are treated as a constant series.
const ZERO_STD_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub tickers: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
    pub observation_count: usize,
}

impl CorrelationResult {
    pub fn index_of(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    /// Correlation of `a` against `b` by ticker symbol.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.matrix[i][j])
    }
}

/// Return observations on the dates shared by every ticker.
///
/// `rows[k][c]` is the return of `tickers[c]` on `dates[k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedReturns {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl AlignedReturns {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Pearson matrix over these rows. Alignment guarantees at least two rows.
    pub fn correlate(&self) -> CorrelationResult {
        correlate(self)
    }

    fn column(&self, c: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |row| row[c])
    }
}

pub fn align_returns(
    price_history: &PriceHistory,
    return_type: ReturnType,
) -> CorrelResult<AlignedReturns> {
    let mut ticker_returns: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for (ticker, series) in price_history {
        let returns = compute_returns(series, return_type).map_err(|err| {
            tracing::debug!(%ticker, error = %err, "return computation failed");
            err
        })?;
        // Duplicate dates keep the last return, matching a plain map insert.
        let by_date = returns.into_iter().map(|r| (r.date, r.value)).collect();
        ticker_returns.insert(ticker.as_str(), by_date);
    }

    let tickers: Vec<String> = ticker_returns.keys().map(|t| t.to_string()).collect();
    if tickers.len() < 2 {
        return Err(CorrelError::invalid_parameter(
            "At least two tickers are required to compute correlations.",
        ));
    }

    let mut maps = ticker_returns.values();
    let mut common: BTreeSet<NaiveDate> = maps
        .next()
        .map(|m| m.keys().copied().collect())
        .unwrap_or_default();
    for m in maps {
        common.retain(|d| m.contains_key(d));
    }

    if common.len() < 2 {
        return Err(CorrelError::insufficient_data(
            "Not enough overlapping return observations across tickers.",
        ));
    }

    let dates: Vec<NaiveDate> = common.into_iter().collect();
    let rows = dates
        .iter()
        .map(|d| ticker_returns.values().map(|m| m[d]).collect())
        .collect();

    Ok(AlignedReturns {
        tickers,
        dates,
        rows,
    })
}

/// Sample Pearson correlation of every ticker pair over their common return dates.
///
/// Each cell is computed on its own, so `matrix[i][j]` and `matrix[j][i]` agree only up
/// to floating-point rounding.
pub fn compute_correlation_matrix(
    price_history: &PriceHistory,
    return_type: ReturnType,
) -> CorrelResult<CorrelationResult> {
    let aligned = align_returns(price_history, return_type)?;
    Ok(aligned.correlate())
}

fn correlate(aligned: &AlignedReturns) -> CorrelationResult {
    let n = aligned.rows.len();
    let k = aligned.tickers.len();
    let denom = (n - 1) as f64;

    let means: Vec<f64> = (0..k)
        .map(|c| aligned.column(c).sum::<f64>() / n as f64)
        .collect();
    let stdevs: Vec<f64> = (0..k)
        .map(|c| {
            let mean = means[c];
            (aligned.column(c).map(|v| (v - mean).powi(2)).sum::<f64>() / denom).sqrt()
        })
        .collect();

    let mut matrix = Vec::with_capacity(k);
    for i in 0..k {
        let mut row = Vec::with_capacity(k);
        for j in 0..k {
            if i == j {
                row.push(1.0);
                continue;
            }

            let (std_i, std_j) = (stdevs[i], stdevs[j]);
            if std_i.abs() <= ZERO_STD_TOLERANCE || std_j.abs() <= ZERO_STD_TOLERANCE {
                row.push(0.0);
                continue;
            }

            let covariance = aligned
                .rows
                .iter()
                .map(|r| (r[i] - means[i]) * (r[j] - means[j]))
                .sum::<f64>()
                / denom;
            row.push((covariance / (std_i * std_j)).clamp(-1.0, 1.0));
        }
        matrix.push(row);
    }

    tracing::debug!(
        tickers = k,
        observations = n,
        "computed correlation matrix"
    );

    CorrelationResult {
        tickers: aligned.tickers.clone(),
        matrix,
        observation_count: n,
    }
}
