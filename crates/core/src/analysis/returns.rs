use crate::domain::price::{PricePoint, ReturnPoint, ReturnType};
use crate::error::{CorrelError, CorrelResult};

/// Converts one ticker's closes into daily returns dated by the later observation.
///
/// The series is stably sorted by date first. A transition touching a non-positive price
/// produces no return, but the baseline still moves to the current point, so the next
/// transition is measured from the skipped one.
pub fn compute_returns(
    series: &[PricePoint],
    return_type: ReturnType,
) -> CorrelResult<Vec<ReturnPoint>> {
    if series.len() < 2 {
        return Err(CorrelError::insufficient_data(
            "At least two price observations are required to compute returns.",
        ));
    }

    let mut ordered = series.to_vec();
    ordered.sort_by_key(|p| p.date);

    let mut returns = Vec::with_capacity(ordered.len() - 1);
    let mut previous = ordered[0];
    for current in &ordered[1..] {
        if previous.is_valid() && current.is_valid() {
            returns.push(ReturnPoint {
                date: current.date,
                value: return_type.apply(previous.price, current.price),
            });
        }
        previous = *current;
    }

    if returns.is_empty() {
        return Err(CorrelError::insufficient_data(
            "Unable to compute returns due to non-positive prices or insufficient data.",
        ));
    }

    tracing::trace!(
        points = series.len(),
        returns = returns.len(),
        %return_type,
        "computed returns"
    );
    Ok(returns)
}
