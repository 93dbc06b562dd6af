use chrono::{Duration, Local, NaiveDate};

/// `[today - lookback_days, today]` in local time.
pub fn default_range(lookback_days: i64) -> (NaiveDate, NaiveDate) {
    default_range_at(Local::now().date_naive(), lookback_days)
}

pub fn default_range_at(today: NaiveDate, lookback_days: i64) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(lookback_days), today)
}

/// Unix timestamps (seconds, UTC midnight) bounding `[start, end)`.
pub fn to_unix_bounds(start: NaiveDate, end: NaiveDate) -> (i64, i64) {
    let secs = |d: NaiveDate| {
        d.and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default()
    };
    (secs(start), secs(end))
}

/// Converts a bar timestamp to the exchange-local calendar date.
pub fn exchange_date(timestamp: i64, gmt_offset_secs: i64) -> Option<NaiveDate> {
    chrono::DateTime::from_timestamp(timestamp + gmt_offset_secs, 0).map(|dt| dt.date_naive())
}
