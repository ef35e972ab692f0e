use chrono::{DateTime, NaiveDate, Utc};

/// Milliseconds since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn now_millis() -> i64 {
    js_sys::Date::now() as i64
}

/// Milliseconds since the Unix epoch
#[cfg(not(target_arch = "wasm32"))]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Calendar date (UTC) for a millisecond timestamp
pub fn date_from_millis(millis: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

pub fn today() -> NaiveDate {
    date_from_millis(now_millis())
}

/// RFC 3339 rendering of a millisecond timestamp, empty when out of range
pub fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_from_millis() {
        // 2025-08-15T14:00:00Z
        let date = date_from_millis(1_755_266_400_000);
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 8, 15).unwrap());
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "1970-01-01T00:00:00+00:00");
    }
}
