use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

/// Source of the `@timestamp` field. Invoked once per log call.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The system's UTC clock.
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// A clock that always returns `instant`.
pub fn fixed_clock(instant: DateTime<Utc>) -> Clock {
    Arc::new(move || instant)
}

/// ISO-8601, UTC, millisecond precision: `2020-05-11T15:01:01.000Z`.
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_with_milliseconds_and_zulu() {
        let instant = Utc.with_ymd_and_hms(2020, 5, 11, 15, 1, 1).unwrap();
        assert_eq!(format_timestamp(&instant), "2020-05-11T15:01:01.000Z");
    }

    #[test]
    fn fixed_clock_is_stable() {
        let instant = Utc.with_ymd_and_hms(2021, 1, 2, 3, 4, 5).unwrap();
        let clock = fixed_clock(instant);
        assert_eq!(clock(), instant);
        assert_eq!(clock(), clock());
    }
}
