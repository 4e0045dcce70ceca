use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

pub const DATE_FORMAT: &str = "%d.%m.%Y";
pub const TIME_FORMAT: &str = "%H:%M";

/// Parse a slot's `DD.MM.YYYY` + `HH:MM` pair into a naive datetime.
pub fn parse_slot_datetime(date: &str, time: &str) -> Result<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| anyhow!("Invalid date '{date}', expected DD.MM.YYYY"))?;
    let time = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
        .map_err(|_| anyhow!("Invalid time '{time}', expected HH:MM"))?;

    Ok(date.and_time(time))
}

/// True when the lesson starts within the open-closed window
/// `(0, threshold_hours]` counted from `now`. Lessons already started (or
/// exactly now) are outside the window.
pub fn within_window(lesson: NaiveDateTime, now: NaiveDateTime, threshold_hours: i64) -> bool {
    let remaining = lesson - now;
    remaining > Duration::zero() && remaining <= Duration::hours(threshold_hours)
}

/// True when the lesson is still more than `lead_hours` away, i.e. the owner
/// is allowed to cancel it themselves.
pub fn outside_lead_time(lesson: NaiveDateTime, now: NaiveDateTime, lead_hours: i64) -> bool {
    lesson - now > Duration::hours(lead_hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%d.%m.%Y %H:%M").unwrap()
    }

    #[test]
    fn test_parse_slot_datetime_valid() {
        let parsed = parse_slot_datetime("28.02.2026", "14:00").unwrap();
        assert_eq!(parsed, dt("28.02.2026 14:00"));
    }

    #[test]
    fn test_parse_slot_datetime_trims() {
        assert!(parse_slot_datetime(" 01.03.2026 ", " 09:30 ").is_ok());
    }

    #[test]
    fn test_parse_slot_datetime_invalid() {
        assert!(parse_slot_datetime("2026-02-28", "14:00").is_err());
        assert!(parse_slot_datetime("31.02.2026", "14:00").is_err());
        assert!(parse_slot_datetime("28.02.2026", "25:00").is_err());
        assert!(parse_slot_datetime("garbage", "14:00").is_err());
        assert!(parse_slot_datetime("", "").is_err());
    }

    #[test]
    fn test_within_window_bounds() {
        let now = dt("01.03.2026 12:00");

        // Open at zero: a lesson starting exactly now is outside.
        assert!(!within_window(now, now, 24));
        // Closed at the threshold.
        assert!(within_window(dt("02.03.2026 12:00"), now, 24));
        // Just past the threshold.
        assert!(!within_window(dt("02.03.2026 12:01"), now, 24));
        // In the past.
        assert!(!within_window(dt("01.03.2026 11:00"), now, 24));
        // Inside.
        assert!(within_window(dt("01.03.2026 13:30"), now, 2));
    }

    #[test]
    fn test_outside_lead_time() {
        let now = dt("01.03.2026 12:00");

        assert!(outside_lead_time(dt("03.03.2026 12:00"), now, 24));
        // Exactly at the lead time is not enough.
        assert!(!outside_lead_time(dt("02.03.2026 12:00"), now, 24));
        assert!(!outside_lead_time(dt("01.03.2026 18:00"), now, 24));
    }
}
