//! Human-readable timestamps for the "last saved" and "last updated" displays.

use chrono::{DateTime, Local, TimeZone};

/// Reserved store key holding the time of the last write made by a writer page.
pub const LAST_SAVED_KEY: &str = "last_saved_timestamp";

/// Format like an en-US locale date string: `10/18/2026, 3:04:05 PM`.
pub fn format_locale<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

pub fn now_locale() -> String {
    format_locale(&Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_afternoon() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 15, 4, 5).unwrap();
        assert_eq!(format_locale(&at), "10/18/2026, 3:04:05 PM");
    }

    #[test]
    fn test_format_midnight() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 9).unwrap();
        assert_eq!(format_locale(&at), "1/2/2026, 12:00:09 AM");
    }
}
