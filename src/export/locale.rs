//! Spanish (Honduras) formatting for printed reports.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use num_format::{Locale, ToFormattedString};

use crate::filter::range::to_local;

/// `dd/mm/aaaa hh:mm a. m.` / `p. m.`
pub fn format_local(dt: NaiveDateTime) -> String {
    let sufijo = if dt.hour() < 12 { "a. m." } else { "p. m." };
    format!("{} {}", dt.format("%d/%m/%Y %I:%M"), sufijo)
}

pub fn format_timestamp(ts: DateTime<Utc>, offset: &FixedOffset) -> String {
    format_local(to_local(ts, offset))
}

/// Missing timestamps print as `placeholder`.
pub fn format_timestamp_or(ts: Option<DateTime<Utc>>, offset: &FixedOffset, placeholder: &str) -> String {
    ts.map_or_else(|| placeholder.to_string(), |t| format_timestamp(t, offset))
}

pub fn format_date(ts: DateTime<Utc>, offset: &FixedOffset) -> String {
    to_local(ts, offset).format("%d/%m/%Y").to_string()
}

/// `1234.5` → `1,234.5` with a fixed number of decimals.
/// Halves round away from zero (`4321.25` → `4,321.3`).
pub fn format_number(value: f64, decimals: usize) -> String {
    let escala = 10u64.pow(decimals as u32);
    let unidades = (value.abs() * escala as f64).round() as u64;
    let entero = (unidades / escala).to_formatted_string(&Locale::en);

    let mut out = String::new();
    if value < 0.0 && unidades > 0 {
        out.push('-');
    }
    out.push_str(&entero);
    if decimals > 0 {
        out.push_str(&format!(".{:0width$}", unidades % escala, width = decimals));
    }
    out
}

pub fn format_count(n: usize) -> String {
    format_number(n as f64, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn honduras() -> FixedOffset {
        FixedOffset::west_opt(6 * 3600).unwrap()
    }

    #[test]
    fn test_format_timestamp_morning_and_afternoon() {
        let morning = Utc.with_ymd_and_hms(2026, 10, 18, 15, 5, 0).unwrap();
        assert_eq!(format_timestamp(morning, &honduras()), "18/10/2026 09:05 a. m.");
        let evening = Utc.with_ymd_and_hms(2026, 10, 19, 3, 30, 0).unwrap();
        assert_eq!(format_timestamp(evening, &honduras()), "18/10/2026 09:30 p. m.");
    }

    #[test]
    fn test_noon_and_midnight() {
        let noon = Utc.with_ymd_and_hms(2026, 1, 2, 18, 0, 0).unwrap();
        assert_eq!(format_timestamp(noon, &honduras()), "02/01/2026 12:00 p. m.");
        let midnight = Utc.with_ymd_and_hms(2026, 1, 2, 6, 0, 0).unwrap();
        assert_eq!(format_timestamp(midnight, &honduras()), "02/01/2026 12:00 a. m.");
    }

    #[test]
    fn test_placeholder() {
        assert_eq!(format_timestamp_or(None, &honduras(), "-"), "-");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234.5, 1), "1,234.5");
        assert_eq!(format_number(1234567.0, 0), "1,234,567");
        assert_eq!(format_number(999.0, 2), "999.00");
        assert_eq!(format_number(-0.01, 1), "0.0");
        assert_eq!(format_count(12000), "12,000");
    }

    #[test]
    fn test_format_number_rounds_half_away_from_zero() {
        assert_eq!(format_number(-4321.25, 1), "-4,321.3");
        assert_eq!(format_number(4321.25, 1), "4,321.3");
        assert_eq!(format_number(2.5, 0), "3");
        assert_eq!(format_number(0.05, 1), "0.1");
    }
}
