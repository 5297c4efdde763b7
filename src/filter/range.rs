use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

/// Named shortcuts resolving to a local-time window relative to "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickRange {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
    Last90Days,
    ThisMonth,
    ThisYear,
}

impl QuickRange {
    pub const ALL: [QuickRange; 7] = [
        QuickRange::Today,
        QuickRange::Yesterday,
        QuickRange::Last7Days,
        QuickRange::Last30Days,
        QuickRange::Last90Days,
        QuickRange::ThisMonth,
        QuickRange::ThisYear,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QuickRange::Today => "Hoy",
            QuickRange::Yesterday => "Ayer",
            QuickRange::Last7Days => "Últimos 7 días",
            QuickRange::Last30Days => "Últimos 30 días",
            QuickRange::Last90Days => "Últimos 90 días",
            QuickRange::ThisMonth => "Este mes",
            QuickRange::ThisYear => "Este año",
        }
    }
}

impl std::str::FromStr for QuickRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "today" | "hoy" => Ok(QuickRange::Today),
            "yesterday" | "ayer" => Ok(QuickRange::Yesterday),
            "last-7-days" | "7" | "7d" => Ok(QuickRange::Last7Days),
            "last-30-days" | "30" | "30d" => Ok(QuickRange::Last30Days),
            "last-90-days" | "90" | "90d" => Ok(QuickRange::Last90Days),
            "this-month" | "mes" => Ok(QuickRange::ThisMonth),
            "this-year" | "anio" | "año" => Ok(QuickRange::ThisYear),
            other => Err(format!("Rango rápido desconocido: {}", other)),
        }
    }
}

/// Half-open local-time window `[start, end_exclusive)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end_exclusive: NaiveDateTime,
}

fn midnight(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_opt(0, 0, 0).expect("00:00:00 is a valid time")
}

impl DateWindow {
    /// Whole days from `first` to `last` inclusive.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Self {
        let (first, last) = if first <= last { (first, last) } else { (last, first) };
        DateWindow {
            start: midnight(first),
            end_exclusive: midnight(last + Duration::days(1)),
        }
    }

    pub fn contains(&self, local: NaiveDateTime) -> bool {
        local >= self.start && local < self.end_exclusive
    }

    pub fn contains_utc(&self, ts: DateTime<Utc>, offset: &FixedOffset) -> bool {
        self.contains(to_local(ts, offset))
    }
}

/// Wall-clock time at the hospital for a stored UTC timestamp.
pub fn to_local(ts: DateTime<Utc>, offset: &FixedOffset) -> NaiveDateTime {
    ts.with_timezone(offset).naive_local()
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("day 1 exists in every month")
}

pub fn resolve_quick_range(range: QuickRange, today: NaiveDate) -> DateWindow {
    match range {
        QuickRange::Today => DateWindow::days(today, today),
        QuickRange::Yesterday => {
            let ayer = today - Duration::days(1);
            DateWindow::days(ayer, ayer)
        }
        QuickRange::Last7Days => DateWindow::days(today - Duration::days(6), today),
        QuickRange::Last30Days => DateWindow::days(today - Duration::days(29), today),
        QuickRange::Last90Days => DateWindow::days(today - Duration::days(89), today),
        QuickRange::ThisMonth => {
            let start = first_of_month(today.year(), today.month());
            let next = if today.month() == 12 {
                first_of_month(today.year() + 1, 1)
            } else {
                first_of_month(today.year(), today.month() + 1)
            };
            DateWindow {
                start: midnight(start),
                end_exclusive: midnight(next),
            }
        }
        QuickRange::ThisYear => DateWindow {
            start: midnight(first_of_month(today.year(), 1)),
            end_exclusive: midnight(first_of_month(today.year() + 1, 1)),
        },
    }
}

/// Combines manual dates and a quick range; the quick range wins.
/// One manual date alone selects that single day. No input → no window.
pub fn resolve_window(
    date_start: Option<NaiveDate>,
    date_end: Option<NaiveDate>,
    quick_range: Option<QuickRange>,
    today: NaiveDate,
) -> Option<DateWindow> {
    if let Some(range) = quick_range {
        return Some(resolve_quick_range(range, today));
    }
    match (date_start, date_end) {
        (Some(start), Some(end)) => Some(DateWindow::days(start, end)),
        (Some(day), None) | (None, Some(day)) => Some(DateWindow::days(day, day)),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_today_window() {
        let w = resolve_quick_range(QuickRange::Today, d("2026-10-18"));
        assert_eq!(w.start, dt("2026-10-18 00:00:00"));
        assert_eq!(w.end_exclusive, dt("2026-10-19 00:00:00"));
        assert!(w.contains(dt("2026-10-18 23:59:59")));
        assert!(!w.contains(dt("2026-10-19 00:00:00")));
    }

    #[test]
    fn test_yesterday_across_month_boundary() {
        let w = resolve_quick_range(QuickRange::Yesterday, d("2026-03-01"));
        assert_eq!(w.start, dt("2026-02-28 00:00:00"));
        assert_eq!(w.end_exclusive, dt("2026-03-01 00:00:00"));
    }

    #[test]
    fn test_last_7_days_includes_today() {
        let w = resolve_quick_range(QuickRange::Last7Days, d("2026-10-18"));
        assert_eq!(w.start, dt("2026-10-12 00:00:00"));
        assert_eq!(w.end_exclusive, dt("2026-10-19 00:00:00"));
    }

    #[test]
    fn test_this_month_december() {
        let w = resolve_quick_range(QuickRange::ThisMonth, d("2026-12-15"));
        assert_eq!(w.start, dt("2026-12-01 00:00:00"));
        assert_eq!(w.end_exclusive, dt("2027-01-01 00:00:00"));
    }

    #[test]
    fn test_this_year() {
        let w = resolve_quick_range(QuickRange::ThisYear, d("2026-06-30"));
        assert_eq!(w.start, dt("2026-01-01 00:00:00"));
        assert_eq!(w.end_exclusive, dt("2027-01-01 00:00:00"));
    }

    #[test]
    fn test_every_quick_range_is_ordered() {
        for today in [d("2026-01-01"), d("2026-02-28"), d("2028-02-29"), d("2026-12-31")] {
            for range in QuickRange::ALL {
                let w = resolve_quick_range(range, today);
                assert!(w.start <= w.end_exclusive, "{:?} at {}", range, today);
                assert!(w.contains(midnight(today)) || range == QuickRange::Yesterday);
            }
        }
    }

    #[test]
    fn test_quick_range_overrides_manual_dates() {
        let w = resolve_window(
            Some(d("2025-01-01")),
            Some(d("2025-01-31")),
            Some(QuickRange::Today),
            d("2026-10-18"),
        )
        .unwrap();
        assert_eq!(w.start, dt("2026-10-18 00:00:00"));
    }

    #[test]
    fn test_single_manual_date_is_one_day() {
        let w = resolve_window(None, Some(d("2026-05-10")), None, d("2026-10-18")).unwrap();
        assert_eq!(w.start, dt("2026-05-10 00:00:00"));
        assert_eq!(w.end_exclusive, dt("2026-05-11 00:00:00"));
    }

    #[test]
    fn test_reversed_manual_dates_are_swapped() {
        let w = resolve_window(Some(d("2026-05-10")), Some(d("2026-05-01")), None, d("2026-10-18"))
            .unwrap();
        assert_eq!(w.start, dt("2026-05-01 00:00:00"));
        assert_eq!(w.end_exclusive, dt("2026-05-11 00:00:00"));
    }

    #[test]
    fn test_no_criteria_no_window() {
        assert!(resolve_window(None, None, None, d("2026-10-18")).is_none());
    }

    #[test]
    fn test_contains_utc_uses_local_offset() {
        let honduras = FixedOffset::west_opt(6 * 3600).unwrap();
        let w = resolve_quick_range(QuickRange::Today, d("2026-10-18"));
        // 2026-10-19 03:00 UTC is still the 18th at 21:00 in Honduras
        let late_evening = Utc.with_ymd_and_hms(2026, 10, 19, 3, 0, 0).unwrap();
        assert!(w.contains_utc(late_evening, &honduras));
        // 2026-10-18 05:00 UTC is the 17th at 23:00 in Honduras
        let previous_day = Utc.with_ymd_and_hms(2026, 10, 18, 5, 0, 0).unwrap();
        assert!(!w.contains_utc(previous_day, &honduras));
    }

    #[test]
    fn test_quick_range_from_str() {
        assert_eq!("hoy".parse::<QuickRange>(), Ok(QuickRange::Today));
        assert_eq!("last-30-days".parse::<QuickRange>(), Ok(QuickRange::Last30Days));
        assert_eq!("mes".parse::<QuickRange>(), Ok(QuickRange::ThisMonth));
        assert!("semana".parse::<QuickRange>().is_err());
    }
}
