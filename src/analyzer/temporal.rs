use chrono::{Datelike, NaiveDateTime};

/// Month bucket key, `YYYY-MM`. Lexicographic order is chronological.
pub fn month_key(dt: NaiveDateTime) -> String {
    format!("{:04}-{:02}", dt.year(), dt.month())
}

/// "2026-10" → "oct 2026". Malformed keys are returned unchanged.
pub fn month_label(key: &str) -> String {
    let parsed = key
        .split_once('-')
        .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)));
    match parsed {
        Some((year, month)) if (1..=12).contains(&month) => {
            format!("{} {}", spanish_month_abbr(month), year)
        }
        _ => key.to_string(),
    }
}

fn spanish_month_abbr(month: u32) -> &'static str {
    match month {
        1 => "ene",
        2 => "feb",
        3 => "mar",
        4 => "abr",
        5 => "may",
        6 => "jun",
        7 => "jul",
        8 => "ago",
        9 => "sept",
        10 => "oct",
        11 => "nov",
        12 => "dic",
        _ => "",
    }
}

pub fn spanish_month_name(month: u32) -> &'static str {
    match month {
        1 => "Enero",
        2 => "Febrero",
        3 => "Marzo",
        4 => "Abril",
        5 => "Mayo",
        6 => "Junio",
        7 => "Julio",
        8 => "Agosto",
        9 => "Septiembre",
        10 => "Octubre",
        11 => "Noviembre",
        12 => "Diciembre",
        _ => "Desconocido",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_month_key_zero_padded() {
        assert_eq!(month_key(dt("2026-03-09 10:00:00")), "2026-03");
        assert_eq!(month_key(dt("2025-12-31 23:59:59")), "2025-12");
    }

    #[test]
    fn test_month_keys_sort_chronologically() {
        let mut keys = vec!["2026-01", "2025-11", "2025-02"];
        keys.sort();
        assert_eq!(keys, vec!["2025-02", "2025-11", "2026-01"]);
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label("2026-10"), "oct 2026");
        assert_eq!(month_label("2025-01"), "ene 2025");
        assert_eq!(month_label("sin-fecha"), "sin-fecha");
        assert_eq!(month_label("2026-13"), "2026-13");
    }

    #[test]
    fn test_spanish_month_name() {
        assert_eq!(spanish_month_name(8), "Agosto");
        assert_eq!(spanish_month_name(0), "Desconocido");
    }
}
