use std::collections::HashSet;

use chrono::NaiveDate;

use super::range::{resolve_window, QuickRange};
use super::FilterContext;
use crate::model::AuditLogEntry;

/// Bitácora filter. Window rules are the ones used for tickets.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub quick_range: Option<QuickRange>,
    /// Exact actor identity.
    pub usuario: Option<String>,
    /// Action prefix, usually one of [`distinct_keywords`].
    pub accion: Option<String>,
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.trim().is_empty())
}

impl AuditFilter {
    pub fn is_active(&self) -> bool {
        self.date_start.is_some()
            || self.date_end.is_some()
            || self.quick_range.is_some()
            || non_blank(&self.usuario).is_some()
            || non_blank(&self.accion).is_some()
    }
}

/// Entries matching every criterion, input order kept. Undated entries never match.
pub fn filter_audit<'a>(
    entries: &'a [AuditLogEntry],
    filter: &AuditFilter,
    ctx: &FilterContext,
) -> Vec<&'a AuditLogEntry> {
    let window = resolve_window(filter.date_start, filter.date_end, filter.quick_range, ctx.today);
    let usuario = non_blank(&filter.usuario);
    let accion = non_blank(&filter.accion);

    entries
        .iter()
        .filter(|e| match (e.fecha, &window) {
            (None, _) => false,
            (Some(f), Some(w)) => w.contains_utc(f, &ctx.offset),
            (Some(_), None) => true,
        })
        .filter(|e| usuario.map_or(true, |u| e.usuario == u))
        .filter(|e| accion.map_or(true, |a| e.accion.starts_with(a)))
        .collect()
}

/// Rows for the PDF: the filtered list, or the whole log when no filter is set.
pub fn entries_for_export<'a>(
    entries: &'a [AuditLogEntry],
    filter: &AuditFilter,
    ctx: &FilterContext,
) -> Vec<&'a AuditLogEntry> {
    if filter.is_active() {
        filter_audit(entries, filter, ctx)
    } else {
        entries.iter().collect()
    }
}

/// Actor identities in first-seen order.
pub fn distinct_users(entries: &[AuditLogEntry]) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .map(|e| e.usuario.as_str())
        .filter(|u| !u.is_empty() && seen.insert(*u))
        .map(str::to_string)
        .collect()
}

/// First word of each action in first-seen order.
pub fn distinct_keywords(entries: &[AuditLogEntry]) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter_map(AuditLogEntry::keyword)
        .filter(|k| seen.insert(*k))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn ctx() -> FilterContext {
        FilterContext {
            today: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            offset: FixedOffset::west_opt(6 * 3600).unwrap(),
        }
    }

    fn entry(id: i64, usuario: &str, accion: &str, day: Option<u32>) -> AuditLogEntry {
        AuditLogEntry {
            id,
            usuario: usuario.into(),
            accion: accion.into(),
            fecha: day.map(|d| Utc.with_ymd_and_hms(2026, 10, d, 16, 0, 0).unwrap()),
        }
    }

    fn sample() -> Vec<AuditLogEntry> {
        vec![
            entry(1, "admin@hospital.hn", "Eliminó ticket #4", Some(18)),
            entry(2, "tec@hospital.hn", "Cerró el ticket #3 con solución", Some(17)),
            entry(3, "admin@hospital.hn", "Asignó prioridad ALTA y técnico tec@hospital.hn al ticket #3", Some(10)),
            entry(4, "admin@hospital.hn", "Eliminó DEFINITIVAMENTE ticket #1", None),
        ]
    }

    fn ids(list: &[&AuditLogEntry]) -> Vec<i64> {
        list.iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_undated_entries_never_match() {
        let log = sample();
        let all = filter_audit(&log, &AuditFilter::default(), &ctx());
        assert_eq!(ids(&all), vec![1, 2, 3]);
    }

    #[test]
    fn test_actor_and_action_prefix() {
        let log = sample();
        let filter = AuditFilter {
            usuario: Some("admin@hospital.hn".into()),
            accion: Some("Eliminó".into()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_audit(&log, &filter, &ctx())), vec![1]);
    }

    #[test]
    fn test_quick_range() {
        let log = sample();
        let filter = AuditFilter {
            quick_range: Some(QuickRange::Last7Days),
            ..Default::default()
        };
        assert_eq!(ids(&filter_audit(&log, &filter, &ctx())), vec![1, 2]);
    }

    #[test]
    fn test_export_uses_full_log_without_filter() {
        let log = sample();
        let inactive = AuditFilter {
            usuario: Some("  ".into()),
            ..Default::default()
        };
        assert!(!inactive.is_active());
        assert_eq!(entries_for_export(&log, &inactive, &ctx()).len(), 4);

        let active = AuditFilter {
            accion: Some("Cerró".into()),
            ..Default::default()
        };
        assert_eq!(ids(&entries_for_export(&log, &active, &ctx())), vec![2]);
    }

    #[test]
    fn test_distinct_menus() {
        let log = sample();
        assert_eq!(distinct_users(&log), vec!["admin@hospital.hn", "tec@hospital.hn"]);
        assert_eq!(distinct_keywords(&log), vec!["Eliminó", "Cerró", "Asignó"]);
    }
}
