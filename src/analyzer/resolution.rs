//! Closed-ticket analytics: response and resolution averages, monthly
//! trends, status distribution and per-department counts.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;

use super::stats::{percentil, promedio_positivo};
use super::temporal::{month_key, month_label};
use crate::filter::range::{to_local, DateWindow};
use crate::filter::DepartmentCount;
use crate::model::{Status, Ticket};

const SIN_DEPARTAMENTO: &str = "N/D";

/// "2d 3h", "4h 10m", "35m"; "N/A" when unknown or not positive.
pub fn duracion_humana(d: Option<Duration>) -> String {
    let Some(d) = d.filter(|d| *d > Duration::zero()) else {
        return "N/A".to_string();
    };
    let min = d.num_minutes();
    let h = min / 60;
    let days = h / 24;
    if days > 0 {
        format!("{}d {}h", days, h % 24)
    } else if h > 0 {
        format!("{}h {}m", h, min % 60)
    } else {
        format!("{}m", min)
    }
}

fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 60.0
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}

/// First-response delay in minutes.
pub fn response_minutes(t: &Ticket) -> Option<f64> {
    Some(minutes_between(t.fecha?, t.fecha_primer_respuesta?))
}

/// Creation → closure in hours.
pub fn resolution_hours(t: &Ticket) -> Option<f64> {
    Some(hours_between(t.fecha?, t.fecha_cierre?))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedTicketRow {
    pub numero: String,
    pub asunto: String,
    pub departamento: String,
    pub tecnico: Option<String>,
    pub fecha_creacion: Option<DateTime<Utc>>,
    pub fecha_cierre: Option<DateTime<Utc>>,
    pub tiempo_resolucion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAverage {
    pub mes: String,
    pub etiqueta: String,
    pub promedio: f64,
    pub muestras: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDistribution {
    pub pendiente: usize,
    pub proceso: usize,
    pub cerrado: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedReport {
    pub window: Option<DateWindow>,
    pub total_cerrados: usize,
    /// In-progress tickets over the whole set, not only the window.
    pub en_proceso: usize,
    pub promedio_respuesta_min: Option<f64>,
    pub promedio_resolucion_h: Option<f64>,
    pub mediana_resolucion_h: Option<f64>,
    pub distribucion: StatusDistribution,
    pub por_departamento: Vec<DepartmentCount>,
    pub respuesta_por_mes: Vec<MonthlyAverage>,
    pub resolucion_por_mes: Vec<MonthlyAverage>,
    pub filas: Vec<ClosedTicketRow>,
}

/// Closed tickets with a closure date inside `window` (any closure date when `None`).
pub fn closed_in_window<'a>(
    tickets: &'a [Ticket],
    window: Option<&DateWindow>,
    offset: &FixedOffset,
) -> Vec<&'a Ticket> {
    tickets
        .iter()
        .filter(|t| t.estado == Status::Closed)
        .filter(|t| match (t.fecha_cierre, window) {
            (None, _) => false,
            (Some(c), Some(w)) => w.contains_utc(c, offset),
            (Some(_), None) => true,
        })
        .collect()
}

pub fn status_distribution(tickets: &[Ticket]) -> StatusDistribution {
    let mut d = StatusDistribution::default();
    for t in tickets {
        match t.estado {
            Status::Pending => d.pendiente += 1,
            Status::InProgress => d.proceso += 1,
            Status::Closed => d.cerrado += 1,
            Status::Deleted => {}
        }
    }
    d
}

fn department_counts(closed: &[&Ticket]) -> Vec<DepartmentCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in closed {
        let d = t.departamento.trim();
        let d = if d.is_empty() { SIN_DEPARTAMENTO } else { d };
        *counts.entry(d).or_insert(0) += 1;
    }
    let mut out: Vec<DepartmentCount> = counts
        .into_iter()
        .map(|(d, total)| DepartmentCount {
            departamento: d.to_string(),
            total,
        })
        .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.departamento.cmp(&b.departamento)));
    out
}

/// Averages grouped by month key, ascending. Non-positive samples are dropped.
fn monthly_averages(samples: impl Iterator<Item = (String, f64)>) -> Vec<MonthlyAverage> {
    let mut by_month: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (key, v) in samples {
        if v > 0.0 {
            by_month.entry(key).or_default().push(v);
        }
    }
    by_month
        .into_iter()
        .filter_map(|(mes, values)| {
            let promedio = promedio_positivo(&values)?;
            Some(MonthlyAverage {
                etiqueta: month_label(&mes),
                mes,
                promedio,
                muestras: values.len(),
            })
        })
        .collect()
}

pub fn build_closed_report(
    tickets: &[Ticket],
    window: Option<DateWindow>,
    offset: &FixedOffset,
) -> ClosedReport {
    let mut closed = closed_in_window(tickets, window.as_ref(), offset);
    closed.sort_by(|a, b| b.fecha.cmp(&a.fecha));

    let respuestas: Vec<f64> = closed.iter().filter_map(|t| response_minutes(t)).collect();
    let resoluciones: Vec<f64> = closed.iter().filter_map(|t| resolution_hours(t)).collect();
    let resoluciones_positivas: Vec<f64> = resoluciones.iter().copied().filter(|h| *h > 0.0).collect();

    let respuesta_por_mes = monthly_averages(closed.iter().filter_map(|t| {
        let creado = t.fecha?;
        Some((month_key(to_local(creado, offset)), response_minutes(t)?))
    }));
    let resolucion_por_mes = monthly_averages(closed.iter().filter_map(|t| {
        let cierre = t.fecha_cierre?;
        Some((month_key(to_local(cierre, offset)), resolution_hours(t)?))
    }));

    let filas = closed
        .iter()
        .map(|t| ClosedTicketRow {
            numero: t.display_number(),
            asunto: t.asunto.clone(),
            departamento: t.departamento.clone(),
            tecnico: t.tecnico_asignado.clone(),
            fecha_creacion: t.fecha,
            fecha_cierre: t.fecha_cierre,
            tiempo_resolucion: duracion_humana(t.fecha.zip(t.fecha_cierre).map(|(a, b)| b - a)),
        })
        .collect();

    let distribucion = status_distribution(tickets);

    ClosedReport {
        window,
        total_cerrados: closed.len(),
        en_proceso: distribucion.proceso,
        promedio_respuesta_min: promedio_positivo(&respuestas),
        promedio_resolucion_h: promedio_positivo(&resoluciones),
        mediana_resolucion_h: if resoluciones_positivas.is_empty() {
            None
        } else {
            Some(percentil(&resoluciones_positivas, 50.0))
        },
        distribucion,
        por_departamento: department_counts(&closed),
        respuesta_por_mes,
        resolucion_por_mes,
        filas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn offset() -> FixedOffset {
        FixedOffset::west_opt(6 * 3600).unwrap()
    }

    fn utc(m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, m, d, h, min, 0).unwrap()
    }

    fn closed(id: &str, dept: &str, created: DateTime<Utc>, first: Option<DateTime<Utc>>, closed: DateTime<Utc>) -> Ticket {
        let mut t: Ticket = serde_json::from_str(&format!(r#"{{"id": "{}"}}"#, id)).unwrap();
        t.estado = Status::Closed;
        t.departamento = dept.into();
        t.fecha = Some(created);
        t.fecha_primer_respuesta = first;
        t.fecha_cierre = Some(closed);
        t
    }

    fn with_status(id: &str, estado: Status) -> Ticket {
        let mut t: Ticket = serde_json::from_str(&format!(r#"{{"id": "{}"}}"#, id)).unwrap();
        t.estado = estado;
        t
    }

    fn october() -> DateWindow {
        DateWindow::days(
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
        )
    }

    #[test]
    fn test_duracion_humana() {
        assert_eq!(duracion_humana(Some(Duration::minutes(35))), "35m");
        assert_eq!(duracion_humana(Some(Duration::minutes(4 * 60 + 10))), "4h 10m");
        assert_eq!(duracion_humana(Some(Duration::hours(51))), "2d 3h");
        assert_eq!(duracion_humana(Some(Duration::zero())), "N/A");
        assert_eq!(duracion_humana(Some(Duration::minutes(-5))), "N/A");
        assert_eq!(duracion_humana(None), "N/A");
    }

    #[test]
    fn test_closed_in_window_uses_local_closure_date() {
        let tickets = vec![
            // 1 Nov 03:00 UTC = 31 Oct 21:00 local → inside October
            closed("a", "IT", utc(10, 30, 15, 0), None, utc(11, 1, 3, 0)),
            // 1 Oct 04:00 UTC = 30 Sep 22:00 local → outside
            closed("b", "IT", utc(9, 29, 15, 0), None, utc(10, 1, 4, 0)),
            with_status("c", Status::InProgress),
        ];
        let w = october();
        let list = closed_in_window(&tickets, Some(&w), &offset());
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "a");
        assert_eq!(closed_in_window(&tickets, None, &offset()).len(), 2);
    }

    #[test]
    fn test_report_averages_only_positive_durations() {
        let tickets = vec![
            // response 30 min, resolution 2 h
            closed("1", "EMERGENCIA", utc(10, 5, 14, 0), Some(utc(10, 5, 14, 30)), utc(10, 5, 16, 0)),
            // response 90 min, resolution 6 h
            closed("2", "EMERGENCIA", utc(10, 6, 14, 0), Some(utc(10, 6, 15, 30)), utc(10, 6, 20, 0)),
            // bad data: first response before creation, closure equal to creation
            closed("3", "", utc(10, 7, 14, 0), Some(utc(10, 7, 13, 0)), utc(10, 7, 14, 0)),
            with_status("4", Status::InProgress),
            with_status("5", Status::InProgress),
            with_status("6", Status::Pending),
        ];
        let r = build_closed_report(&tickets, Some(october()), &offset());

        assert_eq!(r.total_cerrados, 3);
        assert_eq!(r.en_proceso, 2);
        assert!((r.promedio_respuesta_min.unwrap() - 60.0).abs() < 1e-9);
        assert!((r.promedio_resolucion_h.unwrap() - 4.0).abs() < 1e-9);
        assert!((r.mediana_resolucion_h.unwrap() - 4.0).abs() < 1e-9);
        assert_eq!(r.distribucion, StatusDistribution { pendiente: 1, proceso: 2, cerrado: 3 });

        assert_eq!(r.por_departamento[0].departamento, "EMERGENCIA");
        assert_eq!(r.por_departamento[0].total, 2);
        assert_eq!(r.por_departamento[1].departamento, "N/D");

        assert_eq!(r.filas[0].numero, "3");
        assert_eq!(r.filas[0].tiempo_resolucion, "N/A");
        assert_eq!(r.filas[2].tiempo_resolucion, "2h 0m");
    }

    #[test]
    fn test_report_without_samples() {
        let tickets = vec![with_status("1", Status::Pending)];
        let r = build_closed_report(&tickets, Some(october()), &offset());
        assert_eq!(r.total_cerrados, 0);
        assert!(r.promedio_respuesta_min.is_none());
        assert!(r.promedio_resolucion_h.is_none());
        assert!(r.mediana_resolucion_h.is_none());
        assert!(r.filas.is_empty());
        assert!(r.respuesta_por_mes.is_empty());
    }

    #[test]
    fn test_monthly_averages_sorted_by_key() {
        let tickets = vec![
            closed("1", "IT", utc(10, 2, 14, 0), Some(utc(10, 2, 14, 20)), utc(10, 2, 18, 0)),
            // created in September, closed in October
            closed("2", "IT", utc(9, 20, 14, 0), Some(utc(9, 20, 15, 0)), utc(10, 3, 14, 0)),
        ];
        let r = build_closed_report(&tickets, None, &offset());

        let keys: Vec<&str> = r.respuesta_por_mes.iter().map(|m| m.mes.as_str()).collect();
        assert_eq!(keys, vec!["2026-09", "2026-10"]);
        assert_eq!(r.respuesta_por_mes[0].etiqueta, "sept 2026");
        assert!((r.respuesta_por_mes[0].promedio - 60.0).abs() < 1e-9);

        assert_eq!(r.resolucion_por_mes.len(), 1);
        assert_eq!(r.resolucion_por_mes[0].mes, "2026-10");
        assert_eq!(r.resolucion_por_mes[0].muestras, 2);
    }

    #[test]
    fn test_monthly_averages_skip_non_positive_samples() {
        let tickets = vec![
            closed("1", "IT", utc(10, 2, 14, 0), Some(utc(10, 2, 14, 40)), utc(10, 2, 16, 0)),
            // first response logged before creation, closed at creation
            closed("2", "IT", utc(10, 4, 14, 0), Some(utc(10, 4, 13, 0)), utc(10, 4, 14, 0)),
            // the only September sample is invalid
            closed("3", "IT", utc(9, 10, 14, 0), Some(utc(9, 10, 14, 0)), utc(10, 5, 14, 0)),
        ];
        let r = build_closed_report(&tickets, None, &offset());

        assert_eq!(r.respuesta_por_mes.len(), 1);
        assert_eq!(r.respuesta_por_mes[0].mes, "2026-10");
        assert_eq!(r.respuesta_por_mes[0].muestras, 1);
        assert!((r.respuesta_por_mes[0].promedio - 40.0).abs() < 1e-9);
        assert_eq!(r.resolucion_por_mes[0].muestras, 2);
    }
}
