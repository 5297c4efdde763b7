use std::collections::BTreeMap;

use chrono::Duration;

use super::locale::{format_count, format_number, format_timestamp_or};
use super::{Column, HeaderLine, ReportContext, ReportDocument, Section, HEADER_BLUE, HEADER_DARK};
use crate::analyzer::ClosedReport;
use crate::analyzer::temporal::month_label;
use crate::filter::DateWindow;

pub const CLOSED_EMPTY: &str = "No hay tickets cerrados en el periodo seleccionado.";

pub fn window_label(window: Option<&DateWindow>) -> String {
    match window {
        None => "Todo el historial".to_string(),
        Some(w) => {
            let last = w.end_exclusive - Duration::days(1);
            format!("{} - {}", w.start.format("%d/%m/%Y"), last.format("%d/%m/%Y"))
        }
    }
}

fn metric(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{} {}", format_number(v, 1), unit))
}

/// Month → (average response minutes, average resolution hours).
fn monthly_rows(report: &ClosedReport) -> Vec<Vec<String>> {
    let mut months: BTreeMap<&str, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for m in &report.respuesta_por_mes {
        months.entry(m.mes.as_str()).or_default().0 = Some(m.promedio);
    }
    for m in &report.resolucion_por_mes {
        months.entry(m.mes.as_str()).or_default().1 = Some(m.promedio);
    }
    months
        .into_iter()
        .map(|(mes, (resp, resol))| vec![month_label(mes), metric(resp, "min"), metric(resol, "h")])
        .collect()
}

/// Closed-ticket analytics for a period.
pub fn closed_tickets_report(report: &ClosedReport, ctx: &ReportContext) -> ReportDocument {
    let mut doc = ReportDocument::new("Reporte de Tickets Cerrados", "reporte_tickets_cerrados.pdf");
    doc.logo = ctx.logo.clone();
    doc.header = vec![
        HeaderLine::bold(&ctx.institucion, 14.0),
        HeaderLine::plain(format!("Dirección: {}", ctx.ubicacion), 10.0),
        HeaderLine::bold("Reporte de Tickets Cerrados", 12.0),
    ];
    doc.metadata = vec![
        ("Periodo".into(), window_label(report.window.as_ref())),
        ("Generado".into(), ctx.generated_label()),
        ("Tickets cerrados".into(), format_count(report.total_cerrados)),
        ("Tickets en proceso".into(), format_count(report.en_proceso)),
        ("Tiempo promedio de respuesta".into(), metric(report.promedio_respuesta_min, "min")),
        ("Tiempo promedio de resolución".into(), metric(report.promedio_resolucion_h, "h")),
        ("Mediana de resolución".into(), metric(report.mediana_resolucion_h, "h")),
    ];

    let d = report.distribucion;
    doc.sections.push(Section::KeyValue {
        title: "Distribución por estado".into(),
        rows: vec![
            ("Pendientes".into(), format_count(d.pendiente)),
            ("En proceso".into(), format_count(d.proceso)),
            ("Cerrados".into(), format_count(d.cerrado)),
        ],
        header_fill: HEADER_DARK,
    });

    if !report.filas.is_empty() {
        doc.sections.push(Section::table(
            Some("Tickets cerrados por departamento".into()),
            vec![Column::new("Departamento", 3.0), Column::new("Cerrados", 1.0)],
            report
                .por_departamento
                .iter()
                .map(|c| vec![c.departamento.clone(), format_count(c.total)])
                .collect(),
            HEADER_BLUE,
            CLOSED_EMPTY,
        ));
        doc.sections.push(Section::table(
            Some("Promedios mensuales".into()),
            vec![
                Column::new("Mes", 2.0),
                Column::new("Respuesta promedio", 2.0),
                Column::new("Resolución promedio", 2.0),
            ],
            monthly_rows(report),
            HEADER_BLUE,
            "Sin datos mensuales.",
        ));
    }

    let rows = report
        .filas
        .iter()
        .map(|f| {
            vec![
                f.numero.clone(),
                f.asunto.clone(),
                format_timestamp_or(f.fecha_creacion, &ctx.offset, "-"),
                format_timestamp_or(f.fecha_cierre, &ctx.offset, "-"),
                f.tiempo_resolucion.clone(),
            ]
        })
        .collect();
    doc.sections.push(Section::table(
        Some("Detalle de tickets cerrados".into()),
        vec![
            Column::new("ID", 1.0),
            Column::new("Asunto", 4.0),
            Column::new("Fecha Creación", 2.6),
            Column::new("Fecha Cierre", 2.6),
            Column::new("Tiempo Resolución", 2.0),
        ],
        rows,
        HEADER_BLUE,
        CLOSED_EMPTY,
    ));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::build_closed_report;
    use crate::export::render_pdf;
    use crate::model::{Status, Ticket};
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    fn offset() -> FixedOffset {
        FixedOffset::west_opt(6 * 3600).unwrap()
    }

    fn ctx() -> ReportContext {
        ReportContext {
            institucion: "Hospital Puerto Cortes".into(),
            titulo_sistema: "SIT - Sistema Inteligente de Tickets".into(),
            ubicacion: "Puerto Cortes, Honduras".into(),
            logo: None,
            offset: offset(),
            generated_at: Utc.with_ymd_and_hms(2026, 10, 18, 15, 0, 0).unwrap(),
        }
    }

    fn closed_ticket() -> Ticket {
        let mut t: Ticket = serde_json::from_str(r#"{"id": "a", "numero": 9, "asunto": "Red caída"}"#).unwrap();
        t.estado = Status::Closed;
        t.departamento = "EMERGENCIA".into();
        t.fecha = Some(Utc.with_ymd_and_hms(2026, 10, 10, 14, 0, 0).unwrap());
        t.fecha_primer_respuesta = Some(Utc.with_ymd_and_hms(2026, 10, 10, 14, 30, 0).unwrap());
        t.fecha_cierre = Some(Utc.with_ymd_and_hms(2026, 10, 10, 17, 0, 0).unwrap());
        t
    }

    #[test]
    fn test_window_label() {
        let w = DateWindow::days(
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        );
        assert_eq!(window_label(Some(&w)), "01/10/2026 - 18/10/2026");
        assert_eq!(window_label(None), "Todo el historial");
    }

    #[test]
    fn test_report_sections_and_metrics() {
        let tickets = vec![closed_ticket()];
        let report = build_closed_report(&tickets, None, &offset());
        let doc = closed_tickets_report(&report, &ctx());

        let meta: Vec<&str> = doc.metadata.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(meta[2], "1");
        assert_eq!(meta[4], "30.0 min");
        assert_eq!(meta[5], "3.0 h");

        let Some(Section::Table { rows, .. }) = doc.sections.last() else {
            panic!("expected the detail table last");
        };
        assert_eq!(rows[0][0], "9");
        assert_eq!(rows[0][4], "3h 0m");
        assert!(render_pdf(&doc).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn test_empty_period() {
        let report = build_closed_report(&[], None, &offset());
        let doc = closed_tickets_report(&report, &ctx());
        assert!(!doc.has_table());
        assert_eq!(doc.sections.last(), Some(&Section::Placeholder(CLOSED_EMPTY.into())));
        assert!(doc.metadata.iter().any(|(_, v)| v == "N/A"));
    }
}
