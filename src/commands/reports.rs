use std::path::Path;
use std::time::Instant;

use chrono::{NaiveDate, Utc};

use super::{record_audit, write_export, ExportResult, Session};
use crate::analyzer::{build_closed_report, ClosedReport};
use crate::config::get_config_from_db;
use crate::db::queries;
use crate::error::AppError;
use crate::export::closed_report::closed_tickets_report;
use crate::export::xlsx::analytics_workbook;
use crate::export::{render_pdf, ReportContext};
use crate::filter::{resolve_window, DateWindow, FilterContext, QuickRange};
use crate::model::Action;
use crate::state::{AppState, DbAccess};
use crate::workflow::AuditEvent;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportPeriod {
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub quick_range: Option<QuickRange>,
    /// Ignore the window and report every closed ticket.
    pub all_history: bool,
}

impl ReportPeriod {
    pub fn all_history() -> Self {
        ReportPeriod { all_history: true, ..Default::default() }
    }

    /// With no dates and no quick range the report covers the current month.
    pub fn window(&self, today: NaiveDate) -> Option<DateWindow> {
        if self.all_history {
            return None;
        }
        let range = match (self.date_start, self.date_end, self.quick_range) {
            (None, None, None) => Some(QuickRange::ThisMonth),
            (_, _, range) => range,
        };
        resolve_window(self.date_start, self.date_end, range, today)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Pdf,
    Xlsx,
}

impl ReportFormat {
    /// From the output file extension; anything but `.xlsx` is PDF.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => ReportFormat::Xlsx,
            _ => ReportFormat::Pdf,
        }
    }
}

pub fn closed_report(state: &AppState, session: &Session, period: &ReportPeriod) -> Result<ClosedReport, AppError> {
    session.require(Action::ExportReports)?;
    let config = state.db(get_config_from_db)?;
    let tickets = state.db(queries::list_tickets)?;
    let ctx = FilterContext::now(config.offset());
    let window = period.window(ctx.today);
    Ok(build_closed_report(&tickets, window, &ctx.offset))
}

pub fn export_closed_report(
    state: &AppState,
    session: &Session,
    period: &ReportPeriod,
    out: &Path,
) -> Result<ExportResult, AppError> {
    let start = Instant::now();
    let report = closed_report(state, session, period)?;
    let config = state.db(get_config_from_db)?;

    let (titulo, bytes) = match ReportFormat::from_path(out) {
        ReportFormat::Pdf => {
            let ctx = ReportContext::from_config(&config, Utc::now());
            let doc = closed_tickets_report(&report, &ctx);
            (format!("{} (PDF)", doc.title), render_pdf(&doc)?)
        }
        ReportFormat::Xlsx => (
            "Reporte de Tickets Cerrados (Excel)".to_string(),
            analytics_workbook(&report, &config.offset())?,
        ),
    };
    let result = write_export(out, &bytes, start)?;
    record_audit(state, session, AuditEvent::ReportExported { titulo: &titulo });
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::tickets::{assign_ticket, close_ticket, create_ticket};
    use super::*;
    use crate::model::{NewTicket, Priority, Role, UserAccount};

    fn seed_closed(state: &AppState) {
        state
            .db(|conn| {
                queries::upsert_user(
                    conn,
                    &UserAccount {
                        id: "u-tec".into(),
                        nombre: "Técnico".into(),
                        dni: "0501199012345".into(),
                        correo: "tec@hospital.hn".into(),
                        departamento: "IT".into(),
                        rol: Role::Technician,
                        creado_en: None,
                    },
                )
            })
            .unwrap();
        let input = NewTicket {
            asunto: "Servidor".into(),
            descripcion: "Sin respuesta".into(),
            departamento: "LABORATORIO".into(),
            ..Default::default()
        };
        create_ticket(state, &usuario(), &input).unwrap();
        create_ticket(state, &usuario(), &input).unwrap();
        assign_ticket(state, &admin(), "1", "tec@hospital.hn", Priority::Medium).unwrap();
        close_ticket(state, &tecnico(), "1", "Reinicio").unwrap();
    }

    #[test]
    fn test_closed_report_today() {
        let state = state();
        seed_closed(&state);
        let period = ReportPeriod { quick_range: Some(QuickRange::Today), ..Default::default() };
        let report = closed_report(&state, &admin(), &period).unwrap();
        assert_eq!(report.total_cerrados, 1);
        assert_eq!(report.distribucion.pendiente, 1);
        assert_eq!(report.por_departamento[0].departamento, "LABORATORIO");
        assert!(closed_report(&state, &usuario(), &period).is_err());
    }

    #[test]
    fn test_export_both_formats() {
        let state = state();
        seed_closed(&state);
        let dir = std::env::temp_dir().join(format!("sit-reportes-{}", uuid::Uuid::new_v4()));

        export_closed_report(&state, &tecnico(), &ReportPeriod::default(), &dir.join("cerrados.pdf")).unwrap();
        assert!(std::fs::read(dir.join("cerrados.pdf")).unwrap().starts_with(b"%PDF"));

        export_closed_report(&state, &tecnico(), &ReportPeriod::default(), &dir.join("cerrados.XLSX")).unwrap();
        assert!(std::fs::read(dir.join("cerrados.XLSX")).unwrap().starts_with(b"PK"));
        assert_eq!(audit_lines(&state)[0], "Exportó reporte Reporte de Tickets Cerrados (Excel)");
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_default_period_is_current_month() {
        let state = state();
        seed_closed(&state);
        let mut old: crate::model::Ticket = serde_json::from_str(
            r#"{"id": "viejo", "numero": 90, "asunto": "Mouse", "departamento": "FARMACIA", "estado": "Cerrado",
                "prioridad": "Baja", "tecnicoAsignado": "tec@hospital.hn",
                "fecha": "2020-02-03T10:00:00Z", "fechaCierre": "2020-02-03T12:00:00Z"}"#,
        )
        .unwrap();
        old.solucion = "Cambio".into();
        state.db(|conn| queries::save_ticket(conn, &old)).unwrap();

        let month = closed_report(&state, &admin(), &ReportPeriod::default()).unwrap();
        assert_eq!(month.total_cerrados, 1);
        assert!(month.window.is_some());

        let all = closed_report(&state, &admin(), &ReportPeriod::all_history()).unwrap();
        assert_eq!(all.total_cerrados, 2);
        assert!(all.window.is_none());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ReportFormat::from_path(Path::new("a.xlsx")), ReportFormat::Xlsx);
        assert_eq!(ReportFormat::from_path(Path::new("a.pdf")), ReportFormat::Pdf);
        assert_eq!(ReportFormat::from_path(Path::new("sin_extension")), ReportFormat::Pdf);
    }
}
