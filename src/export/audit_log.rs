use super::locale::format_timestamp_or;
use super::{Column, HeaderLine, LogoPlacement, ReportContext, ReportDocument, Section, HEADER_DARK};
use crate::model::AuditLogEntry;

pub const AUDIT_EMPTY: &str = "Sin registros para exportar.";

/// Bitácora export with the entries exactly as selected by the caller.
pub fn audit_log_report(entries: &[&AuditLogEntry], ctx: &ReportContext) -> ReportDocument {
    let mut doc = ReportDocument::new("Bitácora de actividades", "bitacora.pdf");
    doc.logo = ctx.logo.clone();
    doc.logo_placement = LogoPlacement::Left;
    doc.logo_width_mm = 28.0;
    doc.header = vec![
        HeaderLine::bold(&ctx.institucion, 13.0),
        HeaderLine::plain(&ctx.titulo_sistema, 12.0),
        HeaderLine::plain("BITÁCORA DE ACTIVIDADES", 12.0),
        HeaderLine::plain(format!("Fecha de exportación: {}", ctx.generated_label()), 10.0),
    ];
    doc.metadata = vec![("Registros".into(), entries.len().to_string())];

    let rows = entries
        .iter()
        .map(|e| {
            vec![
                if e.usuario.is_empty() { "-".to_string() } else { e.usuario.clone() },
                if e.accion.is_empty() { "-".to_string() } else { e.accion.clone() },
                format_timestamp_or(e.fecha, &ctx.offset, "-"),
            ]
        })
        .collect();
    doc.sections.push(Section::table(
        None,
        vec![Column::new("Usuario", 2.5), Column::new("Acción", 5.0), Column::new("Fecha", 2.5)],
        rows,
        HEADER_DARK,
        AUDIT_EMPTY,
    ));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::render_pdf;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn ctx() -> ReportContext {
        ReportContext {
            institucion: "Hospital Puerto Cortes".into(),
            titulo_sistema: "SIT - Sistema Inteligente de Tickets".into(),
            ubicacion: "Puerto Cortés, Honduras".into(),
            logo: None,
            offset: FixedOffset::west_opt(6 * 3600).unwrap(),
            generated_at: Utc.with_ymd_and_hms(2026, 10, 18, 15, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_rows_with_defaults() {
        let entries = vec![
            AuditLogEntry {
                id: 1,
                usuario: "admin@hospital.hn".into(),
                accion: "Eliminó ticket #4".into(),
                fecha: Some(Utc.with_ymd_and_hms(2026, 10, 17, 22, 15, 0).unwrap()),
            },
            AuditLogEntry { id: 2, usuario: String::new(), accion: "Exportó la bitácora a PDF".into(), fecha: None },
        ];
        let refs: Vec<&AuditLogEntry> = entries.iter().collect();
        let doc = audit_log_report(&refs, &ctx());

        let Section::Table { rows, .. } = &doc.sections[0] else {
            panic!("expected a table");
        };
        assert_eq!(rows[0], vec!["admin@hospital.hn", "Eliminó ticket #4", "17/10/2026 04:15 p. m."]);
        assert_eq!(rows[1], vec!["-", "Exportó la bitácora a PDF", "-"]);
        assert!(render_pdf(&doc).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn test_empty_log_has_no_table() {
        let doc = audit_log_report(&[], &ctx());
        assert!(!doc.has_table());
        assert_eq!(doc.sections, vec![Section::Placeholder(AUDIT_EMPTY.into())]);
    }
}
