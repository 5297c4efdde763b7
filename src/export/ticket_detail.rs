use super::locale::{format_timestamp, format_timestamp_or};
use super::{HeaderLine, LogoPlacement, ReportContext, ReportDocument, Section, HEADER_DARK, STATE_GREEN};
use crate::model::{collapse_whitespace, Status, Ticket};

fn state_title(estado: Status) -> &'static str {
    match estado {
        Status::Pending => "Ticket pendiente",
        Status::InProgress => "Ticket en proceso",
        Status::Closed => "Ticket cerrado",
        Status::Deleted => "Ticket eliminado",
    }
}

fn dash(value: &str) -> String {
    let v = collapse_whitespace(value);
    if v.is_empty() {
        "-".to_string()
    } else {
        v
    }
}

pub fn ticket_file_name(t: &Ticket) -> String {
    format!("ticket_{}.pdf", t.display_number())
}

/// Printable work order for one ticket, signed by the technician and the requester.
pub fn ticket_sheet(t: &Ticket, ctx: &ReportContext) -> ReportDocument {
    let mut doc = ReportDocument::new(format!("Ticket {}", t.display_number()), ticket_file_name(t));
    doc.logo = ctx.logo.clone();
    doc.logo_placement = LogoPlacement::Left;
    doc.logo_width_mm = 28.0;
    doc.margin_mm = 10.0;
    doc.header = vec![
        HeaderLine::bold(ctx.titulo_sistema.to_uppercase(), 14.0),
        HeaderLine::plain(&ctx.ubicacion, 11.0),
        HeaderLine::bold(state_title(t.estado), 12.0).colored(STATE_GREEN),
        HeaderLine::plain(format!("TICKET N° {}", t.display_number()), 12.0),
    ];

    let solicitante = vec![
        ("Fecha de creación".to_string(), format_timestamp_or(t.fecha, &ctx.offset, "-")),
        ("Departamento".to_string(), dash(&t.departamento)),
        ("Responsable".to_string(), dash(&t.creado_por)),
        ("Asunto".to_string(), dash(&t.asunto)),
        ("Descripción".to_string(), dash(&t.descripcion)),
    ];

    let fin = match t.fecha_cierre {
        Some(c) => format_timestamp(c, &ctx.offset),
        None => ctx.generated_label(),
    };
    let solucion = if t.solucion.trim().is_empty() {
        "Pendiente de cierre".to_string()
    } else {
        collapse_whitespace(&t.solucion)
    };
    let mantenimiento = vec![
        ("Inicio".to_string(), format_timestamp_or(t.fecha_primer_respuesta, &ctx.offset, "-")),
        ("Fin".to_string(), fin),
        (
            "Técnico asignado".to_string(),
            t.tecnico().map_or_else(|| "No asignado".to_string(), str::to_string),
        ),
        ("Prioridad".to_string(), t.prioridad.label().to_string()),
        ("Solución".to_string(), solucion),
    ];

    doc.sections = vec![
        Section::KeyValue {
            title: "Datos del solicitante".into(),
            rows: solicitante,
            header_fill: HEADER_DARK,
        },
        Section::KeyValue {
            title: "Datos de mantenimiento".into(),
            rows: mantenimiento,
            header_fill: HEADER_DARK,
        },
        Section::Signatures(vec![
            "Firma Responsable de Mantenimiento".into(),
            "Firma del Solicitante".into(),
        ]),
    ];
    doc.footer_note = Some(format!("Generado por SIT • {}", ctx.generated_label()));
    doc
}
