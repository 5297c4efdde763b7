use super::{Column, HeaderLine, ReportContext, ReportDocument, Section, HEADER_BLUE};
use crate::filter::sort_tickets;
use crate::model::{Status, Ticket};

/// Tab of the ticket list the export was requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListTab {
    /// Everything except deleted tickets.
    #[default]
    Todos,
    Pendiente,
    Proceso,
    Cerrado,
    Eliminado,
}

impl ListTab {
    pub fn label(self) -> &'static str {
        match self {
            ListTab::Todos => "Todos",
            ListTab::Pendiente => "Pendiente",
            ListTab::Proceso => "Proceso",
            ListTab::Cerrado => "Cerrado",
            ListTab::Eliminado => "Eliminado",
        }
    }

    pub fn from_status(status: Option<Status>) -> Self {
        match status {
            None => ListTab::Todos,
            Some(Status::Pending) => ListTab::Pendiente,
            Some(Status::InProgress) => ListTab::Proceso,
            Some(Status::Closed) => ListTab::Cerrado,
            Some(Status::Deleted) => ListTab::Eliminado,
        }
    }

    pub fn includes(self, status: Status) -> bool {
        match self {
            ListTab::Todos => status != Status::Deleted,
            ListTab::Pendiente => status == Status::Pending,
            ListTab::Proceso => status == Status::InProgress,
            ListTab::Cerrado => status == Status::Closed,
            ListTab::Eliminado => status == Status::Deleted,
        }
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// The printed list: tickets of `tab`, in list order.
pub fn ticket_list_report(tickets: &[&Ticket], tab: ListTab, ctx: &ReportContext) -> ReportDocument {
    let mut selected: Vec<&Ticket> = tickets.iter().copied().filter(|t| tab.includes(t.estado)).collect();
    sort_tickets(&mut selected);

    let rows: Vec<Vec<String>> = selected
        .iter()
        .map(|t| {
            vec![
                t.display_number(),
                or_default(&t.asunto, "-"),
                or_default(&t.departamento, "N/A"),
                or_default(&t.categoria, "N/A"),
                t.tecnico().map_or_else(|| "No asignado".to_string(), str::to_string),
                t.prioridad.label().to_string(),
                t.estado.label().to_string(),
            ]
        })
        .collect();

    let file_name = format!("reporte_tickets_{}.pdf", tab.label().to_lowercase());
    let mut doc = ReportDocument::new(format!("Reporte de Tickets - {}", tab.label()), file_name);
    doc.logo = ctx.logo.clone();
    doc.header = vec![
        HeaderLine::bold(ctx.titulo_sistema.to_uppercase(), 14.0),
        HeaderLine::plain(&ctx.ubicacion, 10.0),
        HeaderLine::bold(format!("Reporte de Tickets - {}", tab.label()), 12.0),
        HeaderLine::plain(format!("Generado el {}", ctx.generated_label()), 9.0),
    ];
    doc.metadata = vec![("Total de tickets".into(), rows.len().to_string())];
    doc.sections.push(Section::table(
        None,
        vec![
            Column::new("ID", 1.0),
            Column::new("Asunto", 3.2),
            Column::new("Departamento", 2.2),
            Column::new("Categoría", 2.0),
            Column::new("Técnico", 2.4),
            Column::new("Prioridad", 1.6),
            Column::new("Estado", 1.6),
        ],
        rows,
        HEADER_BLUE,
        "No hay tickets para exportar.",
    ));
    doc
}
