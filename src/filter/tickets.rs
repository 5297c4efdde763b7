use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::paging::{clamp_page, page_slice, PageInfo};
use super::range::{resolve_window, DateWindow, QuickRange};
use super::FilterContext;
use crate::model::{normalize_text, same_identity, Priority, Status, Ticket};

/// Field searched by the free-text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Asunto,
    Descripcion,
    Departamento,
    Categoria,
    Tecnico,
    CreadoPor,
}

impl std::str::FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_text(s).as_str() {
            "asunto" | "subject" => Ok(SearchField::Asunto),
            "descripcion" | "description" => Ok(SearchField::Descripcion),
            "departamento" | "department" => Ok(SearchField::Departamento),
            "categoria" | "category" => Ok(SearchField::Categoria),
            "tecnico" | "tecnicoasignado" | "technician" | "assignee" => Ok(SearchField::Tecnico),
            "creadopor" | "creator" => Ok(SearchField::CreadoPor),
            other => Err(format!("Campo de búsqueda desconocido: {}", other)),
        }
    }
}

fn field_value(t: &Ticket, field: SearchField) -> &str {
    match field {
        SearchField::Asunto => &t.asunto,
        SearchField::Descripcion => &t.descripcion,
        SearchField::Departamento => &t.departamento,
        SearchField::Categoria => &t.categoria,
        SearchField::Tecnico => t.tecnico().unwrap_or(""),
        SearchField::CreadoPor => &t.creado_por,
    }
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub quick_range: Option<QuickRange>,
    pub text: Option<String>,
    pub field: Option<SearchField>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
}

impl TicketFilter {
    pub fn window(&self, ctx: &FilterContext) -> Option<DateWindow> {
        resolve_window(self.date_start, self.date_end, self.quick_range, ctx.today)
    }
}

fn matches_text(t: &Ticket, needle: &str, field: Option<SearchField>) -> bool {
    match field {
        Some(f) => normalize_text(field_value(t, f)).contains(needle),
        None => {
            normalize_text(&t.asunto).contains(needle)
                || normalize_text(&t.descripcion).contains(needle)
        }
    }
}

/// Applies every criterion; the result keeps the input order.
/// Without a status criterion, deleted tickets are left out.
pub fn filter_tickets<'a>(
    tickets: &'a [Ticket],
    filter: &TicketFilter,
    ctx: &FilterContext,
) -> Vec<&'a Ticket> {
    let window = filter.window(ctx);
    let needle = filter
        .text
        .as_deref()
        .map(normalize_text)
        .filter(|n| !n.is_empty());
    let assignee = filter
        .assignee
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());

    tickets
        .iter()
        .filter(|t| match filter.status {
            Some(status) => t.estado == status,
            None => t.estado != Status::Deleted,
        })
        .filter(|t| filter.priority.map_or(true, |p| t.prioridad == p))
        .filter(|t| match assignee {
            Some(a) => t.tecnico().is_some_and(|tec| same_identity(tec, a)),
            None => true,
        })
        .filter(|t| match &needle {
            Some(n) => matches_text(t, n, filter.field),
            None => true,
        })
        .filter(|t| match &window {
            Some(w) => t.fecha.is_some_and(|f| w.contains_utc(f, &ctx.offset)),
            None => true,
        })
        .collect()
}

/// Default list ordering: status rank (closed last), priority rank, newest first.
pub fn compare_tickets(a: &Ticket, b: &Ticket) -> Ordering {
    a.estado
        .rank()
        .cmp(&b.estado.rank())
        .then_with(|| a.prioridad.rank().cmp(&b.prioridad.rank()))
        .then_with(|| b.fecha.cmp(&a.fecha))
}

pub fn sort_tickets<T: Borrow<Ticket>>(list: &mut [T]) {
    list.sort_by(|a, b| compare_tickets(a.borrow(), b.borrow()));
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounters {
    pub abiertos: usize,
    pub en_proceso: usize,
    pub cerrados: usize,
}

pub fn count_by_status<T: Borrow<Ticket>>(tickets: &[T]) -> StatusCounters {
    let mut c = StatusCounters::default();
    for t in tickets {
        match t.borrow().estado {
            Status::Pending => c.abiertos += 1,
            Status::InProgress => c.en_proceso += 1,
            Status::Closed => c.cerrados += 1,
            Status::Deleted => {}
        }
    }
    c
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentCount {
    pub departamento: String,
    pub total: usize,
}

/// Tickets per department, busiest first (ties alphabetical). Blank departments are skipped.
pub fn rank_departments<T: Borrow<Ticket>>(tickets: &[T]) -> Vec<DepartmentCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in tickets {
        let dept = t.borrow().departamento.trim();
        if !dept.is_empty() {
            *counts.entry(dept).or_insert(0) += 1;
        }
    }
    let mut ranking: Vec<DepartmentCount> = counts
        .into_iter()
        .map(|(departamento, total)| DepartmentCount {
            departamento: departamento.to_string(),
            total,
        })
        .collect();
    ranking.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.departamento.cmp(&b.departamento))
    });
    ranking
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketListView {
    pub tickets: Vec<Ticket>,
    pub pagination: PageInfo,
    pub counters: StatusCounters,
    pub ranking: Vec<DepartmentCount>,
    pub window: Option<DateWindow>,
}

/// Filter → sort → counters/ranking over the filtered set → page.
pub fn build_ticket_view(
    tickets: &[Ticket],
    filter: &TicketFilter,
    ctx: &FilterContext,
    requested_page: usize,
    page_size: usize,
) -> TicketListView {
    let mut filtered = filter_tickets(tickets, filter, ctx);
    sort_tickets(&mut filtered);

    let pagination = clamp_page(requested_page, filtered.len(), page_size);
    let page = page_slice(&filtered, &pagination)
        .iter()
        .map(|t| (*t).clone())
        .collect();

    TicketListView {
        tickets: page,
        pagination,
        counters: count_by_status(&filtered),
        ranking: rank_departments(&filtered),
        window: filter.window(ctx),
    }
}
