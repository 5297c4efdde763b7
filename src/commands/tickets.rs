use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use super::{load_ticket, record_audit, write_export, ExportResult, Session};
use crate::config::get_config_from_db;
use crate::db::queries;
use crate::error::AppError;
use crate::export::ticket_detail::ticket_sheet;
use crate::export::ticket_list::{ticket_list_report, ListTab};
use crate::export::{render_pdf, ReportContext};
use crate::filter::{build_ticket_view, filter_tickets, FilterContext, TicketFilter, TicketListView};
use crate::model::{Action, ChatMessage, Comment, MessageKind, NewTicket, Priority, Status, Ticket};
use crate::state::{AppState, DbAccess};
use crate::workflow::{self, AuditEvent};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub comentarios: Vec<Comment>,
    pub chat: Vec<ChatMessage>,
}

fn visible_ticket(state: &AppState, session: &Session, reference: &str) -> Result<Ticket, AppError> {
    let t = load_ticket(state, reference)?;
    if !session.can_see(&t) {
        return Err(AppError::TicketNotFound(reference.to_string()));
    }
    Ok(t)
}

fn visible_tickets(state: &AppState, session: &Session) -> Result<Vec<Ticket>, AppError> {
    let all = state.db(queries::list_tickets)?;
    Ok(all.into_iter().filter(|t| session.can_see(t)).collect())
}

fn save(state: &AppState, t: &Ticket) -> Result<(), AppError> {
    state.db(|conn| queries::save_ticket(conn, t))?;
    Ok(())
}

pub fn list_tickets(
    state: &AppState,
    session: &Session,
    filter: &TicketFilter,
    page: usize,
) -> Result<TicketListView, AppError> {
    let config = state.db(get_config_from_db)?;
    let tickets = visible_tickets(state, session)?;
    let ctx = FilterContext::now(config.offset());
    Ok(build_ticket_view(&tickets, filter, &ctx, page, config.tickets_por_pagina))
}

pub fn get_ticket(state: &AppState, session: &Session, reference: &str) -> Result<TicketDetail, AppError> {
    let ticket = visible_ticket(state, session, reference)?;
    let (comentarios, chat) = state.db(|conn| {
        Ok::<_, rusqlite::Error>((
            queries::list_comments(conn, &ticket.id)?,
            queries::list_chat_messages(conn, &ticket.id)?,
        ))
    })?;
    Ok(TicketDetail { ticket, comentarios, chat })
}

pub fn create_ticket(state: &AppState, session: &Session, input: &NewTicket) -> Result<Ticket, AppError> {
    session.require(Action::CreateTicket)?;
    let input = workflow::validate_new_ticket(input, session.rol)?;

    let mut ticket = Ticket {
        id: uuid::Uuid::new_v4().to_string(),
        numero: None,
        asunto: input.asunto,
        descripcion: input.descripcion,
        departamento: input.departamento,
        categoria: input.categoria,
        prioridad: input.prioridad,
        estado: Status::Pending,
        creado_por: session.correo.clone(),
        tecnico_asignado: None,
        fecha: Some(Utc::now()),
        fecha_primer_respuesta: None,
        fecha_cierre: None,
        fecha_recuperado: None,
        solucion: String::new(),
        impreso: false,
    };
    let numero = state.db_mut(|conn| queries::insert_new_ticket(conn, &mut ticket))?;
    log::info!("Ticket #{} creado por {}", numero, session.correo);

    record_audit(
        state,
        session,
        AuditEvent::TicketCreated { numero: &numero.to_string(), asunto: &ticket.asunto },
    );
    Ok(ticket)
}

/// The technician must be a registered technician or administrator.
fn check_assignable(state: &AppState, tecnico: &str) -> Result<(), AppError> {
    let user = state
        .db(|conn| queries::find_user_by_email(conn, tecnico))?
        .ok_or_else(|| AppError::UserNotFound(tecnico.trim().to_string()))?;
    if !user.rol.can_be_assigned() {
        return Err(AppError::validation(format!(
            "{} no es técnico ni administrador",
            user.correo
        )));
    }
    Ok(())
}

pub fn assign_ticket(
    state: &AppState,
    session: &Session,
    reference: &str,
    tecnico: &str,
    prioridad: Priority,
) -> Result<Ticket, AppError> {
    session.require(Action::AssignTicket)?;
    let mut t = load_ticket(state, reference)?;
    workflow::assign(&mut t, tecnico, prioridad, Utc::now())?;
    check_assignable(state, tecnico)?;
    save(state, &t)?;

    let numero = t.display_number();
    record_audit(
        state,
        session,
        AuditEvent::TicketAssigned { numero: &numero, prioridad, tecnico: t.tecnico().unwrap_or_default() },
    );
    Ok(t)
}

pub fn reassign_ticket(state: &AppState, session: &Session, reference: &str, tecnico: &str) -> Result<Ticket, AppError> {
    session.require(Action::Reassign)?;
    let mut t = load_ticket(state, reference)?;
    workflow::reassign(&mut t, tecnico)?;
    check_assignable(state, tecnico)?;
    save(state, &t)?;

    let numero = t.display_number();
    record_audit(
        state,
        session,
        AuditEvent::TicketReassigned { numero: &numero, tecnico: t.tecnico().unwrap_or_default() },
    );
    Ok(t)
}

/// Moves a ticket between pending and in-progress. Closing and deleting
/// have their own commands.
pub fn change_status(state: &AppState, session: &Session, reference: &str, estado: Status) -> Result<Ticket, AppError> {
    session.require(Action::ChangeStatus)?;
    let mut t = load_ticket(state, reference)?;
    match estado {
        Status::InProgress => workflow::mark_in_progress(&mut t, Utc::now())?,
        Status::Pending => workflow::reopen(&mut t)?,
        Status::Closed | Status::Deleted => {
            return Err(AppError::validation(format!(
                "Use el comando correspondiente para marcar el ticket como {}",
                estado.label()
            )))
        }
    }
    save(state, &t)?;

    let numero = t.display_number();
    let event = if estado == Status::InProgress {
        AuditEvent::TicketInProgress { numero: &numero }
    } else {
        AuditEvent::TicketReopened { numero: &numero }
    };
    record_audit(state, session, event);
    Ok(t)
}

/// Closes the ticket and posts the solution as a comment and a chat message.
pub fn close_ticket(state: &AppState, session: &Session, reference: &str, solucion: &str) -> Result<Ticket, AppError> {
    session.require(Action::CloseTicket)?;
    let mut t = load_ticket(state, reference)?;
    let now = Utc::now();
    let solucion = workflow::close(&mut t, solucion, now)?;

    let comment = Comment {
        id: 0,
        ticket_id: t.id.clone(),
        usuario: session.correo.clone(),
        texto: workflow::solution_comment(&solucion),
        fecha: Some(now),
    };
    let message = ChatMessage {
        id: 0,
        ticket_id: t.id.clone(),
        autor: session.correo.clone(),
        tipo: MessageKind::Solution,
        mensaje: Some(solucion),
        imagen_url: None,
        fecha: Some(now),
        leido_por: vec![session.correo.clone()],
    };
    state.db_mut(|conn| {
        let tx = conn.transaction()?;
        queries::save_ticket(&tx, &t)?;
        queries::insert_comment(&tx, &comment)?;
        queries::insert_chat_message(&tx, &message)?;
        tx.commit()
    })?;

    let numero = t.display_number();
    record_audit(state, session, AuditEvent::TicketClosed { numero: &numero });
    Ok(t)
}

pub fn delete_ticket(state: &AppState, session: &Session, reference: &str) -> Result<Ticket, AppError> {
    session.require(Action::DeleteTicket)?;
    let mut t = load_ticket(state, reference)?;
    workflow::soft_delete(&mut t)?;
    save(state, &t)?;
    record_audit(state, session, AuditEvent::TicketDeleted { numero: &t.display_number() });
    Ok(t)
}

pub fn recover_ticket(state: &AppState, session: &Session, reference: &str) -> Result<Ticket, AppError> {
    session.require(Action::RecoverTicket)?;
    let mut t = load_ticket(state, reference)?;
    workflow::recover(&mut t, Utc::now())?;
    save(state, &t)?;
    record_audit(state, session, AuditEvent::TicketRecovered { numero: &t.display_number() });
    Ok(t)
}

/// Hard delete, only from the recycle bin.
pub fn purge_ticket(state: &AppState, session: &Session, reference: &str) -> Result<(), AppError> {
    session.require(Action::PurgeTicket)?;
    let t = load_ticket(state, reference)?;
    workflow::ensure_purgeable(&t)?;
    state.db_mut(|conn| queries::purge_ticket(conn, &t.id))?;
    log::info!("Ticket #{} eliminado definitivamente", t.display_number());
    record_audit(state, session, AuditEvent::TicketPurged { numero: &t.display_number() });
    Ok(())
}

pub fn add_comment(state: &AppState, session: &Session, reference: &str, texto: &str) -> Result<Comment, AppError> {
    session.require(Action::Comment)?;
    let t = visible_ticket(state, session, reference)?;
    workflow::ensure_accepts_messages(&t)?;
    let texto = texto.trim();
    if texto.is_empty() {
        return Err(AppError::validation("El comentario está vacío"));
    }

    let mut comment = Comment {
        id: 0,
        ticket_id: t.id.clone(),
        usuario: session.correo.clone(),
        texto: texto.to_string(),
        fecha: Some(Utc::now()),
    };
    comment.id = state.db(|conn| queries::insert_comment(conn, &comment))?;
    record_audit(state, session, AuditEvent::TicketCommented { numero: &t.display_number() });
    Ok(comment)
}

/// Work-order PDF for one ticket; the ticket is flagged as printed.
pub fn print_ticket(state: &AppState, session: &Session, reference: &str, out: &Path) -> Result<ExportResult, AppError> {
    session.require(Action::PrintTicket)?;
    let start = Instant::now();
    let mut t = load_ticket(state, reference)?;
    let config = state.db(get_config_from_db)?;

    let ctx = ReportContext::from_config(&config, Utc::now());
    let bytes = render_pdf(&ticket_sheet(&t, &ctx))?;
    let result = write_export(out, &bytes, start)?;

    workflow::mark_printed(&mut t);
    save(state, &t)?;
    record_audit(state, session, AuditEvent::TicketPrinted { numero: &t.display_number() });
    Ok(result)
}

/// PDF of the filtered list, titled after the status tab.
pub fn export_ticket_list(
    state: &AppState,
    session: &Session,
    filter: &TicketFilter,
    out: &Path,
) -> Result<ExportResult, AppError> {
    session.require(Action::ExportReports)?;
    let start = Instant::now();
    let config = state.db(get_config_from_db)?;
    let tickets = visible_tickets(state, session)?;
    let selected = filter_tickets(&tickets, filter, &FilterContext::now(config.offset()));

    let tab = ListTab::from_status(filter.status);
    let ctx = ReportContext::from_config(&config, Utc::now());
    let doc = ticket_list_report(&selected, tab, &ctx);
    let bytes = render_pdf(&doc)?;
    let result = write_export(out, &bytes, start)?;

    record_audit(state, session, AuditEvent::ReportExported { titulo: &doc.title });
    Ok(result)
}
