use chrono::Utc;

use super::{load_ticket, record_audit, Session};
use crate::db::queries;
use crate::error::AppError;
use crate::filter::{build_inbox, InboxEntry};
use crate::model::{Action, ChatMessage, MessageKind, Ticket};
use crate::state::{AppState, DbAccess};
use crate::workflow::{self, AuditEvent};

fn chat_ticket(state: &AppState, session: &Session, reference: &str) -> Result<Ticket, AppError> {
    session.require(Action::Chat)?;
    let t = load_ticket(state, reference)?;
    if !session.can_see(&t) {
        return Err(AppError::TicketNotFound(reference.to_string()));
    }
    Ok(t)
}

/// Conversations of every ticket the session can see, with unread counts.
pub fn inbox(state: &AppState, session: &Session) -> Result<Vec<InboxEntry>, AppError> {
    session.require(Action::Chat)?;
    let (tickets, messages) = state.db(|conn| {
        Ok::<_, rusqlite::Error>((queries::list_tickets(conn)?, queries::list_all_chat_messages(conn)?))
    })?;
    let visible: Vec<Ticket> = tickets.into_iter().filter(|t| session.can_see(t)).collect();
    Ok(build_inbox(&visible, &messages, &session.correo))
}

/// Text message; the author counts as having read it.
pub fn send_message(state: &AppState, session: &Session, reference: &str, texto: &str) -> Result<ChatMessage, AppError> {
    let t = chat_ticket(state, session, reference)?;
    workflow::ensure_accepts_messages(&t)?;
    let texto = texto.trim();
    if texto.is_empty() {
        return Err(AppError::validation("El mensaje está vacío"));
    }

    let mut message = ChatMessage {
        id: 0,
        ticket_id: t.id.clone(),
        autor: session.correo.clone(),
        tipo: MessageKind::Text,
        mensaje: Some(texto.to_string()),
        imagen_url: None,
        fecha: Some(Utc::now()),
        leido_por: vec![session.correo.clone()],
    };
    message.id = state.db(|conn| queries::insert_chat_message(conn, &message))?;
    record_audit(state, session, AuditEvent::ChatMessageSent { numero: &t.display_number() });
    Ok(message)
}

/// Marks the whole conversation as read by the session; returns the updated message count.
pub fn mark_read(state: &AppState, session: &Session, reference: &str) -> Result<usize, AppError> {
    let t = chat_ticket(state, session, reference)?;
    state.db_mut(|conn| queries::mark_chat_read(conn, &t.id, &session.correo))
}

pub fn messages(state: &AppState, session: &Session, reference: &str) -> Result<Vec<ChatMessage>, AppError> {
    let t = chat_ticket(state, session, reference)?;
    state.db(|conn| queries::list_chat_messages(conn, &t.id))
}
