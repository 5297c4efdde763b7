use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{same_identity, ChatMessage, MessageKind, Status, Ticket};

pub const IMAGE_PLACEHOLDER: &str = "🖼 Imagen";
pub const NO_MESSAGES: &str = "Sin mensajes";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub unread: usize,
    pub preview: String,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Messages whose reader set does not include `viewer`.
pub fn unread_count(messages: &[&ChatMessage], viewer: &str) -> usize {
    messages
        .iter()
        .filter(|m| !m.leido_por.iter().any(|r| same_identity(r, viewer)))
        .count()
}

fn preview_of(m: &ChatMessage) -> String {
    let text = m.mensaje.as_deref().map(str::trim).unwrap_or("");
    match m.tipo {
        MessageKind::Image => IMAGE_PLACEHOLDER.to_string(),
        MessageKind::TextImage if text.is_empty() => IMAGE_PLACEHOLDER.to_string(),
        _ => text.to_string(),
    }
}

pub fn summarize_chat(messages: &[&ChatMessage], viewer: &str) -> ChatSummary {
    // max_by_key keeps the last maximum, so undated messages fall back to arrival order
    let latest = messages.iter().max_by_key(|m| m.fecha);
    ChatSummary {
        unread: unread_count(messages, viewer),
        preview: latest.map_or_else(|| NO_MESSAGES.to_string(), |m| preview_of(m)),
        last_message_at: latest.and_then(|m| m.fecha),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    pub ticket_id: String,
    pub numero: String,
    pub asunto: String,
    pub estado: Status,
    #[serde(flatten)]
    pub chat: ChatSummary,
}

/// One entry per non-deleted ticket: closed conversations last, then
/// most recent activity first.
pub fn build_inbox(tickets: &[Ticket], messages: &[ChatMessage], viewer: &str) -> Vec<InboxEntry> {
    let mut by_ticket: HashMap<&str, Vec<&ChatMessage>> = HashMap::new();
    for m in messages {
        by_ticket.entry(m.ticket_id.as_str()).or_default().push(m);
    }

    let mut inbox: Vec<InboxEntry> = tickets
        .iter()
        .filter(|t| t.estado != Status::Deleted)
        .map(|t| {
            let msgs = by_ticket.get(t.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            InboxEntry {
                ticket_id: t.id.clone(),
                numero: t.display_number(),
                asunto: t.asunto.clone(),
                estado: t.estado,
                chat: summarize_chat(msgs, viewer),
            }
        })
        .collect();

    inbox.sort_by(|a, b| {
        let a_closed = a.estado == Status::Closed;
        let b_closed = b.estado == Status::Closed;
        a_closed
            .cmp(&b_closed)
            .then_with(|| b.chat.last_message_at.cmp(&a.chat.last_message_at))
    });
    inbox
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(ticket: &str, tipo: MessageKind, text: Option<&str>, minute: u32, readers: &[&str]) -> ChatMessage {
        ChatMessage {
            id: 0,
            ticket_id: ticket.to_string(),
            autor: "ana@hospital.hn".into(),
            tipo,
            mensaje: text.map(str::to_string),
            imagen_url: None,
            fecha: Some(Utc.with_ymd_and_hms(2026, 10, 18, 12, minute, 0).unwrap()),
            leido_por: readers.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn ticket(id: &str, estado: Status) -> Ticket {
        let mut t: Ticket = serde_json::from_str(&format!(r#"{{"id": "{}"}}"#, id)).unwrap();
        t.estado = estado;
        t
    }

    #[test]
    fn test_unread_count_ignores_case() {
        let a = msg("t", MessageKind::Text, Some("hola"), 1, &["Tec@Hospital.hn"]);
        let b = msg("t", MessageKind::Text, Some("¿sigue?"), 2, &["ana@hospital.hn"]);
        let c = msg("t", MessageKind::Text, Some("ok"), 3, &[]);
        assert_eq!(unread_count(&[&a, &b, &c], "tec@hospital.hn"), 2);
    }

    #[test]
    fn test_preview_is_latest_message() {
        let a = msg("t", MessageKind::Text, Some("último"), 9, &[]);
        let b = msg("t", MessageKind::Text, Some("primero"), 1, &[]);
        let s = summarize_chat(&[&a, &b], "x");
        assert_eq!(s.preview, "último");
        assert_eq!(s.last_message_at, a.fecha);
    }

    #[test]
    fn test_preview_placeholders() {
        let img = msg("t", MessageKind::Image, None, 5, &[]);
        assert_eq!(summarize_chat(&[&img], "x").preview, IMAGE_PLACEHOLDER);

        let both = msg("t", MessageKind::TextImage, Some("mire la foto"), 5, &[]);
        assert_eq!(summarize_chat(&[&both], "x").preview, "mire la foto");

        let s = summarize_chat(&[], "x");
        assert_eq!(s.preview, NO_MESSAGES);
        assert_eq!(s.unread, 0);
        assert!(s.last_message_at.is_none());
    }

    #[test]
    fn test_inbox_order_closed_last_then_recent() {
        let tickets = vec![
            ticket("old", Status::InProgress),
            ticket("closed", Status::Closed),
            ticket("recent", Status::Pending),
            ticket("silent", Status::InProgress),
            ticket("gone", Status::Deleted),
        ];
        let messages = vec![
            msg("old", MessageKind::Text, Some("a"), 1, &[]),
            msg("closed", MessageKind::Solution, Some("listo"), 50, &[]),
            msg("recent", MessageKind::Text, Some("b"), 30, &["tec@hospital.hn"]),
            msg("gone", MessageKind::Text, Some("c"), 59, &[]),
        ];
        let inbox = build_inbox(&tickets, &messages, "tec@hospital.hn");
        let order: Vec<&str> = inbox.iter().map(|e| e.ticket_id.as_str()).collect();
        assert_eq!(order, vec!["recent", "old", "silent", "closed"]);
        assert_eq!(inbox[0].chat.unread, 0);
        assert_eq!(inbox[1].chat.unread, 1);
        assert_eq!(inbox[2].chat.preview, NO_MESSAGES);
        assert_eq!(inbox[3].chat.preview, "listo");
    }
}
