use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::deserializers::de;
use super::text::normalize_text;

// ─── Prioridad ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    #[default]
    Unassigned,
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Lenient parse of the labels stored by the platform.
    /// Anything unrecognized ("", "No asignada", "Pendiente de clasificación") is unassigned.
    pub fn from_label(label: &str) -> Self {
        match normalize_text(label).as_str() {
            "critica" | "critical" => Priority::Critical,
            "alta" | "high" => Priority::High,
            "media" | "medium" => Priority::Medium,
            "baja" | "low" => Priority::Low,
            _ => Priority::Unassigned,
        }
    }

    /// Stored key (lower-case, no accents).
    pub fn key(self) -> &'static str {
        match self {
            Priority::Unassigned => "",
            Priority::Low => "baja",
            Priority::Medium => "media",
            Priority::High => "alta",
            Priority::Critical => "critica",
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Priority::Unassigned => "No asignada",
            Priority::Low => "Baja",
            Priority::Medium => "Media",
            Priority::High => "Alta",
            Priority::Critical => "Crítica",
        }
    }

    /// Sort rank: tickets still awaiting triage first, then critical → low.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Unassigned => 0,
            Priority::Critical => 1,
            Priority::High => 2,
            Priority::Medium => 3,
            Priority::Low => 4,
        }
    }

    pub fn is_assigned(self) -> bool {
        self != Priority::Unassigned
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Priority::from_label(&s)
    }
}

impl From<Priority> for String {
    fn from(p: Priority) -> Self {
        p.key().to_string()
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    /// Strict variant for user input: an unknown label is an error, not "unassigned".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let p = Priority::from_label(s);
        if p == Priority::Unassigned && !matches!(normalize_text(s).as_str(), "" | "no asignada")
        {
            return Err(format!("Prioridad desconocida: {}", s));
        }
        Ok(p)
    }
}

// ─── Estado ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Closed,
    Deleted,
}

impl Status {
    /// Lenient parse: "Cerrado", "cerrado", "En proceso", "proceso", "abierto"…
    /// Unknown labels fall back to pending.
    pub fn from_label(label: &str) -> Self {
        let e = normalize_text(label);
        if e.contains("cerr") || e == "closed" {
            Status::Closed
        } else if e.contains("elimin") || e == "deleted" {
            Status::Deleted
        } else if e.contains("proceso") || e.contains("progress") {
            Status::InProgress
        } else {
            Status::Pending
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Status::Pending => "pendiente",
            Status::InProgress => "proceso",
            Status::Closed => "cerrado",
            Status::Deleted => "eliminado",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pendiente",
            Status::InProgress => "En proceso",
            Status::Closed => "Cerrado",
            Status::Deleted => "Eliminado",
        }
    }

    /// Closed always last so that the default ordering never shows a closed
    /// ticket above an open one, deleted ones included.
    pub fn rank(self) -> u8 {
        match self {
            Status::Pending => 0,
            Status::InProgress => 1,
            Status::Deleted => 2,
            Status::Closed => 3,
        }
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        Status::from_label(&s)
    }
}

impl From<Status> for String {
    fn from(s: Status) -> Self {
        s.key().to_string()
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let e = normalize_text(s);
        let known = ["pend", "abiert", "open", "proceso", "progress", "cerr", "closed", "elimin", "deleted"];
        if known.iter().any(|k| e.contains(k)) {
            Ok(Status::from_label(s))
        } else {
            Err(format!("Estado desconocido: {}", s))
        }
    }
}

// ─── Ticket ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    #[serde(default)]
    pub numero: Option<i64>,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub asunto: String,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub descripcion: String,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub departamento: String,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub categoria: String,
    #[serde(default)]
    pub prioridad: Priority,
    #[serde(default)]
    pub estado: Status,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub creado_por: String,
    #[serde(default, deserialize_with = "de::empty_as_none")]
    pub tecnico_asignado: Option<String>,
    #[serde(default, deserialize_with = "de::timestamp_opt")]
    pub fecha: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::timestamp_opt")]
    pub fecha_primer_respuesta: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::timestamp_opt")]
    pub fecha_cierre: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::timestamp_opt")]
    pub fecha_recuperado: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub solucion: String,
    #[serde(default)]
    pub impreso: bool,
}

impl Ticket {
    /// "#12" or the document id when the ticket predates the counter.
    pub fn display_number(&self) -> String {
        match self.numero {
            Some(n) => n.to_string(),
            None => self.id.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.estado == Status::Closed
    }

    pub fn tecnico(&self) -> Option<&str> {
        self.tecnico_asignado.as_deref()
    }
}

/// Fields supplied when filing a ticket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub asunto: String,
    pub descripcion: String,
    pub departamento: String,
    #[serde(default)]
    pub categoria: String,
    /// Only honoured when the creator is an administrator.
    #[serde(default)]
    pub prioridad: Priority,
}

// ─── Comentarios y chat ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub ticket_id: String,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub usuario: String,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub texto: String,
    #[serde(default, deserialize_with = "de::timestamp_opt")]
    pub fecha: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    TextImage,
    Solution,
}

impl MessageKind {
    pub fn from_label(label: &str) -> Self {
        match normalize_text(label).as_str() {
            "imagen" | "image" => MessageKind::Image,
            "texto+imagen" | "text+image" => MessageKind::TextImage,
            "solucion" | "solution" => MessageKind::Solution,
            _ => MessageKind::Text,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            MessageKind::Text => "texto",
            MessageKind::Image => "imagen",
            MessageKind::TextImage => "texto+imagen",
            MessageKind::Solution => "solucion",
        }
    }
}

impl From<String> for MessageKind {
    fn from(s: String) -> Self {
        MessageKind::from_label(&s)
    }
}

impl From<MessageKind> for String {
    fn from(k: MessageKind) -> Self {
        k.key().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub ticket_id: String,
    /// Older documents carry the author under `usuario`.
    #[serde(default, alias = "usuario", deserialize_with = "de::null_as_empty")]
    pub autor: String,
    #[serde(default)]
    pub tipo: MessageKind,
    #[serde(default, deserialize_with = "de::empty_as_none")]
    pub mensaje: Option<String>,
    #[serde(default, alias = "url", deserialize_with = "de::empty_as_none")]
    pub imagen_url: Option<String>,
    #[serde(default, deserialize_with = "de::timestamp_opt")]
    pub fecha: Option<DateTime<Utc>>,
    #[serde(default)]
    pub leido_por: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_label_variants() {
        assert_eq!(Priority::from_label("Crítica"), Priority::Critical);
        assert_eq!(Priority::from_label("ALTA"), Priority::High);
        assert_eq!(Priority::from_label("media"), Priority::Medium);
        assert_eq!(Priority::from_label("low"), Priority::Low);
        assert_eq!(Priority::from_label(""), Priority::Unassigned);
        assert_eq!(Priority::from_label("No asignada"), Priority::Unassigned);
        assert_eq!(
            Priority::from_label("Pendiente de clasificación"),
            Priority::Unassigned
        );
    }

    #[test]
    fn test_priority_rank_order() {
        let mut ps = vec![
            Priority::Low,
            Priority::Critical,
            Priority::Unassigned,
            Priority::Medium,
            Priority::High,
        ];
        ps.sort_by_key(|p| p.rank());
        assert_eq!(
            ps,
            vec![
                Priority::Unassigned,
                Priority::Critical,
                Priority::High,
                Priority::Medium,
                Priority::Low
            ]
        );
    }

    #[test]
    fn test_priority_from_str_rejects_unknown() {
        assert_eq!("alta".parse::<Priority>(), Ok(Priority::High));
        assert!("urgentisima".parse::<Priority>().is_err());
    }

    #[test]
    fn test_status_from_label_variants() {
        assert_eq!(Status::from_label("Cerrado"), Status::Closed);
        assert_eq!(Status::from_label("En proceso"), Status::InProgress);
        assert_eq!(Status::from_label("proceso"), Status::InProgress);
        assert_eq!(Status::from_label("eliminado"), Status::Deleted);
        assert_eq!(Status::from_label("abierto"), Status::Pending);
        assert_eq!(Status::from_label(""), Status::Pending);
    }

    #[test]
    fn test_status_rank_closed_last() {
        for s in [Status::Pending, Status::InProgress, Status::Deleted] {
            assert!(s.rank() < Status::Closed.rank());
        }
    }

    #[test]
    fn test_ticket_deserialize_platform_document() {
        let json = r#"{
            "id": "abc123",
            "numero": 42,
            "asunto": "Impresora",
            "descripcion": null,
            "departamento": "EMERGENCIA",
            "prioridad": "Alta",
            "estado": "En proceso",
            "creadoPor": "ana@hospital.hn",
            "tecnicoAsignado": "",
            "fecha": {"seconds": 1767630240, "nanoseconds": 0},
            "impreso": true
        }"#;
        let t: Ticket = serde_json::from_str(json).unwrap();
        assert_eq!(t.numero, Some(42));
        assert_eq!(t.descripcion, "");
        assert_eq!(t.prioridad, Priority::High);
        assert_eq!(t.estado, Status::InProgress);
        assert!(t.tecnico_asignado.is_none());
        assert!(t.fecha.is_some());
        assert!(t.fecha_cierre.is_none());
        assert!(t.impreso);
    }

    #[test]
    fn test_ticket_serializes_stored_keys() {
        let t: Ticket = serde_json::from_str(r#"{"id": "x", "prioridad": "Crítica", "estado": "Cerrado"}"#).unwrap();
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["prioridad"], "critica");
        assert_eq!(v["estado"], "cerrado");
        assert_eq!(v["creadoPor"], "");
    }

    #[test]
    fn test_display_number_falls_back_to_id() {
        let mut t: Ticket = serde_json::from_str(r#"{"id": "doc-9"}"#).unwrap();
        assert_eq!(t.display_number(), "doc-9");
        t.numero = Some(7);
        assert_eq!(t.display_number(), "7");
    }

    #[test]
    fn test_chat_message_aliases() {
        let m: ChatMessage = serde_json::from_str(
            r#"{"usuario": "ana@hospital.hn", "tipo": "imagen", "url": "https://x/y.png", "leidoPor": ["ana@hospital.hn"]}"#,
        )
        .unwrap();
        assert_eq!(m.autor, "ana@hospital.hn");
        assert_eq!(m.tipo, MessageKind::Image);
        assert_eq!(m.imagen_url.as_deref(), Some("https://x/y.png"));
        assert_eq!(m.leido_por.len(), 1);
    }
}
