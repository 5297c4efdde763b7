//! Ticket lifecycle rules. Transitions mutate a loaded [`Ticket`] in place
//! and never touch storage; callers persist the result and log the
//! matching [`AuditEvent`].

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::AppError;
use crate::model::{collapse_whitespace, NewTicket, NewUser, Priority, Role, Status, Ticket};

static DNI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{13}$").expect("DNI: invalid pattern"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("EMAIL: invalid pattern")
});

pub const SOLUTION_PREFIX: &str = "SOLUCIÓN: ";

fn ensure_not_deleted(t: &Ticket) -> Result<(), AppError> {
    if t.estado == Status::Deleted {
        return Err(AppError::validation(format!(
            "El ticket #{} está eliminado",
            t.display_number()
        )));
    }
    Ok(())
}

fn ensure_not_closed(t: &Ticket) -> Result<(), AppError> {
    ensure_not_deleted(t)?;
    if t.is_closed() {
        return Err(AppError::validation(format!(
            "El ticket #{} está cerrado",
            t.display_number()
        )));
    }
    Ok(())
}

fn required_technician(tecnico: &str) -> Result<String, AppError> {
    let tecnico = tecnico.trim();
    if tecnico.is_empty() {
        return Err(AppError::validation("Debes seleccionar un técnico"));
    }
    Ok(tecnico.to_string())
}

fn first_response(t: &mut Ticket, now: DateTime<Utc>) {
    if t.fecha_primer_respuesta.is_none() {
        t.fecha_primer_respuesta = Some(now);
    }
}

/// Triage: sets priority and technician, moves the ticket to in-progress.
pub fn assign(
    t: &mut Ticket,
    tecnico: &str,
    prioridad: Priority,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_not_closed(t)?;
    if !prioridad.is_assigned() {
        return Err(AppError::validation("Debes seleccionar una prioridad"));
    }
    let tecnico = required_technician(tecnico)?;
    t.prioridad = prioridad;
    t.tecnico_asignado = Some(tecnico);
    t.estado = Status::InProgress;
    first_response(t, now);
    Ok(())
}

pub fn reassign(t: &mut Ticket, tecnico: &str) -> Result<(), AppError> {
    ensure_not_closed(t)?;
    t.tecnico_asignado = Some(required_technician(tecnico)?);
    Ok(())
}

pub fn mark_in_progress(t: &mut Ticket, now: DateTime<Utc>) -> Result<(), AppError> {
    ensure_not_closed(t)?;
    t.estado = Status::InProgress;
    first_response(t, now);
    Ok(())
}

/// Back to pending. A closed ticket loses its closure date.
pub fn reopen(t: &mut Ticket) -> Result<(), AppError> {
    ensure_not_deleted(t)?;
    t.estado = Status::Pending;
    t.fecha_cierre = None;
    Ok(())
}

/// A ticket may only be closed once it has a technician and a priority.
pub fn can_close(t: &Ticket) -> bool {
    t.prioridad.is_assigned() && t.tecnico().is_some_and(|x| !x.trim().is_empty())
}

/// Closes with a resolution text. Returns the trimmed solution.
pub fn close(t: &mut Ticket, solucion: &str, now: DateTime<Utc>) -> Result<String, AppError> {
    ensure_not_closed(t)?;
    let solucion = solucion.trim();
    if solucion.is_empty() {
        return Err(AppError::validation("Debes escribir la solución"));
    }
    if !can_close(t) {
        return Err(AppError::validation(
            "El ticket necesita técnico y prioridad antes de cerrarse",
        ));
    }
    t.solucion = solucion.to_string();
    t.estado = Status::Closed;
    t.fecha_cierre = Some(now);
    Ok(t.solucion.clone())
}

pub fn soft_delete(t: &mut Ticket) -> Result<(), AppError> {
    ensure_not_deleted(t)?;
    t.estado = Status::Deleted;
    Ok(())
}

/// Restores a deleted ticket as a fresh pending one, triage cleared.
pub fn recover(t: &mut Ticket, now: DateTime<Utc>) -> Result<(), AppError> {
    if t.estado != Status::Deleted {
        return Err(AppError::validation(format!(
            "Solo se pueden recuperar tickets eliminados (#{})",
            t.display_number()
        )));
    }
    t.estado = Status::Pending;
    t.tecnico_asignado = None;
    t.prioridad = Priority::Unassigned;
    t.fecha = Some(now);
    t.fecha_recuperado = Some(now);
    Ok(())
}

pub fn ensure_purgeable(t: &Ticket) -> Result<(), AppError> {
    if t.estado != Status::Deleted {
        return Err(AppError::validation(format!(
            "Solo se pueden eliminar definitivamente tickets en la papelera (#{})",
            t.display_number()
        )));
    }
    Ok(())
}

/// Comments and chat messages are refused once the ticket is closed.
pub fn ensure_accepts_messages(t: &Ticket) -> Result<(), AppError> {
    ensure_not_closed(t)
}

pub fn mark_printed(t: &mut Ticket) {
    t.impreso = true;
}

pub fn solution_comment(solucion: &str) -> String {
    format!("{}{}", SOLUTION_PREFIX, solucion.trim())
}

// ─── Validación ───────────────────────────────────────────────────────────────

/// Trims the fields; subject, description and department are required.
/// Priority is dropped unless the creator is an administrator.
pub fn validate_new_ticket(input: &NewTicket, creator_role: Role) -> Result<NewTicket, AppError> {
    let ticket = NewTicket {
        asunto: collapse_whitespace(&input.asunto),
        descripcion: input.descripcion.trim().to_string(),
        departamento: normalize_department(&input.departamento),
        categoria: input.categoria.trim().to_string(),
        prioridad: if creator_role == Role::Admin {
            input.prioridad
        } else {
            Priority::Unassigned
        },
    };
    if ticket.asunto.is_empty() || ticket.descripcion.is_empty() || ticket.departamento.is_empty() {
        return Err(AppError::validation("Debes llenar todos los campos"));
    }
    Ok(ticket)
}

pub fn validate_dni(dni: &str) -> Result<(), AppError> {
    if DNI.is_match(dni.trim()) {
        Ok(())
    } else {
        Err(AppError::validation("El DNI debe contener exactamente 13 números."))
    }
}

pub fn validate_email(correo: &str) -> Result<(), AppError> {
    if EMAIL.is_match(correo.trim()) {
        Ok(())
    } else {
        Err(AppError::validation(format!("Correo inválido: {}", correo.trim())))
    }
}

pub fn validate_new_user(input: &NewUser) -> Result<NewUser, AppError> {
    let user = NewUser {
        nombre: collapse_whitespace(&input.nombre),
        dni: input.dni.trim().to_string(),
        correo: input.correo.trim().to_lowercase(),
        departamento: normalize_department(&input.departamento),
        rol: input.rol,
    };
    if user.nombre.is_empty() {
        return Err(AppError::validation("El nombre es obligatorio"));
    }
    validate_dni(&user.dni)?;
    validate_email(&user.correo)?;
    Ok(user)
}

/// Stored department name: trimmed, inner blanks collapsed, upper-case.
pub fn normalize_department(nombre: &str) -> String {
    collapse_whitespace(nombre).to_uppercase()
}

// ─── Bitácora ─────────────────────────────────────────────────────────────────

/// Every action that leaves a line in the bitácora.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditEvent<'a> {
    TicketCreated { numero: &'a str, asunto: &'a str },
    TicketAssigned { numero: &'a str, prioridad: Priority, tecnico: &'a str },
    TicketReassigned { numero: &'a str, tecnico: &'a str },
    TicketInProgress { numero: &'a str },
    TicketReopened { numero: &'a str },
    TicketClosed { numero: &'a str },
    TicketDeleted { numero: &'a str },
    TicketRecovered { numero: &'a str },
    TicketPurged { numero: &'a str },
    TicketPrinted { numero: &'a str },
    TicketCommented { numero: &'a str },
    ChatMessageSent { numero: &'a str },
    DepartmentCreated { nombre: &'a str },
    DepartmentRemoved { nombre: &'a str },
    UserCreated { correo: &'a str },
    UserEdited { nombre: &'a str },
    UserRemoved { correo: &'a str },
    AuditExported,
    ReportExported { titulo: &'a str },
    ConfigChanged { clave: &'a str },
    DataImported { tickets: usize },
}

impl fmt::Display for AuditEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::TicketCreated { numero, asunto } => {
                write!(f, "Creó el ticket #{}: \"{}\"", numero, asunto)
            }
            AuditEvent::TicketAssigned { numero, prioridad, tecnico } => write!(
                f,
                "Asignó prioridad {} y técnico {} al ticket #{}",
                prioridad.key().to_uppercase(),
                tecnico,
                numero
            ),
            AuditEvent::TicketReassigned { numero, tecnico } => {
                write!(f, "Reasignó ticket #{} a {}", numero, tecnico)
            }
            AuditEvent::TicketInProgress { numero } => {
                write!(f, "Marcó ticket #{} como En proceso", numero)
            }
            AuditEvent::TicketReopened { numero } => {
                write!(f, "Reabrió ticket #{} como Pendiente", numero)
            }
            AuditEvent::TicketClosed { numero } => {
                write!(f, "Cerró el ticket #{} con solución", numero)
            }
            AuditEvent::TicketDeleted { numero } => write!(f, "Eliminó ticket #{}", numero),
            AuditEvent::TicketRecovered { numero } => write!(
                f,
                "Recuperó el ticket #{} (ahora Pendiente sin técnico ni prioridad)",
                numero
            ),
            AuditEvent::TicketPurged { numero } => {
                write!(f, "Eliminó DEFINITIVAMENTE ticket #{}", numero)
            }
            AuditEvent::TicketPrinted { numero } => write!(f, "Imprimió ticket #{}", numero),
            AuditEvent::TicketCommented { numero } => write!(f, "Comentó en ticket #{}", numero),
            AuditEvent::ChatMessageSent { numero } => {
                write!(f, "Envió mensaje en el chat del ticket #{}", numero)
            }
            AuditEvent::DepartmentCreated { nombre } => write!(f, "Creó departamento {}", nombre),
            AuditEvent::DepartmentRemoved { nombre } => {
                write!(f, "Eliminó departamento {}", nombre)
            }
            AuditEvent::UserCreated { correo } => write!(f, "Creó usuario {}", correo),
            AuditEvent::UserEdited { nombre } => write!(f, "Editó usuario {}", nombre),
            AuditEvent::UserRemoved { correo } => write!(f, "Eliminó usuario {}", correo),
            AuditEvent::AuditExported => write!(f, "Exportó la bitácora a PDF"),
            AuditEvent::ReportExported { titulo } => write!(f, "Exportó reporte {}", titulo),
            AuditEvent::ConfigChanged { clave } => write!(f, "Cambió la configuración {}", clave),
            AuditEvent::DataImported { tickets } => {
                write!(f, "Importó datos de la plataforma ({} tickets)", tickets)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 15, 0, 0).unwrap()
    }

    fn pending() -> Ticket {
        let mut t: Ticket = serde_json::from_str(r#"{"id": "doc1", "numero": 12, "asunto": "Monitor"}"#).unwrap();
        t.fecha = Some(Utc.with_ymd_and_hms(2026, 10, 17, 15, 0, 0).unwrap());
        t
    }

    #[test]
    fn test_assign_requires_priority_and_technician() {
        let mut t = pending();
        assert!(assign(&mut t, "tec@hospital.hn", Priority::Unassigned, now()).is_err());
        assert!(assign(&mut t, "  ", Priority::High, now()).is_err());
        assert_eq!(t.estado, Status::Pending);

        assign(&mut t, " tec@hospital.hn ", Priority::High, now()).unwrap();
        assert_eq!(t.estado, Status::InProgress);
        assert_eq!(t.tecnico(), Some("tec@hospital.hn"));
        assert_eq!(t.fecha_primer_respuesta, Some(now()));
    }

    #[test]
    fn test_first_response_is_kept() {
        let mut t = pending();
        let earlier = Utc.with_ymd_and_hms(2026, 10, 17, 16, 0, 0).unwrap();
        t.fecha_primer_respuesta = Some(earlier);
        mark_in_progress(&mut t, now()).unwrap();
        assert_eq!(t.fecha_primer_respuesta, Some(earlier));
    }

    #[test]
    fn test_close_without_triage_is_rejected() {
        let mut t = pending();
        assert!(!can_close(&t));
        assert!(close(&mut t, "Se cambió el cable", now()).is_err());
        assert_eq!(t.estado, Status::Pending);

        t.prioridad = Priority::Low;
        assert!(!can_close(&t));
        t.prioridad = Priority::Unassigned;
        t.tecnico_asignado = Some("tec@hospital.hn".into());
        assert!(!can_close(&t));
    }

    #[test]
    fn test_close_requires_solution() {
        let mut t = pending();
        assign(&mut t, "tec@hospital.hn", Priority::Medium, now()).unwrap();
        assert!(close(&mut t, "   ", now()).is_err());

        let s = close(&mut t, "  Se cambió el cable ", now()).unwrap();
        assert_eq!(s, "Se cambió el cable");
        assert!(t.is_closed());
        assert_eq!(t.fecha_cierre, Some(now()));
        assert_eq!(solution_comment(&s), "SOLUCIÓN: Se cambió el cable");
    }

    #[test]
    fn test_closed_ticket_refuses_messages_and_changes() {
        let mut t = pending();
        assign(&mut t, "tec@hospital.hn", Priority::Medium, now()).unwrap();
        close(&mut t, "ok", now()).unwrap();
        assert!(ensure_accepts_messages(&t).is_err());
        assert!(reassign(&mut t, "otro@hospital.hn").is_err());
        assert!(close(&mut t, "otra vez", now()).is_err());

        reopen(&mut t).unwrap();
        assert_eq!(t.estado, Status::Pending);
        assert!(t.fecha_cierre.is_none());
        assert!(ensure_accepts_messages(&t).is_ok());
    }

    #[test]
    fn test_delete_recover_purge() {
        let mut t = pending();
        assign(&mut t, "tec@hospital.hn", Priority::Critical, now()).unwrap();
        assert!(ensure_purgeable(&t).is_err());
        assert!(recover(&mut t, now()).is_err());

        soft_delete(&mut t).unwrap();
        assert!(soft_delete(&mut t).is_err());
        assert!(ensure_purgeable(&t).is_ok());

        recover(&mut t, now()).unwrap();
        assert_eq!(t.estado, Status::Pending);
        assert!(t.tecnico_asignado.is_none());
        assert_eq!(t.prioridad, Priority::Unassigned);
        assert_eq!(t.fecha, Some(now()));
        assert_eq!(t.fecha_recuperado, Some(now()));
    }

    #[test]
    fn test_validate_new_ticket() {
        let input = NewTicket {
            asunto: "  Impresora   atascada ".into(),
            descripcion: " No imprime ".into(),
            departamento: " rayos x ".into(),
            categoria: "Hardware".into(),
            prioridad: Priority::High,
        };
        let t = validate_new_ticket(&input, Role::EndUser).unwrap();
        assert_eq!(t.asunto, "Impresora atascada");
        assert_eq!(t.departamento, "RAYOS X");
        assert_eq!(t.prioridad, Priority::Unassigned);

        let t = validate_new_ticket(&input, Role::Admin).unwrap();
        assert_eq!(t.prioridad, Priority::High);

        let missing = NewTicket {
            descripcion: "  ".into(),
            ..input
        };
        assert!(validate_new_ticket(&missing, Role::Admin).is_err());
    }

    #[test]
    fn test_validate_dni() {
        assert!(validate_dni("0501199012345").is_ok());
        assert!(validate_dni("050119901234").is_err());
        assert!(validate_dni("05011990123456").is_err());
        assert!(validate_dni("0501-1990-123").is_err());
        let err = validate_dni("abc").unwrap_err();
        assert!(err.to_string().contains("exactamente 13 números"));
    }

    #[test]
    fn test_validate_new_user_normalizes() {
        let input = NewUser {
            nombre: " Ana  López ".into(),
            dni: "0501199012345".into(),
            correo: " Ana@Hospital.HN ".into(),
            departamento: "informática".into(),
            rol: Role::Technician,
        };
        let u = validate_new_user(&input).unwrap();
        assert_eq!(u.nombre, "Ana López");
        assert_eq!(u.correo, "ana@hospital.hn");
        assert_eq!(u.departamento, "INFORMÁTICA");

        let bad = NewUser {
            correo: "sin-arroba".into(),
            ..input
        };
        assert!(validate_new_user(&bad).is_err());
    }

    #[test]
    fn test_audit_messages() {
        let e = AuditEvent::TicketAssigned {
            numero: "12",
            prioridad: Priority::High,
            tecnico: "tec@hospital.hn",
        };
        assert_eq!(e.to_string(), "Asignó prioridad ALTA y técnico tec@hospital.hn al ticket #12");
        assert_eq!(
            AuditEvent::TicketRecovered { numero: "3" }.to_string(),
            "Recuperó el ticket #3 (ahora Pendiente sin técnico ni prioridad)"
        );
        assert_eq!(
            AuditEvent::TicketPurged { numero: "3" }.to_string(),
            "Eliminó DEFINITIVAMENTE ticket #3"
        );
        assert_eq!(
            AuditEvent::TicketCreated { numero: "7", asunto: "Monitor" }.to_string(),
            "Creó el ticket #7: \"Monitor\""
        );
    }
}
