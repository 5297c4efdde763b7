//! One service function per user-visible action. Every function takes the
//! shared [`AppState`] and the acting [`Session`], checks the role, runs the
//! workflow rule, persists, and leaves a line in the bitácora.

pub mod audit;
pub mod chat;
pub mod config;
pub mod departments;
pub mod import;
pub mod reports;
pub mod tickets;
pub mod users;

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::queries;
use crate::error::AppError;
use crate::model::{same_identity, Action, Role, Ticket};
use crate::state::{AppState, DbAccess};
use crate::workflow::AuditEvent;

/// The identity an action is performed as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub correo: String,
    pub rol: Role,
}

impl Session {
    pub fn new(correo: impl Into<String>, rol: Role) -> Self {
        Session { correo: correo.into().trim().to_lowercase(), rol }
    }

    /// Looks the account up by email. While no account exists at all the
    /// caller acts as administrator so the first users can be created.
    pub fn resolve(state: &AppState, correo: &str) -> Result<Session, AppError> {
        let (user, any_user) = state.db(|conn| {
            let user = queries::find_user_by_email(conn, correo)?;
            let any: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok::<_, rusqlite::Error>((user, any > 0))
        })?;
        match user {
            Some(u) => Ok(Session::new(u.correo, u.rol)),
            None if !any_user => {
                log::warn!("Sin usuarios registrados: {} actúa como administrador", correo);
                Ok(Session::new(correo, Role::Admin))
            }
            None => Err(AppError::UserNotFound(correo.to_string())),
        }
    }

    pub fn require(&self, action: Action) -> Result<(), AppError> {
        if self.rol.allows(action) {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                role: self.rol.label().to_string(),
                action: action.describe().to_string(),
            })
        }
    }

    /// End users only see the tickets they filed.
    pub fn can_see(&self, t: &Ticket) -> bool {
        self.rol != Role::EndUser || same_identity(&t.creado_por, &self.correo)
    }
}

/// Appends to the bitácora. A failure here is logged and never fails the action.
pub(crate) fn record_audit(state: &AppState, session: &Session, event: AuditEvent<'_>) {
    record_audit_at(state, session, event, Utc::now());
}

pub(crate) fn record_audit_at(state: &AppState, session: &Session, event: AuditEvent<'_>, now: DateTime<Utc>) {
    let accion = event.to_string();
    if let Err(e) = state.db(|conn| queries::append_audit(conn, &session.correo, &accion, now)) {
        log::error!("No se pudo registrar en la bitácora \"{}\": {}", accion, e);
    }
}

/// Loads a ticket by id or number.
pub(crate) fn load_ticket(state: &AppState, reference: &str) -> Result<Ticket, AppError> {
    state
        .db(|conn| queries::find_ticket(conn, reference))?
        .ok_or_else(|| AppError::TicketNotFound(reference.to_string()))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub path: String,
    pub size_bytes: u64,
    pub duration_ms: u64,
}

pub(crate) fn write_export(path: &Path, bytes: &[u8], start: Instant) -> Result<ExportResult, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    log::info!("Exportado {} ({} bytes)", path.display(), bytes.len());
    Ok(ExportResult {
        path: path.display().to_string(),
        size_bytes: bytes.len() as u64,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
