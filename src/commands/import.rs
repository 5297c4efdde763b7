use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use super::{record_audit, Session};
use crate::db::insert::{import_snapshot, ImportSummary, Snapshot};
use crate::error::AppError;
use crate::model::Action;
use crate::state::{AppState, DbAccess};
use crate::workflow::AuditEvent;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    #[serde(flatten)]
    pub summary: ImportSummary,
    pub duration_ms: u64,
}

/// Loads a JSON dump of the platform collections into the local store.
pub fn import_json(state: &AppState, session: &Session, path: &Path) -> Result<ImportResult, AppError> {
    session.require(Action::ManageUsers)?;
    let start = Instant::now();

    let raw = std::fs::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&raw)?;
    log::info!(
        "Importando {}: {} tickets, {} usuarios",
        path.display(),
        snapshot.tickets.len(),
        snapshot.usuarios.len()
    );

    let summary = state.db_mut(|conn| import_snapshot(conn, &snapshot))?;
    record_audit(state, session, AuditEvent::DataImported { tickets: summary.tickets });
    Ok(ImportResult {
        summary,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
