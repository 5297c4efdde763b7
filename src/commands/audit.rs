use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use super::{record_audit, write_export, ExportResult, Session};
use crate::config::get_config_from_db;
use crate::db::queries;
use crate::error::AppError;
use crate::export::audit_log::audit_log_report;
use crate::export::{render_pdf, ReportContext};
use crate::filter::{distinct_keywords, distinct_users, entries_for_export, filter_audit, AuditFilter, FilterContext};
use crate::model::{Action, AuditLogEntry};
use crate::state::{AppState, DbAccess};
use crate::workflow::AuditEvent;

/// Values offered by the bitácora filter menus.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilterOptions {
    pub usuarios: Vec<String>,
    pub acciones: Vec<String>,
}

pub fn list_audit(state: &AppState, session: &Session, filter: &AuditFilter) -> Result<Vec<AuditLogEntry>, AppError> {
    session.require(Action::ReadAuditLog)?;
    let config = state.db(get_config_from_db)?;
    let entries = state.db(queries::list_audit)?;
    let ctx = FilterContext::now(config.offset());
    Ok(filter_audit(&entries, filter, &ctx).into_iter().cloned().collect())
}

pub fn audit_filter_options(state: &AppState, session: &Session) -> Result<AuditFilterOptions, AppError> {
    session.require(Action::ReadAuditLog)?;
    let entries = state.db(queries::list_audit)?;
    Ok(AuditFilterOptions {
        usuarios: distinct_users(&entries),
        acciones: distinct_keywords(&entries),
    })
}

/// PDF of the filtered bitácora, or of the whole log when no filter is set.
pub fn export_audit(state: &AppState, session: &Session, filter: &AuditFilter, out: &Path) -> Result<ExportResult, AppError> {
    session.require(Action::ReadAuditLog)?;
    let start = Instant::now();
    let config = state.db(get_config_from_db)?;
    let entries = state.db(queries::list_audit)?;
    let selected = entries_for_export(&entries, filter, &FilterContext::now(config.offset()));

    let ctx = ReportContext::from_config(&config, Utc::now());
    let bytes = render_pdf(&audit_log_report(&selected, &ctx))?;
    let result = write_export(out, &bytes, start)?;
    record_audit(state, session, AuditEvent::AuditExported);
    Ok(result)
}
