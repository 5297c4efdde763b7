use super::{record_audit, Session};
use crate::config::{get_config_from_db, update_config_in_db, AppConfig};
use crate::error::AppError;
use crate::model::Action;
use crate::state::{AppState, DbAccess};
use crate::workflow::AuditEvent;

pub fn get_config(state: &AppState) -> Result<AppConfig, AppError> {
    state.db(get_config_from_db)
}

/// Changes one setting and persists the whole configuration.
pub fn set_config(state: &AppState, session: &Session, key: &str, value: &str) -> Result<AppConfig, AppError> {
    session.require(Action::ManageUsers)?;
    let mut config = get_config(state)?;
    config.set(key, value)?;
    state.db(|conn| update_config_in_db(conn, &config))?;
    log::info!("Configuración actualizada: {} = {}", key, value.trim());
    record_audit(state, session, AuditEvent::ConfigChanged { clave: key });
    Ok(config)
}
