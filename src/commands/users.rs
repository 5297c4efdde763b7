use chrono::Utc;

use super::{record_audit, Session};
use crate::db::queries;
use crate::error::AppError;
use crate::model::{Action, NewUser, UserAccount};
use crate::state::{AppState, DbAccess};
use crate::workflow::{validate_new_user, AuditEvent};

pub fn list_users(state: &AppState, session: &Session) -> Result<Vec<UserAccount>, AppError> {
    session.require(Action::ManageUsers)?;
    state.db(queries::list_users)
}

pub fn create_user(state: &AppState, session: &Session, input: &NewUser) -> Result<UserAccount, AppError> {
    session.require(Action::ManageUsers)?;
    let input = validate_new_user(input)?;

    let user = UserAccount {
        id: uuid::Uuid::new_v4().to_string(),
        nombre: input.nombre,
        dni: input.dni,
        correo: input.correo,
        departamento: input.departamento,
        rol: input.rol,
        creado_en: Some(Utc::now()),
    };
    state.db(|conn| {
        if queries::email_taken(conn, &user.correo, None)? {
            return Err(AppError::DuplicateEmail(user.correo.clone()));
        }
        Ok(queries::upsert_user(conn, &user)?)
    })?;
    log::info!("Usuario {} creado ({})", user.correo, user.rol.label());
    record_audit(state, session, AuditEvent::UserCreated { correo: &user.correo });
    Ok(user)
}

/// Replaces the editable fields of an account, keeping its id and creation date.
pub fn update_user(state: &AppState, session: &Session, id: &str, input: &NewUser) -> Result<UserAccount, AppError> {
    session.require(Action::ManageUsers)?;
    let input = validate_new_user(input)?;

    let user = state.db(|conn| {
        let existing = queries::find_user(conn, id)?.ok_or_else(|| AppError::UserNotFound(id.to_string()))?;
        if queries::email_taken(conn, &input.correo, Some(id))? {
            return Err(AppError::DuplicateEmail(input.correo.clone()));
        }
        let user = UserAccount {
            id: existing.id,
            nombre: input.nombre.clone(),
            dni: input.dni.clone(),
            correo: input.correo.clone(),
            departamento: input.departamento.clone(),
            rol: input.rol,
            creado_en: existing.creado_en,
        };
        queries::upsert_user(conn, &user)?;
        Ok(user)
    })?;
    record_audit(state, session, AuditEvent::UserEdited { nombre: &user.nombre });
    Ok(user)
}

pub fn delete_user(state: &AppState, session: &Session, id: &str) -> Result<(), AppError> {
    session.require(Action::ManageUsers)?;
    let user = state
        .db(|conn| queries::find_user(conn, id))?
        .ok_or_else(|| AppError::UserNotFound(id.to_string()))?;
    state.db(|conn| queries::delete_user(conn, &user.id))?;
    record_audit(state, session, AuditEvent::UserRemoved { correo: &user.correo });
    Ok(())
}
