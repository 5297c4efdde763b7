use chrono::Utc;

use super::{record_audit, Session};
use crate::db::queries;
use crate::error::AppError;
use crate::model::{Action, Department};
use crate::state::{AppState, DbAccess};
use crate::workflow::{normalize_department, AuditEvent};

pub fn list_departments(state: &AppState) -> Result<Vec<Department>, AppError> {
    state.db(queries::list_departments)
}

/// Adds a department; names are unique after normalization.
pub fn add_department(state: &AppState, session: &Session, nombre: &str) -> Result<Department, AppError> {
    session.require(Action::ManageDepartments)?;
    let nombre = normalize_department(nombre);
    if nombre.is_empty() {
        return Err(AppError::validation("El nombre del departamento es obligatorio"));
    }

    let now = Utc::now();
    let id = state.db(|conn| {
        if queries::department_exists(conn, &nombre)? {
            return Err(AppError::DuplicateDepartment(nombre.clone()));
        }
        Ok(queries::insert_department(conn, &nombre, now)?)
    })?;
    record_audit(state, session, AuditEvent::DepartmentCreated { nombre: &nombre });
    Ok(Department { id, nombre, fecha_creacion: Some(now) })
}

pub fn remove_department(state: &AppState, session: &Session, nombre: &str) -> Result<(), AppError> {
    session.require(Action::ManageDepartments)?;
    let dept = state
        .db(|conn| queries::find_department(conn, nombre))?
        .ok_or_else(|| AppError::validation(format!("Departamento no encontrado: {}", nombre.trim())))?;
    state.db(|conn| queries::delete_department(conn, dept.id))?;
    record_audit(state, session, AuditEvent::DepartmentRemoved { nombre: &dept.nombre });
    Ok(())
}
