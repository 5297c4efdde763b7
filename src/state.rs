use rusqlite::Connection;
use std::sync::Mutex;

use crate::error::AppError;

pub struct AppState {
    pub db: Mutex<Option<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        AppState {
            db: Mutex::new(Some(conn)),
        }
    }
}

pub trait DbAccess {
    fn db<F, T, E>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: Into<AppError>;

    fn db_mut<F, T, E>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: Into<AppError>;
}

impl DbAccess for AppState {
    fn db<F, T, E>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: Into<AppError>,
    {
        let guard = self
            .db
            .lock()
            .map_err(|e| AppError::Custom(format!("Mutex envenenado: {}", e)))?;
        let conn = guard.as_ref().ok_or(AppError::DbNotInitialized)?;
        f(conn).map_err(Into::into)
    }

    fn db_mut<F, T, E>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: Into<AppError>,
    {
        let mut guard = self
            .db
            .lock()
            .map_err(|e| AppError::Custom(format!("Mutex envenenado: {}", e)))?;
        let conn = guard.as_mut().ok_or(AppError::DbNotInitialized)?;
        f(conn).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_db_is_an_error() {
        let state = AppState {
            db: Mutex::new(None),
        };
        let res = state.db(|conn| conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0)));
        assert!(matches!(res, Err(AppError::DbNotInitialized)));
    }

    #[test]
    fn test_sqlite_error_converts() {
        let state = AppState::new(Connection::open_in_memory().unwrap());
        let res = state.db(|conn| conn.execute("SELECT * FROM tabla_inexistente", []));
        assert!(matches!(res, Err(AppError::Sqlite(_))));
    }
}
