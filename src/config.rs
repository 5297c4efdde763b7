use chrono::FixedOffset;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const DEFAULT_PAGE_SIZE: usize = 30;
/// Honduras, UTC−6, no daylight saving.
const DEFAULT_UTC_OFFSET_MIN: i32 = -360;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub tickets_por_pagina: usize,
    pub utc_offset_minutos: i32,
    pub nombre_institucion: String,
    pub titulo_sistema: String,
    pub ubicacion: String,
    pub ruta_logo: String,
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            tickets_por_pagina: DEFAULT_PAGE_SIZE,
            utc_offset_minutos: DEFAULT_UTC_OFFSET_MIN,
            nombre_institucion: "Hospital Puerto Cortes".into(),
            titulo_sistema: "SIT - Sistema Inteligente de Tickets".into(),
            ubicacion: "Puerto Cortés, Honduras".into(),
            ruta_logo: "assets/logo.png".into(),
        }
    }
}

impl AppConfig {
    /// Local offset; an out-of-range value falls back to UTC−6.
    pub fn offset(&self) -> FixedOffset {
        offset_from_minutes(self.utc_offset_minutos)
            .or_else(|| offset_from_minutes(DEFAULT_UTC_OFFSET_MIN))
            .expect("UTC-6 is a valid offset")
    }

    /// Applies one `key=value` pair as typed by the user.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        let value = value.trim();
        match key {
            "tickets_por_pagina" => {
                self.tickets_por_pagina = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| AppError::validation("tickets_por_pagina debe ser un entero positivo"))?
            }
            "utc_offset_minutos" => {
                let minutes: i32 = value
                    .parse()
                    .map_err(|_| AppError::validation("utc_offset_minutos debe ser un entero"))?;
                if offset_from_minutes(minutes).is_none() {
                    return Err(AppError::validation("utc_offset_minutos fuera de rango"));
                }
                self.utc_offset_minutos = minutes;
            }
            "nombre_institucion" => self.nombre_institucion = value.to_string(),
            "titulo_sistema" => self.titulo_sistema = value.to_string(),
            "ubicacion" => self.ubicacion = value.to_string(),
            "ruta_logo" => self.ruta_logo = value.to_string(),
            other => {
                return Err(AppError::validation(format!(
                    "Clave de configuración desconocida: {}",
                    other
                )))
            }
        }
        Ok(())
    }
}

pub fn get_config_from_db(conn: &Connection) -> Result<AppConfig, rusqlite::Error> {
    let mut stmt = conn.prepare_cached("SELECT key, value FROM config")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut config = AppConfig::default();

    for row in rows {
        let (key, value) = row?;
        match key.as_str() {
            "tickets_por_pagina" => {
                config.tickets_por_pagina = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_PAGE_SIZE)
            }
            "utc_offset_minutos" => {
                config.utc_offset_minutos = value
                    .parse::<i32>()
                    .ok()
                    .filter(|m| offset_from_minutes(*m).is_some())
                    .unwrap_or(DEFAULT_UTC_OFFSET_MIN)
            }
            "nombre_institucion" => config.nombre_institucion = value,
            "titulo_sistema" => config.titulo_sistema = value,
            "ubicacion" => config.ubicacion = value,
            "ruta_logo" => config.ruta_logo = value,
            _ => {}
        }
    }

    Ok(config)
}

pub fn update_config_in_db(conn: &Connection, config: &AppConfig) -> Result<(), rusqlite::Error> {
    let pairs: Vec<(&str, String)> = vec![
        ("tickets_por_pagina", config.tickets_por_pagina.to_string()),
        ("utc_offset_minutos", config.utc_offset_minutos.to_string()),
        ("nombre_institucion", config.nombre_institucion.clone()),
        ("titulo_sistema", config.titulo_sistema.clone()),
        ("ubicacion", config.ubicacion.clone()),
        ("ruta_logo", config.ruta_logo.clone()),
    ];

    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO config (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
    )?;

    for (key, value) in pairs {
        stmt.execute(rusqlite::params![key, value])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup::init_db_in_memory;

    #[test]
    fn test_defaults_when_table_empty() {
        let conn = init_db_in_memory().unwrap();
        let config = get_config_from_db(&conn).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tickets_por_pagina, 30);
        assert_eq!(config.offset().local_minus_utc(), -6 * 3600);
    }

    #[test]
    fn test_update_then_read_back() {
        let conn = init_db_in_memory().unwrap();
        let mut config = AppConfig::default();
        config.set("tickets_por_pagina", "50").unwrap();
        config.set("ubicacion", " La Ceiba, Honduras ").unwrap();
        update_config_in_db(&conn, &config).unwrap();

        let loaded = get_config_from_db(&conn).unwrap();
        assert_eq!(loaded.tickets_por_pagina, 50);
        assert_eq!(loaded.ubicacion, "La Ceiba, Honduras");
    }

    #[test]
    fn test_invalid_stored_values_fall_back() {
        let conn = init_db_in_memory().unwrap();
        conn.execute_batch(
            "INSERT INTO config (key, value) VALUES ('tickets_por_pagina', 'muchos');
             INSERT INTO config (key, value) VALUES ('utc_offset_minutos', '999999');",
        )
        .unwrap();
        let config = get_config_from_db(&conn).unwrap();
        assert_eq!(config.tickets_por_pagina, 30);
        assert_eq!(config.utc_offset_minutos, -360);
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = AppConfig::default();
        assert!(config.set("tickets_por_pagina", "0").is_err());
        assert!(config.set("utc_offset_minutos", "abc").is_err());
        assert!(config.set("color_favorito", "azul").is_err());
        assert_eq!(config, AppConfig::default());
    }
}
