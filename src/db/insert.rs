use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::model::{AuditLogEntry, ChatMessage, Comment, Department, Ticket, UserAccount};

/// A ticket document with its subcollections, as exported from the platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDocument {
    #[serde(flatten)]
    pub ticket: Ticket,
    #[serde(default)]
    pub comentarios: Vec<Comment>,
    #[serde(default)]
    pub chat: Vec<ChatMessage>,
}

/// JSON dump of the platform collections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub tickets: Vec<TicketDocument>,
    #[serde(default)]
    pub departamentos: Vec<Department>,
    #[serde(default)]
    pub usuarios: Vec<UserAccount>,
    #[serde(default)]
    pub bitacora: Vec<AuditLogEntry>,
    /// Value of `counters/tickets.ultimo` at export time.
    #[serde(default)]
    pub ultimo_ticket: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub tickets: usize,
    pub comentarios: usize,
    pub mensajes: usize,
    pub departamentos: usize,
    pub usuarios: usize,
    pub bitacora: usize,
    pub ultimo_ticket: i64,
}

/// Loads a snapshot in one transaction. Tickets and users are upserted by id,
/// and the ticket counter never moves backwards.
pub fn import_snapshot(conn: &mut Connection, snapshot: &Snapshot) -> Result<ImportSummary, rusqlite::Error> {
    let tx = conn.transaction()?;
    let mut summary = ImportSummary::default();

    {
        let mut comment_stmt = tx.prepare_cached(
            "INSERT INTO comments (ticket_id, usuario, texto, fecha) VALUES (?1, ?2, ?3, ?4)",
        )?;
        let mut chat_stmt = tx.prepare_cached(
            "INSERT INTO chat_messages (ticket_id, autor, tipo, mensaje, imagen_url, fecha, leido_por)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for doc in &snapshot.tickets {
            let t = &doc.ticket;
            super::queries::save_ticket(&tx, t)?;
            summary.tickets += 1;

            // Re-importing a ticket replaces its subcollections.
            tx.execute("DELETE FROM comments WHERE ticket_id = ?1", [&t.id])?;
            tx.execute("DELETE FROM chat_messages WHERE ticket_id = ?1", [&t.id])?;

            for c in &doc.comentarios {
                comment_stmt.execute(params![t.id, c.usuario, c.texto, c.fecha])?;
                summary.comentarios += 1;
            }
            for m in &doc.chat {
                let leido_por = serde_json::to_string(&m.leido_por)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                chat_stmt.execute(params![
                    t.id,
                    m.autor,
                    m.tipo.key(),
                    m.mensaje,
                    m.imagen_url,
                    m.fecha,
                    leido_por,
                ])?;
                summary.mensajes += 1;
            }
        }

        let mut dept_stmt = tx.prepare_cached(
            "INSERT INTO departments (nombre, fecha_creacion) VALUES (?1, ?2)",
        )?;
        for d in &snapshot.departamentos {
            let nombre = crate::workflow::normalize_department(&d.nombre);
            if nombre.is_empty() || super::queries::department_exists(&tx, &nombre)? {
                continue;
            }
            dept_stmt.execute(params![nombre, d.fecha_creacion])?;
            summary.departamentos += 1;
        }

        for u in &snapshot.usuarios {
            if u.id.trim().is_empty() {
                log::warn!("Usuario sin id omitido: {}", u.correo);
                continue;
            }
            super::queries::upsert_user(&tx, u)?;
            summary.usuarios += 1;
        }

        // The bitácora has no document id: an entry already present with the
        // same actor, action and timestamp is the same entry.
        let mut audit_seen = tx.prepare_cached(
            "SELECT 1 FROM audit_log WHERE usuario = ?1 AND accion = ?2 AND fecha IS ?3 LIMIT 1",
        )?;
        let mut audit_stmt = tx.prepare_cached(
            "INSERT INTO audit_log (usuario, accion, fecha) VALUES (?1, ?2, ?3)",
        )?;
        for e in &snapshot.bitacora {
            if audit_seen.exists(params![e.usuario, e.accion, e.fecha])? {
                continue;
            }
            audit_stmt.execute(params![e.usuario, e.accion, e.fecha])?;
            summary.bitacora += 1;
        }
    }

    let max_numero: Option<i64> = tx.query_row("SELECT MAX(numero) FROM tickets", [], |r| r.get(0))?;
    let current: Option<i64> = tx
        .query_row("SELECT ultimo FROM counters WHERE name = 'tickets'", [], |r| r.get(0))
        .optional()?;
    let ultimo = [current, max_numero, snapshot.ultimo_ticket]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0);
    tx.execute(
        "INSERT OR REPLACE INTO counters (name, ultimo) VALUES ('tickets', ?1)",
        [ultimo],
    )?;
    summary.ultimo_ticket = ultimo;

    tx.commit()?;
    log::info!(
        "Importación: {} tickets, {} comentarios, {} mensajes, {} departamentos, {} usuarios, {} entradas de bitácora",
        summary.tickets,
        summary.comentarios,
        summary.mensajes,
        summary.departamentos,
        summary.usuarios,
        summary.bitacora
    );
    Ok(summary)
}
