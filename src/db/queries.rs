use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row, Transaction};

use crate::model::{
    same_identity, AuditLogEntry, ChatMessage, Comment, Department, MessageKind, Priority, Role,
    Status, Ticket, UserAccount,
};
use crate::workflow::normalize_department;

// ─── Helpers privados ─────────────────────────────────────────────────────────

const TICKET_COLUMNS: &str = "id, numero, asunto, descripcion, departamento, categoria, prioridad,
    estado, creado_por, tecnico_asignado, fecha, fecha_primer_respuesta, fecha_cierre,
    fecha_recuperado, solucion, impreso";

fn row_to_ticket(row: &Row) -> Result<Ticket, rusqlite::Error> {
    Ok(Ticket {
        id: row.get(0)?,
        numero: row.get(1)?,
        asunto: row.get(2)?,
        descripcion: row.get(3)?,
        departamento: row.get(4)?,
        categoria: row.get(5)?,
        prioridad: Priority::from_label(&row.get::<_, String>(6)?),
        estado: Status::from_label(&row.get::<_, String>(7)?),
        creado_por: row.get(8)?,
        tecnico_asignado: row
            .get::<_, Option<String>>(9)?
            .filter(|t| !t.trim().is_empty()),
        fecha: row.get(10)?,
        fecha_primer_respuesta: row.get(11)?,
        fecha_cierre: row.get(12)?,
        fecha_recuperado: row.get(13)?,
        solucion: row.get(14)?,
        impreso: row.get::<_, i32>(15)? != 0,
    })
}

fn readers_to_json(readers: &[String]) -> Result<String, rusqlite::Error> {
    serde_json::to_string(readers).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn readers_from_json(idx: usize, raw: &str) -> Result<Vec<String>, rusqlite::Error> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_chat(row: &Row) -> Result<ChatMessage, rusqlite::Error> {
    let leido_por: String = row.get(7)?;
    Ok(ChatMessage {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        autor: row.get(2)?,
        tipo: MessageKind::from_label(&row.get::<_, String>(3)?),
        mensaje: row.get(4)?,
        imagen_url: row.get(5)?,
        fecha: row.get(6)?,
        leido_por: readers_from_json(7, &leido_por)?,
    })
}

fn row_to_user(row: &Row) -> Result<UserAccount, rusqlite::Error> {
    Ok(UserAccount {
        id: row.get(0)?,
        nombre: row.get(1)?,
        dni: row.get(2)?,
        correo: row.get(3)?,
        departamento: row.get(4)?,
        rol: Role::from_label(&row.get::<_, String>(5)?),
        creado_en: row.get(6)?,
    })
}

// ─── Tickets ──────────────────────────────────────────────────────────────────

pub fn list_tickets(conn: &Connection) -> Result<Vec<Ticket>, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM tickets ORDER BY fecha DESC, numero DESC",
        TICKET_COLUMNS
    ))?;
    let rows = stmt.query_map([], row_to_ticket)?;
    rows.collect()
}

/// Looks a ticket up by document id, or by number when `reference` is numeric ("12" or "#12").
pub fn find_ticket(conn: &Connection, reference: &str) -> Result<Option<Ticket>, rusqlite::Error> {
    let reference = reference.trim();
    let by_id = conn
        .query_row(
            &format!("SELECT {} FROM tickets WHERE id = ?1", TICKET_COLUMNS),
            [reference],
            row_to_ticket,
        )
        .optional()?;
    if by_id.is_some() {
        return Ok(by_id);
    }
    match reference.trim_start_matches('#').parse::<i64>() {
        Ok(numero) => conn
            .query_row(
                &format!("SELECT {} FROM tickets WHERE numero = ?1", TICKET_COLUMNS),
                [numero],
                row_to_ticket,
            )
            .optional(),
        Err(_) => Ok(None),
    }
}

/// Upsert by id. Comments and chat are left untouched.
pub fn save_ticket(conn: &Connection, t: &Ticket) -> Result<usize, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO tickets (
            id, numero, asunto, descripcion, departamento, categoria, prioridad,
            estado, creado_por, tecnico_asignado, fecha, fecha_primer_respuesta, fecha_cierre,
            fecha_recuperado, solucion, impreso
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        ON CONFLICT(id) DO UPDATE SET
            numero = excluded.numero,
            asunto = excluded.asunto,
            descripcion = excluded.descripcion,
            departamento = excluded.departamento,
            categoria = excluded.categoria,
            prioridad = excluded.prioridad,
            estado = excluded.estado,
            creado_por = excluded.creado_por,
            tecnico_asignado = excluded.tecnico_asignado,
            fecha = excluded.fecha,
            fecha_primer_respuesta = excluded.fecha_primer_respuesta,
            fecha_cierre = excluded.fecha_cierre,
            fecha_recuperado = excluded.fecha_recuperado,
            solucion = excluded.solucion,
            impreso = excluded.impreso",
    )?;
    stmt.execute(params![
        t.id,
        t.numero,
        t.asunto,
        t.descripcion,
        t.departamento,
        t.categoria,
        t.prioridad.key(),
        t.estado.key(),
        t.creado_por,
        t.tecnico_asignado,
        t.fecha,
        t.fecha_primer_respuesta,
        t.fecha_cierre,
        t.fecha_recuperado,
        t.solucion,
        t.impreso as i32,
    ])
}

/// Reads and bumps the `tickets` counter. Must run inside the caller's transaction.
pub fn mint_ticket_number(tx: &Transaction) -> Result<i64, rusqlite::Error> {
    tx.execute(
        "INSERT OR IGNORE INTO counters (name, ultimo) VALUES ('tickets', 0)",
        [],
    )?;
    tx.execute(
        "UPDATE counters SET ultimo = ultimo + 1 WHERE name = 'tickets'",
        [],
    )?;
    tx.query_row(
        "SELECT ultimo FROM counters WHERE name = 'tickets'",
        [],
        |row| row.get(0),
    )
}

pub fn next_ticket_number(conn: &mut Connection) -> Result<i64, rusqlite::Error> {
    let tx = conn.transaction()?;
    let n = mint_ticket_number(&tx)?;
    tx.commit()?;
    Ok(n)
}

/// Stores a new ticket with a freshly minted number; returns the number.
pub fn insert_new_ticket(conn: &mut Connection, ticket: &mut Ticket) -> Result<i64, rusqlite::Error> {
    let tx = conn.transaction()?;
    let numero = mint_ticket_number(&tx)?;
    ticket.numero = Some(numero);
    save_ticket(&tx, ticket)?;
    tx.commit()?;
    Ok(numero)
}

/// Hard delete of a ticket with its comments and chat.
pub fn purge_ticket(conn: &mut Connection, id: &str) -> Result<usize, rusqlite::Error> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM comments WHERE ticket_id = ?1", [id])?;
    tx.execute("DELETE FROM chat_messages WHERE ticket_id = ?1", [id])?;
    let n = tx.execute("DELETE FROM tickets WHERE id = ?1", [id])?;
    tx.commit()?;
    Ok(n)
}

// ─── Comentarios ──────────────────────────────────────────────────────────────

pub fn insert_comment(conn: &Connection, c: &Comment) -> Result<i64, rusqlite::Error> {
    conn.prepare_cached(
        "INSERT INTO comments (ticket_id, usuario, texto, fecha) VALUES (?1, ?2, ?3, ?4)",
    )?
    .execute(params![c.ticket_id, c.usuario, c.texto, c.fecha])?;
    Ok(conn.last_insert_rowid())
}

pub fn list_comments(conn: &Connection, ticket_id: &str) -> Result<Vec<Comment>, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, ticket_id, usuario, texto, fecha FROM comments
         WHERE ticket_id = ?1 ORDER BY fecha ASC, id ASC",
    )?;
    let rows = stmt.query_map([ticket_id], |row| {
        Ok(Comment {
            id: row.get(0)?,
            ticket_id: row.get(1)?,
            usuario: row.get(2)?,
            texto: row.get(3)?,
            fecha: row.get(4)?,
        })
    })?;
    rows.collect()
}

// ─── Chat ─────────────────────────────────────────────────────────────────────

const CHAT_COLUMNS: &str = "id, ticket_id, autor, tipo, mensaje, imagen_url, fecha, leido_por";

pub fn insert_chat_message(conn: &Connection, m: &ChatMessage) -> Result<i64, rusqlite::Error> {
    conn.prepare_cached(
        "INSERT INTO chat_messages (ticket_id, autor, tipo, mensaje, imagen_url, fecha, leido_por)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?
    .execute(params![
        m.ticket_id,
        m.autor,
        m.tipo.key(),
        m.mensaje,
        m.imagen_url,
        m.fecha,
        readers_to_json(&m.leido_por)?,
    ])?;
    Ok(conn.last_insert_rowid())
}

pub fn list_chat_messages(conn: &Connection, ticket_id: &str) -> Result<Vec<ChatMessage>, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM chat_messages WHERE ticket_id = ?1 ORDER BY fecha ASC, id ASC",
        CHAT_COLUMNS
    ))?;
    let rows = stmt.query_map([ticket_id], row_to_chat)?;
    rows.collect()
}

pub fn list_all_chat_messages(conn: &Connection) -> Result<Vec<ChatMessage>, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM chat_messages ORDER BY fecha ASC, id ASC",
        CHAT_COLUMNS
    ))?;
    let rows = stmt.query_map([], row_to_chat)?;
    rows.collect()
}

/// Adds `viewer` to the reader set of every message of the ticket. Returns how many changed.
pub fn mark_chat_read(conn: &mut Connection, ticket_id: &str, viewer: &str) -> Result<usize, rusqlite::Error> {
    let tx = conn.transaction()?;
    let mut changed = 0;
    {
        let mut select = tx.prepare_cached("SELECT id, leido_por FROM chat_messages WHERE ticket_id = ?1")?;
        let rows: Vec<(i64, String)> = select
            .query_map([ticket_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<_, _>>()?;
        let mut update = tx.prepare_cached("UPDATE chat_messages SET leido_por = ?1 WHERE id = ?2")?;
        for (id, raw) in rows {
            let mut readers = readers_from_json(1, &raw)?;
            if readers.iter().any(|r| same_identity(r, viewer)) {
                continue;
            }
            readers.push(viewer.trim().to_string());
            update.execute(params![readers_to_json(&readers)?, id])?;
            changed += 1;
        }
    }
    tx.commit()?;
    Ok(changed)
}

// ─── Departamentos ────────────────────────────────────────────────────────────

pub fn list_departments(conn: &Connection) -> Result<Vec<Department>, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, nombre, fecha_creacion FROM departments ORDER BY nombre ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Department {
            id: row.get(0)?,
            nombre: row.get(1)?,
            fecha_creacion: row.get(2)?,
        })
    })?;
    rows.collect()
}

/// Compares normalized names so legacy rows in mixed case still count as duplicates.
pub fn department_exists(conn: &Connection, nombre: &str) -> Result<bool, rusqlite::Error> {
    let wanted = normalize_department(nombre);
    Ok(list_departments(conn)?
        .iter()
        .any(|d| normalize_department(&d.nombre) == wanted))
}

pub fn insert_department(
    conn: &Connection,
    nombre: &str,
    fecha: DateTime<Utc>,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO departments (nombre, fecha_creacion) VALUES (?1, ?2)",
        params![nombre, fecha],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_department(conn: &Connection, nombre: &str) -> Result<Option<Department>, rusqlite::Error> {
    let wanted = normalize_department(nombre);
    Ok(list_departments(conn)?
        .into_iter()
        .find(|d| normalize_department(&d.nombre) == wanted))
}

pub fn delete_department(conn: &Connection, id: i64) -> Result<usize, rusqlite::Error> {
    conn.execute("DELETE FROM departments WHERE id = ?1", [id])
}

// ─── Usuarios ─────────────────────────────────────────────────────────────────

const USER_COLUMNS: &str = "id, nombre, dni, correo, departamento, rol, creado_en";

pub fn list_users(conn: &Connection) -> Result<Vec<UserAccount>, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM users ORDER BY nombre COLLATE NOCASE ASC",
        USER_COLUMNS
    ))?;
    let rows = stmt.query_map([], row_to_user)?;
    rows.collect()
}

pub fn find_user_by_email(conn: &Connection, correo: &str) -> Result<Option<UserAccount>, rusqlite::Error> {
    conn.query_row(
        &format!(
            "SELECT {} FROM users WHERE LOWER(correo) = LOWER(?1) LIMIT 1",
            USER_COLUMNS
        ),
        [correo.trim()],
        row_to_user,
    )
    .optional()
}

pub fn find_user(conn: &Connection, id: &str) -> Result<Option<UserAccount>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        [id],
        row_to_user,
    )
    .optional()
}

/// True when another account (other than `except_id`) already uses the address.
pub fn email_taken(conn: &Connection, correo: &str, except_id: Option<&str>) -> Result<bool, rusqlite::Error> {
    Ok(find_user_by_email(conn, correo)?
        .is_some_and(|u| except_id.map_or(true, |id| u.id != id)))
}

pub fn upsert_user(conn: &Connection, u: &UserAccount) -> Result<usize, rusqlite::Error> {
    conn.prepare_cached(
        "INSERT OR REPLACE INTO users (id, nombre, dni, correo, departamento, rol, creado_en)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?
    .execute(params![
        u.id,
        u.nombre,
        u.dni,
        u.correo,
        u.departamento,
        u.rol.label(),
        u.creado_en,
    ])
}

pub fn delete_user(conn: &Connection, id: &str) -> Result<usize, rusqlite::Error> {
    conn.execute("DELETE FROM users WHERE id = ?1", [id])
}

// ─── Bitácora ─────────────────────────────────────────────────────────────────

pub fn append_audit(
    conn: &Connection,
    usuario: &str,
    accion: &str,
    fecha: DateTime<Utc>,
) -> Result<i64, rusqlite::Error> {
    conn.prepare_cached("INSERT INTO audit_log (usuario, accion, fecha) VALUES (?1, ?2, ?3)")?
        .execute(params![usuario, accion, fecha])?;
    Ok(conn.last_insert_rowid())
}

/// Whole log, newest first.
pub fn list_audit(conn: &Connection) -> Result<Vec<AuditLogEntry>, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, usuario, accion, fecha FROM audit_log ORDER BY fecha DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(AuditLogEntry {
            id: row.get(0)?,
            usuario: row.get(1)?,
            accion: row.get(2)?,
            fecha: row.get(3)?,
        })
    })?;
    rows.collect()
}
