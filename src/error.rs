use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de entrada/salida: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error SQLite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Error de serialización: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Error al generar Excel: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Error al generar PDF: {0}")]
    Pdf(String),

    #[error("Validación: {0}")]
    Validation(String),

    #[error("Ticket no encontrado: {0}")]
    TicketNotFound(String),

    #[error("Usuario no encontrado: {0}")]
    UserNotFound(String),

    #[error("El departamento ya existe: {0}")]
    DuplicateDepartment(String),

    #[error("Este correo ya está registrado: {0}")]
    DuplicateEmail(String),

    #[error("El rol {role} no puede {action}")]
    Forbidden { role: String, action: String },

    #[error("Base de datos no inicializada")]
    DbNotInitialized,

    #[error("{0}")]
    Custom(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
