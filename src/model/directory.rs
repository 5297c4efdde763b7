use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::deserializers::de;
use super::text::normalize_text;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    #[serde(default)]
    pub id: i64,
    pub nombre: String,
    #[serde(default, deserialize_with = "de::timestamp_opt")]
    pub fecha_creacion: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Technician,
    #[default]
    EndUser,
}

/// Actions whose availability depends on the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateTicket,
    Comment,
    Chat,
    ChangeStatus,
    CloseTicket,
    Reassign,
    PrintTicket,
    ExportReports,
    AssignTicket,
    DeleteTicket,
    RecoverTicket,
    PurgeTicket,
    ManageDepartments,
    ManageUsers,
    ReadAuditLog,
}

impl Action {
    pub fn describe(self) -> &'static str {
        match self {
            Action::CreateTicket => "crear tickets",
            Action::Comment => "comentar tickets",
            Action::Chat => "usar el chat",
            Action::ChangeStatus => "cambiar el estado de tickets",
            Action::CloseTicket => "cerrar tickets",
            Action::Reassign => "reasignar tickets",
            Action::PrintTicket => "imprimir tickets",
            Action::ExportReports => "exportar reportes",
            Action::AssignTicket => "asignar tickets",
            Action::DeleteTicket => "eliminar tickets",
            Action::RecoverTicket => "recuperar tickets",
            Action::PurgeTicket => "eliminar tickets definitivamente",
            Action::ManageDepartments => "administrar departamentos",
            Action::ManageUsers => "administrar usuarios",
            Action::ReadAuditLog => "consultar la bitácora",
        }
    }
}

impl Role {
    pub fn from_label(label: &str) -> Self {
        match normalize_text(label).as_str() {
            "administrador" | "admin" => Role::Admin,
            "tecnico" | "technician" => Role::Technician,
            _ => Role::EndUser,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "Administrador",
            Role::Technician => "Tecnico",
            Role::EndUser => "Usuario",
        }
    }

    /// Technicians and administrators can be assigned tickets.
    pub fn can_be_assigned(self) -> bool {
        matches!(self, Role::Admin | Role::Technician)
    }

    pub fn allows(self, action: Action) -> bool {
        match self {
            Role::Admin => true,
            Role::Technician => matches!(
                action,
                Action::CreateTicket
                    | Action::Comment
                    | Action::Chat
                    | Action::ChangeStatus
                    | Action::CloseTicket
                    | Action::Reassign
                    | Action::PrintTicket
                    | Action::ExportReports
            ),
            Role::EndUser => matches!(
                action,
                Action::CreateTicket | Action::Comment | Action::Chat
            ),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::from_label(&s)
    }
}

impl From<Role> for String {
    fn from(r: Role) -> Self {
        r.label().to_string()
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_text(s).as_str() {
            "administrador" | "admin" | "tecnico" | "technician" | "usuario" | "user"
            | "end-user" => Ok(Role::from_label(s)),
            _ => Err(format!("Rol desconocido: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    #[serde(default, alias = "uid")]
    pub id: String,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub nombre: String,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub dni: String,
    pub correo: String,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub departamento: String,
    #[serde(default)]
    pub rol: Role,
    #[serde(default, deserialize_with = "de::timestamp_opt")]
    pub creado_en: Option<DateTime<Utc>>,
}

/// Fields supplied when registering or editing an account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub nombre: String,
    pub dni: String,
    pub correo: String,
    pub departamento: String,
    pub rol: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_label() {
        assert_eq!(Role::from_label("Administrador"), Role::Admin);
        assert_eq!(Role::from_label("Técnico"), Role::Technician);
        assert_eq!(Role::from_label("Tecnico"), Role::Technician);
        assert_eq!(Role::from_label("Usuario"), Role::EndUser);
        assert_eq!(Role::from_label(""), Role::EndUser);
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Admin.allows(Action::PurgeTicket));
        assert!(Role::Technician.allows(Action::CloseTicket));
        assert!(!Role::Technician.allows(Action::AssignTicket));
        assert!(!Role::Technician.allows(Action::ManageUsers));
        assert!(Role::EndUser.allows(Action::CreateTicket));
        assert!(Role::EndUser.allows(Action::Chat));
        assert!(!Role::EndUser.allows(Action::CloseTicket));
        assert!(!Role::EndUser.allows(Action::ReadAuditLog));
    }

    #[test]
    fn test_can_be_assigned() {
        assert!(Role::Admin.can_be_assigned());
        assert!(Role::Technician.can_be_assigned());
        assert!(!Role::EndUser.can_be_assigned());
    }

    #[test]
    fn test_user_account_uid_alias() {
        let u: UserAccount = serde_json::from_str(
            r#"{"uid": "u1", "nombre": "Ana", "dni": "0501199012345", "correo": "ana@hospital.hn", "departamento": "IT", "rol": "Tecnico"}"#,
        )
        .unwrap();
        assert_eq!(u.id, "u1");
        assert_eq!(u.rol, Role::Technician);
    }
}
