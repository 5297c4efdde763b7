use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::deserializers::de;

/// One line of the bitácora. Append-only: the application never edits or removes entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    #[serde(default)]
    pub id: i64,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub usuario: String,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub accion: String,
    #[serde(default, deserialize_with = "de::timestamp_opt")]
    pub fecha: Option<DateTime<Utc>>,
}

impl AuditLogEntry {
    /// First word of the action ("Eliminó ticket #4" → "Eliminó").
    pub fn keyword(&self) -> Option<&str> {
        self.accion.split_whitespace().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword() {
        let e = AuditLogEntry {
            id: 1,
            usuario: "admin@hospital.hn".into(),
            accion: "Eliminó ticket #4".into(),
            fecha: None,
        };
        assert_eq!(e.keyword(), Some("Eliminó"));

        let empty = AuditLogEntry {
            accion: "  ".into(),
            ..e
        };
        assert_eq!(empty.keyword(), None);
    }
}
