use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parses the textual timestamp forms found in platform exports:
/// RFC 3339, "YYYY-MM-DD HH:MM:SS" (UTC) and bare "YYYY-MM-DD".
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Serde-compatible deserializers for use with `#[serde(deserialize_with = "de::...")]`.
pub mod de {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer};

    /// Firestore `{seconds, nanoseconds}`, epoch millis or a timestamp string.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Seconds {
            seconds: i64,
            #[serde(default)]
            nanoseconds: u32,
        },
        Millis(i64),
        Text(String),
    }

    /// Any supported timestamp form → Some(DateTime<Utc>), null/"" → None
    pub fn timestamp_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
        Ok(match raw {
            None => None,
            Some(RawTimestamp::Seconds {
                seconds,
                nanoseconds,
            }) => Utc.timestamp_opt(seconds, nanoseconds).single(),
            Some(RawTimestamp::Millis(ms)) => Utc.timestamp_millis_opt(ms).single(),
            Some(RawTimestamp::Text(s)) => super::parse_timestamp(&s),
        })
    }

    /// "" / "   " / null → None, "x" → Some("x")
    pub fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
    }

    /// null → ""
    pub fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
    }
}
