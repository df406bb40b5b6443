//! Data models for session records

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A resumable conversation keyed by an opaque session id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identifier supplied by the caller or generated on first run
    pub session_id: String,

    /// When the session was first created
    pub created_at: DateTime<Utc>,

    /// When a turn was last appended
    pub updated_at: DateTime<Utc>,
}

/// One turn of a session's conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Session this turn belongs to
    pub session_id: String,

    /// Position of the turn within the session, starting at 0
    pub sequence: i64,

    /// Who produced the turn (user, analyzer, architect, developer, ...)
    pub role: String,

    /// Turn text
    pub content: String,

    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

/// Encode a timestamp as fixed-width RFC 3339 so that text ordering matches time ordering
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidData(format!("{} '{}': {}", column, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_encoding_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let b = a + chrono::Duration::microseconds(500_000);
        let ea = encode_timestamp(&a);
        let eb = encode_timestamp(&b);
        assert_eq!(ea.len(), eb.len());
        assert!(ea < eb);
    }

    #[test]
    fn test_timestamp_decode_roundtrip() {
        let now = Utc::now();
        let encoded = encode_timestamp(&now);
        let decoded = decode_timestamp("timestamp", &encoded).unwrap();
        assert_eq!(encode_timestamp(&decoded), encoded);
    }

    #[test]
    fn test_timestamp_decode_invalid() {
        let err = decode_timestamp("updated_at", "yesterday").unwrap_err();
        assert!(err.to_string().contains("updated_at"));
    }
}
