//! Record types for the transcript log.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::Result;

/// Identifies one conversation's transcript.
///
/// Keys are opaque to the store: the CLI uses a user-chosen name, other
/// callers may use an account id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SessionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// A record waiting to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub kind: String,
    pub data: Value,
}

impl NewRecord {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Serialize `value` as the record payload.
    pub fn encode<T: Serialize>(kind: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self::new(kind, serde_json::to_value(value)?))
    }
}

/// A stored entry in a session's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub session: SessionKey,
    /// Position within the session, starting at 1.
    pub seq: i64,
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub data: Value,
}

impl Record {
    /// Deserialize the payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_key_display() {
        let key = SessionKey::from("manager-42");
        assert_eq!(key.to_string(), "manager-42");
        assert_eq!(key.as_str(), "manager-42");
    }

    #[test]
    fn new_record_encodes_payload() {
        #[derive(Serialize)]
        struct Payload {
            text: &'static str,
        }

        let record = NewRecord::encode("user", &Payload { text: "hi" }).unwrap();
        assert_eq!(record.kind, "user");
        assert_eq!(record.data, json!({ "text": "hi" }));
    }
}
