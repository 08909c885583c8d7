//! Event types, hook results, and the payload handed to handlers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of lifecycle moments the host can raise.
///
/// Adding a value requires a coordinated release of host and plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // ── Users ──
    /// A new account is being created.
    UserSignup,
    /// An account is logging in.
    UserLogin,

    // ── Compute sessions ──
    /// A compute session is starting.
    ComputeSessionStart,
    /// A compute session is terminating.
    ComputeSessionTerminate,

    // ── Volumes ──
    /// A storage volume is being created.
    VolumeCreate,
    /// A storage volume is being deleted.
    VolumeDelete,
}

impl EventType {
    /// Every event type, in code order.
    pub const ALL: [EventType; 6] = [
        Self::UserSignup,
        Self::UserLogin,
        Self::ComputeSessionStart,
        Self::ComputeSessionTerminate,
        Self::VolumeCreate,
        Self::VolumeDelete,
    ];

    /// Returns the stable numeric code of this event type.
    pub fn code(&self) -> u16 {
        match self {
            Self::UserSignup => 0x1001,
            Self::UserLogin => 0x1002,
            Self::ComputeSessionStart => 0x2001,
            Self::ComputeSessionTerminate => 0x2002,
            Self::VolumeCreate => 0x3001,
            Self::VolumeDelete => 0x3002,
        }
    }

    /// Returns the string name of this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserSignup => "user_signup",
            Self::UserLogin => "user_login",
            Self::ComputeSessionStart => "compute_session_start",
            Self::ComputeSessionTerminate => "compute_session_terminate",
            Self::VolumeCreate => "volume_create",
            Self::VolumeDelete => "volume_delete",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<u16> for EventType {
    type Error = u16;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|event| event.code() == code)
            .ok_or(code)
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    /// Parses the snake_case name, e.g. `user_signup`.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == name)
            .ok_or_else(|| format!("unknown event type '{name}'"))
    }
}

/// Decision rendered by a handler, or by the aggregate of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookResult {
    /// No objection.
    Bypass,
    /// The triggering operation must not proceed.
    Rejected,
    /// The handler altered something. Aggregated like `Bypass`.
    Modified,
}

impl HookResult {
    /// Returns whether this result is a rejection.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

impl std::fmt::Display for HookResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bypass => "bypass",
            Self::Rejected => "rejected",
            Self::Modified => "modified",
        };
        write!(f, "{name}")
    }
}

/// Event argument passed to hook handlers: a flexible key-value map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookPayload {
    /// Arbitrary data keyed by string.
    pub data: HashMap<String, serde_json::Value>,
    /// The actor (user) who triggered this event.
    pub actor_id: Option<Uuid>,
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,
}

impl HookPayload {
    /// Creates an empty payload stamped with the current time.
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            actor_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Sets the actor ID.
    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Inserts a typed data value.
    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Inserts a string value.
    pub fn with_string(self, key: &str, value: &str) -> Self {
        self.with_data(key, serde_json::json!(value))
    }

    /// Inserts a UUID value.
    pub fn with_uuid(self, key: &str, value: Uuid) -> Self {
        self.with_data(key, serde_json::json!(value))
    }

    /// Inserts an integer value.
    pub fn with_int(self, key: &str, value: i64) -> Self {
        self.with_data(key, serde_json::json!(value))
    }

    /// Inserts a boolean value.
    pub fn with_bool(self, key: &str, value: bool) -> Self {
        self.with_data(key, serde_json::json!(value))
    }

    /// Gets a data value by key.
    pub fn get_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a string data value.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Gets a UUID data value.
    pub fn get_uuid(&self, key: &str) -> Option<Uuid> {
        self.data
            .get(key)
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Gets an i64 data value.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(|v| v.as_i64())
    }

    /// Gets a bool data value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }
}

impl Default for HookPayload {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_codes_round_trip() {
        for event in EventType::ALL {
            assert_eq!(EventType::try_from(event.code()), Ok(event));
        }
        assert_eq!(EventType::try_from(0x9999), Err(0x9999));
    }

    #[test]
    fn test_event_parses_from_name() {
        for event in EventType::ALL {
            assert_eq!(event.as_str().parse::<EventType>(), Ok(event));
        }
        assert!("user-signup".parse::<EventType>().is_err());
    }

    #[test]
    fn test_event_serializes_as_snake_case() {
        let json = serde_json::to_string(&EventType::ComputeSessionStart).unwrap();
        assert_eq!(json, "\"compute_session_start\"");
    }

    #[test]
    fn test_payload_typed_accessors() {
        let id = Uuid::new_v4();
        let payload = HookPayload::new()
            .with_actor(id)
            .with_string("email", "a@example.com")
            .with_uuid("session_id", id)
            .with_int("quota", 3)
            .with_bool("admin", false);

        assert_eq!(payload.actor_id, Some(id));
        assert_eq!(payload.get_string("email"), Some("a@example.com"));
        assert_eq!(payload.get_uuid("session_id"), Some(id));
        assert_eq!(payload.get_i64("quota"), Some(3));
        assert_eq!(payload.get_bool("admin"), Some(false));
        assert!(payload.get_data("missing").is_none());
    }
}
