// 📨 Event Model - One record type per pipeline stage
// RawEvent → EventWithProcessingTimestamp → SanitizedEvent → NormalizedEvent
//
// Each stage produces a new value whose JSON shape is a superset of the
// previous one. Shared fields live in `EventEnvelope` and are flattened, so
// the wire format reads like a single record growing field by field.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

// ============================================================================
// ACTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventAction {
    Login,
    Logout,
    Purchase,
    View,
    UpdateProfile,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Login => "LOGIN",
            EventAction::Logout => "LOGOUT",
            EventAction::Purchase => "PURCHASE",
            EventAction::View => "VIEW",
            EventAction::UpdateProfile => "UPDATE_PROFILE",
        }
    }

    /// Actions that are expected to submit credentials
    pub fn carries_credentials(&self) -> bool {
        matches!(self, EventAction::Login | EventAction::UpdateProfile)
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ENVELOPE PARTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub user_id: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventContext {
    pub ip_address: String,
    pub user_agent: String,
    /// Client-side event time, epoch milliseconds
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceContext {
    pub browser: String,
    pub os: String,
    pub device: String,
}

/// Fields carried unchanged through every stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub identity: UserIdentity,
    pub action: EventAction,
    pub context: RawEventContext,
    pub device: DeviceContext,
}

// ============================================================================
// SENSITIVE DATA
// ============================================================================

/// Credentials submitted with an event.
///
/// `Debug` and `Serialize` never emit the values, only whether each one is
/// present. Deserialization reads the real values.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveData {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub token: String,
}

const REDACTED: &str = "[REDACTED]";

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        REDACTED
    }
}

impl SensitiveData {
    pub fn new(password: &str, token: &str) -> Self {
        SensitiveData {
            password: password.to_string(),
            token: token.to_string(),
        }
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }
}

impl std::fmt::Debug for SensitiveData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensitiveData")
            .field("password", &redact(&self.password))
            .field("token", &redact(&self.token))
            .finish()
    }
}

impl Serialize for SensitiveData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SensitiveData", 2)?;
        state.serialize_field("password", redact(&self.password))?;
        state.serialize_field("token", redact(&self.token))?;
        state.end()
    }
}

// ============================================================================
// STAGE RECORDS
// ============================================================================

/// Event as supplied by the outside world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(flatten)]
    pub envelope: EventEnvelope,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive_data: Option<SensitiveData>,
}

/// RawEvent plus the time the pipeline picked it up.
///
/// `processed_at` is only `None` for events that bypassed the timestamp
/// stage; the sanitize stage refuses those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWithProcessingTimestamp {
    #[serde(flatten)]
    pub envelope: EventEnvelope,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive_data: Option<SensitiveData>,

    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub processed_at: Option<DateTime<Utc>>,
}

impl EventWithProcessingTimestamp {
    pub fn stamped(raw: RawEvent, processed_at: DateTime<Utc>) -> Self {
        EventWithProcessingTimestamp {
            envelope: raw.envelope,
            sensitive_data: raw.sensitive_data,
            processed_at: Some(processed_at),
        }
    }

    pub fn is_timestamped(&self) -> bool {
        self.processed_at.is_some()
    }

    /// Credentials attached to an action that never submits them
    pub fn has_unexpected_credentials(&self) -> bool {
        self.sensitive_data.is_some() && !self.envelope.action.carries_credentials()
    }
}

/// Unstamped conversion, for callers that skip the timestamp stage
impl From<RawEvent> for EventWithProcessingTimestamp {
    fn from(raw: RawEvent) -> Self {
        EventWithProcessingTimestamp {
            envelope: raw.envelope,
            sensitive_data: raw.sensitive_data,
            processed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedData {
    pub has_password: bool,
    pub has_token: bool,
}

impl SanitizedData {
    pub fn from_sensitive(sensitive: Option<&SensitiveData>) -> Self {
        match sensitive {
            Some(data) => SanitizedData {
                has_password: data.has_password(),
                has_token: data.has_token(),
            },
            None => SanitizedData::default(),
        }
    }
}

/// Timestamped event with credentials replaced by presence flags.
/// There is no credential field on this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedEvent {
    #[serde(flatten)]
    pub envelope: EventEnvelope,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub processed_at: DateTime<Utc>,

    pub sanitized_data: SanitizedData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedContext {
    pub region: String,
    pub timezone: String,
    pub locale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    #[serde(flatten)]
    pub sanitized: SanitizedEvent,

    pub normalized_context: NormalizedContext,
}

impl NormalizedEvent {
    pub fn envelope(&self) -> &EventEnvelope {
        &self.sanitized.envelope
    }

    pub fn processed_at(&self) -> DateTime<Utc> {
        self.sanitized.processed_at
    }

    pub fn sanitized_data(&self) -> SanitizedData {
        self.sanitized.sanitized_data
    }
}

/// Fully processed event, the pipeline's final output
pub type ProcessedEvent = NormalizedEvent;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_raw_event() -> RawEvent {
        serde_json::from_value(json!({
            "identity": {"userId": "u1", "sessionId": "s1"},
            "action": "UPDATE_PROFILE",
            "context": {"ipAddress": "203.0.113.42", "userAgent": "UA", "timestamp": 1000},
            "device": {"browser": "Chrome", "os": "macOS", "device": "MBP"},
            "sensitiveData": {"password": "hunter2", "token": "tok-abc"}
        }))
        .unwrap()
    }

    #[test]
    fn test_raw_event_reads_camel_case_json() {
        let raw = create_test_raw_event();

        assert_eq!(raw.envelope.identity.user_id, "u1");
        assert_eq!(raw.envelope.action, EventAction::UpdateProfile);
        assert_eq!(raw.envelope.context.ip_address, "203.0.113.42");
        assert_eq!(raw.sensitive_data.as_ref().unwrap().password, "hunter2");
    }

    #[test]
    fn test_demo_event_parses() {
        let raw: RawEvent = serde_json::from_str(include_str!("../demos/login_event.json")).unwrap();

        assert_eq!(raw.envelope.action, EventAction::Login);
        assert!(raw.sensitive_data.unwrap().has_token());
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result: Result<RawEvent, _> = serde_json::from_value(json!({
            "identity": {"userId": "u1", "sessionId": "s1"},
            "action": "DELETE_ACCOUNT",
            "context": {"ipAddress": "203.0.113.42", "userAgent": "UA", "timestamp": 1000},
            "device": {"browser": "Chrome", "os": "macOS", "device": "MBP"}
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_sensitive_data_never_serializes_values() {
        let raw = create_test_raw_event();

        let json = serde_json::to_string(&raw).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("tok-abc"));
        assert!(json.contains(REDACTED));

        let debug = format!("{:?}", raw);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("tok-abc"));
    }

    #[test]
    fn test_empty_credentials_serialize_empty() {
        let data = SensitiveData::new("", "tok");
        let value = serde_json::to_value(&data).unwrap();

        assert_eq!(value, json!({"password": "", "token": REDACTED}));
    }

    #[test]
    fn test_unstamped_conversion_has_no_processed_at() {
        let event: EventWithProcessingTimestamp = create_test_raw_event().into();
        assert!(!event.is_timestamped());

        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("processedAt").is_none());
    }

    #[test]
    fn test_processed_at_serializes_as_millis() {
        let at = DateTime::from_timestamp_millis(1_710_624_780_123).unwrap();
        let event = EventWithProcessingTimestamp::stamped(create_test_raw_event(), at);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["processedAt"], json!(1_710_624_780_123_i64));
        assert_eq!(value["identity"]["userId"], json!("u1"));
    }

    #[test]
    fn test_sanitized_data_from_sensitive() {
        assert_eq!(SanitizedData::from_sensitive(None), SanitizedData::default());

        let flags = SanitizedData::from_sensitive(Some(&SensitiveData::new("pw", "")));
        assert!(flags.has_password);
        assert!(!flags.has_token);
    }

    #[test]
    fn test_carries_credentials() {
        assert!(EventAction::Login.carries_credentials());
        assert!(EventAction::UpdateProfile.carries_credentials());
        assert!(!EventAction::View.carries_credentials());
        assert_eq!(EventAction::UpdateProfile.to_string(), "UPDATE_PROFILE");
    }

    #[test]
    fn test_unexpected_credentials() {
        let mut raw = create_test_raw_event();
        let update: EventWithProcessingTimestamp = raw.clone().into();
        assert!(!update.has_unexpected_credentials());

        raw.envelope.action = EventAction::View;
        let view: EventWithProcessingTimestamp = raw.clone().into();
        assert!(view.has_unexpected_credentials());

        raw.sensitive_data = None;
        let bare: EventWithProcessingTimestamp = raw.into();
        assert!(!bare.has_unexpected_credentials());
    }
}
