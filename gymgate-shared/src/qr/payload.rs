/// QR badge payload structure and parsing
///
/// # Wire Shape
///
/// ```json
/// {
///   "type": "gym_attendance",
///   "member_id": "MEM001",
///   "gym_id": "550e8400-e29b-41d4-a716-446655440000",
///   "name": "Dana Park",
///   "generated_at": "2026-01-10T12:00:00Z"
/// }
/// ```
///
/// `member_id` carries the human-readable member code (the same string
/// members type by hand), not the internal row id. The payload is plain
/// unsigned JSON: the member-directory lookup plus the gym cross-check
/// are the actual trust boundary, and signing would break every badge
/// already in circulation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminator value marking an attendance badge payload
pub const BADGE_PAYLOAD_TYPE: &str = "gym_attendance";

/// The scannable badge payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgePayload {
    /// Fixed discriminator, always [`BADGE_PAYLOAD_TYPE`]
    #[serde(rename = "type")]
    pub payload_type: String,

    /// Member code (human-readable, unique within the gym)
    pub member_id: String,

    /// Gym the badge was issued for
    pub gym_id: String,

    /// Display name shown beside the code on the badge
    pub name: String,

    /// When the badge was generated
    pub generated_at: DateTime<Utc>,
}

impl BadgePayload {
    /// Builds a payload for a member's badge
    pub fn new(
        member_code: impl Into<String>,
        gym_id: Uuid,
        display_name: impl Into<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            payload_type: BADGE_PAYLOAD_TYPE.to_string(),
            member_id: member_code.into(),
            gym_id: gym_id.to_string(),
            name: display_name.into(),
            generated_at,
        }
    }

    /// Serializes the payload to its wire JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The gym id the badge claims, if it parses as a UUID
    ///
    /// A badge carrying garbage here can never match a real gym, so the
    /// caller treats `None` like any other gym mismatch.
    pub fn expected_gym(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.gym_id).ok()
    }
}

/// Result of parsing raw scanner input
#[derive(Debug, Clone, PartialEq)]
pub enum ScanInput {
    /// Input was a well-formed badge payload
    Badge(BadgePayload),

    /// Anything else: treat the whole trimmed input as a member code
    Code(String),
}

/// Parses raw scanner input into a badge payload or a bare code
///
/// Parse failures and unknown discriminators are not errors at this
/// stage: the input silently falls through to raw-code handling, and a
/// bad code surfaces later as "member not found". Unknown JSON fields
/// are ignored so newer badge generations keep scanning.
pub fn parse_scan_input(raw: &str) -> ScanInput {
    let trimmed = raw.trim();

    if let Ok(payload) = serde_json::from_str::<BadgePayload>(trimmed) {
        if payload.payload_type == BADGE_PAYLOAD_TYPE {
            return ScanInput::Badge(payload);
        }
    }

    ScanInput::Code(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let gym = Uuid::new_v4();
        let payload = BadgePayload::new("MEM001", gym, "Dana Park", Utc::now());

        let json = payload.to_json().unwrap();
        match parse_scan_input(&json) {
            ScanInput::Badge(decoded) => {
                assert_eq!(decoded.member_id, "MEM001");
                assert_eq!(decoded.expected_gym(), Some(gym));
                assert_eq!(decoded.name, "Dana Park");
            }
            ScanInput::Code(_) => panic!("expected badge payload"),
        }
    }

    #[test]
    fn test_wire_field_names_are_stable() {
        let payload = BadgePayload::new(
            "MEM001",
            Uuid::nil(),
            "Dana Park",
            DateTime::parse_from_rfc3339("2026-01-10T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );

        let value: serde_json::Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "gym_attendance");
        assert_eq!(value["member_id"], "MEM001");
        assert_eq!(value["gym_id"], Uuid::nil().to_string());
        assert_eq!(value["name"], "Dana Park");
        assert_eq!(value["generated_at"], "2026-01-10T12:00:00Z");
    }

    #[test]
    fn test_non_json_falls_back_to_raw_code() {
        assert_eq!(
            parse_scan_input("MEM001"),
            ScanInput::Code("MEM001".to_string())
        );
        assert_eq!(
            parse_scan_input("  MEM001\n"),
            ScanInput::Code("MEM001".to_string())
        );
    }

    #[test]
    fn test_wrong_discriminator_falls_back_to_raw_code() {
        let json = r#"{"type":"door_access","member_id":"MEM001","gym_id":"x","name":"D","generated_at":"2026-01-10T12:00:00Z"}"#;
        assert_eq!(parse_scan_input(json), ScanInput::Code(json.to_string()));
    }

    #[test]
    fn test_missing_fields_fall_back_to_raw_code() {
        let json = r#"{"type":"gym_attendance","member_id":"MEM001"}"#;
        assert_eq!(parse_scan_input(json), ScanInput::Code(json.to_string()));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{
            "type": "gym_attendance",
            "member_id": "MEM001",
            "gym_id": "550e8400-e29b-41d4-a716-446655440000",
            "name": "Dana Park",
            "generated_at": "2026-01-10T12:00:00Z",
            "signature": "future-field",
            "version": 3
        }"#;

        match parse_scan_input(json) {
            ScanInput::Badge(payload) => assert_eq!(payload.member_id, "MEM001"),
            ScanInput::Code(_) => panic!("unknown fields must not break decoding"),
        }
    }

    #[test]
    fn test_expected_gym_with_garbage_id() {
        let mut payload = BadgePayload::new("MEM001", Uuid::new_v4(), "Dana", Utc::now());
        payload.gym_id = "not-a-uuid".to_string();
        assert_eq!(payload.expected_gym(), None);
    }
}
