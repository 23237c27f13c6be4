//! QR presence token payload codec and usability rules.
//!
//! The payload is the exact JSON string rendered into the QR image:
//!
//! ```text
//! {"venue_id":"17","expiry":"2026-10-16T09:15:00Z","salt":"9f0c…"}
//! ```
//!
//! There is no MAC. A scan is accepted only when the server holds a token
//! whose stored payload is byte-identical to the scanned string, so the
//! field order and timestamp format here must never change.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::generate_salt;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Shortest token validity an admin may request, in minutes.
pub const MIN_VALIDITY_MINS: i64 = 1;

/// Longest token validity an admin may request, in minutes (one day).
pub const MAX_VALIDITY_MINS: i64 = 1440;

/// Validity used when the admin does not specify one.
pub const DEFAULT_VALIDITY_MINS: i64 = 15;

/// Deserialized QR payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    pub venue_id: String,
    pub expiry: String,
    pub salt: String,
}

impl QrPayload {
    /// Build a payload for `venue_id` expiring `validity_mins` after `now`.
    ///
    /// The expiry is rounded up to whole seconds so that the RFC 3339 text in
    /// the payload and the stored `expires_at` column agree exactly and the
    /// token never lives shorter than requested.
    pub fn issue(venue_id: DbId, now: Timestamp, validity_mins: i64) -> Self {
        let expires_at = ceil_to_seconds(now + chrono::Duration::minutes(validity_mins));
        Self {
            venue_id: venue_id.to_string(),
            expiry: expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            salt: generate_salt(),
        }
    }

    /// Serialize to the canonical payload string.
    pub fn encode(&self) -> Result<String, CoreError> {
        serde_json::to_string(self)
            .map_err(|e| CoreError::Internal(format!("QR payload serialization failed: {e}")))
    }

    /// Parse a scanned payload string.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let payload: Self = serde_json::from_str(raw.trim())
            .map_err(|_| CoreError::Validation("Malformed QR payload".to_string()))?;
        if payload.salt.is_empty() {
            return Err(CoreError::Validation("QR payload has no salt".to_string()));
        }
        payload.venue_id()?;
        payload.expires_at()?;
        Ok(payload)
    }

    pub fn venue_id(&self) -> Result<DbId, CoreError> {
        self.venue_id
            .parse()
            .map_err(|_| CoreError::Validation("QR payload has an invalid venue id".to_string()))
    }

    pub fn expires_at(&self) -> Result<Timestamp, CoreError> {
        DateTime::parse_from_rfc3339(&self.expiry)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| CoreError::Validation("QR payload has an invalid expiry".to_string()))
    }
}

/// Validate the parameters of an issue request.
pub fn validate_issue(validity_mins: i64, max_capacity: i32) -> Result<(), CoreError> {
    if !(MIN_VALIDITY_MINS..=MAX_VALIDITY_MINS).contains(&validity_mins) {
        return Err(CoreError::Validation(format!(
            "Validity must be between {MIN_VALIDITY_MINS} and {MAX_VALIDITY_MINS} minutes"
        )));
    }
    if max_capacity < 1 {
        return Err(CoreError::Validation(
            "max_capacity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Check that a persisted token may admit another scanner at `now`.
///
/// Deactivation and expiry only. Seats are checked separately, so a student
/// already admitted can re-scan a full token.
pub fn ensure_scannable(
    is_active: bool,
    expires_at: Timestamp,
    now: Timestamp,
) -> Result<(), CoreError> {
    if !is_active {
        return Err(CoreError::Missing("QR code has been deactivated".to_string()));
    }
    if now >= expires_at {
        return Err(CoreError::Missing("QR code has expired".to_string()));
    }
    Ok(())
}

/// Order of checks: deactivation, expiry, exhaustion.
pub fn ensure_usable(
    is_active: bool,
    expires_at: Timestamp,
    current_usage: i32,
    max_capacity: i32,
    now: Timestamp,
) -> Result<(), CoreError> {
    ensure_scannable(is_active, expires_at, now)?;
    if current_usage >= max_capacity {
        return Err(CoreError::CapacityExhausted(
            "QR code has reached its maximum number of scans".to_string(),
        ));
    }
    Ok(())
}

fn ceil_to_seconds(t: Timestamp) -> Timestamp {
    let secs = if t.timestamp_subsec_nanos() > 0 {
        t.timestamp() + 1
    } else {
        t.timestamp()
    };
    DateTime::from_timestamp(secs, 0).unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    use super::*;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap() + chrono::Duration::milliseconds(750)
    }

    #[test]
    fn payload_field_order_is_stable() {
        let payload = QrPayload {
            venue_id: "7".to_string(),
            expiry: "2026-10-16T09:15:00Z".to_string(),
            salt: "ab".to_string(),
        };
        assert_eq!(
            payload.encode().unwrap(),
            r#"{"venue_id":"7","expiry":"2026-10-16T09:15:00Z","salt":"ab"}"#
        );
    }

    #[test]
    fn issued_expiry_is_whole_seconds() {
        let payload = QrPayload::issue(3, t0(), 5);
        assert_eq!(payload.expiry, "2026-10-16T09:05:01Z");
        assert_eq!(payload.venue_id().unwrap(), 3);
        assert_eq!(payload.salt.len(), 32);
    }

    #[test]
    fn parse_reencodes_byte_identically() {
        let issued = QrPayload::issue(11, t0(), 15);
        let raw = issued.encode().unwrap();
        let parsed = QrPayload::parse(&raw).unwrap();
        assert_eq!(parsed.encode().unwrap(), raw);
    }

    #[test]
    fn garbage_payload_is_invalid_request() {
        assert_matches!(QrPayload::parse("not json"), Err(CoreError::Validation(_)));
        assert_matches!(
            QrPayload::parse(r#"{"venue_id":"x","expiry":"2026-10-16T09:15:00Z","salt":"ab"}"#),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn validity_bounds() {
        assert!(validate_issue(1, 1).is_ok());
        assert!(validate_issue(1440, 30).is_ok());
        assert!(validate_issue(0, 1).is_err());
        assert!(validate_issue(1441, 1).is_err());
        assert!(validate_issue(15, 0).is_err());
    }

    #[test]
    fn usable_just_before_expiry() {
        let expires = t0() + chrono::Duration::minutes(5);
        let at = expires - chrono::Duration::seconds(1);
        assert!(ensure_usable(true, expires, 0, 2, at).is_ok());
    }

    #[test]
    fn unusable_at_and_after_expiry() {
        let expires = t0() + chrono::Duration::minutes(5);
        assert_matches!(
            ensure_usable(true, expires, 0, 2, expires),
            Err(CoreError::Missing(_))
        );
        assert_matches!(
            ensure_usable(true, expires, 0, 2, expires + chrono::Duration::milliseconds(1)),
            Err(CoreError::Missing(_))
        );
    }

    #[test]
    fn deactivated_token_unusable() {
        let expires = t0() + chrono::Duration::minutes(5);
        assert_matches!(
            ensure_usable(false, expires, 0, 2, t0()),
            Err(CoreError::Missing(_))
        );
    }

    #[test]
    fn full_token_is_capacity_exhausted() {
        let expires = t0() + chrono::Duration::minutes(5);
        assert_matches!(
            ensure_usable(true, expires, 2, 2, t0()),
            Err(CoreError::CapacityExhausted(_))
        );
        assert!(ensure_usable(true, expires, 1, 2, t0()).is_ok());
    }

    #[test]
    fn full_token_is_still_scannable() {
        let expires = t0() + chrono::Duration::minutes(5);
        assert!(ensure_scannable(true, expires, t0()).is_ok());
        assert_matches!(
            ensure_scannable(true, expires, expires),
            Err(CoreError::Missing(_))
        );
        assert_matches!(
            ensure_scannable(false, expires, t0()),
            Err(CoreError::Missing(_))
        );
    }
}
