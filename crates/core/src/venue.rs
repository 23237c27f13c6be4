//! Venue invariants.

use crate::error::CoreError;
use crate::level::validate_level;

/// Validate the fields of a new venue.
pub fn validate_new_venue(name: &str, capacity: i32, level: i32) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("Venue name must not be empty".to_string()));
    }
    if capacity < 1 {
        return Err(CoreError::Validation(
            "Venue capacity must be at least 1".to_string(),
        ));
    }
    validate_level(level)
}

/// Current state of a venue relevant to an update.
#[derive(Debug, Clone, Copy)]
pub struct VenueUsage {
    pub level: i32,
    pub capacity: i32,
    /// Number of sessions ever scheduled against the venue.
    pub session_count: i64,
    /// Non-dummy participants in pending/active sessions at the venue.
    pub active_bookings: i64,
}

/// Validate a partial venue update against the venue's usage.
///
/// The level is frozen once any session exists. Capacity may only grow
/// while active bookings exist.
pub fn validate_venue_update(
    usage: &VenueUsage,
    new_name: Option<&str>,
    new_capacity: Option<i32>,
    new_level: Option<i32>,
) -> Result<(), CoreError> {
    if let Some(name) = new_name {
        if name.trim().is_empty() {
            return Err(CoreError::Validation("Venue name must not be empty".to_string()));
        }
    }

    if let Some(level) = new_level {
        validate_level(level)?;
        if level != usage.level && usage.session_count > 0 {
            return Err(CoreError::Conflict(
                "Venue level cannot change once sessions are scheduled".to_string(),
            ));
        }
    }

    if let Some(capacity) = new_capacity {
        if capacity < 1 {
            return Err(CoreError::Validation(
                "Venue capacity must be at least 1".to_string(),
            ));
        }
        if capacity < usage.capacity && usage.active_bookings > 0 {
            return Err(CoreError::Conflict(
                "Venue capacity cannot shrink while bookings are active".to_string(),
            ));
        }
    }

    Ok(())
}
