//! GD level bounds and promotion arithmetic.

use crate::error::CoreError;

/// Lowest GD tier.
pub const MIN_LEVEL: i32 = 1;

/// Highest GD tier. Students at this level cannot be promoted further.
pub const MAX_LEVEL: i32 = 3;

/// Validate that `level` is a known GD tier.
pub fn validate_level(level: i32) -> Result<(), CoreError> {
    if (MIN_LEVEL..=MAX_LEVEL).contains(&level) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid level {level}. Must be between {MIN_LEVEL} and {MAX_LEVEL}"
        )))
    }
}

/// The level a qualification earned at `current_level` targets.
///
/// Saturates at [`MAX_LEVEL`].
pub fn next_level(current_level: i32) -> i32 {
    (current_level + 1).min(MAX_LEVEL)
}

/// The level a student holds after an approval for `qualified_for_level`.
///
/// Approvals never lower a student's level.
pub fn promoted_level(current_level: i32, qualified_for_level: i32) -> i32 {
    current_level.max(qualified_for_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_one_to_three_are_valid() {
        for level in 1..=3 {
            assert!(validate_level(level).is_ok());
        }
    }

    #[test]
    fn out_of_range_levels_rejected() {
        assert!(validate_level(0).is_err());
        assert!(validate_level(4).is_err());
    }

    #[test]
    fn next_level_saturates() {
        assert_eq!(next_level(1), 2);
        assert_eq!(next_level(2), 3);
        assert_eq!(next_level(3), 3);
    }

    #[test]
    fn promotion_never_downgrades() {
        assert_eq!(promoted_level(2, 3), 3);
        assert_eq!(promoted_level(3, 2), 3);
    }
}
