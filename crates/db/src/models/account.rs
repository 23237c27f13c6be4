//! Admin and student account models.

use gd_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full row from the `admins` table.
///
/// Contains the password hash -- never serialize this to API responses.
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: DbId,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an admin.
#[derive(Debug, Deserialize)]
pub struct CreateAdmin {
    pub username: String,
    pub password_hash: String,
}

/// Full row from the `students` table.
#[derive(Debug, Clone, FromRow)]
pub struct Student {
    pub id: DbId,
    pub roll_number: String,
    pub name: String,
    pub password_hash: String,
    pub current_gd_level: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe student representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct StudentProfile {
    pub id: DbId,
    pub roll_number: String,
    pub name: String,
    pub current_gd_level: i32,
    pub created_at: Timestamp,
}

impl From<&Student> for StudentProfile {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id,
            roll_number: s.roll_number.clone(),
            name: s.name.clone(),
            current_gd_level: s.current_gd_level,
            created_at: s.created_at,
        }
    }
}

/// DTO for creating a student.
#[derive(Debug, Deserialize)]
pub struct CreateStudent {
    pub roll_number: String,
    pub name: String,
    pub password_hash: String,
    pub current_gd_level: i32,
}
