//! Repository for the `admins` and `students` tables.

use gd_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::account::{Admin, CreateAdmin, CreateStudent, Student};

const ADMIN_COLUMNS: &str = "id, username, password_hash, is_active, created_at, updated_at";

const STUDENT_COLUMNS: &str = "id, roll_number, name, password_hash, current_gd_level, \
                               is_active, created_at, updated_at";

/// Queries for admin accounts.
pub struct AdminRepo;

impl AdminRepo {
    pub async fn create(db: impl PgExecutor<'_>, input: &CreateAdmin) -> Result<Admin, sqlx::Error> {
        let query = format!(
            "INSERT INTO admins (username, password_hash)
             VALUES ($1, $2)
             RETURNING {ADMIN_COLUMNS}"
        );
        sqlx::query_as::<_, Admin>(&query)
            .bind(&input.username)
            .bind(&input.password_hash)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_username(
        db: impl PgExecutor<'_>,
        username: &str,
    ) -> Result<Option<Admin>, sqlx::Error> {
        let query = format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE username = $1");
        sqlx::query_as::<_, Admin>(&query)
            .bind(username)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<Admin>, sqlx::Error> {
        let query = format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE id = $1");
        sqlx::query_as::<_, Admin>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }
}

/// Queries for student accounts.
pub struct StudentRepo;

impl StudentRepo {
    pub async fn create(
        db: impl PgExecutor<'_>,
        input: &CreateStudent,
    ) -> Result<Student, sqlx::Error> {
        let query = format!(
            "INSERT INTO students (roll_number, name, password_hash, current_gd_level)
             VALUES ($1, $2, $3, $4)
             RETURNING {STUDENT_COLUMNS}"
        );
        sqlx::query_as::<_, Student>(&query)
            .bind(&input.roll_number)
            .bind(&input.name)
            .bind(&input.password_hash)
            .bind(input.current_gd_level)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(
        db: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Student>, sqlx::Error> {
        let query = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1");
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_roll_number(
        db: impl PgExecutor<'_>,
        roll_number: &str,
    ) -> Result<Option<Student>, sqlx::Error> {
        let query = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE roll_number = $1");
        sqlx::query_as::<_, Student>(&query)
            .bind(roll_number)
            .fetch_optional(db)
            .await
    }

    /// Load and row-lock a student. Serializes one student's bookings.
    pub async fn lock_by_id(
        db: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Student>, sqlx::Error> {
        let query = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Current level of each listed student that still exists.
    pub async fn levels_for(
        db: impl PgExecutor<'_>,
        ids: &[DbId],
    ) -> Result<Vec<(DbId, i32)>, sqlx::Error> {
        sqlx::query_as::<_, (DbId, i32)>(
            "SELECT id, current_gd_level FROM students WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(db)
        .await
    }

    /// Raise a student's level to `level`. Never lowers it.
    pub async fn raise_level(
        db: impl PgExecutor<'_>,
        id: DbId,
        level: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE students
             SET current_gd_level = GREATEST(current_gd_level, $2), updated_at = NOW()
             WHERE id = $1
             RETURNING current_gd_level",
        )
        .bind(id)
        .bind(level)
        .fetch_optional(db)
        .await
    }
}
