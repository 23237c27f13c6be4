//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use gd_core::types::{DbId, Timestamp};
use gd_db::models::account::{CreateAdmin, CreateStudent};
use gd_db::models::survey::CreateQuestion;
use gd_db::models::venue::CreateVenue;
use gd_db::repositories::{AdminRepo, QuestionRepo, StudentRepo, VenueRepo};
use gd_pipeline::{QrTokenService, SessionCoordinator};
use sqlx::PgPool;

/// Fixed start instant for every scenario (whole second).
pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
}

pub fn at(minutes: i64) -> Timestamp {
    t0() + Duration::minutes(minutes)
}

pub async fn admin(pool: &PgPool, username: &str) -> DbId {
    AdminRepo::create(
        pool,
        &CreateAdmin {
            username: username.to_string(),
            password_hash: "unused".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn student(pool: &PgPool, roll: &str, level: i32) -> DbId {
    StudentRepo::create(
        pool,
        &CreateStudent {
            roll_number: roll.to_string(),
            name: format!("Student {roll}"),
            password_hash: "unused".to_string(),
            current_gd_level: level,
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn venue(pool: &PgPool, name: &str, capacity: i32, level: i32) -> DbId {
    VenueRepo::create(
        pool,
        &CreateVenue {
            name: name.to_string(),
            capacity,
            level,
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn question(pool: &PgPool, text: &str, weight: f64, display_order: i32) -> DbId {
    QuestionRepo::create(
        pool,
        &CreateQuestion {
            text: text.to_string(),
            weight,
            levels: vec![1, 2, 3],
            display_order,
        },
    )
    .await
    .unwrap()
    .id
}

/// Issue a token and have every listed student scan it at `t0`.
/// Returns the shared session id.
pub async fn session_with(pool: &PgPool, students: &[DbId]) -> DbId {
    let issuer = admin(pool, "proctor").await;
    let venue_id = venue(pool, "Hall A", 10, 1).await;
    let token = QrTokenService::issue(
        pool,
        venue_id,
        Some(15),
        Some(students.len() as i32),
        issuer,
        t0(),
    )
    .await
    .unwrap();

    let mut session_id = None;
    for &student_id in students {
        let session = SessionCoordinator::join_by_qr(pool, student_id, &token.payload, t0())
            .await
            .unwrap();
        session_id = Some(session.id);
    }
    session_id.unwrap()
}
