//! Login handlers for admins and students.

use axum::extract::State;
use axum::Json;
use gd_core::error::CoreError;
use gd_core::roles::{ROLE_ADMIN, ROLE_STUDENT};
use gd_core::types::DbId;
use gd_db::repositories::{AdminRepo, StudentRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::jwt::generate_token;
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /admin/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminLoginRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request body for `POST /student/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct StudentLoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub roll_number: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StudentLoginResponse {
    pub token: String,
    pub level: i32,
    pub user_id: DbId,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /admin/login
pub async fn admin_login(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<AdminLoginRequest>,
) -> AppResult<Json<AdminLoginResponse>> {
    let admin = AdminRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !admin.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }
    check_password(&input.password, &admin.password_hash)?;

    let token = generate_token(admin.id, ROLE_ADMIN, None, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation failed: {e}")))?;

    tracing::info!(admin_id = admin.id, "Admin logged in");
    Ok(Json(AdminLoginResponse {
        token,
        token_type: "Bearer",
    }))
}

/// POST /student/login
pub async fn student_login(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<StudentLoginRequest>,
) -> AppResult<Json<StudentLoginResponse>> {
    let student = StudentRepo::find_by_roll_number(&state.pool, &input.roll_number)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !student.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }
    check_password(&input.password, &student.password_hash)?;

    let token = generate_token(
        student.id,
        ROLE_STUDENT,
        Some(student.current_gd_level),
        &state.config.jwt,
    )
    .map_err(|e| AppError::InternalError(format!("Token generation failed: {e}")))?;

    tracing::info!(student_id = student.id, level = student.current_gd_level, "Student logged in");
    Ok(Json(StudentLoginResponse {
        token,
        level: student.current_gd_level,
        user_id: student.id,
    }))
}

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized("Invalid credentials".into()))
}

fn check_password(password: &str, hash: &str) -> AppResult<()> {
    let valid = verify_password(password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if valid {
        Ok(())
    } else {
        Err(invalid_credentials())
    }
}
