//! JWT access-token generation and validation.
//!
//! Tokens are HS256-signed. Admin and student tokens use separate secrets so
//! a leaked student key cannot mint admin tokens; the role claim must agree
//! with the key that verified the signature.

use gd_core::roles::{ROLE_ADMIN, ROLE_STUDENT};
use gd_core::types::DbId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::{ensure, parse_or, required, ConfigError};

/// Default token lifetime in minutes.
const DEFAULT_EXPIRY_MINS: i64 = 480;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub user_id: DbId,
    /// `"admin"` or `"student"`.
    pub role: String,
    /// GD level at login time. Students only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    pub exp: i64,
    pub iat: i64,
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub admin_secret: String,
    /// Falls back to the admin secret when `JWT_SECRET_STUDENT` is unset.
    pub student_secret: String,
    pub expiry_mins: i64,
}

impl JwtConfig {
    /// Read `JWT_SECRET`, `JWT_SECRET_STUDENT` and `JWT_EXPIRY_MINS`.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let admin_secret = required(lookup, "JWT_SECRET")?;
        let student_secret = lookup("JWT_SECRET_STUDENT")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| admin_secret.clone());
        let expiry_mins: i64 = parse_or(lookup, "JWT_EXPIRY_MINS", DEFAULT_EXPIRY_MINS)?;
        ensure(expiry_mins > 0, "JWT_EXPIRY_MINS", expiry_mins, "must be positive")?;

        Ok(Self {
            admin_secret,
            student_secret,
            expiry_mins,
        })
    }

    fn secret_for(&self, role: &str) -> Option<&str> {
        match role {
            ROLE_ADMIN => Some(self.admin_secret.as_str()),
            ROLE_STUDENT => Some(self.student_secret.as_str()),
            _ => None,
        }
    }
}

/// Generate a token for `user_id` signed with the key of `role`.
pub fn generate_token(
    user_id: DbId,
    role: &str,
    level: Option<i32>,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let secret = config
        .secret_for(role)
        .ok_or(jsonwebtoken::errors::ErrorKind::InvalidSubject)?;
    let now = chrono::Utc::now().timestamp();

    let claims = Claims {
        user_id,
        role: role.to_string(),
        level,
        exp: now + config.expiry_mins * 60,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate a token against both role keys and return its claims.
///
/// The admin key is tried first. A token is only accepted when its `role`
/// claim names the key that verified it.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut last_err = None;
    for role in [ROLE_ADMIN, ROLE_STUDENT] {
        let Some(secret) = config.secret_for(role) else {
            continue;
        };
        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) if data.claims.role == role => return Ok(data.claims),
            Ok(_) => {}
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| jsonwebtoken::errors::ErrorKind::InvalidToken.into()))
}
