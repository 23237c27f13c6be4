//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- role-keyed JWT generation and validation.

pub mod jwt;
pub mod password;
