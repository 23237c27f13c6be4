//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- any valid Bearer token.
//! - [`rbac::RequireAdmin`] -- the `admin` role.
//! - [`rbac::RequireStudent`] -- the `student` role.

pub mod auth;
pub mod rbac;
