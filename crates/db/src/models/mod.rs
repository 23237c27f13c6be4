//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` create/update DTOs where the entity is written from requests

pub mod account;
pub mod penalty;
pub mod qr_token;
pub mod qualification;
pub mod session;
pub mod survey;
pub mod venue;
