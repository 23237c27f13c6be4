//! Domain rules of the GD assessment pipeline.
//!
//! Everything here is pure: no I/O, no clock reads. The `db`, `pipeline`
//! and `api` crates build on these types and checks.

pub mod clock;
pub mod error;
pub mod level;
pub mod penalty;
pub mod qr;
pub mod qualification;
pub mod roles;
pub mod scoring;
pub mod session;
pub mod survey;
pub mod timer;
pub mod types;
pub mod venue;
