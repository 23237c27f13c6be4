//! Clock and identifier sources.
//!
//! Every time-dependent rule in the pipeline takes `now` as an argument; the
//! API layer obtains it from a [`Clock`] held in application state so tests
//! can pin or advance time.

use std::sync::RwLock;

use rand::RngCore;
use uuid::Uuid;

use crate::types::Timestamp;

/// Number of random bytes in a QR salt (128 bits).
pub const SALT_BYTES: usize = 16;

/// Source of the current wall-clock instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The real UTC clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}

/// A clock that only moves when told to. Used by tests.
#[derive(Debug)]
pub struct ManualClock {
    current: RwLock<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: RwLock::new(start),
        }
    }

    pub fn set(&self, instant: Timestamp) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = instant;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Generate a fresh opaque QR group id.
pub fn new_group_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a random salt and return it hex-encoded (32 lowercase chars).
pub fn generate_salt() -> String {
    let mut buf = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}
