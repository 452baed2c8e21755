//! Collaborator interfaces consumed by the hub.
//!
//! The engine itself is transport-free: the wall clock, client identity
//! resolution, the fatal-client sink, and observation persistence are all
//! injected behind these traits. Production hosts wire real
//! implementations; tests use the deterministic doubles in [`mock`].

pub mod mock;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::session::SessionHandle;

/// Wall-clock source, in seconds since the Unix epoch.
pub trait Clock {
    fn now_seconds(&self) -> f64;
}

/// Production clock backed by the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_seconds(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// Resolves an opaque session handle to a client identity. Called once per
/// session; the result is cached on the session binding.
pub trait IdentityProvider {
    fn identify_client(&self, session: SessionHandle) -> Result<String, String>;
}

/// Sink for fatal client errors. A kill ends the offending session; it
/// must never corrupt hub state.
pub trait ClientControl {
    fn kill_client(&mut self, session: SessionHandle, reason: &str);
}

/// Optional persistence backend for observation buffers. The payload is
/// the buffer's JSON dump.
pub trait ObservationStore {
    fn persist(&mut self, obs_path: &str, json: &str) -> Result<(), String>;
    fn load(&self, obs_path: &str) -> Result<Option<String>, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_recent() {
        let now = SystemClock.now_seconds();
        // 2020-01-01 as a floor; just proves we aren't returning zero.
        assert!(now > 1_577_836_800.0);
    }
}
