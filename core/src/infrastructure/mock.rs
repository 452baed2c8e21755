//! Deterministic collaborator doubles for testing.
//!
//! Each mock shares its observable state through an `Rc` so tests can keep
//! a handle after moving the mock into the hub.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::{Clock, ClientControl, IdentityProvider, ObservationStore};
use crate::session::SessionHandle;

/// Settable clock. Clones share the same time cell.
#[derive(Clone)]
pub struct MockClock {
    now: Rc<Cell<f64>>,
}

impl MockClock {
    pub fn new(now: f64) -> MockClock {
        MockClock {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }
}

impl Clock for MockClock {
    fn now_seconds(&self) -> f64 {
        self.now.get()
    }
}

/// Identity provider backed by a handle-to-name map. Unknown handles fail
/// to identify.
#[derive(Clone, Default)]
pub struct MockIdentity {
    clients: Rc<RefCell<HashMap<SessionHandle, String>>>,
}

impl MockIdentity {
    pub fn new() -> MockIdentity {
        MockIdentity::default()
    }

    /// Register a session as belonging to the named client.
    pub fn with_client(self, session: SessionHandle, client_id: &str) -> MockIdentity {
        self.clients
            .borrow_mut()
            .insert(session, client_id.to_string());
        self
    }

    pub fn add_client(&self, session: SessionHandle, client_id: &str) {
        self.clients
            .borrow_mut()
            .insert(session, client_id.to_string());
    }
}

impl IdentityProvider for MockIdentity {
    fn identify_client(&self, session: SessionHandle) -> Result<String, String> {
        self.clients
            .borrow()
            .get(&session)
            .cloned()
            .ok_or_else(|| format!("unknown session {:?}", session))
    }
}

/// Records every kill so tests can assert on contract-violation handling.
#[derive(Clone, Default)]
pub struct RecordingControl {
    kills: Rc<RefCell<Vec<(SessionHandle, String)>>>,
}

impl RecordingControl {
    pub fn new() -> RecordingControl {
        RecordingControl::default()
    }

    pub fn kills(&self) -> Vec<(SessionHandle, String)> {
        self.kills.borrow().clone()
    }

    pub fn kill_count(&self) -> usize {
        self.kills.borrow().len()
    }

    pub fn last_reason(&self) -> Option<String> {
        self.kills.borrow().last().map(|(_, r)| r.clone())
    }
}

impl ClientControl for RecordingControl {
    fn kill_client(&mut self, session: SessionHandle, reason: &str) {
        self.kills
            .borrow_mut()
            .push((session, reason.to_string()));
    }
}

/// In-memory observation store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn get(&self, obs_path: &str) -> Option<String> {
        self.entries.borrow().get(obs_path).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl ObservationStore for MemoryStore {
    fn persist(&mut self, obs_path: &str, json: &str) -> Result<(), String> {
        self.entries
            .borrow_mut()
            .insert(obs_path.to_string(), json.to_string());
        Ok(())
    }

    fn load(&self, obs_path: &str) -> Result<Option<String>, String> {
        Ok(self.entries.borrow().get(obs_path).cloned())
    }
}
