//! Client sessions and their namespace bindings.
//!
//! A session is an opaque handle minted by the transport. The first
//! operation on a session resolves the client identity and caches the
//! `/app/<client-id>` entry; the binding dies with the session, the
//! subtree does not. Resource counts are keyed by client identity so the
//! cap survives reconnects.

use std::collections::HashMap;

use crate::tree::EntryId;

/// Opaque client session handle, minted by the IPC transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u32);

/// Cached per-session state.
#[derive(Debug, Clone)]
pub struct SessionBinding {
    pub client_id: String,
    pub namespace: EntryId,
}

/// Bindings for all live sessions plus per-client resource accounting.
#[derive(Debug, Default)]
pub struct SessionTable {
    bindings: HashMap<SessionHandle, SessionBinding>,
    resource_counts: HashMap<String, usize>,
}

impl SessionTable {
    pub fn new() -> SessionTable {
        SessionTable::default()
    }

    pub fn binding(&self, session: SessionHandle) -> Option<&SessionBinding> {
        self.bindings.get(&session)
    }

    pub fn bind(&mut self, session: SessionHandle, client_id: &str, namespace: EntryId) {
        self.bindings.insert(
            session,
            SessionBinding {
                client_id: client_id.to_string(),
                namespace,
            },
        );
    }

    /// Drop a session's binding. Resource counts are left alone: the
    /// client's subtree persists and so does its budget.
    pub fn unbind(&mut self, session: SessionHandle) {
        self.bindings.remove(&session);
    }

    pub fn resource_count(&self, client_id: &str) -> usize {
        self.resource_counts.get(client_id).copied().unwrap_or(0)
    }

    pub fn charge_resource(&mut self, client_id: &str) {
        *self
            .resource_counts
            .entry(client_id.to_string())
            .or_insert(0) += 1;
    }

    pub fn release_resource(&mut self, client_id: &str) {
        if let Some(count) = self.resource_counts.get_mut(client_id) {
            *count = count.saturating_sub(1);
        }
    }

    pub fn session_count(&self) -> usize {
        self.bindings.len()
    }
}
