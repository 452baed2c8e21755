//! The hub: central runtime owning the resource tree, session bindings,
//! configuration, and collaborators.
//!
//! All mutation flows through one `Hub` on one execution context. Client
//! operations enter through the facades ([`crate::io::IoApi`],
//! [`crate::query::QueryApi`], [`crate::admin::AdminApi`]) or through
//! [`Hub::execute`], the single dispatch method for wire commands.

use crate::admin::AdminApi;
use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use crate::infrastructure::{ClientControl, Clock, IdentityProvider, ObservationStore};
use crate::io::IoApi;
use crate::query::QueryApi;
use crate::session::{SessionBinding, SessionHandle, SessionTable};
use crate::tree::{path, EntryId, EntryKind, Tree};

pub struct Hub {
    pub(crate) tree: Tree,
    pub(crate) config: HubConfig,
    pub(crate) sessions: SessionTable,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) identity: Box<dyn IdentityProvider>,
    pub(crate) control: Box<dyn ClientControl>,
    pub(crate) store: Option<Box<dyn ObservationStore>>,
}

impl Hub {
    /// Build a hub from configuration and collaborators.
    pub fn new(
        config: HubConfig,
        clock: Box<dyn Clock>,
        identity: Box<dyn IdentityProvider>,
        control: Box<dyn ClientControl>,
    ) -> Hub {
        let tree = Tree::new(&config.default_units);
        Hub {
            tree,
            config,
            sessions: SessionTable::new(),
            clock,
            identity,
            control,
            store: None,
        }
    }

    /// Attach an observation persistence backend.
    pub fn with_store(mut self, store: Box<dyn ObservationStore>) -> Hub {
        self.store = Some(store);
        self
    }

    /// Borrow the tree for inspection (testing, diagnostics).
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Producer/consumer facade for a client session.
    pub fn io(&mut self, session: SessionHandle) -> IoApi<'_> {
        IoApi::new(self, session)
    }

    /// Read-side facade for a client session.
    pub fn query(&mut self, session: SessionHandle) -> QueryApi<'_> {
        QueryApi::new(self, session)
    }

    /// Administrative facade.
    pub fn admin(&mut self) -> AdminApi<'_> {
        AdminApi::new(self)
    }

    // -----------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------

    /// Resolve and cache a session's namespace binding. Returns the client
    /// identity. Identity failure is fatal for the session and leaves the
    /// tree untouched.
    pub fn open_session(&mut self, session: SessionHandle) -> HubResult<String> {
        let binding = self.ensure_binding(session)?;
        Ok(binding.client_id)
    }

    /// Discard a session's binding. The client's subtree persists so a
    /// reconnecting client finds its resources again.
    pub fn close_session(&mut self, session: SessionHandle) {
        self.sessions.unbind(session);
    }

    /// Look up (or establish) the binding for a session.
    pub(crate) fn ensure_binding(&mut self, session: SessionHandle) -> HubResult<SessionBinding> {
        if let Some(binding) = self.sessions.binding(session) {
            return Ok(binding.clone());
        }

        let client_id = match self.identity.identify_client(session) {
            Ok(id) => id,
            Err(err) => {
                return Err(self.fatal(
                    session,
                    &format!("unable to resolve client identity: {}", err),
                ));
            }
        };
        if !path::is_valid_segment(&client_id) {
            return Err(self.fatal(
                session,
                &format!("client identity '{}' is not a valid path segment", client_id),
            ));
        }

        let app_ns = self
            .tree
            .get_entry(self.tree.root(), "app")
            .expect("the /app namespace is always reachable");
        let namespace = self
            .tree
            .get_entry(app_ns, &client_id)
            .expect("a validated client id is a resolvable segment");
        self.sessions.bind(session, &client_id, namespace);
        log::debug!("session {:?} bound to /app/{}", session, client_id);
        Ok(self
            .sessions
            .binding(session)
            .expect("binding just inserted")
            .clone())
    }

    /// Kill a client session for a contract violation. The returned status
    /// unwinds the call chain; the transport never delivers it.
    pub(crate) fn fatal(&mut self, session: SessionHandle, reason: &str) -> HubError {
        log::warn!("killing client session {:?}: {}", session, reason);
        self.control.kill_client(session, reason);
        self.sessions.unbind(session);
        HubError::Fatal
    }

    // -----------------------------------------------------------------
    // Shared lookups
    // -----------------------------------------------------------------

    /// Resolve an observation path: absolute under `/obs/`, or relative to
    /// it. Other absolute paths, and paths not naming an Observation,
    /// resolve as not-found.
    pub(crate) fn find_observation(&self, obs_path: &str) -> Option<EntryId> {
        let id = if obs_path.starts_with("/obs/") {
            self.tree.find_absolute(obs_path)?
        } else if path::is_absolute(obs_path) {
            return None;
        } else {
            let obs_ns = self.tree.find_entry(self.tree.root(), "obs")?;
            self.tree.find_entry(obs_ns, obs_path)?
        };
        if self.tree.entry(id).kind() != EntryKind::Observation {
            return None;
        }
        Some(id)
    }
}
