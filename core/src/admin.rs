//! Administrative surface: observation lifecycle, source binding, buffer
//! and filter configuration, and buffer persistence.
//!
//! Observations live under `/obs/` and persist independently of any client
//! session. Operations here take observation paths either absolute
//! (`/obs/...`) or relative to `/obs/`; source paths are always absolute.

use crate::error::{HubError, HubResult};
use crate::hub::Hub;
use crate::resource::{HandlerRef, PushCallback};
use crate::sample::{DataType, Sample, SampleRef};
use crate::tree::{path, EntryId, EntryKind};

/// Administrative operations. No client session: the admin context is
/// trusted and violations surface as status codes, never as kills.
pub struct AdminApi<'a> {
    hub: &'a mut Hub,
}

impl<'a> AdminApi<'a> {
    pub(crate) fn new(hub: &'a mut Hub) -> AdminApi<'a> {
        AdminApi { hub }
    }

    // -----------------------------------------------------------------
    // Observation lifecycle
    // -----------------------------------------------------------------

    /// Create an observation (idempotent). Buffer caps start from the hub
    /// configuration; `Duplicate` when the path already holds an Input or
    /// Output.
    pub fn create_observation(&mut self, obs_path: &str) -> HubResult<()> {
        let rel = self.obs_relative(obs_path)?;
        let obs_ns = self
            .hub
            .tree
            .get_entry(self.hub.tree.root(), "obs")
            .expect("the /obs namespace is always reachable");
        let id = self.hub.tree.get_observation(obs_ns, &rel)?;

        let max_count = self.hub.config.obs_buffer_max_count;
        let max_window = self.hub.config.obs_buffer_max_window_secs;
        let obs = self.hub.tree.obs_state_mut(id);
        if obs.buffer().max_count() == 0 && obs.buffer().max_window_secs() == 0.0 {
            obs.buffer_mut().set_max_count(max_count);
            obs.buffer_mut().set_max_window_secs(max_window);
        }
        Ok(())
    }

    /// Delete an observation, unbinding it from its source and from any
    /// observation it feeds.
    pub fn delete_observation(&mut self, obs_path: &str) -> HubResult<()> {
        let id = self.find_observation(obs_path)?;
        self.hub.tree.delete_observation(id);
        Ok(())
    }

    /// Bind an observation to the resource at an absolute path, creating a
    /// placeholder when the source does not exist yet. `None` unbinds.
    pub fn set_source(&mut self, obs_path: &str, source: Option<&str>) -> HubResult<()> {
        let id = self.find_observation(obs_path)?;
        match source {
            None => self.hub.tree.set_source(id, None),
            Some(src_path) => {
                if !path::is_absolute(src_path) {
                    return Err(HubError::NotFound);
                }
                let root = self.hub.tree.root();
                let src = self.hub.tree.get_resource(root, src_path)?;
                self.hub.tree.set_source(id, Some(src))
            }
        }
    }

    // -----------------------------------------------------------------
    // Buffer & filter configuration
    // -----------------------------------------------------------------

    /// Set the FIFO cap of an observation buffer. Shrinking evicts oldest
    /// entries immediately; zero disables buffering.
    pub fn set_buffer_max_count(&mut self, obs_path: &str, max_count: usize) -> HubResult<()> {
        let id = self.find_observation(obs_path)?;
        self.hub
            .tree
            .obs_state_mut(id)
            .buffer_mut()
            .set_max_count(max_count);
        Ok(())
    }

    /// Set the time-window cap of an observation buffer, in seconds; zero
    /// disables the window.
    pub fn set_buffer_max_window(&mut self, obs_path: &str, secs: f64) -> HubResult<()> {
        let id = self.find_observation(obs_path)?;
        self.hub
            .tree
            .obs_state_mut(id)
            .buffer_mut()
            .set_max_window_secs(secs);
        Ok(())
    }

    /// Minimum seconds between samples accepted by the observation; zero
    /// disables.
    pub fn set_min_period(&mut self, obs_path: &str, secs: f64) -> HubResult<()> {
        let id = self.find_observation(obs_path)?;
        self.hub.tree.obs_state_mut(id).filter_mut().min_period = secs;
        Ok(())
    }

    /// Numeric dead-band: samples changing less than this from the last
    /// accepted value are dropped; zero disables.
    pub fn set_change_by(&mut self, obs_path: &str, amount: f64) -> HubResult<()> {
        let id = self.find_observation(obs_path)?;
        self.hub.tree.obs_state_mut(id).filter_mut().change_by = amount;
        Ok(())
    }

    /// Reject numeric samples below this limit; NaN disables.
    pub fn set_low_limit(&mut self, obs_path: &str, limit: f64) -> HubResult<()> {
        let id = self.find_observation(obs_path)?;
        self.hub.tree.obs_state_mut(id).filter_mut().low_limit = limit;
        Ok(())
    }

    /// Reject numeric samples above this limit; NaN disables.
    pub fn set_high_limit(&mut self, obs_path: &str, limit: f64) -> HubResult<()> {
        let id = self.find_observation(obs_path)?;
        self.hub.tree.obs_state_mut(id).filter_mut().high_limit = limit;
        Ok(())
    }

    /// Register a push handler on an observation. This is the admin-side
    /// counterpart of the client handler registration, which only accepts
    /// Inputs and Outputs.
    pub fn add_push_handler(
        &mut self,
        obs_path: &str,
        expected: DataType,
        callback: PushCallback,
    ) -> HubResult<HandlerRef> {
        let id = self.find_observation(obs_path)?;
        Ok(self.hub.tree.add_push_handler(id, expected, callback))
    }

    pub fn remove_push_handler(&mut self, handler: HandlerRef) {
        self.hub.tree.remove_push_handler(handler);
    }

    // -----------------------------------------------------------------
    // Pushes by absolute path (administrative)
    // -----------------------------------------------------------------

    pub fn push_trigger(&mut self, abs_path: &str, timestamp: f64) -> HubResult<()> {
        self.push_sample(abs_path, DataType::Trigger, Sample::trigger(timestamp))
    }

    pub fn push_boolean(&mut self, abs_path: &str, timestamp: f64, value: bool) -> HubResult<()> {
        self.push_sample(abs_path, DataType::Boolean, Sample::boolean(timestamp, value))
    }

    pub fn push_numeric(&mut self, abs_path: &str, timestamp: f64, value: f64) -> HubResult<()> {
        self.push_sample(abs_path, DataType::Numeric, Sample::numeric(timestamp, value))
    }

    pub fn push_string(&mut self, abs_path: &str, timestamp: f64, value: &str) -> HubResult<()> {
        self.push_sample(abs_path, DataType::String, Sample::string(timestamp, value))
    }

    pub fn push_json(&mut self, abs_path: &str, timestamp: f64, value: &str) -> HubResult<()> {
        let sample = Sample::json(timestamp, value)?;
        self.push_sample(abs_path, DataType::Json, sample)
    }

    fn push_sample(
        &mut self,
        abs_path: &str,
        incoming: DataType,
        sample: SampleRef,
    ) -> HubResult<()> {
        let id = self
            .hub
            .tree
            .find_absolute(abs_path)
            .ok_or(HubError::NotFound)?;
        if !self.hub.tree.entry(id).kind().carries_data() {
            return Err(HubError::Unsupported);
        }
        let hub = &mut *self.hub;
        hub.tree.push(id, incoming, sample, hub.clock.as_ref())
    }

    // -----------------------------------------------------------------
    // Introspection & persistence
    // -----------------------------------------------------------------

    /// Role of the entry at an absolute path.
    pub fn entry_kind(&self, abs_path: &str) -> HubResult<EntryKind> {
        let id = self
            .hub
            .tree
            .find_absolute(abs_path)
            .ok_or(HubError::NotFound)?;
        Ok(self.hub.tree.entry(id).kind())
    }

    /// Snapshot an observation buffer into the persistence backend.
    /// `Unsupported` when no store is attached.
    pub fn persist_observation(&mut self, obs_path: &str) -> HubResult<()> {
        let id = self.find_observation(obs_path)?;
        let key = self.hub.tree.path_of(id);
        let json = self
            .hub
            .tree
            .entry(id)
            .resource()
            .and_then(|s| s.observation())
            .expect("observation entry has observation state")
            .buffer()
            .to_json_string();
        let store = self.hub.store.as_mut().ok_or(HubError::Unsupported)?;
        if let Err(err) = store.persist(&key, &json) {
            log::error!("persisting {} failed: {}", key, err);
            return Err(HubError::Unavailable);
        }
        Ok(())
    }

    /// Restore an observation buffer from the persistence backend.
    /// Returns the number of samples loaded.
    pub fn load_observation(&mut self, obs_path: &str) -> HubResult<usize> {
        let id = self.find_observation(obs_path)?;
        let key = self.hub.tree.path_of(id);
        let store = self.hub.store.as_ref().ok_or(HubError::Unsupported)?;
        let json = match store.load(&key) {
            Ok(Some(json)) => json,
            Ok(None) => return Err(HubError::NotFound),
            Err(err) => {
                log::error!("loading {} failed: {}", key, err);
                return Err(HubError::Unavailable);
            }
        };
        self.hub
            .tree
            .obs_state_mut(id)
            .buffer_mut()
            .load_json(&json)
            .map_err(|err| {
                log::error!("restoring {} failed: {}", key, err);
                HubError::FormatError
            })
    }

    // -----------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------

    fn find_observation(&self, obs_path: &str) -> HubResult<EntryId> {
        self.hub.find_observation(obs_path).ok_or(HubError::NotFound)
    }

    /// Normalise an observation path to its `/obs/`-relative form.
    fn obs_relative(&self, obs_path: &str) -> HubResult<String> {
        let rel = if let Some(stripped) = obs_path.strip_prefix("/obs/") {
            stripped
        } else if path::is_absolute(obs_path) {
            return Err(HubError::NotFound);
        } else {
            obs_path
        };
        if path::split(rel).map_or(true, |segments| segments.is_empty()) {
            return Err(HubError::NotFound);
        }
        Ok(rel.to_string())
    }
}
