//! Producer/consumer facade: the client-facing I/O surface.
//!
//! All paths are relative to the calling session's `/app/<client-id>`
//! namespace. Structural failures come back as status codes; contract
//! violations (pushing to a missing resource, fetching the wrong kind,
//! setting a wrong-kind default, marking a non-Output optional) kill the
//! session through the `ClientControl` collaborator, and the `Fatal`
//! status that unwinds the call is never delivered to the offender.

use crate::error::{HubError, HubResult};
use crate::hub::Hub;
use crate::resource::{HandlerRef, PushCallback};
use crate::sample::{DataType, Sample, SampleRef};
use crate::session::SessionHandle;
use crate::tree::{EntryId, EntryKind};

/// Producer/consumer operations for one client session.
pub struct IoApi<'a> {
    hub: &'a mut Hub,
    session: SessionHandle,
}

impl<'a> IoApi<'a> {
    pub(crate) fn new(hub: &'a mut Hub, session: SessionHandle) -> IoApi<'a> {
        IoApi { hub, session }
    }

    // -----------------------------------------------------------------
    // Resource lifecycle
    // -----------------------------------------------------------------

    /// Create an Input (sensor-side) resource. Idempotent on an identical
    /// re-creation; `Duplicate` on any conflicting one.
    pub fn create_input(&mut self, path: &str, data_type: DataType, units: &str) -> HubResult<()> {
        self.create_io(path, EntryKind::Input, data_type, units)
    }

    /// Create an Output (actuator-side) resource. New Outputs start
    /// mandatory.
    pub fn create_output(&mut self, path: &str, data_type: DataType, units: &str) -> HubResult<()> {
        self.create_io(path, EntryKind::Output, data_type, units)
    }

    fn create_io(
        &mut self,
        path: &str,
        kind: EntryKind,
        data_type: DataType,
        units: &str,
    ) -> HubResult<()> {
        let binding = self.hub.ensure_binding(self.session)?;
        let existing = self
            .hub
            .tree
            .find_entry(binding.namespace, path)
            .map(|id| self.hub.tree.entry(id).kind());

        // Only creations that mint a new Input/Output count against the
        // client's budget; idempotent re-creation is free.
        let is_new = existing != Some(kind);
        let conflicts = matches!(
            existing,
            Some(EntryKind::Input) | Some(EntryKind::Output) | Some(EntryKind::Observation)
        ) && is_new;
        if is_new && !conflicts {
            let count = self.hub.sessions.resource_count(&binding.client_id);
            if count >= self.hub.config.max_resources_per_client {
                return Err(HubError::NoMemory);
            }
        }

        let result = match kind {
            EntryKind::Input => {
                self.hub
                    .tree
                    .get_input(binding.namespace, path, data_type, units)
            }
            EntryKind::Output => {
                self.hub
                    .tree
                    .get_output(binding.namespace, path, data_type, units)
            }
            _ => unreachable!("create_io only mints Inputs and Outputs"),
        };
        match result {
            Ok(_) => {
                if is_new {
                    self.hub.sessions.charge_resource(&binding.client_id);
                }
                Ok(())
            }
            Err(HubError::Duplicate) => Err(HubError::Duplicate),
            Err(_) => Err(self.hub.fatal(
                self.session,
                &format!("failed to create resource '{}'", path),
            )),
        }
    }

    /// Delete an Input or Output. Does nothing if the resource does not
    /// exist.
    pub fn delete_resource(&mut self, path: &str) -> HubResult<()> {
        let binding = self.hub.ensure_binding(self.session)?;
        if let Some(id) = self.find_io(path)? {
            self.hub.tree.delete_io(id);
            self.hub.sessions.release_resource(&binding.client_id);
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Push
    // -----------------------------------------------------------------

    pub fn push_trigger(&mut self, path: &str, timestamp: f64) -> HubResult<()> {
        self.push_sample(path, DataType::Trigger, Sample::trigger(timestamp))
    }

    pub fn push_boolean(&mut self, path: &str, timestamp: f64, value: bool) -> HubResult<()> {
        self.push_sample(path, DataType::Boolean, Sample::boolean(timestamp, value))
    }

    pub fn push_numeric(&mut self, path: &str, timestamp: f64, value: f64) -> HubResult<()> {
        self.push_sample(path, DataType::Numeric, Sample::numeric(timestamp, value))
    }

    pub fn push_string(&mut self, path: &str, timestamp: f64, value: &str) -> HubResult<()> {
        self.push_sample(path, DataType::String, Sample::string(timestamp, value))
    }

    /// Push a JSON sample. Malformed payloads (embedded NUL) are refused
    /// with `FormatError` without touching the resource.
    pub fn push_json(&mut self, path: &str, timestamp: f64, value: &str) -> HubResult<()> {
        let sample = Sample::json(timestamp, value)?;
        self.push_sample(path, DataType::Json, sample)
    }

    fn push_sample(
        &mut self,
        path: &str,
        incoming: DataType,
        sample: SampleRef,
    ) -> HubResult<()> {
        let id = match self.find_io(path)? {
            Some(id) => id,
            None => {
                return Err(self.hub.fatal(
                    self.session,
                    &format!("client pushed data to non-existent resource '{}'", path),
                ));
            }
        };
        let hub = &mut *self.hub;
        match hub.tree.push(id, incoming, sample, hub.clock.as_ref()) {
            Ok(()) => Ok(()),
            Err(HubError::FormatError) => Err(self.hub.fatal(
                self.session,
                &format!("client pushed {} data to '{}'", incoming, path),
            )),
            Err(other) => Err(other),
        }
    }

    // -----------------------------------------------------------------
    // Defaults & flags
    // -----------------------------------------------------------------

    pub fn set_boolean_default(&mut self, path: &str, value: bool) -> HubResult<()> {
        self.set_default(path, DataType::Boolean, Sample::boolean(0.0, value))
    }

    pub fn set_numeric_default(&mut self, path: &str, value: f64) -> HubResult<()> {
        self.set_default(path, DataType::Numeric, Sample::numeric(0.0, value))
    }

    pub fn set_string_default(&mut self, path: &str, value: &str) -> HubResult<()> {
        self.set_default(path, DataType::String, Sample::string(0.0, value))
    }

    pub fn set_json_default(&mut self, path: &str, value: &str) -> HubResult<()> {
        let sample = Sample::json(0.0, value)?;
        self.set_default(path, DataType::Json, sample)
    }

    fn set_default(
        &mut self,
        path: &str,
        data_type: DataType,
        sample: SampleRef,
    ) -> HubResult<()> {
        let id = match self.find_io(path)? {
            Some(id) => id,
            None => {
                return Err(self.hub.fatal(
                    self.session,
                    &format!("default set on non-existent resource '{}'", path),
                ));
            }
        };
        if self.resource_type(id) != data_type {
            return Err(self.hub.fatal(
                self.session,
                &format!("default of wrong type for resource '{}'", path),
            ));
        }
        self.hub.tree.set_default(id, sample);
        Ok(())
    }

    /// Mark an Output optional. Outputs are mandatory by default.
    pub fn mark_optional(&mut self, path: &str) -> HubResult<()> {
        let id = match self.find_io(path)? {
            Some(id) => id,
            None => {
                return Err(self.hub.fatal(
                    self.session,
                    &format!("mark-optional on non-existent resource '{}'", path),
                ));
            }
        };
        if self.hub.tree.entry(id).kind() != EntryKind::Output {
            return Err(self.hub.fatal(
                self.session,
                &format!("mark-optional on non-Output resource '{}'", path),
            ));
        }
        self.hub.tree.mark_optional(id);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------

    /// Register a push handler on an Input or Output. The callback fires
    /// synchronously for every push whose kind matches `expected`.
    pub fn add_push_handler(
        &mut self,
        path: &str,
        expected: DataType,
        callback: PushCallback,
    ) -> HubResult<HandlerRef> {
        let id = match self.find_io(path)? {
            Some(id) => id,
            None => {
                return Err(self.hub.fatal(
                    self.session,
                    &format!("push handler registered before resource '{}' exists", path),
                ));
            }
        };
        Ok(self.hub.tree.add_push_handler(id, expected, callback))
    }

    /// Unlink a handler; in-flight invocations complete, later dispatches
    /// skip it.
    pub fn remove_push_handler(&mut self, handler: HandlerRef) {
        self.hub.tree.remove_push_handler(handler);
    }

    /// Polling handlers are declared in the client surface but not
    /// implemented.
    pub fn add_poll_handler(&mut self, _path: &str) -> HubResult<()> {
        log::warn!("polling not yet supported");
        Err(HubError::Unsupported)
    }

    pub fn remove_poll_handler(&mut self) {}

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// Timestamp of the current value, of any data type.
    pub fn get_timestamp(&mut self, path: &str) -> HubResult<f64> {
        let id = self.find_io(path)?.ok_or(HubError::NotFound)?;
        match self.hub.tree.current_value(id) {
            Some(sample) => Ok(sample.timestamp()),
            None => Err(HubError::Unavailable),
        }
    }

    pub fn get_boolean(&mut self, path: &str) -> HubResult<(f64, bool)> {
        let sample = self.current_checked(path, DataType::Boolean)?;
        let value = sample.as_boolean().expect("boolean resource holds boolean");
        Ok((sample.timestamp(), value))
    }

    pub fn get_numeric(&mut self, path: &str) -> HubResult<(f64, f64)> {
        let sample = self.current_checked(path, DataType::Numeric)?;
        let value = sample.as_numeric().expect("numeric resource holds numeric");
        Ok((sample.timestamp(), value))
    }

    /// Current string value. `max_len` is the capacity the client declared
    /// for its receive buffer; a longer value yields `Overflow`.
    pub fn get_string(&mut self, path: &str, max_len: usize) -> HubResult<(f64, String)> {
        let sample = self.current_checked(path, DataType::String)?;
        let value = sample.as_string().expect("string resource holds string");
        if value.len() > max_len {
            return Err(HubError::Overflow);
        }
        Ok((sample.timestamp(), value.to_string()))
    }

    /// Current value of any type, projected to JSON.
    pub fn get_json(&mut self, path: &str, max_len: usize) -> HubResult<(f64, String)> {
        let id = self.find_io(path)?.ok_or(HubError::NotFound)?;
        let sample = self
            .hub
            .tree
            .current_value(id)
            .ok_or(HubError::Unavailable)?;
        let value = sample.value_json();
        if value.len() > max_len {
            return Err(HubError::Overflow);
        }
        Ok((sample.timestamp(), value))
    }

    // -----------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------

    /// Find an Input/Output under the session namespace. `Ok(None)` when
    /// the path is missing or names something that is not an I/O resource.
    fn find_io(&mut self, path: &str) -> HubResult<Option<EntryId>> {
        let binding = self.hub.ensure_binding(self.session)?;
        let id = match self.hub.tree.find_entry(binding.namespace, path) {
            Some(id) => id,
            None => return Ok(None),
        };
        match self.hub.tree.entry(id).kind() {
            EntryKind::Input | EntryKind::Output => Ok(Some(id)),
            _ => Ok(None),
        }
    }

    fn resource_type(&self, id: EntryId) -> DataType {
        self.hub
            .tree
            .entry(id)
            .resource()
            .expect("I/O entry carries resource state")
            .data_type()
    }

    /// Current value with a kind check; a wrong-kind fetch kills the
    /// session.
    fn current_checked(&mut self, path: &str, expected: DataType) -> HubResult<SampleRef> {
        let id = self.find_io(path)?.ok_or(HubError::NotFound)?;
        if self.resource_type(id) != expected {
            return Err(self
                .hub
                .fatal(self.session, "fetch of wrong data type on resource"));
        }
        self.hub.tree.current_value(id).ok_or(HubError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::infrastructure::mock::{MockClock, MockIdentity, RecordingControl};
    use std::cell::RefCell;
    use std::rc::Rc;

    const S: SessionHandle = SessionHandle(1);

    fn hub() -> (Hub, RecordingControl, MockClock) {
        let control = RecordingControl::new();
        let clock = MockClock::new(1_700_000_000.0);
        let identity = MockIdentity::new().with_client(S, "sensors");
        let hub = Hub::new(
            HubConfig::default(),
            Box::new(clock.clone()),
            Box::new(identity),
            Box::new(control.clone()),
        );
        (hub, control, clock)
    }

    #[test]
    fn create_and_push_round_trip() {
        let (mut hub, control, _) = hub();
        hub.io(S)
            .create_input("sensor/temp", DataType::Numeric, "degC")
            .unwrap();
        hub.io(S)
            .push_numeric("sensor/temp", 1_700_000_000.0, 21.5)
            .unwrap();
        let (ts, value) = hub.io(S).get_numeric("sensor/temp").unwrap();
        assert_eq!(ts, 1_700_000_000.0);
        assert_eq!(value, 21.5);
        assert_eq!(control.kill_count(), 0);
    }

    #[test]
    fn relative_paths_accept_leading_slash() {
        let (mut hub, _, _) = hub();
        hub.io(S)
            .create_input("/sensor/temp", DataType::Numeric, "degC")
            .unwrap();
        assert!(hub
            .tree()
            .find_absolute("/app/sensors/sensor/temp")
            .is_some());
    }

    #[test]
    fn recreation_is_idempotent() {
        let (mut hub, _, _) = hub();
        hub.io(S).create_input("x", DataType::Numeric, "m").unwrap();
        hub.io(S).create_input("x", DataType::Numeric, "m").unwrap();
    }

    #[test]
    fn duplicate_conflict_leaves_state_unchanged() {
        let (mut hub, _, _) = hub();
        hub.io(S).create_input("x", DataType::Numeric, "m").unwrap();
        assert_eq!(
            hub.io(S).create_output("x", DataType::Numeric, "m"),
            Err(HubError::Duplicate)
        );
        assert_eq!(
            hub.query(S).get_data_type("/app/sensors/x").unwrap(),
            DataType::Numeric
        );
    }

    #[test]
    fn resource_cap_yields_no_memory() {
        let control = RecordingControl::new();
        let identity = MockIdentity::new().with_client(S, "sensors");
        let config = HubConfig {
            max_resources_per_client: 2,
            ..Default::default()
        };
        let mut hub = Hub::new(
            config,
            Box::new(MockClock::new(0.0)),
            Box::new(identity),
            Box::new(control),
        );

        hub.io(S).create_input("a", DataType::Numeric, "").unwrap();
        hub.io(S).create_input("b", DataType::Numeric, "").unwrap();
        assert_eq!(
            hub.io(S).create_input("c", DataType::Numeric, ""),
            Err(HubError::NoMemory)
        );
        // Deleting one frees budget for another.
        hub.io(S).delete_resource("a").unwrap();
        hub.io(S).create_input("c", DataType::Numeric, "").unwrap();
    }

    #[test]
    fn push_to_missing_resource_kills_client() {
        let (mut hub, control, _) = hub();
        let err = hub.io(S).push_numeric("nope", 1.0, 1.0).unwrap_err();
        assert_eq!(err, HubError::Fatal);
        assert_eq!(control.kill_count(), 1);
        assert!(control.last_reason().unwrap().contains("non-existent"));
    }

    #[test]
    fn wrong_kind_push_kills_client() {
        let (mut hub, control, _) = hub();
        hub.io(S).create_input("x", DataType::Numeric, "").unwrap();
        assert_eq!(
            hub.io(S).push_boolean("x", 1.0, true),
            Err(HubError::Fatal)
        );
        assert_eq!(control.kill_count(), 1);
    }

    #[test]
    fn wrong_kind_fetch_kills_client() {
        let (mut hub, control, _) = hub();
        hub.io(S).create_input("x", DataType::Numeric, "").unwrap();
        hub.io(S).push_numeric("x", 1.0, 5.0).unwrap();
        assert_eq!(hub.io(S).get_boolean("x"), Err(HubError::Fatal));
        assert_eq!(control.kill_count(), 1);
    }

    #[test]
    fn zero_timestamp_stamped_at_pipeline_entry() {
        let (mut hub, _, clock) = hub();
        clock.set(1_700_000_123.0);
        hub.io(S).create_input("x", DataType::Trigger, "").unwrap();
        hub.io(S).push_trigger("x", 0.0).unwrap();
        assert_eq!(hub.io(S).get_timestamp("x").unwrap(), 1_700_000_123.0);
    }

    #[test]
    fn default_precedence_scenario() {
        let (mut hub, _, _) = hub();
        hub.io(S).create_output("y", DataType::Boolean, "").unwrap();
        hub.io(S).set_boolean_default("y", true).unwrap();
        assert_eq!(hub.io(S).get_boolean("y").unwrap(), (0.0, true));

        hub.io(S).push_boolean("y", 5.0, false).unwrap();
        assert_eq!(hub.io(S).get_boolean("y").unwrap(), (5.0, false));
    }

    #[test]
    fn default_is_write_once() {
        let (mut hub, _, _) = hub();
        hub.io(S).create_output("y", DataType::Numeric, "").unwrap();
        hub.io(S).set_numeric_default("y", 1.0).unwrap();
        hub.io(S).set_numeric_default("y", 2.0).unwrap();
        assert_eq!(hub.io(S).get_numeric("y").unwrap(), (0.0, 1.0));
    }

    #[test]
    fn wrong_kind_default_kills_client() {
        let (mut hub, control, _) = hub();
        hub.io(S).create_output("y", DataType::Boolean, "").unwrap();
        assert_eq!(
            hub.io(S).set_numeric_default("y", 1.0),
            Err(HubError::Fatal)
        );
        assert_eq!(control.kill_count(), 1);
    }

    #[test]
    fn mark_optional_requires_output() {
        let (mut hub, control, _) = hub();
        hub.io(S).create_output("out", DataType::Numeric, "").unwrap();
        hub.io(S).create_input("in", DataType::Numeric, "").unwrap();

        hub.io(S).mark_optional("out").unwrap();
        assert!(!hub
            .tree()
            .find_absolute("/app/sensors/out")
            .map(|id| hub.tree().entry(id).resource().unwrap().is_mandatory())
            .unwrap());

        assert_eq!(hub.io(S).mark_optional("in"), Err(HubError::Fatal));
        assert_eq!(control.kill_count(), 1);
    }

    #[test]
    fn handler_before_resource_kills_client() {
        let (mut hub, control, _) = hub();
        let result =
            hub.io(S)
                .add_push_handler("nope", DataType::Numeric, Box::new(|_| {}));
        assert!(result.is_err());
        assert_eq!(control.kill_count(), 1);
    }

    #[test]
    fn handler_fan_out_through_facade() {
        let (mut hub, _, _) = hub();
        hub.io(S).create_input("x", DataType::Numeric, "").unwrap();
        let seen: Rc<RefCell<Vec<f64>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let handler = hub
            .io(S)
            .add_push_handler(
                "x",
                DataType::Numeric,
                Box::new(move |s| sink.borrow_mut().push(s.as_numeric().unwrap())),
            )
            .unwrap();

        hub.io(S).push_numeric("x", 1.0, 10.0).unwrap();
        hub.io(S).remove_push_handler(handler);
        hub.io(S).push_numeric("x", 2.0, 20.0).unwrap();

        assert_eq!(*seen.borrow(), vec![10.0]);
    }

    #[test]
    fn poll_handler_is_unsupported() {
        let (mut hub, control, _) = hub();
        assert_eq!(hub.io(S).add_poll_handler("x"), Err(HubError::Unsupported));
        assert_eq!(control.kill_count(), 0);
    }

    #[test]
    fn string_overflow_is_retryable() {
        let (mut hub, _, _) = hub();
        hub.io(S).create_input("s", DataType::String, "").unwrap();
        hub.io(S).push_string("s", 1.0, "long value").unwrap();
        assert_eq!(hub.io(S).get_string("s", 4), Err(HubError::Overflow));
        let (_, value) = hub.io(S).get_string("s", 64).unwrap();
        assert_eq!(value, "long value");
    }

    #[test]
    fn get_json_projects_any_kind() {
        let (mut hub, _, _) = hub();
        hub.io(S).create_input("b", DataType::Boolean, "").unwrap();
        hub.io(S).push_boolean("b", 1.0, true).unwrap();
        let (_, json) = hub.io(S).get_json("b", 64).unwrap();
        assert_eq!(json, "true");
    }

    #[test]
    fn push_json_with_nul_is_format_error() {
        let (mut hub, control, _) = hub();
        hub.io(S).create_input("j", DataType::Json, "").unwrap();
        assert_eq!(
            hub.io(S).push_json("j", 1.0, "bad\0json"),
            Err(HubError::FormatError)
        );
        assert_eq!(control.kill_count(), 0);
        assert_eq!(hub.io(S).get_timestamp("j"), Err(HubError::Unavailable));
    }

    #[test]
    fn get_on_missing_resource_is_not_found() {
        let (mut hub, control, _) = hub();
        assert_eq!(hub.io(S).get_timestamp("nope"), Err(HubError::NotFound));
        assert_eq!(hub.io(S).get_numeric("nope"), Err(HubError::NotFound));
        assert_eq!(control.kill_count(), 0);
    }

    #[test]
    fn delete_missing_resource_is_a_no_op() {
        let (mut hub, control, _) = hub();
        hub.io(S).delete_resource("nope").unwrap();
        assert_eq!(control.kill_count(), 0);
    }

    #[test]
    fn delete_then_read_is_not_found() {
        let (mut hub, _, _) = hub();
        hub.io(S).create_input("x", DataType::Numeric, "").unwrap();
        hub.io(S).push_numeric("x", 1.0, 1.0).unwrap();
        hub.io(S).delete_resource("x").unwrap();
        assert_eq!(hub.io(S).get_timestamp("x"), Err(HubError::NotFound));
    }
}
