//! Resource state and the push pipeline.
//!
//! Every data-carrying entry (Input, Output, Observation, Placeholder)
//! holds a `ResourceState`: current value, write-once default, units,
//! push-handler list, and the list of observations bound to it. The push
//! pipeline runs to completion on the single dispatch context; nothing
//! inside it suspends, so each push is atomic with respect to every other
//! tree observer.

pub mod buffer;
pub mod filter;

use std::fmt;

use crate::error::{HubError, HubResult};
use crate::infrastructure::Clock;
use crate::sample::{DataType, SampleRef};
use crate::tree::{EntryId, EntryKind, Tree};

use buffer::SampleBuffer;
use filter::ObservationFilter;

/// Callback invoked synchronously for each matching push.
pub type PushCallback = Box<dyn FnMut(&SampleRef)>;

/// Opaque reference to a registered push handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerRef {
    pub(crate) entry: EntryId,
    pub(crate) serial: u64,
}

struct HandlerSlot {
    serial: u64,
    expected: DataType,
    removed: bool,
    callback: Option<PushCallback>,
}

/// Insertion-ordered handler list. Removal during an active fan-out only
/// tombstones the slot; the list compacts when the dispatch ends, so slot
/// indexes stay stable for the whole fan-out.
#[derive(Default)]
pub struct HandlerList {
    slots: Vec<HandlerSlot>,
    next_serial: u64,
    dispatching: bool,
}

impl fmt::Debug for HandlerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerList")
            .field("len", &self.slots.len())
            .field("dispatching", &self.dispatching)
            .finish()
    }
}

impl HandlerList {
    fn add(&mut self, expected: DataType, callback: PushCallback) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.slots.push(HandlerSlot {
            serial,
            expected,
            removed: false,
            callback: Some(callback),
        });
        serial
    }

    fn remove(&mut self, serial: u64) {
        if self.dispatching {
            for slot in &mut self.slots {
                if slot.serial == serial {
                    slot.removed = true;
                }
            }
        } else {
            self.slots.retain(|slot| slot.serial != serial);
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn begin_dispatch(&mut self) {
        self.dispatching = true;
    }

    fn end_dispatch(&mut self) {
        self.dispatching = false;
        self.slots.retain(|slot| !slot.removed);
    }

    /// Move the callback out of slot `index` if it is live and expects the
    /// incoming kind. Must be paired with [`HandlerList::restore`].
    fn take_matching(&mut self, index: usize, incoming: DataType) -> Option<PushCallback> {
        let slot = self.slots.get_mut(index)?;
        if slot.removed || slot.expected != incoming {
            return None;
        }
        slot.callback.take()
    }

    fn restore(&mut self, index: usize, callback: PushCallback) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.callback = Some(callback);
        }
    }
}

/// Observation-only state: source binding, history buffer, filter stage,
/// and the reentry guard used while routing to bound observations.
#[derive(Debug, Default)]
pub struct ObservationState {
    source: Option<EntryId>,
    pub(crate) buffer: SampleBuffer,
    pub(crate) filter: ObservationFilter,
    routing: bool,
}

impl ObservationState {
    pub fn source(&self) -> Option<EntryId> {
        self.source
    }

    pub(crate) fn clear_source(&mut self) {
        self.source = None;
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut SampleBuffer {
        &mut self.buffer
    }

    pub fn filter(&self) -> &ObservationFilter {
        &self.filter
    }

    pub(crate) fn filter_mut(&mut self) -> &mut ObservationFilter {
        &mut self.filter
    }
}

/// Per-entry data state, shared by every role except Namespace.
#[derive(Debug)]
pub struct ResourceState {
    data_type: DataType,
    units: String,
    current: Option<SampleRef>,
    default: Option<SampleRef>,
    mandatory: bool,
    handlers: HandlerList,
    routes: Vec<EntryId>,
    observation: Option<ObservationState>,
}

impl ResourceState {
    /// State for a freshly referenced placeholder: trigger-typed until data
    /// arrives.
    pub fn placeholder(units: &str) -> ResourceState {
        ResourceState {
            data_type: DataType::Trigger,
            units: units.to_string(),
            current: None,
            default: None,
            mandatory: false,
            handlers: HandlerList::default(),
            routes: Vec::new(),
            observation: None,
        }
    }

    /// Bare state used when promoting a namespace that never carried data.
    pub fn bare() -> ResourceState {
        ResourceState::placeholder("")
    }

    /// Promote to a concrete Input/Output: fixes the data type and units.
    /// Outputs start mandatory. A current value or default left over from
    /// placeholder life is dropped if its kind no longer matches.
    pub(crate) fn promote(&mut self, data_type: DataType, units: &str, output: bool) {
        self.data_type = data_type;
        self.units = units.to_string();
        if output {
            self.mandatory = true;
        }
        if self
            .current
            .as_ref()
            .is_some_and(|s| s.data_type() != data_type)
        {
            self.current = None;
        }
        if self
            .default
            .as_ref()
            .is_some_and(|s| s.data_type() != data_type)
        {
            self.default = None;
        }
    }

    pub(crate) fn attach_observation(&mut self) {
        if self.observation.is_none() {
            self.observation = Some(ObservationState::default());
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub(crate) fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub(crate) fn mark_optional(&mut self) {
        self.mandatory = false;
    }

    /// The value a reader sees: the current sample, else the default (its
    /// timestamp returned verbatim), else nothing.
    pub fn current_value(&self) -> Option<&SampleRef> {
        self.current.as_ref().or(self.default.as_ref())
    }

    /// The last committed sample only, without the default fallback.
    pub(crate) fn current_sample(&self) -> Option<&SampleRef> {
        self.current.as_ref()
    }

    pub(crate) fn set_current(&mut self, sample: SampleRef) {
        self.current = Some(sample);
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Write-once: a second set is a silent no-op.
    pub(crate) fn set_default(&mut self, sample: SampleRef) {
        if self.default.is_none() {
            self.default = Some(sample);
        }
    }

    pub fn routes(&self) -> &[EntryId] {
        &self.routes
    }

    pub(crate) fn add_route(&mut self, observation: EntryId) {
        if !self.routes.contains(&observation) {
            self.routes.push(observation);
        }
    }

    pub(crate) fn remove_route(&mut self, observation: EntryId) {
        self.routes.retain(|id| *id != observation);
    }

    pub fn observation(&self) -> Option<&ObservationState> {
        self.observation.as_ref()
    }

    pub(crate) fn observation_mut(&mut self) -> Option<&mut ObservationState> {
        self.observation.as_mut()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

// ---------------------------------------------------------------------------
// Push pipeline & handler registration (tree-level operations)
// ---------------------------------------------------------------------------

impl Tree {
    /// Push a sample into an entry: stamp, gate, filter, commit, fan out,
    /// and route to bound observations. `incoming` is the kind the client
    /// claimed; for Inputs and Outputs it must match the resource type
    /// (the facade treats a mismatch as a contract violation).
    pub fn push(
        &mut self,
        id: EntryId,
        incoming: DataType,
        sample: SampleRef,
        clock: &dyn Clock,
    ) -> HubResult<()> {
        let sample = if sample.timestamp() == 0.0 {
            sample.with_timestamp(clock.now_seconds())
        } else {
            sample
        };
        self.push_stamped(id, incoming, &sample)
    }

    fn push_stamped(
        &mut self,
        id: EntryId,
        incoming: DataType,
        sample: &SampleRef,
    ) -> HubResult<()> {
        let kind = self.entry(id).kind();
        match kind {
            EntryKind::Namespace => return Err(HubError::Unsupported),
            EntryKind::Input | EntryKind::Output => {
                let data_type = self.state(id).data_type();
                if data_type != incoming {
                    return Err(HubError::FormatError);
                }
            }
            EntryKind::Observation | EntryKind::Placeholder => {
                if kind == EntryKind::Observation {
                    let obs = self.obs_state(id);
                    if obs.routing {
                        log::warn!(
                            "dropping sample re-entering observation {} during routing",
                            self.path_of(id)
                        );
                        return Ok(());
                    }
                }
                // Dynamic typing: these entries track the kind last pushed.
                self.state_mut(id).set_data_type(incoming);
            }
        }

        // Filter stage, observations only. Compared against the last
        // committed sample, not the default.
        if kind == EntryKind::Observation {
            let state = self.state(id);
            let last = state.current_sample().map(|s| s.as_ref());
            let pass = state
                .observation()
                .expect("observation entry without observation state")
                .filter
                .accepts(last, sample);
            if !pass {
                log::debug!("filter rejected sample on {}", self.path_of(id));
                return Ok(());
            }
        }

        // Commit: replace the current value, append to the buffer.
        {
            let state = self.state_mut(id);
            state.set_current(sample.clone());
            if let Some(obs) = state.observation_mut() {
                obs.buffer.push(sample.clone());
            }
        }

        self.fan_out(id, incoming, sample);

        // Deliver to observations bound to this entry, guarding against
        // binding cycles.
        let routes = self.state(id).routes().to_vec();
        if !routes.is_empty() {
            if kind == EntryKind::Observation {
                self.obs_state_mut(id).routing = true;
            }
            for destination in routes {
                if !self.contains(destination) {
                    continue;
                }
                if let Err(err) = self.push_stamped(destination, incoming, sample) {
                    log::warn!(
                        "routing to bound observation {} failed: {}",
                        self.path_of(destination),
                        err
                    );
                }
            }
            if kind == EntryKind::Observation {
                self.obs_state_mut(id).routing = false;
            }
        }

        Ok(())
    }

    fn fan_out(&mut self, id: EntryId, incoming: DataType, sample: &SampleRef) {
        let count = self.state(id).handlers.len();
        if count == 0 {
            return;
        }
        self.state_mut(id).handlers.begin_dispatch();
        for index in 0..count {
            if let Some(mut callback) = self.state_mut(id).handlers.take_matching(index, incoming)
            {
                callback(sample);
                self.state_mut(id).handlers.restore(index, callback);
            }
        }
        self.state_mut(id).handlers.end_dispatch();
    }

    /// Current value of an entry: the last pushed sample, else the default.
    pub fn current_value(&self, id: EntryId) -> Option<SampleRef> {
        self.entry(id).resource().and_then(|s| s.current_value()).cloned()
    }

    /// Set the default value. Write-once; later calls are silent no-ops.
    pub fn set_default(&mut self, id: EntryId, sample: SampleRef) {
        self.state_mut(id).set_default(sample);
    }

    /// Clear the mandatory flag of an Output.
    pub fn mark_optional(&mut self, id: EntryId) {
        self.state_mut(id).mark_optional();
    }

    /// Register a push handler; fires for every push whose incoming kind
    /// equals `expected`, in insertion order.
    pub fn add_push_handler(
        &mut self,
        id: EntryId,
        expected: DataType,
        callback: PushCallback,
    ) -> HandlerRef {
        let serial = self.state_mut(id).handlers.add(expected, callback);
        HandlerRef { entry: id, serial }
    }

    /// Unlink a handler. Safe on stale references; during an active
    /// fan-out the slot is tombstoned and compacted afterwards.
    pub fn remove_push_handler(&mut self, handler: HandlerRef) {
        if !self.contains(handler.entry) {
            return;
        }
        if let Some(state) = self.entry_mut(handler.entry).resource_mut() {
            state.handlers.remove(handler.serial);
        }
    }

    /// Bind an observation to a source entry (or unbind with `None`). The
    /// source must carry resource state; binding an observation to itself
    /// is rejected.
    pub fn set_source(&mut self, obs: EntryId, source: Option<EntryId>) -> HubResult<()> {
        assert!(
            self.entry(obs).kind() == EntryKind::Observation,
            "set_source on non-observation entry"
        );
        if source == Some(obs) {
            return Err(HubError::Unsupported);
        }
        if let Some(src) = source {
            if self.entry(src).resource().is_none() {
                return Err(HubError::Unsupported);
            }
        }

        let old = self.obs_state(obs).source;
        if let Some(old_src) = old {
            if self.contains(old_src) {
                if let Some(state) = self.entry_mut(old_src).resource_mut() {
                    state.remove_route(obs);
                }
            }
        }

        if let Some(src) = source {
            self.state_mut(src).add_route(obs);
        }
        self.obs_state_mut(obs).source = source;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Internal state accessors
    // -----------------------------------------------------------------

    fn state(&self, id: EntryId) -> &ResourceState {
        self.entry(id)
            .resource()
            .expect("data operation on entry without resource state")
    }

    pub(crate) fn state_mut(&mut self, id: EntryId) -> &mut ResourceState {
        self.entry_mut(id)
            .resource_mut()
            .expect("data operation on entry without resource state")
    }

    fn obs_state(&self, id: EntryId) -> &ObservationState {
        self.state(id)
            .observation()
            .expect("observation entry without observation state")
    }

    pub(crate) fn obs_state_mut(&mut self, id: EntryId) -> &mut ObservationState {
        self.state_mut(id)
            .observation_mut()
            .expect("observation entry without observation state")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockClock;
    use crate::sample::Sample;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tree() -> Tree {
        Tree::new("")
    }

    fn clock() -> MockClock {
        MockClock::new(1_700_000_000.0)
    }

    #[test]
    fn push_then_get_round_trip() {
        let mut t = tree();
        let c = clock();
        let id = t
            .get_input(t.root(), "temp", DataType::Numeric, "degC")
            .unwrap();
        t.push(id, DataType::Numeric, Sample::numeric(1_700_000_000.0, 21.5), &c)
            .unwrap();
        let current = t.current_value(id).unwrap();
        assert_eq!(current.timestamp(), 1_700_000_000.0);
        assert_eq!(current.as_numeric(), Some(21.5));
    }

    #[test]
    fn zero_timestamp_is_stamped_with_wall_clock() {
        let mut t = tree();
        let c = clock();
        c.set(1234.5);
        let id = t.get_input(t.root(), "x", DataType::Boolean, "").unwrap();
        t.push(id, DataType::Boolean, Sample::boolean(0.0, true), &c)
            .unwrap();
        assert_eq!(t.current_value(id).unwrap().timestamp(), 1234.5);
    }

    #[test]
    fn type_gate_rejects_mismatch_on_io() {
        let mut t = tree();
        let c = clock();
        let id = t.get_input(t.root(), "x", DataType::Numeric, "").unwrap();
        let err = t
            .push(id, DataType::Boolean, Sample::boolean(1.0, true), &c)
            .unwrap_err();
        assert_eq!(err, HubError::FormatError);
        assert!(t.current_value(id).is_none());
    }

    #[test]
    fn observation_accepts_any_kind_and_tracks_type() {
        let mut t = tree();
        let c = clock();
        let id = t.get_observation(t.root(), "obs/o").unwrap();
        t.obs_state_mut(id).buffer.set_max_count(10);

        t.push(id, DataType::Numeric, Sample::numeric(1.0, 5.0), &c)
            .unwrap();
        assert_eq!(t.entry(id).resource().unwrap().data_type(), DataType::Numeric);

        t.push(id, DataType::String, Sample::string(2.0, "s"), &c)
            .unwrap();
        assert_eq!(t.entry(id).resource().unwrap().data_type(), DataType::String);
        assert_eq!(t.obs_state(id).buffer.len(), 2);
    }

    #[test]
    fn default_is_write_once() {
        let mut t = tree();
        let id = t.get_output(t.root(), "y", DataType::Boolean, "").unwrap();
        t.set_default(id, Sample::boolean(0.0, true));
        t.set_default(id, Sample::boolean(0.0, false));
        let value = t.current_value(id).unwrap();
        assert_eq!(value.as_boolean(), Some(true));
        assert_eq!(value.timestamp(), 0.0);
    }

    #[test]
    fn push_takes_precedence_over_default() {
        let mut t = tree();
        let c = clock();
        let id = t.get_output(t.root(), "y", DataType::Boolean, "").unwrap();
        t.set_default(id, Sample::boolean(0.0, true));
        t.push(id, DataType::Boolean, Sample::boolean(5.0, false), &c)
            .unwrap();
        let value = t.current_value(id).unwrap();
        assert_eq!(value.timestamp(), 5.0);
        assert_eq!(value.as_boolean(), Some(false));
    }

    #[test]
    fn handlers_fire_once_per_push_in_insertion_order() {
        let mut t = tree();
        let c = clock();
        let id = t.get_input(t.root(), "x", DataType::Numeric, "").unwrap();
        let calls: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        let first = calls.clone();
        t.add_push_handler(
            id,
            DataType::Numeric,
            Box::new(move |_| first.borrow_mut().push("first")),
        );
        let second = calls.clone();
        t.add_push_handler(
            id,
            DataType::Numeric,
            Box::new(move |_| second.borrow_mut().push("second")),
        );

        t.push(id, DataType::Numeric, Sample::numeric(1.0, 1.0), &c)
            .unwrap();
        assert_eq!(*calls.borrow(), vec!["first", "second"]);

        t.push(id, DataType::Numeric, Sample::numeric(2.0, 2.0), &c)
            .unwrap();
        assert_eq!(calls.borrow().len(), 4);
    }

    #[test]
    fn removed_handler_is_not_invoked() {
        let mut t = tree();
        let c = clock();
        let id = t.get_input(t.root(), "x", DataType::Numeric, "").unwrap();
        let calls: Rc<RefCell<u32>> = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        let handler = t.add_push_handler(
            id,
            DataType::Numeric,
            Box::new(move |_| *counter.borrow_mut() += 1),
        );
        t.remove_push_handler(handler);
        t.push(id, DataType::Numeric, Sample::numeric(1.0, 1.0), &c)
            .unwrap();
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn handler_receives_the_stamped_sample() {
        let mut t = tree();
        let c = clock();
        c.set(777.0);
        let id = t.get_input(t.root(), "x", DataType::String, "").unwrap();
        let seen: Rc<RefCell<Vec<(f64, String)>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        t.add_push_handler(
            id,
            DataType::String,
            Box::new(move |s| {
                sink.borrow_mut()
                    .push((s.timestamp(), s.as_string().unwrap().to_string()))
            }),
        );
        t.push(id, DataType::String, Sample::string(0.0, "hello"), &c)
            .unwrap();
        assert_eq!(*seen.borrow(), vec![(777.0, "hello".to_string())]);
    }

    #[test]
    fn tombstoned_handler_skipped_and_compacted() {
        let mut list = HandlerList::default();
        let serial = list.add(DataType::Numeric, Box::new(|_| {}));
        list.begin_dispatch();
        list.remove(serial);
        // Still present but tombstoned while the dispatch is active.
        assert_eq!(list.len(), 1);
        assert!(list.take_matching(0, DataType::Numeric).is_none());
        list.end_dispatch();
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn bound_observation_receives_routed_samples() {
        let mut t = tree();
        let c = clock();
        let input = t.get_input(t.root(), "app/s/temp", DataType::Numeric, "").unwrap();
        let obs = t.get_observation(t.root(), "obs/temp").unwrap();
        t.obs_state_mut(obs).buffer.set_max_count(10);
        t.set_source(obs, Some(input)).unwrap();

        t.push(input, DataType::Numeric, Sample::numeric(1.0, 10.0), &c)
            .unwrap();
        t.push(input, DataType::Numeric, Sample::numeric(2.0, 20.0), &c)
            .unwrap();

        assert_eq!(t.obs_state(obs).buffer.len(), 2);
        assert_eq!(t.current_value(obs).unwrap().as_numeric(), Some(20.0));
    }

    #[test]
    fn rebinding_replaces_the_source() {
        let mut t = tree();
        let c = clock();
        let a = t.get_input(t.root(), "a", DataType::Numeric, "").unwrap();
        let b = t.get_input(t.root(), "b", DataType::Numeric, "").unwrap();
        let obs = t.get_observation(t.root(), "obs/o").unwrap();
        t.obs_state_mut(obs).buffer.set_max_count(10);

        t.set_source(obs, Some(a)).unwrap();
        t.set_source(obs, Some(b)).unwrap();

        t.push(a, DataType::Numeric, Sample::numeric(1.0, 1.0), &c)
            .unwrap();
        assert_eq!(t.obs_state(obs).buffer.len(), 0);
        t.push(b, DataType::Numeric, Sample::numeric(2.0, 2.0), &c)
            .unwrap();
        assert_eq!(t.obs_state(obs).buffer.len(), 1);
        assert_eq!(t.obs_state(obs).source(), Some(b));
    }

    #[test]
    fn binding_cycle_is_broken() {
        let mut t = tree();
        let c = clock();
        let a = t.get_observation(t.root(), "obs/a").unwrap();
        let b = t.get_observation(t.root(), "obs/b").unwrap();
        t.obs_state_mut(a).buffer.set_max_count(10);
        t.obs_state_mut(b).buffer.set_max_count(10);
        t.set_source(b, Some(a)).unwrap();
        t.set_source(a, Some(b)).unwrap();

        // Without the guard this would recurse forever.
        t.push(a, DataType::Numeric, Sample::numeric(1.0, 1.0), &c)
            .unwrap();
        assert_eq!(t.obs_state(a).buffer.len(), 1);
        assert_eq!(t.obs_state(b).buffer.len(), 1);
    }

    #[test]
    fn self_binding_is_rejected() {
        let mut t = tree();
        let obs = t.get_observation(t.root(), "obs/o").unwrap();
        assert_eq!(t.set_source(obs, Some(obs)), Err(HubError::Unsupported));
    }

    #[test]
    fn deleting_source_severs_binding() {
        let mut t = tree();
        let c = clock();
        let input = t.get_input(t.root(), "src", DataType::Numeric, "").unwrap();
        let obs = t.get_observation(t.root(), "obs/o").unwrap();
        t.obs_state_mut(obs).buffer.set_max_count(10);
        t.set_source(obs, Some(input)).unwrap();

        t.delete_io(input);
        assert_eq!(t.obs_state(obs).source(), None);

        // Recreating the input does not restore the binding.
        let again = t.get_input(t.root(), "src", DataType::Numeric, "").unwrap();
        t.push(again, DataType::Numeric, Sample::numeric(1.0, 1.0), &c)
            .unwrap();
        assert_eq!(t.obs_state(obs).buffer.len(), 0);
    }

    #[test]
    fn observation_filter_applies_before_commit() {
        let mut t = tree();
        let c = clock();
        let obs = t.get_observation(t.root(), "obs/o").unwrap();
        t.obs_state_mut(obs).buffer.set_max_count(10);
        t.obs_state_mut(obs).filter.change_by = 5.0;

        t.push(obs, DataType::Numeric, Sample::numeric(1.0, 10.0), &c)
            .unwrap();
        t.push(obs, DataType::Numeric, Sample::numeric(2.0, 12.0), &c)
            .unwrap(); // within dead-band, dropped
        t.push(obs, DataType::Numeric, Sample::numeric(3.0, 20.0), &c)
            .unwrap();

        assert_eq!(t.obs_state(obs).buffer.len(), 2);
        assert_eq!(t.current_value(obs).unwrap().as_numeric(), Some(20.0));
    }

    #[test]
    fn promotion_drops_mismatched_placeholder_value() {
        let mut t = tree();
        let c = clock();
        let ph = t.get_resource(t.root(), "x").unwrap();
        t.push(ph, DataType::String, Sample::string(1.0, "old"), &c)
            .unwrap();
        let id = t.get_input(t.root(), "x", DataType::Numeric, "").unwrap();
        assert_eq!(id, ph);
        assert!(t.current_value(id).is_none());
    }
}
