//! Read-side facade: current values, buffer dumps, and window aggregates
//! by absolute path.
//!
//! Unlike the producer/consumer surface, reads here never mutate the tree.
//! Observation paths may be given absolute (`/obs/...`) or relative to
//! `/obs/`. Aggregates degrade to NaN instead of failing: a missing
//! observation, an empty buffer, or a non-numeric buffer all answer NaN.

use std::io::Write;

use crate::error::{HubError, HubResult};
use crate::hub::Hub;
use crate::resource::buffer::resolve_start_time;
use crate::sample::{DataType, SampleRef};
use crate::session::SessionHandle;
use crate::tree::EntryId;

/// Read-side operations for one client session.
pub struct QueryApi<'a> {
    hub: &'a mut Hub,
    session: SessionHandle,
}

impl<'a> QueryApi<'a> {
    pub(crate) fn new(hub: &'a mut Hub, session: SessionHandle) -> QueryApi<'a> {
        QueryApi { hub, session }
    }

    // -----------------------------------------------------------------
    // Buffer reads
    // -----------------------------------------------------------------

    /// Write buffered samples of an observation to `sink` as one JSON
    /// array, oldest first, and invoke `completion` with the final status
    /// once the write has finished. `start_after` follows the usual start
    /// time rules (NaN reads the whole buffer; under thirty years means
    /// seconds before now; more means absolute epoch seconds), except that
    /// zero and negative values are a contract violation here.
    ///
    /// Returns `NotFound` without invoking `completion` when the
    /// observation does not exist.
    pub fn read_buffer_json<F>(
        &mut self,
        obs_path: &str,
        start_after: f64,
        sink: &mut dyn Write,
        completion: F,
    ) -> HubResult<()>
    where
        F: FnOnce(HubResult<usize>),
    {
        let id = self
            .hub
            .find_observation(obs_path)
            .ok_or(HubError::NotFound)?;
        if !start_after.is_nan() && start_after <= 0.0 {
            return Err(self.hub.fatal(
                self.session,
                &format!("non-positive startAfter time provided ({})", start_after),
            ));
        }

        let start_ts = resolve_start_time(start_after, self.hub.clock.now_seconds());
        let buffer = self.observation_buffer(id);
        let status = match buffer.write_json(start_ts, sink) {
            Ok(written) => Ok(written),
            Err(err) => {
                // A dead sink means the reader went away mid-dump; the
                // partially written stream gets an error completion.
                log::debug!("buffer read on {} aborted: {}", obs_path, err);
                Err(HubError::Fatal)
            }
        };
        completion(status);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------

    /// Minimum numeric value in the window; NaN when there is none.
    pub fn get_min(&mut self, obs_path: &str, start: f64) -> f64 {
        self.aggregate(obs_path, start, |b, ts| b.min(ts))
    }

    /// Maximum numeric value in the window; NaN when there is none.
    pub fn get_max(&mut self, obs_path: &str, start: f64) -> f64 {
        self.aggregate(obs_path, start, |b, ts| b.max(ts))
    }

    /// Arithmetic mean over the window; NaN when there is none.
    pub fn get_mean(&mut self, obs_path: &str, start: f64) -> f64 {
        self.aggregate(obs_path, start, |b, ts| b.mean(ts))
    }

    /// Population standard deviation over the window; NaN when there is
    /// none.
    pub fn get_std_dev(&mut self, obs_path: &str, start: f64) -> f64 {
        self.aggregate(obs_path, start, |b, ts| b.stddev(ts))
    }

    fn aggregate<F>(&mut self, obs_path: &str, start: f64, f: F) -> f64
    where
        F: FnOnce(&crate::resource::buffer::SampleBuffer, f64) -> f64,
    {
        let id = match self.hub.find_observation(obs_path) {
            Some(id) => id,
            None => return f64::NAN,
        };
        let start_ts = resolve_start_time(start, self.hub.clock.now_seconds());
        f(self.observation_buffer(id), start_ts)
    }

    // -----------------------------------------------------------------
    // Current-value reads
    // -----------------------------------------------------------------

    /// Current data type of a resource. Observations and placeholders
    /// report whatever kind was pushed last.
    pub fn get_data_type(&mut self, path: &str) -> HubResult<DataType> {
        let id = self.find_resource(path)?;
        Ok(self.state(id).data_type())
    }

    /// Units of a resource; `max_len` is the caller's buffer capacity.
    pub fn get_units(&mut self, path: &str, max_len: usize) -> HubResult<String> {
        let id = self.find_resource(path)?;
        let units = self.state(id).units().to_string();
        if units.len() > max_len {
            return Err(HubError::Overflow);
        }
        Ok(units)
    }

    /// Timestamp of the current value of a resource of any type.
    pub fn get_timestamp(&mut self, path: &str) -> HubResult<f64> {
        let sample = self.current(path)?;
        Ok(sample.timestamp())
    }

    pub fn get_boolean(&mut self, path: &str) -> HubResult<(f64, bool)> {
        let sample = self.current(path)?;
        match sample.as_boolean() {
            Some(value) => Ok((sample.timestamp(), value)),
            None => Err(HubError::FormatError),
        }
    }

    pub fn get_numeric(&mut self, path: &str) -> HubResult<(f64, f64)> {
        let sample = self.current(path)?;
        match sample.as_numeric() {
            Some(value) => Ok((sample.timestamp(), value)),
            None => Err(HubError::FormatError),
        }
    }

    pub fn get_string(&mut self, path: &str, max_len: usize) -> HubResult<(f64, String)> {
        let sample = self.current(path)?;
        let value = match sample.as_string() {
            Some(value) => value,
            None => return Err(HubError::FormatError),
        };
        if value.len() > max_len {
            return Err(HubError::Overflow);
        }
        Ok((sample.timestamp(), value.to_string()))
    }

    /// Current value of any type, projected to JSON.
    pub fn get_json(&mut self, path: &str, max_len: usize) -> HubResult<(f64, String)> {
        let sample = self.current(path)?;
        let value = sample.value_json();
        if value.len() > max_len {
            return Err(HubError::Overflow);
        }
        Ok((sample.timestamp(), value))
    }

    // -----------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------

    /// Resolve an absolute path to a data-carrying entry.
    fn find_resource(&self, path: &str) -> HubResult<EntryId> {
        let id = self
            .hub
            .tree
            .find_absolute(path)
            .ok_or(HubError::NotFound)?;
        if !self.hub.tree.entry(id).kind().carries_data() {
            return Err(HubError::Unsupported);
        }
        Ok(id)
    }

    fn state(&self, id: EntryId) -> &crate::resource::ResourceState {
        self.hub
            .tree
            .entry(id)
            .resource()
            .expect("data-carrying entry has resource state")
    }

    fn observation_buffer(&self, id: EntryId) -> &crate::resource::buffer::SampleBuffer {
        self.state(id)
            .observation()
            .expect("observation entry has observation state")
            .buffer()
    }

    fn current(&self, path: &str) -> HubResult<SampleRef> {
        let id = self.find_resource(path)?;
        self.hub.tree.current_value(id).ok_or(HubError::Unavailable)
    }
}
