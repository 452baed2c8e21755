//! Bounded FIFO of samples held by an observation, plus window aggregates.
//!
//! Eviction is oldest-first and happens on append: when the size cap is
//! exceeded, or when the span between the newest and oldest timestamps
//! exceeds the window cap. A size cap of zero disables buffering entirely.

use std::collections::VecDeque;
use std::io::{self, Write};

use crate::sample::{Sample, SampleRef};

/// Threshold separating "seconds ago" from "absolute epoch seconds" in
/// read start times.
pub const SECONDS_IN_30_YEARS: f64 = 946_728_000.0;

/// Resolve a caller-supplied start time against the current wall clock.
///
/// NaN selects the whole buffer, `0` resolves to epoch zero (also the whole
/// buffer), values under thirty years are relative to now, anything larger
/// is taken as absolute epoch seconds.
pub fn resolve_start_time(start: f64, now: f64) -> f64 {
    if start.is_nan() {
        f64::NEG_INFINITY
    } else if start == 0.0 {
        0.0
    } else if start < SECONDS_IN_30_YEARS {
        now - start
    } else {
        start
    }
}

/// FIFO of shared samples with a size cap and a time-window cap.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: VecDeque<SampleRef>,
    max_count: usize,
    max_window_secs: f64,
}

impl SampleBuffer {
    pub fn new() -> SampleBuffer {
        SampleBuffer::default()
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    pub fn max_window_secs(&self) -> f64 {
        self.max_window_secs
    }

    /// Set the size cap and evict immediately if the buffer shrank.
    pub fn set_max_count(&mut self, max_count: usize) {
        self.max_count = max_count;
        self.enforce_caps();
    }

    /// Set the window cap in seconds (`0.0` disables) and evict
    /// immediately.
    pub fn set_max_window_secs(&mut self, secs: f64) {
        self.max_window_secs = secs;
        self.enforce_caps();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a sample, evicting oldest entries as needed. A zero size cap
    /// means buffering is off and the sample is dropped.
    pub fn push(&mut self, sample: SampleRef) {
        if self.max_count == 0 {
            return;
        }
        self.samples.push_back(sample);
        self.enforce_caps();
    }

    fn enforce_caps(&mut self) {
        while self.samples.len() > self.max_count {
            self.samples.pop_front();
        }
        if self.max_window_secs > 0.0 {
            while let (Some(oldest), Some(newest)) =
                (self.samples.front(), self.samples.back())
            {
                if newest.timestamp() - oldest.timestamp() > self.max_window_secs {
                    self.samples.pop_front();
                } else {
                    break;
                }
            }
        }
    }

    /// Iterate samples with `timestamp >= start_ts`, oldest first.
    pub fn samples_since(&self, start_ts: f64) -> impl Iterator<Item = &SampleRef> {
        self.samples
            .iter()
            .filter(move |s| s.timestamp() >= start_ts)
    }

    /// All buffered samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SampleRef> {
        self.samples.iter()
    }

    // -----------------------------------------------------------------
    // JSON dump & restore
    // -----------------------------------------------------------------

    /// Write samples with `timestamp >= start_ts` to `sink` as one JSON
    /// array, in push order. Returns the number of entries written. The
    /// array is produced in a single call, so a reader never observes a
    /// torn dump.
    pub fn write_json(&self, start_ts: f64, sink: &mut dyn Write) -> io::Result<usize> {
        let mut written = 0;
        sink.write_all(b"[")?;
        for sample in self.samples_since(start_ts) {
            if written > 0 {
                sink.write_all(b",")?;
            }
            sink.write_all(sample.entry_json().as_bytes())?;
            written += 1;
        }
        sink.write_all(b"]")?;
        Ok(written)
    }

    /// The whole buffer as a JSON array string (persistence format).
    pub fn to_json_string(&self) -> String {
        let mut out = Vec::new();
        // Writing to a Vec cannot fail.
        let _ = self.write_json(f64::NEG_INFINITY, &mut out);
        String::from_utf8(out).unwrap_or_else(|_| "[]".to_string())
    }

    /// Rebuild buffer contents from a JSON array previously produced by
    /// [`SampleBuffer::to_json_string`]. Existing contents are replaced;
    /// caps still apply.
    pub fn load_json(&mut self, json: &str) -> Result<usize, String> {
        let parsed: serde_json::Value =
            serde_json::from_str(json).map_err(|e| format!("buffer dump not JSON: {}", e))?;
        let entries = parsed
            .as_array()
            .ok_or_else(|| "buffer dump is not an array".to_string())?;

        self.samples.clear();
        for entry in entries {
            let t = entry
                .get("t")
                .and_then(serde_json::Value::as_f64)
                .ok_or_else(|| "buffer entry missing \"t\"".to_string())?;
            let sample = match entry.get("v") {
                None | Some(serde_json::Value::Null) => Sample::trigger(t),
                Some(serde_json::Value::Bool(b)) => Sample::boolean(t, *b),
                Some(serde_json::Value::Number(n)) => {
                    Sample::numeric(t, n.as_f64().unwrap_or(f64::NAN))
                }
                Some(serde_json::Value::String(s)) => Sample::string(t, s),
                Some(other) => Sample::json(t, &other.to_string())
                    .map_err(|_| "buffer entry value not representable".to_string())?,
            };
            self.push(sample);
        }
        Ok(self.samples.len())
    }

    // -----------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------

    fn numeric_since(&self, start_ts: f64) -> impl Iterator<Item = f64> + '_ {
        self.samples_since(start_ts).filter_map(|s| s.as_numeric())
    }

    /// Minimum numeric value since `start_ts`; NaN when there is none.
    pub fn min(&self, start_ts: f64) -> f64 {
        self.numeric_since(start_ts).fold(f64::NAN, f64::min)
    }

    /// Maximum numeric value since `start_ts`; NaN when there is none.
    pub fn max(&self, start_ts: f64) -> f64 {
        self.numeric_since(start_ts).fold(f64::NAN, f64::max)
    }

    /// Arithmetic mean of numeric values since `start_ts`; NaN when there
    /// is none.
    pub fn mean(&self, start_ts: f64) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for v in self.numeric_since(start_ts) {
            sum += v;
            count += 1;
        }
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }

    /// Population standard deviation (N denominator) of numeric values
    /// since `start_ts`; NaN when there is none.
    pub fn stddev(&self, start_ts: f64) -> f64 {
        let mean = self.mean(start_ts);
        if mean.is_nan() {
            return f64::NAN;
        }
        let mut sum_sq = 0.0;
        let mut count = 0usize;
        for v in self.numeric_since(start_ts) {
            let d = v - mean;
            sum_sq += d * d;
            count += 1;
        }
        (sum_sq / count as f64).sqrt()
    }
}
