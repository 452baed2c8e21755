//! Filter stage applied to samples entering an observation.
//!
//! The policy table is configuration: a minimum period between accepted
//! samples, a change-detection dead-band, and low/high limits for numeric
//! values. Everything defaults to off, so an unconfigured observation
//! passes every sample through.

use crate::sample::Sample;

/// Per-observation filter configuration.
#[derive(Debug, Clone)]
pub struct ObservationFilter {
    /// Minimum seconds between accepted samples. `0.0` disables.
    pub min_period: f64,
    /// Numeric dead-band: reject a sample whose value differs from the
    /// last accepted numeric value by less than this. `0.0` disables.
    pub change_by: f64,
    /// Reject numeric samples below this limit. `NaN` disables.
    pub low_limit: f64,
    /// Reject numeric samples above this limit. `NaN` disables.
    pub high_limit: f64,
}

impl Default for ObservationFilter {
    fn default() -> Self {
        ObservationFilter {
            min_period: 0.0,
            change_by: 0.0,
            low_limit: f64::NAN,
            high_limit: f64::NAN,
        }
    }
}

impl ObservationFilter {
    /// Decide whether `incoming` passes, given the last accepted sample.
    ///
    /// Limits and the dead-band only apply to numeric samples; the minimum
    /// period applies to every kind.
    pub fn accepts(&self, last: Option<&Sample>, incoming: &Sample) -> bool {
        if self.min_period > 0.0 {
            if let Some(prev) = last {
                if incoming.timestamp() - prev.timestamp() < self.min_period {
                    return false;
                }
            }
        }

        if let Some(value) = incoming.as_numeric() {
            if value < self.low_limit {
                return false;
            }
            if value > self.high_limit {
                return false;
            }
            if self.change_by > 0.0 {
                if let Some(prev_value) = last.and_then(Sample::as_numeric) {
                    if (value - prev_value).abs() < self.change_by {
                        return false;
                    }
                }
            }
        }

        true
    }
}
