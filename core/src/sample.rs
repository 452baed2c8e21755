//! Data samples: immutable timestamped values pushed through the hub.
//!
//! A sample is created once, then shared by reference between the
//! current-value slot of a resource, observation buffers, and in-flight
//! handler dispatches. The whole engine runs on one execution context, so
//! `Rc` is the sharing model; nothing ever mutates a sample after
//! construction.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{HubError, HubResult};

/// The five data types a resource can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// No payload; the push itself is the event.
    Trigger,
    Boolean,
    Numeric,
    String,
    Json,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Trigger => "trigger",
            DataType::Boolean => "boolean",
            DataType::Numeric => "numeric",
            DataType::String => "string",
            DataType::Json => "json",
        };
        f.write_str(s)
    }
}

/// Kind-discriminated payload of a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Trigger,
    Boolean(bool),
    Numeric(f64),
    String(String),
    Json(String),
}

/// An immutable (timestamp, value) pair.
///
/// Timestamps are seconds since the Unix epoch. A timestamp of `0.0` at
/// construction means "stamp with the wall clock when the sample enters the
/// push pipeline"; the pipeline replaces it exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    timestamp: f64,
    value: SampleValue,
}

/// Shared handle to a sample. Lifetime is the longest holder.
pub type SampleRef = Rc<Sample>;

impl Sample {
    pub fn trigger(timestamp: f64) -> SampleRef {
        Rc::new(Sample {
            timestamp,
            value: SampleValue::Trigger,
        })
    }

    pub fn boolean(timestamp: f64, value: bool) -> SampleRef {
        Rc::new(Sample {
            timestamp,
            value: SampleValue::Boolean(value),
        })
    }

    pub fn numeric(timestamp: f64, value: f64) -> SampleRef {
        Rc::new(Sample {
            timestamp,
            value: SampleValue::Numeric(value),
        })
    }

    pub fn string(timestamp: f64, value: &str) -> SampleRef {
        Rc::new(Sample {
            timestamp,
            value: SampleValue::String(value.to_string()),
        })
    }

    /// Create a JSON sample. Validation is best-effort: the text is stored
    /// verbatim, but embedded NUL bytes are rejected because they cannot
    /// survive the wire formats downstream.
    pub fn json(timestamp: f64, value: &str) -> HubResult<SampleRef> {
        if value.bytes().any(|b| b == 0) {
            return Err(HubError::FormatError);
        }
        Ok(Rc::new(Sample {
            timestamp,
            value: SampleValue::Json(value.to_string()),
        }))
    }

    /// Copy of this sample with a different timestamp. Used by the push
    /// pipeline to stamp `0.0` timestamps; the original is left untouched
    /// for any other holder.
    pub fn with_timestamp(&self, timestamp: f64) -> SampleRef {
        Rc::new(Sample {
            timestamp,
            value: self.value.clone(),
        })
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn data_type(&self) -> DataType {
        match self.value {
            SampleValue::Trigger => DataType::Trigger,
            SampleValue::Boolean(_) => DataType::Boolean,
            SampleValue::Numeric(_) => DataType::Numeric,
            SampleValue::String(_) => DataType::String,
            SampleValue::Json(_) => DataType::Json,
        }
    }

    pub fn value(&self) -> &SampleValue {
        &self.value
    }

    /// Boolean payload, if this is a Boolean sample.
    pub fn as_boolean(&self) -> Option<bool> {
        match self.value {
            SampleValue::Boolean(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric payload, if this is a Numeric sample.
    pub fn as_numeric(&self) -> Option<f64> {
        match self.value {
            SampleValue::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// String payload, if this is a String sample.
    pub fn as_string(&self) -> Option<&str> {
        match &self.value {
            SampleValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Raw JSON text, if this is a Json sample.
    pub fn as_json(&self) -> Option<&str> {
        match &self.value {
            SampleValue::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Project the payload to JSON text.
    ///
    /// Triggers project to `null`, numerics use the shortest round-trip
    /// form, strings are escaped, and Json payloads are emitted verbatim.
    /// Non-finite numerics have no JSON representation and project to
    /// `null` as well.
    pub fn value_json(&self) -> String {
        match &self.value {
            SampleValue::Trigger => "null".to_string(),
            SampleValue::Boolean(v) => {
                if *v {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            SampleValue::Numeric(v) => match serde_json::Number::from_f64(*v) {
                Some(n) => n.to_string(),
                None => "null".to_string(),
            },
            SampleValue::String(v) => {
                serde_json::to_string(v).unwrap_or_else(|_| "null".to_string())
            }
            SampleValue::Json(v) => v.clone(),
        }
    }

    /// Project to a buffer-dump object: `{"t":<ts>,"v":<json>}`, with the
    /// `"v"` member omitted for triggers.
    pub fn entry_json(&self) -> String {
        let t = match serde_json::Number::from_f64(self.timestamp) {
            Some(n) => n.to_string(),
            None => "0".to_string(),
        };
        match self.value {
            SampleValue::Trigger => format!("{{\"t\":{}}}", t),
            _ => format!("{{\"t\":{},\"v\":{}}}", t, self.value_json()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_carry_type_and_timestamp() {
        let s = Sample::numeric(12.5, 21.5);
        assert_eq!(s.timestamp(), 12.5);
        assert_eq!(s.data_type(), DataType::Numeric);
        assert_eq!(s.as_numeric(), Some(21.5));
        assert_eq!(s.as_boolean(), None);
    }

    #[test]
    fn wrong_kind_accessor_is_none() {
        let s = Sample::boolean(1.0, true);
        assert_eq!(s.as_numeric(), None);
        assert_eq!(s.as_string(), None);
        assert_eq!(s.as_boolean(), Some(true));
    }

    #[test]
    fn json_rejects_embedded_nul() {
        assert_eq!(Sample::json(0.0, "nul\0here"), Err(HubError::FormatError));
        assert!(Sample::json(0.0, "{\"a\":1}").is_ok());
    }

    #[test]
    fn with_timestamp_preserves_value() {
        let s = Sample::string(0.0, "hello");
        let stamped = s.with_timestamp(99.0);
        assert_eq!(stamped.timestamp(), 99.0);
        assert_eq!(stamped.as_string(), Some("hello"));
        // Original untouched.
        assert_eq!(s.timestamp(), 0.0);
    }

    #[test]
    fn value_json_per_kind() {
        assert_eq!(Sample::trigger(1.0).value_json(), "null");
        assert_eq!(Sample::boolean(1.0, true).value_json(), "true");
        assert_eq!(Sample::boolean(1.0, false).value_json(), "false");
        assert_eq!(Sample::numeric(1.0, 21.5).value_json(), "21.5");
        assert_eq!(
            Sample::string(1.0, "say \"hi\"").value_json(),
            "\"say \\\"hi\\\"\""
        );
        let j = Sample::json(1.0, "{\"x\":[1,2]}").unwrap();
        assert_eq!(j.value_json(), "{\"x\":[1,2]}");
    }

    #[test]
    fn non_finite_numeric_projects_null() {
        assert_eq!(Sample::numeric(1.0, f64::NAN).value_json(), "null");
        assert_eq!(Sample::numeric(1.0, f64::INFINITY).value_json(), "null");
    }

    #[test]
    fn numeric_round_trips_shortest_form() {
        assert_eq!(Sample::numeric(1.0, 20.0).value_json(), "20.0");
        assert_eq!(Sample::numeric(1.0, 0.1).value_json(), "0.1");
    }

    #[test]
    fn entry_json_omits_value_for_trigger() {
        assert_eq!(Sample::trigger(2.0).entry_json(), "{\"t\":2.0}");
        assert_eq!(
            Sample::numeric(3.0, 30.0).entry_json(),
            "{\"t\":3.0,\"v\":30.0}"
        );
    }

    #[test]
    fn entry_json_parses_back() {
        let e = Sample::string(1700000000.5, "x").entry_json();
        let v: serde_json::Value = serde_json::from_str(&e).unwrap();
        assert_eq!(v["t"], serde_json::json!(1700000000.5));
        assert_eq!(v["v"], serde_json::json!("x"));
    }

    #[test]
    fn data_type_serde_names() {
        let j = serde_json::to_string(&DataType::Numeric).unwrap();
        assert_eq!(j, "\"numeric\"");
        let back: DataType = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(back, DataType::Json);
    }
}
