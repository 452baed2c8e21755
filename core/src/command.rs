//! The typed wire interface for hub operations.
//!
//! Every operation a transport can carry is a variant of [`Command`];
//! [`Hub::execute`] is the single dispatch method. Commands serialize as
//! internally-tagged JSON with a `"command"` discriminant:
//!
//! ```json
//! {"command": "io.create_input", "path": "sensor/temp", "data_type": "numeric", "units": "degC"}
//! {"command": "io.push_numeric", "path": "sensor/temp", "timestamp": 0.0, "value": 21.5}
//! {"command": "query.get_mean", "path": "temp", "start": 600.0}
//! ```
//!
//! Push-handler registration is not on the wire: delivering callbacks to a
//! remote client is the transport's concern, so handlers are registered
//! through the in-process facades only.
//!
//! | Group | Commands |
//! |-------|----------|
//! | io    | `create_input`, `create_output`, `delete_resource`, `push_*`, `set_*_default`, `mark_optional`, `get_*` |
//! | query | `read_buffer`, `get_min`, `get_max`, `get_mean`, `get_std_dev`, `get_*` |
//! | admin | `create_obs`, `delete_obs`, `set_source`, buffer/filter setters, `entry_kind`, `persist_obs`, `load_obs` |

use serde::{Deserialize, Serialize};

use crate::error::{HubError, HubResult};
use crate::hub::Hub;
use crate::sample::DataType;
use crate::session::SessionHandle;
use crate::tree::EntryKind;

fn default_max_len() -> usize {
    4096
}

/// A typed command addressed to the hub on behalf of one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command")]
pub enum Command {
    // -----------------------------------------------------------------
    // Producer/consumer commands (paths relative to the client namespace)
    // -----------------------------------------------------------------

    #[serde(rename = "io.create_input")]
    CreateInput {
        path: String,
        data_type: DataType,
        #[serde(default)]
        units: String,
    },

    #[serde(rename = "io.create_output")]
    CreateOutput {
        path: String,
        data_type: DataType,
        #[serde(default)]
        units: String,
    },

    #[serde(rename = "io.delete_resource")]
    DeleteResource { path: String },

    /// Timestamp `0.0` means "stamp with the wall clock on arrival".
    #[serde(rename = "io.push_trigger")]
    PushTrigger {
        path: String,
        #[serde(default)]
        timestamp: f64,
    },

    #[serde(rename = "io.push_boolean")]
    PushBoolean {
        path: String,
        #[serde(default)]
        timestamp: f64,
        value: bool,
    },

    #[serde(rename = "io.push_numeric")]
    PushNumeric {
        path: String,
        #[serde(default)]
        timestamp: f64,
        value: f64,
    },

    #[serde(rename = "io.push_string")]
    PushString {
        path: String,
        #[serde(default)]
        timestamp: f64,
        value: String,
    },

    #[serde(rename = "io.push_json")]
    PushJson {
        path: String,
        #[serde(default)]
        timestamp: f64,
        value: String,
    },

    #[serde(rename = "io.set_boolean_default")]
    SetBooleanDefault { path: String, value: bool },

    #[serde(rename = "io.set_numeric_default")]
    SetNumericDefault { path: String, value: f64 },

    #[serde(rename = "io.set_string_default")]
    SetStringDefault { path: String, value: String },

    #[serde(rename = "io.set_json_default")]
    SetJsonDefault { path: String, value: String },

    #[serde(rename = "io.mark_optional")]
    MarkOptional { path: String },

    #[serde(rename = "io.get_timestamp")]
    GetTimestamp { path: String },

    #[serde(rename = "io.get_boolean")]
    GetBoolean { path: String },

    #[serde(rename = "io.get_numeric")]
    GetNumeric { path: String },

    #[serde(rename = "io.get_string")]
    GetString {
        path: String,
        /// Client receive-buffer capacity; longer values answer Overflow.
        #[serde(default = "default_max_len")]
        max_len: usize,
    },

    #[serde(rename = "io.get_json")]
    GetJson {
        path: String,
        #[serde(default = "default_max_len")]
        max_len: usize,
    },

    // -----------------------------------------------------------------
    // Query commands (absolute paths; /obs/ shortcut on observations)
    // -----------------------------------------------------------------

    /// Dump an observation buffer. `start_after` absent reads the whole
    /// buffer (the NaN form of the in-process API).
    #[serde(rename = "query.read_buffer")]
    ReadBuffer {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_after: Option<f64>,
    },

    #[serde(rename = "query.get_min")]
    QueryMin {
        path: String,
        #[serde(default)]
        start: f64,
    },

    #[serde(rename = "query.get_max")]
    QueryMax {
        path: String,
        #[serde(default)]
        start: f64,
    },

    #[serde(rename = "query.get_mean")]
    QueryMean {
        path: String,
        #[serde(default)]
        start: f64,
    },

    #[serde(rename = "query.get_std_dev")]
    QueryStdDev {
        path: String,
        #[serde(default)]
        start: f64,
    },

    #[serde(rename = "query.get_data_type")]
    QueryDataType { path: String },

    #[serde(rename = "query.get_units")]
    QueryUnits {
        path: String,
        #[serde(default = "default_max_len")]
        max_len: usize,
    },

    #[serde(rename = "query.get_timestamp")]
    QueryTimestamp { path: String },

    #[serde(rename = "query.get_boolean")]
    QueryBoolean { path: String },

    #[serde(rename = "query.get_numeric")]
    QueryNumeric { path: String },

    #[serde(rename = "query.get_string")]
    QueryString {
        path: String,
        #[serde(default = "default_max_len")]
        max_len: usize,
    },

    #[serde(rename = "query.get_json")]
    QueryJson {
        path: String,
        #[serde(default = "default_max_len")]
        max_len: usize,
    },

    // -----------------------------------------------------------------
    // Administrative commands
    // -----------------------------------------------------------------

    #[serde(rename = "admin.create_obs")]
    CreateObs { path: String },

    #[serde(rename = "admin.delete_obs")]
    DeleteObs { path: String },

    /// Bind (or with `source` absent, unbind) an observation to a source
    /// resource at an absolute path.
    #[serde(rename = "admin.set_source")]
    SetSource {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },

    #[serde(rename = "admin.set_buffer_max_count")]
    SetBufferMaxCount { path: String, max_count: usize },

    #[serde(rename = "admin.set_buffer_max_window")]
    SetBufferMaxWindow { path: String, seconds: f64 },

    #[serde(rename = "admin.set_min_period")]
    SetMinPeriod { path: String, seconds: f64 },

    #[serde(rename = "admin.set_change_by")]
    SetChangeBy { path: String, amount: f64 },

    /// Absent limit disables the filter.
    #[serde(rename = "admin.set_low_limit")]
    SetLowLimit {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<f64>,
    },

    #[serde(rename = "admin.set_high_limit")]
    SetHighLimit {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<f64>,
    },

    #[serde(rename = "admin.entry_kind")]
    AdminEntryKind { path: String },

    #[serde(rename = "admin.persist_obs")]
    PersistObs { path: String },

    #[serde(rename = "admin.load_obs")]
    LoadObs { path: String },
}

/// Typed response to a [`Command`], serialized with a `"result"`
/// discriminant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Timestamp {
        timestamp: f64,
    },
    Boolean {
        timestamp: f64,
        value: bool,
    },
    Numeric {
        timestamp: f64,
        value: f64,
    },
    Text {
        timestamp: f64,
        value: String,
    },
    Json {
        timestamp: f64,
        value: String,
    },
    DataType {
        data_type: DataType,
    },
    Units {
        units: String,
    },
    Kind {
        kind: EntryKind,
    },
    /// Aggregate result; `None` encodes NaN (no numeric data), which has
    /// no JSON representation.
    Aggregate {
        value: Option<f64>,
    },
    /// A buffer dump: the JSON array text plus its entry count.
    Buffer {
        count: usize,
        json: String,
    },
    /// Samples restored into an observation buffer.
    Loaded {
        count: usize,
    },
    Error {
        code: String,
        message: String,
    },
}

impl Response {
    fn status(result: HubResult<()>) -> Response {
        match result {
            Ok(()) => Response::Ok,
            Err(err) => Response::from_error(err),
        }
    }

    fn from_error(err: HubError) -> Response {
        Response::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    fn aggregate(value: f64) -> Response {
        Response::Aggregate {
            value: if value.is_nan() { None } else { Some(value) },
        }
    }
}

fn limit_or_disabled(limit: Option<f64>) -> f64 {
    limit.unwrap_or(f64::NAN)
}

impl Hub {
    /// The single dispatch method: every wire command enters here on
    /// behalf of `session`.
    pub fn execute(&mut self, session: SessionHandle, command: Command) -> Response {
        match command {
            Command::CreateInput {
                path,
                data_type,
                units,
            } => Response::status(self.io(session).create_input(&path, data_type, &units)),
            Command::CreateOutput {
                path,
                data_type,
                units,
            } => Response::status(self.io(session).create_output(&path, data_type, &units)),
            Command::DeleteResource { path } => {
                Response::status(self.io(session).delete_resource(&path))
            }
            Command::PushTrigger { path, timestamp } => {
                Response::status(self.io(session).push_trigger(&path, timestamp))
            }
            Command::PushBoolean {
                path,
                timestamp,
                value,
            } => Response::status(self.io(session).push_boolean(&path, timestamp, value)),
            Command::PushNumeric {
                path,
                timestamp,
                value,
            } => Response::status(self.io(session).push_numeric(&path, timestamp, value)),
            Command::PushString {
                path,
                timestamp,
                value,
            } => Response::status(self.io(session).push_string(&path, timestamp, &value)),
            Command::PushJson {
                path,
                timestamp,
                value,
            } => Response::status(self.io(session).push_json(&path, timestamp, &value)),
            Command::SetBooleanDefault { path, value } => {
                Response::status(self.io(session).set_boolean_default(&path, value))
            }
            Command::SetNumericDefault { path, value } => {
                Response::status(self.io(session).set_numeric_default(&path, value))
            }
            Command::SetStringDefault { path, value } => {
                Response::status(self.io(session).set_string_default(&path, &value))
            }
            Command::SetJsonDefault { path, value } => {
                Response::status(self.io(session).set_json_default(&path, &value))
            }
            Command::MarkOptional { path } => {
                Response::status(self.io(session).mark_optional(&path))
            }
            Command::GetTimestamp { path } => match self.io(session).get_timestamp(&path) {
                Ok(timestamp) => Response::Timestamp { timestamp },
                Err(err) => Response::from_error(err),
            },
            Command::GetBoolean { path } => match self.io(session).get_boolean(&path) {
                Ok((timestamp, value)) => Response::Boolean { timestamp, value },
                Err(err) => Response::from_error(err),
            },
            Command::GetNumeric { path } => match self.io(session).get_numeric(&path) {
                Ok((timestamp, value)) => Response::Numeric { timestamp, value },
                Err(err) => Response::from_error(err),
            },
            Command::GetString { path, max_len } => {
                match self.io(session).get_string(&path, max_len) {
                    Ok((timestamp, value)) => Response::Text { timestamp, value },
                    Err(err) => Response::from_error(err),
                }
            }
            Command::GetJson { path, max_len } => {
                match self.io(session).get_json(&path, max_len) {
                    Ok((timestamp, value)) => Response::Json { timestamp, value },
                    Err(err) => Response::from_error(err),
                }
            }

            Command::ReadBuffer { path, start_after } => {
                let start = start_after.unwrap_or(f64::NAN);
                let mut out = Vec::new();
                let mut count = 0;
                let result = self
                    .query(session)
                    .read_buffer_json(&path, start, &mut out, |status| {
                        if let Ok(written) = status {
                            count = written;
                        }
                    });
                match result {
                    Ok(()) => Response::Buffer {
                        count,
                        json: String::from_utf8(out).unwrap_or_else(|_| "[]".to_string()),
                    },
                    Err(err) => Response::from_error(err),
                }
            }
            Command::QueryMin { path, start } => {
                Response::aggregate(self.query(session).get_min(&path, start))
            }
            Command::QueryMax { path, start } => {
                Response::aggregate(self.query(session).get_max(&path, start))
            }
            Command::QueryMean { path, start } => {
                Response::aggregate(self.query(session).get_mean(&path, start))
            }
            Command::QueryStdDev { path, start } => {
                Response::aggregate(self.query(session).get_std_dev(&path, start))
            }
            Command::QueryDataType { path } => match self.query(session).get_data_type(&path) {
                Ok(data_type) => Response::DataType { data_type },
                Err(err) => Response::from_error(err),
            },
            Command::QueryUnits { path, max_len } => {
                match self.query(session).get_units(&path, max_len) {
                    Ok(units) => Response::Units { units },
                    Err(err) => Response::from_error(err),
                }
            }
            Command::QueryTimestamp { path } => match self.query(session).get_timestamp(&path) {
                Ok(timestamp) => Response::Timestamp { timestamp },
                Err(err) => Response::from_error(err),
            },
            Command::QueryBoolean { path } => match self.query(session).get_boolean(&path) {
                Ok((timestamp, value)) => Response::Boolean { timestamp, value },
                Err(err) => Response::from_error(err),
            },
            Command::QueryNumeric { path } => match self.query(session).get_numeric(&path) {
                Ok((timestamp, value)) => Response::Numeric { timestamp, value },
                Err(err) => Response::from_error(err),
            },
            Command::QueryString { path, max_len } => {
                match self.query(session).get_string(&path, max_len) {
                    Ok((timestamp, value)) => Response::Text { timestamp, value },
                    Err(err) => Response::from_error(err),
                }
            }
            Command::QueryJson { path, max_len } => {
                match self.query(session).get_json(&path, max_len) {
                    Ok((timestamp, value)) => Response::Json { timestamp, value },
                    Err(err) => Response::from_error(err),
                }
            }

            Command::CreateObs { path } => {
                Response::status(self.admin().create_observation(&path))
            }
            Command::DeleteObs { path } => {
                Response::status(self.admin().delete_observation(&path))
            }
            Command::SetSource { path, source } => {
                Response::status(self.admin().set_source(&path, source.as_deref()))
            }
            Command::SetBufferMaxCount { path, max_count } => {
                Response::status(self.admin().set_buffer_max_count(&path, max_count))
            }
            Command::SetBufferMaxWindow { path, seconds } => {
                Response::status(self.admin().set_buffer_max_window(&path, seconds))
            }
            Command::SetMinPeriod { path, seconds } => {
                Response::status(self.admin().set_min_period(&path, seconds))
            }
            Command::SetChangeBy { path, amount } => {
                Response::status(self.admin().set_change_by(&path, amount))
            }
            Command::SetLowLimit { path, limit } => {
                Response::status(self.admin().set_low_limit(&path, limit_or_disabled(limit)))
            }
            Command::SetHighLimit { path, limit } => {
                Response::status(self.admin().set_high_limit(&path, limit_or_disabled(limit)))
            }
            Command::AdminEntryKind { path } => match self.admin().entry_kind(&path) {
                Ok(kind) => Response::Kind { kind },
                Err(err) => Response::from_error(err),
            },
            Command::PersistObs { path } => {
                Response::status(self.admin().persist_observation(&path))
            }
            Command::LoadObs { path } => match self.admin().load_observation(&path) {
                Ok(count) => Response::Loaded { count },
                Err(err) => Response::from_error(err),
            },
        }
    }
}
