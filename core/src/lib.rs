//! On-device data hub: a per-node pub/sub broker for typed, timestamped
//! samples.
//!
//! Sensor-side components push samples into Inputs, actuator-side
//! components consume Outputs, and administratively created Observations
//! derive filtered, buffered streams from either. Everything hangs off a
//! path-addressed resource tree (`/app/<client-id>/...` for client
//! resources, `/obs/...` for observations); the whole engine runs on one
//! execution context, so a push pipeline invocation is atomic with respect
//! to every other observer.
//!
//! # Modules
//!
//! - [`sample`] — immutable, refcounted data samples and JSON projection
//! - [`tree`] — the arena-indexed resource tree, roles, and promotion
//! - [`resource`] — per-resource state, the push pipeline, buffers, filters
//! - [`io`] — the producer/consumer facade (session-relative paths)
//! - [`query`] — the read-side facade (absolute paths, aggregates)
//! - [`admin`] — observation lifecycle, source binding, configuration
//! - [`hub`] — the aggregate runtime and session bindings
//! - [`command`] — the typed wire commands and [`Hub::execute`] dispatch
//! - [`daemon`] — the single-threaded event loop and its handle
//! - [`infrastructure`] — collaborator traits (clock, identity, control,
//!   persistence) and their test doubles

pub mod admin;
pub mod command;
pub mod config;
pub mod daemon;
pub mod error;
pub mod hub;
pub mod infrastructure;
pub mod io;
pub mod query;
pub mod resource;
pub mod sample;
pub mod session;
pub mod tree;

pub use command::{Command, Response};
pub use config::HubConfig;
pub use daemon::{Daemon, DaemonHandle, HubEvent};
pub use error::{HubError, HubResult};
pub use hub::Hub;
pub use sample::{DataType, Sample, SampleRef};
pub use session::SessionHandle;
pub use tree::{EntryId, EntryKind};
