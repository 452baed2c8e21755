//! The hub main event loop.
//!
//! The daemon is single-threaded for state mutation: every tree change,
//! push-pipeline stage, and handler dispatch runs on the thread that owns
//! the `Hub`. Transports and background threads talk to it through an mpsc
//! channel via a clonable [`DaemonHandle`]; each event is processed to
//! completion before the next one starts, which is what makes pipeline
//! invocations atomic with respect to every other observer.
//!
//! # Main loop tick
//!
//! 1. Drain the channel and execute each pending event in arrival order
//! 2. Report whether a shutdown was requested
//!
//! The transport boundary delivers client calls as discrete [`HubEvent`]s;
//! replies travel back over the per-request channel the transport
//! provided.

use std::sync::mpsc;

use crate::command::{Command, Response};
use crate::hub::Hub;
use crate::session::SessionHandle;

/// Events that can be sent to the daemon's main loop.
#[derive(Debug)]
pub enum HubEvent {
    /// A client command arriving from the transport. The response is sent
    /// back on `reply` when present; a kill decision travels through the
    /// `ClientControl` collaborator instead, never through `reply`.
    Request {
        session: SessionHandle,
        command: Command,
        reply: Option<mpsc::Sender<Response>>,
    },
    /// A transport session opened; resolve and cache its identity.
    SessionOpened { session: SessionHandle },
    /// A transport session ended; drop its binding (the subtree stays).
    SessionClosed { session: SessionHandle },
    /// A status message for logging only; no state mutation.
    Log { level: log::Level, message: String },
    /// Request a graceful shutdown.
    Shutdown,
}

/// Handle for sending events to a running daemon. Clonable and Send; the
/// hub itself never leaves the daemon thread.
#[derive(Clone)]
pub struct DaemonHandle {
    sender: mpsc::Sender<HubEvent>,
}

impl DaemonHandle {
    /// Submit a client command. The response arrives on `reply` if given.
    pub fn request(
        &self,
        session: SessionHandle,
        command: Command,
        reply: Option<mpsc::Sender<Response>>,
    ) -> Result<(), String> {
        self.sender
            .send(HubEvent::Request {
                session,
                command,
                reply,
            })
            .map_err(|e| format!("channel send failed: {}", e))
    }

    pub fn session_opened(&self, session: SessionHandle) -> Result<(), String> {
        self.sender
            .send(HubEvent::SessionOpened { session })
            .map_err(|e| format!("channel send failed: {}", e))
    }

    pub fn session_closed(&self, session: SessionHandle) -> Result<(), String> {
        self.sender
            .send(HubEvent::SessionClosed { session })
            .map_err(|e| format!("channel send failed: {}", e))
    }

    pub fn log(&self, level: log::Level, message: &str) -> Result<(), String> {
        self.sender
            .send(HubEvent::Log {
                level,
                message: message.to_string(),
            })
            .map_err(|e| format!("channel send failed: {}", e))
    }

    pub fn shutdown(&self) -> Result<(), String> {
        self.sender
            .send(HubEvent::Shutdown)
            .map_err(|e| format!("channel send failed: {}", e))
    }
}

/// The daemon: owns the hub and the event loop.
pub struct Daemon {
    hub: Hub,
    receiver: mpsc::Receiver<HubEvent>,
    handle: DaemonHandle,
}

impl Daemon {
    /// Wrap a hub in an event loop.
    pub fn new(hub: Hub) -> Daemon {
        let (sender, receiver) = mpsc::channel();
        Daemon {
            hub,
            receiver,
            handle: DaemonHandle { sender },
        }
    }

    /// Get a handle for sending events to this daemon.
    pub fn handle(&self) -> DaemonHandle {
        self.handle.clone()
    }

    /// Run the main event loop. Blocks until shutdown is requested or
    /// every handle is dropped.
    pub fn run(&mut self) {
        loop {
            match self.receiver.recv() {
                Ok(event) => {
                    if self.process(event) {
                        break;
                    }
                }
                Err(_) => {
                    log::info!("hub daemon: all handles dropped, shutting down");
                    break;
                }
            }
        }
    }

    /// Drain and process everything currently queued without blocking.
    /// Returns true if a shutdown was requested.
    pub fn tick(&mut self) -> bool {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.process(event) {
                        return true;
                    }
                }
                Err(mpsc::TryRecvError::Empty) => return false,
                Err(mpsc::TryRecvError::Disconnected) => {
                    log::info!("hub daemon: channel disconnected, shutting down");
                    return true;
                }
            }
        }
    }

    /// Handle one event to completion. Returns true on shutdown.
    fn process(&mut self, event: HubEvent) -> bool {
        match event {
            HubEvent::Request {
                session,
                command,
                reply,
            } => {
                let response = self.hub.execute(session, command);
                if let Some(reply) = reply {
                    // A dead reply channel means the client went away
                    // between request and response; nothing to do.
                    let _ = reply.send(response);
                }
                false
            }
            HubEvent::SessionOpened { session } => {
                // Identity failure already killed the session; the error
                // needs no further handling here.
                let _ = self.hub.open_session(session);
                false
            }
            HubEvent::SessionClosed { session } => {
                self.hub.close_session(session);
                false
            }
            HubEvent::Log { level, message } => {
                log::log!(level, "{}", message);
                false
            }
            HubEvent::Shutdown => true,
        }
    }

    /// Borrow the hub for inspection (testing).
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Mutable hub access for in-process embedders that drive the loop
    /// themselves.
    pub fn hub_mut(&mut self) -> &mut Hub {
        &mut self.hub
    }
}
