#![forbid(unsafe_code)]

//! Single-consumer, best-effort delivery of event records.
//!
//! The channel holds at most one endpoint. Connecting replaces whatever was
//! there; disconnecting empties the slot. A send takes a snapshot of the
//! slot and either hands the record to that endpoint within a bounded time
//! or fails. Nothing is queued or retried here: a dropped record is gone,
//! and gap detection is the consumer's business.

mod in_process;
mod server;
mod socket;

pub use in_process::InProcessEndpoint;
pub use server::{ChannelServer, ConnectPolicy};
pub use socket::SocketEndpoint;

use crate::{Error, event::EventRecord};
use parking_lot::RwLock;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::{info, trace, warn};

/// Something that can carry a record to the consumer.
pub trait Transport: Send + Sync {
    /// Hand the record over. Must return within the endpoint's timeout.
    fn deliver(&self, record: &EventRecord) -> Result<(), Error>;

    /// Called once the endpoint leaves the channel.
    fn shutdown(&self) {}
}

/// Identifies one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionCookie(u64);

impl ConnectionCookie {
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unconnected,
    Connected(ConnectionCookie),
}

struct Connection {
    cookie: ConnectionCookie,
    transport: Arc<dyn Transport>,
}

#[derive(Default)]
pub struct DeliveryChannel {
    slot: RwLock<Option<Connection>>,
    next_cookie: AtomicU64,
}

impl DeliveryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `transport` as the consumer, superseding any previous one.
    pub fn connect(&self, transport: Arc<dyn Transport>) -> ConnectionCookie {
        let cookie = ConnectionCookie(self.next_cookie.fetch_add(1, Ordering::Relaxed) + 1);
        let previous = self.slot.write().replace(Connection { cookie, transport });

        match previous {
            Some(previous) => {
                warn!(%cookie, superseded = %previous.cookie, "consumer superseded");
                previous.transport.shutdown();
            }
            None => info!(%cookie, "consumer connected"),
        }
        cookie
    }

    /// Drop the current consumer, whoever it is.
    pub fn disconnect(&self) -> bool {
        let previous = self.slot.write().take();
        match previous {
            Some(previous) => {
                info!(cookie = %previous.cookie, "consumer disconnected");
                previous.transport.shutdown();
                true
            }
            None => false,
        }
    }

    /// Drop the consumer only if it is still `cookie`.
    pub fn release(&self, cookie: ConnectionCookie) -> bool {
        let released = {
            let mut slot = self.slot.write();
            if slot.as_ref().is_some_and(|current| current.cookie == cookie) {
                slot.take()
            } else {
                None
            }
        };

        match released {
            Some(connection) => {
                info!(%cookie, "consumer released");
                connection.transport.shutdown();
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> ChannelState {
        match self.slot.read().as_ref() {
            Some(connection) => ChannelState::Connected(connection.cookie),
            None => ChannelState::Unconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Try to deliver `record` once. Never blocks beyond the endpoint's
    /// timeout and never retries.
    ///
    /// The slot stays read-locked for the whole hand-off, so `connect`,
    /// `disconnect` and `release` wait for in-flight deliveries and no record
    /// reaches an endpoint after it has left the channel.
    pub fn send(&self, record: EventRecord) -> Result<(), Error> {
        let (cookie, outcome) = {
            let slot = self.slot.read();
            let Some(connection) = slot.as_ref() else {
                trace!(kind = %record.kind(), "no consumer, record dropped");
                return Err(Error::ChannelDisconnected);
            };
            (connection.cookie, connection.transport.deliver(&record))
        };

        outcome.inspect_err(|err| {
            if err.is_fatal_transport() {
                warn!(%cookie, %err, "consumer transport failed");
                self.release(cookie);
            }
        })
    }
}

impl fmt::Debug for DeliveryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryChannel")
            .field("state", &self.state())
            .finish()
    }
}
