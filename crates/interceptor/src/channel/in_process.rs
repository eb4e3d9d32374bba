#![forbid(unsafe_code)]

use super::Transport;
use crate::{Error, event::EventRecord};
use flume::{Receiver, SendTimeoutError, Sender};
use std::time::Duration;

/// Endpoint for a consumer living in the same process.
#[derive(Debug, Clone)]
pub struct InProcessEndpoint {
    tx: Sender<EventRecord>,
    timeout: Duration,
}

impl InProcessEndpoint {
    /// A bounded queue of `capacity` records; a full queue waits at most
    /// `timeout` before the record is dropped.
    pub fn pair(capacity: usize, timeout: Duration) -> (Self, Receiver<EventRecord>) {
        let (tx, rx) = flume::bounded(capacity.max(1));
        (Self { tx, timeout }, rx)
    }

    /// Sized by `queue_capacity` and bounded by `send_timeout`.
    pub fn from_config(config: &config::Channel) -> (Self, Receiver<EventRecord>) {
        Self::pair(config.queue_capacity, config.send_timeout)
    }
}

impl Transport for InProcessEndpoint {
    fn deliver(&self, record: &EventRecord) -> Result<(), Error> {
        self.tx
            .send_timeout(record.clone(), self.timeout)
            .map_err(|err| match err {
                SendTimeoutError::Timeout(_) => Error::SendTimedOut,
                SendTimeoutError::Disconnected(_) => {
                    Error::TransportFailure("consumer receiver dropped".into())
                }
            })
    }
}
