#![forbid(unsafe_code)]

use super::Transport;
use crate::{Error, event::EventRecord};
use parking_lot::Mutex;
use std::{
    io::{ErrorKind, Read, Write},
    net::Shutdown,
    os::unix::net::UnixStream,
    time::Duration,
};
use tracing::trace;

/// Smallest write timeout; the socket API rejects a zero timeout.
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Endpoint backed by a connected Unix stream socket.
///
/// Records go out back to back with no framing, so a record that was only
/// partly written leaves the stream unusable: every socket failure is
/// reported as fatal and the channel drops the endpoint.
#[derive(Debug)]
pub struct SocketEndpoint {
    writer: Mutex<UnixStream>,
    control: UnixStream,
    timeout: Duration,
}

impl SocketEndpoint {
    pub fn new(stream: UnixStream, timeout: Duration) -> Result<Self, Error> {
        let timeout = timeout.max(MIN_TIMEOUT);
        stream.set_nonblocking(false)?;
        stream.set_write_timeout(Some(timeout))?;
        let control = stream.try_clone()?;
        Ok(Self {
            writer: Mutex::new(stream),
            control,
            timeout,
        })
    }

    /// A second handle on the socket, used to notice the consumer hanging up.
    pub fn hangup_handle(&self) -> Result<UnixStream, Error> {
        Ok(self.control.try_clone()?)
    }
}

impl Transport for SocketEndpoint {
    fn deliver(&self, record: &EventRecord) -> Result<(), Error> {
        // another interception thread is mid-write; waiting longer than the
        // send budget is not allowed
        let Some(mut writer) = self.writer.try_lock_for(self.timeout) else {
            return Err(Error::SendTimedOut);
        };
        writer
            .write_all(&record.encode())
            .map_err(|err| Error::TransportFailure(err.to_string()))
    }

    fn shutdown(&self) {
        if let Err(err) = self.control.shutdown(Shutdown::Both) {
            trace!(%err, "socket already closed");
        }
    }
}

/// Block until the peer closes its end. Anything the consumer sends is
/// discarded.
pub(crate) fn wait_for_hangup(mut stream: UnixStream) {
    let mut scratch = [0u8; 256];
    loop {
        match stream.read(&mut scratch) {
            Ok(0) => return,
            Ok(_) => continue,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(_) => return,
        }
    }
}
