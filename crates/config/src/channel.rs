#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::{path::PathBuf, time::Duration};

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Channel {
    /// Filesystem name of the consumer socket.
    pub socket_path: PathBuf,

    /// Upper bound for a single record hand-off, in milliseconds.
    #[serde_as(as = "serde_with::DurationMilliSeconds")]
    pub send_timeout: Duration,

    /// Queue depth of in-process endpoints.
    pub queue_capacity: usize,

    /// Uids allowed to connect as the consumer. Empty accepts anyone.
    pub allowed_uids: Vec<u32>,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/run/sentinelguard/events.sock"),
            send_timeout: Duration::from_millis(50),
            queue_capacity: 1024,
            allowed_uids: Vec::new(),
        }
    }
}
