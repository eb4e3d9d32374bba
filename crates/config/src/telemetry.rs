#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    Process,
    Registry,
    Network,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Telemetry {
    pub enabled: bool,

    /// Interval between process table polls, in seconds.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub poll_interval: Duration,

    pub filter: Vec<TraceKind>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval: Duration::from_secs(1),
            filter: vec![TraceKind::Process, TraceKind::Registry, TraceKind::Network],
        }
    }
}
