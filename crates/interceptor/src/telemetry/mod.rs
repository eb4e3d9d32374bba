#![forbid(unsafe_code)]

//! Secondary signals: process creation, registry and network activity.
//!
//! A session is registered with a filter and a callback, started, delivers
//! events through the callback, and is finally stopped. The core never
//! depends on a session producing anything.

mod inert;
mod proc_scan;

pub use inert::InertTraceSession;
pub use proc_scan::ProcfsTraceSession;

use crate::Error;
use bitflags::bitflags;
use config::TraceKind;
use std::{fmt, net::SocketAddr, path::PathBuf, sync::Arc};

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
    pub struct TraceFilter: u8 {
        const PROCESS = 0b001;
        const REGISTRY = 0b010;
        const NETWORK = 0b100;
    }
}

impl From<&[TraceKind]> for TraceFilter {
    fn from(kinds: &[TraceKind]) -> Self {
        kinds.iter().fold(Self::empty(), |filter, kind| {
            filter
                | match kind {
                    TraceKind::Process => Self::PROCESS,
                    TraceKind::Registry => Self::REGISTRY,
                    TraceKind::Network => Self::NETWORK,
                }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    ProcessCreate {
        pid: u32,
        ppid: u32,
        image: PathBuf,
        cmdline: String,
    },
    RegistryChange {
        pid: u32,
        key: String,
    },
    NetworkConnect {
        pid: u32,
        remote: SocketAddr,
    },
    ShadowCopyDelete {
        pid: u32,
        image: PathBuf,
        cmdline: String,
    },
}

pub type TraceCallback = Arc<dyn Fn(TelemetryEvent) + Send + Sync>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Registered,
    Running,
    Stopped,
}

impl SessionState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Registered => "registered",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }

    pub(crate) fn require(self, expected: SessionState) -> Result<(), Error> {
        if self == expected {
            Ok(())
        } else {
            Err(Error::TraceSessionState {
                expected: expected.name(),
                actual: self.name(),
            })
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub trait TraceSession: Send {
    fn register(&mut self, filter: TraceFilter, callback: TraceCallback) -> Result<(), Error>;

    fn start(&mut self) -> Result<(), Error>;

    /// Idempotent; a stopped session delivers nothing further.
    fn stop(&mut self);

    fn state(&self) -> SessionState;
}

/// Command lines that wipe volume shadow copies.
pub fn is_shadow_copy_deletion(cmdline: &str) -> bool {
    let cmdline = cmdline.to_lowercase();
    let has = |needle: &str| cmdline.contains(needle);

    (has("vssadmin") && has("delete") && has("shadows"))
        || (has("wmic") && has("shadowcopy") && has("delete"))
        || has("remove-volumeshadowcopy")
}
