use std::path::PathBuf;

/// Represents all possible errors that can occur in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The process id no longer refers to a live process.
    #[error("Process lookup failed for pid {pid}")]
    ProcessLookupFailed { pid: u32 },

    /// The in-flight operation carries no usable name.
    #[error("File name unavailable")]
    NameUnavailable,

    /// No consumer is connected; the record was dropped.
    #[error("Channel disconnected")]
    ChannelDisconnected,

    /// The hand-off did not complete within the send timeout.
    #[error("Send timed out")]
    SendTimedOut,

    /// The consumer side failed; the record was dropped.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// A peer tried to connect without being allowed to.
    #[error("Connection from uid {uid} rejected")]
    ConnectionRejected { uid: u32 },

    /// A wire record had an unexpected length.
    #[error("Malformed record: expected {expected} bytes, got {actual}")]
    MalformedRecord { expected: usize, actual: usize },

    /// A wire record carried an unknown kind tag.
    #[error("Unknown event kind tag: {0}")]
    UnknownEventKind(u32),

    /// The quarantine capability was not resolved at startup.
    #[error("Quarantine unavailable")]
    QuarantineUnavailable,

    /// The operating system refused to act on the process.
    #[error("Quarantine denied for pid {pid}")]
    QuarantinePrivilegeDenied { pid: u32 },

    #[error("No such process: {pid}")]
    ProcessNotFound { pid: u32 },

    /// Pid 0, init and the agent itself are never quarantined.
    #[error("Refusing to act on protected pid {pid}")]
    ProtectedProcess { pid: u32 },

    #[error("Failed to update permissions of {path}: {source}")]
    PermissionUpdateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A trace session method was called out of order.
    #[error("Trace session is {actual}, expected {expected}")]
    TraceSessionState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Error occurred while reading data from procfs.
    #[error("Failed to read procfs info: {0}")]
    ProcfsReadFailed(#[from] procfs::ProcError),

    /// Error returned by a system call.
    #[error("System call failed: {0}")]
    Errno(#[from] nix::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Resolution failures degrade a field; they never abort event construction.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, Self::ProcessLookupFailed { .. } | Self::NameUnavailable)
    }

    /// Failures after which the endpoint can no longer be trusted.
    pub fn is_fatal_transport(&self) -> bool {
        matches!(self, Self::TransportFailure(_))
    }
}
