use crate::signals::SignalEvent;
use flume::{RecvError, SendError};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to install signal handler: {0}")]
    SignalHandler(#[source] io::Error),

    #[error("Failed to send signal event: {0}")]
    SendSignal(#[from] SendError<SignalEvent>),

    #[error("Signal listener stopped: {0}")]
    RecvSignal(#[from] RecvError),

    #[error("Failed to connect to {path}: {source}")]
    Connect {
        path: std::path::PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Interceptor(#[from] interceptor::Error),

    #[error(transparent)]
    Config(#[from] config::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
