#![forbid(unsafe_code)]

use super::{SessionState, TraceCallback, TraceFilter, TraceSession};
use crate::Error;
use tracing::debug;

/// Walks the session lifecycle without ever producing events.
#[derive(Default)]
pub struct InertTraceSession {
    state: SessionState,
    filter: TraceFilter,
    callback: Option<TraceCallback>,
}

impl InertTraceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> TraceFilter {
        self.filter
    }
}

impl TraceSession for InertTraceSession {
    fn register(&mut self, filter: TraceFilter, callback: TraceCallback) -> Result<(), Error> {
        self.state.require(SessionState::Idle)?;
        self.filter = filter;
        self.callback = Some(callback);
        self.state = SessionState::Registered;
        Ok(())
    }

    fn start(&mut self) -> Result<(), Error> {
        self.state.require(SessionState::Registered)?;
        debug!(filter = ?self.filter, "inert trace session started");
        self.state = SessionState::Running;
        Ok(())
    }

    fn stop(&mut self) {
        self.callback = None;
        self.state = SessionState::Stopped;
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn lifecycle_runs_in_order() {
        let mut session = InertTraceSession::new();
        assert!(session.start().is_err());

        session.register(TraceFilter::all(), Arc::new(|_| {})).unwrap();
        assert_eq!(session.state(), SessionState::Registered);
        assert!(session.register(TraceFilter::all(), Arc::new(|_| {})).is_err());

        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Running);

        session.stop();
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.start().is_err());
    }
}
