#![forbid(unsafe_code)]

use super::{
    SessionState, TelemetryEvent, TraceCallback, TraceFilter, TraceSession,
    is_shadow_copy_deletion,
};
use crate::Error;
use procfs::process::{Process, all_processes};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Reports process creation by diffing the procfs process table.
///
/// Procfs has no registry and the network table does not attribute
/// connections to their creation instant, so only process signals are
/// produced regardless of the registered filter.
#[derive(Default)]
pub struct ProcfsTraceSession {
    state: SessionState,
    filter: TraceFilter,
    callback: Option<TraceCallback>,
    known: HashSet<i32>,
    seeded: bool,
}

impl ProcfsTraceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the process table once and report processes that appeared since
    /// the previous scan. The first scan after `start` only records a
    /// baseline. Returns the number of events delivered.
    pub fn poll(&mut self) -> Result<usize, Error> {
        self.state.require(SessionState::Running)?;

        let mut current = HashSet::with_capacity(self.known.len());
        let mut events = Vec::new();
        for process in all_processes()? {
            // processes exiting mid-scan are expected
            let Ok(process) = process else { continue };
            current.insert(process.pid);
            if self.seeded && !self.known.contains(&process.pid) {
                events.extend(describe(&process));
            }
        }
        self.known = current;
        self.seeded = true;

        let Some(callback) = &self.callback else {
            return Ok(0);
        };
        if !self.filter.contains(TraceFilter::PROCESS) {
            return Ok(0);
        }
        let delivered = events.len();
        for event in events {
            trace!(?event, "telemetry event");
            callback(event);
        }
        Ok(delivered)
    }
}

fn describe(process: &Process) -> Vec<TelemetryEvent> {
    let Ok(pid) = u32::try_from(process.pid) else {
        return Vec::new();
    };
    let ppid = process
        .stat()
        .ok()
        .and_then(|stat| u32::try_from(stat.ppid).ok())
        .unwrap_or_default();
    let image = process.exe().unwrap_or_default();
    let cmdline = process
        .cmdline()
        .map(|args| args.join(" "))
        .unwrap_or_default();

    let mut events = Vec::with_capacity(2);
    if is_shadow_copy_deletion(&cmdline) {
        events.push(TelemetryEvent::ShadowCopyDelete {
            pid,
            image: image.clone(),
            cmdline: cmdline.clone(),
        });
    }
    events.push(TelemetryEvent::ProcessCreate {
        pid,
        ppid,
        image,
        cmdline,
    });
    events
}

impl TraceSession for ProcfsTraceSession {
    fn register(&mut self, filter: TraceFilter, callback: TraceCallback) -> Result<(), Error> {
        self.state.require(SessionState::Idle)?;
        if filter.intersects(TraceFilter::REGISTRY | TraceFilter::NETWORK) {
            debug!(?filter, "procfs trace session only reports process signals");
        }
        self.filter = filter;
        self.callback = Some(callback);
        self.state = SessionState::Registered;
        Ok(())
    }

    fn start(&mut self) -> Result<(), Error> {
        self.state.require(SessionState::Registered)?;
        self.known.clear();
        self.seeded = false;
        self.state = SessionState::Running;
        Ok(())
    }

    fn stop(&mut self) {
        self.callback = None;
        self.known.clear();
        self.state = SessionState::Stopped;
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::{process::Command, sync::Arc};

    #[test]
    fn poll_requires_running_session() {
        let mut session = ProcfsTraceSession::new();
        assert!(matches!(session.poll(), Err(Error::TraceSessionState { .. })));
    }

    #[test]
    fn reports_new_child_process() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut session = ProcfsTraceSession::new();
        session
            .register(TraceFilter::PROCESS, Arc::new(move |event| sink.lock().push(event)))
            .unwrap();
        session.start().unwrap();

        assert_eq!(session.poll().unwrap(), 0);

        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        let child_pid = child.id();
        session.poll().unwrap();
        child.kill().unwrap();
        child.wait().unwrap();

        let seen = seen.lock();
        assert!(seen.iter().any(|event| matches!(
            event,
            TelemetryEvent::ProcessCreate { pid, ppid, .. }
                if *pid == child_pid && *ppid == std::process::id()
        )));
    }

    #[test]
    fn stopped_session_rejects_poll() {
        let mut session = ProcfsTraceSession::new();
        session.register(TraceFilter::PROCESS, Arc::new(|_| {})).unwrap();
        session.start().unwrap();
        session.stop();
        assert!(session.poll().is_err());
    }
}
