#![forbid(unsafe_code)]

//! Suspend, resume or terminate a process and flip a file's write bits once
//! a consumer has reached a verdict.
//!
//! Unlike the interception path, every failure here is reported to the
//! caller.

use crate::Error;
use nix::{
    errno::Errno,
    sys::signal::{Signal, kill},
    unistd::Pid,
};
use procfs::process::Process;
use std::{fs, os::unix::fs::PermissionsExt, path::Path, sync::Arc};
use tracing::{info, warn};

/// The low-level primitive behind the quarantine commands.
pub trait ProcessControl: Send + Sync {
    fn suspend(&self, pid: u32) -> Result<(), Error>;
    fn resume(&self, pid: u32) -> Result<(), Error>;
    fn terminate(&self, pid: u32) -> Result<(), Error>;
}

/// Job control through signals: SIGSTOP, SIGCONT and SIGKILL.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalControl;

impl SignalControl {
    fn signal(pid: u32, signal: Signal) -> Result<(), Error> {
        kill(to_pid(pid)?, signal).map_err(|errno| match errno {
            Errno::EPERM => Error::QuarantinePrivilegeDenied { pid },
            Errno::ESRCH => Error::ProcessNotFound { pid },
            other => Error::Errno(other),
        })
    }

    /// Whether this process may signal at all. Signal 0 is delivered to no
    /// one and only checks existence and permission.
    fn probe() -> Result<(), Error> {
        kill(Pid::this(), None)?;
        Process::myself()?;
        Ok(())
    }
}

impl ProcessControl for SignalControl {
    fn suspend(&self, pid: u32) -> Result<(), Error> {
        Self::signal(pid, Signal::SIGSTOP)
    }

    fn resume(&self, pid: u32) -> Result<(), Error> {
        Self::signal(pid, Signal::SIGCONT)
    }

    fn terminate(&self, pid: u32) -> Result<(), Error> {
        Self::signal(pid, Signal::SIGKILL)
    }
}

/// Only positive `pid_t` values name a single process. Zero and anything
/// past `i32::MAX` would address a process group or every process.
fn to_pid(pid: u32) -> Result<Pid, Error> {
    i32::try_from(pid)
        .ok()
        .filter(|&raw| raw > 0)
        .map(Pid::from_raw)
        .ok_or(Error::ProcessNotFound { pid })
}

#[derive(Clone)]
pub struct QuarantineActor {
    control: Option<Arc<dyn ProcessControl>>,
    own_pid: u32,
}

impl QuarantineActor {
    /// Resolve the capability once. A disabled config or a failed probe
    /// leaves the actor unavailable for its whole lifetime.
    pub fn resolve(config: &config::Quarantine) -> Self {
        if !config.enabled {
            info!("quarantine disabled by configuration");
            return Self::unavailable();
        }
        match SignalControl::probe() {
            Ok(()) => Self::with_control(Arc::new(SignalControl)),
            Err(err) => {
                warn!(%err, "quarantine primitive unavailable");
                Self::unavailable()
            }
        }
    }

    pub fn with_control(control: Arc<dyn ProcessControl>) -> Self {
        Self {
            control: Some(control),
            own_pid: std::process::id(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            control: None,
            own_pid: std::process::id(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.control.is_some()
    }

    fn checked(&self, pid: u32) -> Result<&dyn ProcessControl, Error> {
        let control = self.control.as_deref().ok_or(Error::QuarantineUnavailable)?;
        if pid <= 1 || pid == self.own_pid {
            return Err(Error::ProtectedProcess { pid });
        }
        to_pid(pid)?;
        Ok(control)
    }

    pub fn suspend(&self, pid: u32) -> Result<(), Error> {
        self.checked(pid)?.suspend(pid)?;
        info!(pid, "process suspended");
        Ok(())
    }

    pub fn resume(&self, pid: u32) -> Result<(), Error> {
        self.checked(pid)?.resume(pid)?;
        info!(pid, "process resumed");
        Ok(())
    }

    pub fn terminate(&self, pid: u32) -> Result<(), Error> {
        self.checked(pid)?.terminate(pid)?;
        warn!(pid, "process terminated");
        Ok(())
    }

    /// True when the process is in the stopped state.
    pub fn is_suspended(&self, pid: u32) -> Result<bool, Error> {
        let process = Process::new(to_pid(pid)?.as_raw()).map_err(|_| Error::ProcessNotFound { pid })?;
        Ok(process.stat()?.state == 'T')
    }

    /// Clear every write bit of `path`, or give write access back to its
    /// owner.
    pub fn set_read_only(&self, path: &Path, read_only: bool) -> Result<(), Error> {
        let failed = |source| Error::PermissionUpdateFailed {
            path: path.to_path_buf(),
            source,
        };
        let mode = fs::metadata(path).map_err(failed)?.permissions().mode();
        // restoring only gives write back to the owner
        let mode = if read_only { mode & !0o222 } else { mode | 0o200 };
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(failed)?;
        info!(path = %path.display(), read_only, "file access updated");
        Ok(())
    }
}

impl std::fmt::Debug for QuarantineActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuarantineActor")
            .field("available", &self.is_available())
            .field("own_pid", &self.own_pid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(&'static str, u32)>>);

    impl ProcessControl for Recorder {
        fn suspend(&self, pid: u32) -> Result<(), Error> {
            self.0.lock().push(("suspend", pid));
            Ok(())
        }

        fn resume(&self, pid: u32) -> Result<(), Error> {
            self.0.lock().push(("resume", pid));
            Ok(())
        }

        fn terminate(&self, pid: u32) -> Result<(), Error> {
            Err(Error::QuarantinePrivilegeDenied { pid })
        }
    }

    #[test]
    fn unavailable_rejects_everything() {
        let actor = QuarantineActor::resolve(&config::Quarantine { enabled: false });
        assert!(!actor.is_available());
        assert!(matches!(actor.suspend(4242), Err(Error::QuarantineUnavailable)));
        assert!(matches!(actor.resume(4242), Err(Error::QuarantineUnavailable)));
        assert!(matches!(actor.terminate(4242), Err(Error::QuarantineUnavailable)));
    }

    #[test]
    fn protected_pids_are_refused() {
        let recorder = Arc::new(Recorder::default());
        let actor = QuarantineActor::with_control(recorder.clone());
        for pid in [0, 1, std::process::id()] {
            assert!(matches!(actor.suspend(pid), Err(Error::ProtectedProcess { .. })));
        }
        assert!(recorder.0.lock().is_empty());
    }

    #[test]
    fn out_of_range_pids_never_reach_the_control() {
        let recorder = Arc::new(Recorder::default());
        let actor = QuarantineActor::with_control(recorder.clone());
        for pid in [i32::MAX as u32 + 1, u32::MAX - 1, u32::MAX] {
            assert!(matches!(actor.suspend(pid), Err(Error::ProcessNotFound { .. })));
            assert!(matches!(actor.resume(pid), Err(Error::ProcessNotFound { .. })));
            assert!(matches!(actor.terminate(pid), Err(Error::ProcessNotFound { .. })));
            assert!(matches!(actor.is_suspended(pid), Err(Error::ProcessNotFound { .. })));
        }
        assert!(recorder.0.lock().is_empty());
    }

    #[test]
    fn signal_control_refuses_group_pids() {
        // -1 as u32 would be kill(-1, ..) and 0 the caller's own group
        for pid in [0, u32::MAX] {
            assert!(matches!(
                SignalControl.suspend(pid),
                Err(Error::ProcessNotFound { pid: p }) if p == pid
            ));
        }
    }

    #[test]
    fn commands_reach_the_control() {
        let recorder = Arc::new(Recorder::default());
        let actor = QuarantineActor::with_control(recorder.clone());
        actor.suspend(4242).unwrap();
        actor.resume(4242).unwrap();
        assert!(matches!(
            actor.terminate(4242),
            Err(Error::QuarantinePrivilegeDenied { pid: 4242 })
        ));
        assert_eq!(*recorder.0.lock(), vec![("suspend", 4242), ("resume", 4242)]);
    }

    #[test]
    fn read_only_round_trip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let actor = QuarantineActor::unavailable();

        actor.set_read_only(file.path(), true).unwrap();
        assert!(fs::metadata(file.path()).unwrap().permissions().readonly());
        actor.set_read_only(file.path(), false).unwrap();
        assert!(!fs::metadata(file.path()).unwrap().permissions().readonly());
    }

    #[test]
    fn missing_file_reports_path() {
        let actor = QuarantineActor::unavailable();
        let err = actor
            .set_read_only(Path::new("/nonexistent/sentinelguard"), true)
            .unwrap_err();
        assert!(matches!(err, Error::PermissionUpdateFailed { .. }));
    }
}
