#![forbid(unsafe_code)]

use crate::{Error, text::ProcessPath};
use procfs::process::Process;
use std::path::PathBuf;
use tracing::trace;

/// Looks up live processes by id.
pub trait ProcessTable: Send + Sync {
    /// Image path of a live process. Racy by nature: the process may exit
    /// between interception and lookup.
    fn image_path(&self, pid: u32) -> Result<PathBuf, Error>;
}

/// Reads `/proc/<pid>/exe`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcfsProcessTable;

impl ProcessTable for ProcfsProcessTable {
    fn image_path(&self, pid: u32) -> Result<PathBuf, Error> {
        let lookup_failed = || Error::ProcessLookupFailed { pid };
        let pid = i32::try_from(pid).map_err(|_| lookup_failed())?;
        // the handle pins the /proc entry only for the duration of this call
        let process = Process::new(pid).map_err(|_| lookup_failed())?;
        let exe = process.exe().map_err(|err| {
            trace!(pid, %err, "image path unreadable");
            lookup_failed()
        })?;
        Ok(exe)
    }
}

/// Bounded image path of `pid`.
pub fn resolve_process_path(table: &dyn ProcessTable, pid: u32) -> Result<ProcessPath, Error> {
    let path = table.image_path(pid)?;
    Ok(ProcessPath::from_path_truncated(&path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::PROCESS_PATH_CAPACITY;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    struct Fixed(PathBuf);

    impl ProcessTable for Fixed {
        fn image_path(&self, _pid: u32) -> Result<PathBuf, Error> {
            Ok(self.0.clone())
        }
    }

    struct Empty;

    impl ProcessTable for Empty {
        fn image_path(&self, pid: u32) -> Result<PathBuf, Error> {
            Err(Error::ProcessLookupFailed { pid })
        }
    }

    #[test]
    fn resolves_own_image() {
        let pid = std::process::id();
        let path = resolve_process_path(&ProcfsProcessTable, pid).unwrap();
        assert!(!path.is_empty());
    }

    #[test]
    fn dead_pid_is_lookup_failure() {
        // pid_max never reaches i32::MAX
        let err = resolve_process_path(&ProcfsProcessTable, i32::MAX as u32).unwrap_err();
        assert!(matches!(err, Error::ProcessLookupFailed { pid } if pid == i32::MAX as u32));
        assert!(err.is_resolution_failure());
    }

    #[test]
    fn out_of_range_pid_is_lookup_failure() {
        let err = resolve_process_path(&ProcfsProcessTable, u32::MAX).unwrap_err();
        assert!(err.is_resolution_failure());
    }

    #[test]
    fn long_image_path_is_truncated() {
        let long = PathBuf::from(format!("/{}", "x".repeat(2000)));
        let path = resolve_process_path(&Fixed(long), 1).unwrap();
        assert_eq!(path.len(), PROCESS_PATH_CAPACITY - 1);
        assert_eq!(path.raw()[PROCESS_PATH_CAPACITY - 1], 0);
    }

    proptest! {
        #[test]
        fn missing_process_degrades_to_empty(pid in any::<u32>()) {
            let path = resolve_process_path(&Empty, pid).unwrap_or_default();
            prop_assert!(path.is_empty());
            prop_assert!(path.raw().iter().all(|&unit| unit == 0));
        }
    }
}
