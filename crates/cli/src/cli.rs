use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::path::{Path, PathBuf};

/// SentinelGuard: file activity interception for ransomware detection
///
/// SentinelGuard classifies file operations, enriches them with process and
/// entropy information and streams fixed-size event records to a single
/// local consumer, which may answer with quarantine commands.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, value_parser = validate_file)]
    pub conffile: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the interceptor and accept a consumer on the event socket.
    Serve {
        /// Override the configured socket path.
        #[arg(short, long)]
        socket: Option<PathBuf>,
    },

    /// Connect to a running interceptor and print every event record.
    Consume {
        /// Override the configured socket path.
        #[arg(short, long)]
        socket: Option<PathBuf>,

        /// Stop after this many records.
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Stop a process in place.
    Suspend {
        #[arg(value_parser = validate_pid)]
        pid: u32,
    },

    /// Let a suspended process continue.
    Resume {
        #[arg(value_parser = validate_pid)]
        pid: u32,
    },

    /// Terminate a process.
    Kill {
        #[arg(value_parser = validate_pid)]
        pid: u32,
    },

    /// Print the effective configuration as TOML.
    PrintConfig,
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.is_file() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}

/// Validate a process id
#[inline(always)]
fn validate_pid(pid: &str) -> Result<u32, String> {
    let pid: u32 = pid
        .parse()
        .map_err(|_| format!("`{pid}` is not a valid process id"))?;
    if pid == 0 || i32::try_from(pid).is_err() {
        Err(format!("Process id must be between 1 and {}", i32::MAX))
    } else {
        Ok(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_quarantine_commands() {
        let cli = Cli::try_parse_from(["sentinelguard", "suspend", "4321"]).unwrap();
        assert_eq!(cli.command, Command::Suspend { pid: 4321 });

        let cli = Cli::try_parse_from(["sentinelguard", "-vv", "kill", "17"]).unwrap();
        assert_eq!(cli.command, Command::Kill { pid: 17 });
    }

    #[test]
    fn rejects_missing_conffile() {
        let err = Cli::try_parse_from([
            "sentinelguard",
            "--conffile",
            "/nonexistent/sentinelguard.toml",
            "print-config",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_group_addressing_pids() {
        assert!(Cli::try_parse_from(["sentinelguard", "kill", "4294967295"]).is_err());
        assert!(Cli::try_parse_from(["sentinelguard", "suspend", "0"]).is_err());
    }

    #[test]
    fn consume_takes_count() {
        let cli = Cli::try_parse_from(["sentinelguard", "consume", "-n", "3"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Consume {
                socket: None,
                count: Some(3)
            }
        );
    }

    proptest! {
        #[test]
        fn pid_in_range_is_valid(pid in 1u32..=i32::MAX as u32) {
            prop_assert_eq!(validate_pid(&pid.to_string()), Ok(pid));
        }

        #[test]
        fn pid_past_i32_max_is_rejected(pid in i32::MAX as u32 + 1..=u32::MAX) {
            prop_assert!(validate_pid(&pid.to_string()).is_err());
        }

        #[test]
        fn garbage_pid_is_rejected(pid in "[a-z-]{1,8}") {
            prop_assert!(validate_pid(&pid).is_err());
        }
    }
}
