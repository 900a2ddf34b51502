//! `pgrep`/`pkill` by exact name, done in-process over `/proc`.

use std::fs;
use std::io;
use std::path::Path;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use thiserror::Error;

/// `/proc/[pid]/comm` holds at most 15 bytes of the executable name.
const COMM_LEN: usize = 15;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to read /proc: {0}")]
    ProcRead(String),

    #[error("Invalid process name: {0}")]
    InvalidName(String),

    #[error("Failed to signal PID {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ProcessError>;

/// A running process matched by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: i32,
    pub comm: String,
}

/// Read-only view of `/proc`.
pub struct ProcessTable {
    root: &'static Path,
}

impl ProcessTable {
    pub fn system() -> Self {
        Self {
            root: Path::new("/proc"),
        }
    }

    /// Every process whose `comm` equals `name` (after kernel truncation).
    pub fn by_name(&self, name: &str) -> Result<Vec<ProcessInfo>> {
        if name.is_empty() || name.contains('/') {
            return Err(ProcessError::InvalidName(name.to_string()));
        }
        let wanted: String = name.chars().take(COMM_LEN).collect();

        let entries = fs::read_dir(self.root)
            .map_err(|e| ProcessError::ProcRead(format!("{}: {}", self.root.display(), e)))?;

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<i32>().ok()) else {
                continue;
            };
            // processes exit while we walk; skip the ones that vanished
            let Some(info) = self.read(pid) else {
                continue;
            };
            if info.comm == wanted {
                found.push(info);
            }
        }
        Ok(found)
    }

    /// Send `sig` to every process called `name`. Returns how many were signalled.
    pub fn signal_all(&self, name: &str, sig: Signal) -> Result<usize> {
        let mut signalled = 0;
        for info in self.by_name(name)? {
            match signal_pid(info.pid, sig) {
                Ok(()) => {
                    tracing::debug!("Sent {} to {} (pid {})", sig, info.comm, info.pid);
                    signalled += 1;
                }
                Err(e) => tracing::debug!("{}", e),
            }
        }
        Ok(signalled)
    }

    fn read(&self, pid: i32) -> Option<ProcessInfo> {
        let comm_path = self.root.join(pid.to_string()).join("comm");
        let comm = fs::read_to_string(comm_path).ok()?.trim_end().to_string();
        Some(ProcessInfo { pid, comm })
    }
}

pub fn signal_pid(pid: i32, sig: Signal) -> Result<()> {
    signal::kill(Pid::from_raw(pid), sig).map_err(|source| ProcessError::Signal { pid, source })
}

/// `pkill -9 -x <name>`.
pub fn pkill_exact_force(name: &str) -> Result<usize> {
    ProcessTable::system().signal_all(name, Signal::SIGKILL)
}

/// `pgrep -x <name>`.
pub fn running(name: &str) -> Result<Vec<ProcessInfo>> {
    ProcessTable::system().by_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_path_names() {
        assert!(matches!(running(""), Err(ProcessError::InvalidName(_))));
        assert!(matches!(
            running("/usr/sbin/hostapd"),
            Err(ProcessError::InvalidName(_))
        ));
    }

    #[test]
    fn finds_current_process() {
        let me = std::process::id() as i32;
        let table = ProcessTable::system();
        let own = table.read(me).unwrap();
        assert!(!own.comm.is_empty());
        assert!(own.comm.len() <= COMM_LEN);

        let found = table.by_name(&own.comm).unwrap();
        assert!(found.iter().any(|p| p.pid == me));
    }

    #[test]
    fn absent_name_signals_nothing() {
        assert_eq!(pkill_exact_force("rogueap-no-such-daemon").unwrap(), 0);
    }

    #[test]
    fn signalling_a_dead_pid_reports_errno() {
        // above pid_max
        let err = signal_pid(i32::MAX, Signal::SIGTERM).unwrap_err();
        assert!(matches!(err, ProcessError::Signal { pid, .. } if pid == i32::MAX));
    }
}
