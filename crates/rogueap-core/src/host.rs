//! Host-side effects: launching daemons, running tools, signalling processes.
//!
//! This is the only module allowed to build `std::process::Command`s. Everything
//! else goes through [`HostOps`] so the lifecycle can run against a recording
//! double in tests.

use std::env;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::process::{self, ProcessError};

/// Captured result of a short-lived tool invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// How to launch a long-running daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Send stdout/stderr to /dev/null
    pub quiet: bool,
    /// Put the daemon in its own process group so terminal signals skip it
    pub own_process_group: bool,
}

impl SpawnSpec {
    pub fn daemon<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            quiet: true,
            own_process_group: false,
        }
    }

    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// A launched daemon owned by the controller.
pub trait DaemonProcess: Send {
    fn pid(&self) -> u32;
    /// Exit status if the process has already exited (reaps it).
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;
    /// Ask the process to exit (SIGTERM).
    fn terminate(&mut self) -> io::Result<()>;
    /// Kill the process (SIGKILL) and reap it.
    fn kill(&mut self) -> io::Result<()>;
}

pub trait HostOps: Send + Sync {
    /// Resolve a binary name or path to an executable file.
    fn locate(&self, program: &str) -> Option<PathBuf>;
    /// Launch a detached daemon.
    fn spawn(&self, spec: &SpawnSpec) -> io::Result<Box<dyn DaemonProcess>>;
    /// Run a tool to completion and capture its output.
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput>;
    /// SIGKILL every process whose name is `name`. Returns how many were signalled.
    fn kill_by_name(&self, name: &str) -> Result<usize, ProcessError>;
    fn sleep(&self, duration: Duration);
}

/// [`HostOps`] backed by the real system.
pub struct RealHostOps;

impl HostOps for RealHostOps {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        if program.contains('/') {
            let path = PathBuf::from(program);
            return is_executable(&path).then_some(path);
        }
        let paths = env::var_os("PATH")?;
        env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    }

    fn spawn(&self, spec: &SpawnSpec) -> io::Result<Box<dyn DaemonProcess>> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).stdin(Stdio::null());
        if spec.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        if spec.own_process_group {
            cmd.process_group(0);
        }
        let child = cmd.spawn()?;
        tracing::debug!("Spawned {} (pid {})", spec.command_line(), child.id());
        Ok(Box::new(ChildProcess { child }))
    }

    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn kill_by_name(&self, name: &str) -> Result<usize, ProcessError> {
        process::pkill_exact_force(name)
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

struct ChildProcess {
    child: Child,
}

impl DaemonProcess for ChildProcess {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    fn terminate(&mut self) -> io::Result<()> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        let pid = i32::try_from(self.child.id())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "PID does not fit in i32"))?;
        signal::kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
    }

    fn kill(&mut self) -> io::Result<()> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        self.child.kill()?;
        self.child.wait().map(|_| ())
    }
}

/// Process name to match for a configured binary (`/usr/sbin/hostapd` -> `hostapd`).
pub fn process_name(program: &str) -> &str {
    Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program)
}
