//! Recording [`HostOps`] double.
//!
//! Nothing touches the system: tools are "installed" unless removed with
//! [`MockHostOps::without_tool`], `ip` keeps per-interface addresses in memory,
//! and every call is appended to an event log for ordering assertions.

use std::collections::{HashMap, HashSet};
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::host::{process_name, CommandOutput, DaemonProcess, HostOps, SpawnSpec};
use crate::process::ProcessError;

#[derive(Default)]
struct MockState {
    missing: HashSet<String>,
    crashing: HashSet<String>,
    ignores_sigterm: HashSet<String>,
    failing_stop: HashSet<String>,
    drop_addresses: bool,
    addresses: HashMap<String, Vec<String>>,
    live: Vec<(u32, String)>,
    commands: Vec<String>,
    spawned: Vec<SpawnSpec>,
    killed: Vec<String>,
    sleeps: Vec<Duration>,
    events: Vec<String>,
    next_pid: u32,
}

#[derive(Clone, Default)]
pub struct MockHostOps {
    state: Arc<Mutex<MockState>>,
}

impl MockHostOps {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Pretend `tool` is not installed.
    pub fn without_tool(self, tool: &str) -> Self {
        self.lock().missing.insert(tool.to_string());
        self
    }

    /// Processes of `program` exit right after launch.
    pub fn crashing(self, program: &str) -> Self {
        self.lock().crashing.insert(program.to_string());
        self
    }

    /// Processes of `program` survive SIGTERM and need SIGKILL.
    pub fn ignoring_sigterm(self, program: &str) -> Self {
        self.lock().ignores_sigterm.insert(program.to_string());
        self
    }

    /// Signalling processes of `program` fails, so a graceful stop errors out.
    pub fn failing_stop(self, program: &str) -> Self {
        self.lock().failing_stop.insert(program.to_string());
        self
    }

    /// `ip addr add` reports success but the address never shows up.
    pub fn dropping_addresses(self) -> Self {
        self.lock().drop_addresses = true;
        self
    }

    /// Tool invocations made through `run`, as command lines.
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub fn spawned(&self) -> Vec<SpawnSpec> {
        self.lock().spawned.clone()
    }

    pub fn spawned_programs(&self) -> Vec<String> {
        self.lock()
            .spawned
            .iter()
            .map(|s| s.program.clone())
            .collect()
    }

    /// Names passed to `kill_by_name`, in order.
    pub fn killed(&self) -> Vec<String> {
        self.lock().killed.clone()
    }

    /// Durations passed to `sleep`, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    /// Everything that happened, in order.
    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    /// Number of launched processes that have not exited.
    pub fn live_processes(&self) -> usize {
        self.lock().live.len()
    }

    fn is_missing(&self, program: &str) -> bool {
        let state = self.lock();
        state.missing.contains(program) || state.missing.contains(process_name(program))
    }
}

impl HostOps for MockHostOps {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        if self.is_missing(program) {
            None
        } else {
            Some(PathBuf::from("/usr/sbin").join(process_name(program)))
        }
    }

    fn spawn(&self, spec: &SpawnSpec) -> io::Result<Box<dyn DaemonProcess>> {
        if self.is_missing(&spec.program) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: not found", spec.program),
            ));
        }
        let mut state = self.lock();
        state.next_pid += 1;
        let pid = 1000 + state.next_pid;
        let name = process_name(&spec.program).to_string();
        let exited = state.crashing.contains(&name);
        let ignores_sigterm = state.ignores_sigterm.contains(&name);
        let fails_stop = state.failing_stop.contains(&name);
        if !exited {
            state.live.push((pid, name.clone()));
        }
        state.spawned.push(spec.clone());
        state.events.push(format!("spawn {}", spec.command_line()));
        Ok(Box::new(MockProcess {
            pid,
            name,
            exited,
            ignores_sigterm,
            fails_stop,
            state: Arc::clone(&self.state),
        }))
    }

    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        if self.is_missing(program) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{program}: not found"),
            ));
        }
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        let mut state = self.lock();
        state.commands.push(line.clone());
        state.events.push(format!("run {line}"));

        let mut output = CommandOutput {
            success: true,
            ..Default::default()
        };
        if process_name(program) == "ip" {
            match args {
                ["addr", "add", cidr, "dev", iface] => {
                    if !state.drop_addresses {
                        state
                            .addresses
                            .entry(iface.to_string())
                            .or_default()
                            .push(cidr.to_string());
                    }
                }
                ["-4", "addr", "show", "dev", iface] => {
                    if let Some(cidrs) = state.addresses.get(*iface) {
                        for cidr in cidrs {
                            output
                                .stdout
                                .push_str(&format!("    inet {cidr} scope global {iface}\n"));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(output)
    }

    fn kill_by_name(&self, name: &str) -> Result<usize, ProcessError> {
        let mut state = self.lock();
        state.killed.push(name.to_string());
        state.events.push(format!("pkill {name}"));
        let before = state.live.len();
        state.live.retain(|(_, n)| n != name);
        Ok(before - state.live.len())
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.sleeps.push(duration);
        state.events.push(format!("sleep {}ms", duration.as_millis()));
    }
}

struct MockProcess {
    pid: u32,
    name: String,
    exited: bool,
    ignores_sigterm: bool,
    fails_stop: bool,
    state: Arc<Mutex<MockState>>,
}

impl MockProcess {
    fn record(&self, event: String) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.events.push(event);
    }

    fn mark_exited(&mut self) {
        self.exited = true;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.live.retain(|(pid, _)| *pid != self.pid);
    }

    fn is_live(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.live.iter().any(|(pid, _)| *pid == self.pid)
    }
}

impl DaemonProcess for MockProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        // pkill through the mock also ends the process
        if self.exited || !self.is_live() {
            self.exited = true;
            Ok(Some(ExitStatus::from_raw(1 << 8)))
        } else {
            Ok(None)
        }
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.record(format!("term {}", self.name));
        if self.fails_stop {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot signal {} (pid {})", self.name, self.pid),
            ));
        }
        if !self.ignores_sigterm {
            self.mark_exited();
        }
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.record(format!("kill {}", self.name));
        self.mark_exited();
        Ok(())
    }
}
