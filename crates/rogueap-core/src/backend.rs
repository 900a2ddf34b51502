//! AP daemon backends and the handle the controller keeps while the AP runs.
//!
//! Both backends are external hostapd processes. The embedded one is the
//! rogue-enabled build driven with [`RuntimeOptions`]; the raw one is the plain
//! system binary launched against a config file. Either way the controller only
//! sees [`DaemonHandle::stop`].

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ApError, Backend, Result};
use crate::hostapd::{HostapdConfig, RuntimeOptions};
use crate::host::{DaemonProcess, HostOps, SpawnSpec};
use crate::settings::ControllerSettings;

const ROGUE_HINT: &str =
    "; pass --force-hostapd to use the hostapd installed on the system instead";

/// A launched hostapd plus the files it was started with.
struct Supervised {
    backend: Backend,
    process: Box<dyn DaemonProcess>,
    artifacts: Vec<PathBuf>,
}

impl Supervised {
    /// Locate, write config, spawn, then treat an early exit as a failed launch.
    fn launch(
        host: &dyn HostOps,
        settings: &ControllerSettings,
        backend: Backend,
        program: &str,
        config: &HostapdConfig,
        options: RuntimeOptions,
        hint: &'static str,
    ) -> Result<Self> {
        if host.locate(program).is_none() {
            return Err(ApError::MissingDependency {
                tool: program.to_string(),
                hint,
            });
        }

        let artifacts = config.write_files(&settings.hostapd_conf_path, &settings.deny_macs_path)?;

        let spec = SpawnSpec {
            program: program.to_string(),
            args: vec![settings.hostapd_conf_path.display().to_string()],
            quiet: options.mute,
            own_process_group: options.eloop_term_disable,
        };
        let mut process = match host.spawn(&spec) {
            Ok(process) => process,
            Err(e) => {
                remove_artifacts(&artifacts);
                return Err(spawn_error(backend, program, hint, e));
            }
        };

        tracing::info!(
            target: "rogueap::ap",
            "{} launched (pid {}), waiting {:?} for it to settle",
            backend,
            process.pid(),
            settings.daemon_startup_wait
        );
        host.sleep(settings.daemon_startup_wait);

        match process.try_wait() {
            Ok(None) => Ok(Self {
                backend,
                process,
                artifacts,
            }),
            Ok(Some(status)) => {
                remove_artifacts(&artifacts);
                Err(ApError::startup(
                    backend,
                    format!("exited during startup ({status})"),
                ))
            }
            Err(e) => {
                let _ = process.kill();
                remove_artifacts(&artifacts);
                Err(ApError::startup(backend, format!("cannot poll process: {e}")))
            }
        }
    }

    /// SIGTERM, give it `grace`, SIGKILL if still alive, then drop the artifacts.
    fn stop(mut self, host: &dyn HostOps, grace: Duration) -> Result<()> {
        self.process.terminate()?;
        host.sleep(grace);
        if self.process.try_wait()?.is_none() {
            tracing::warn!(
                target: "rogueap::ap",
                "{} ignored SIGTERM; killing pid {}",
                self.backend,
                self.process.pid()
            );
            self.process.kill()?;
        }
        remove_artifacts(&self.artifacts);
        tracing::info!(target: "rogueap::ap", "{} stopped", self.backend);
        Ok(())
    }
}

fn spawn_error(backend: Backend, program: &str, hint: &'static str, err: io::Error) -> ApError {
    if err.kind() == io::ErrorKind::NotFound {
        ApError::MissingDependency {
            tool: program.to_string(),
            hint,
        }
    } else {
        ApError::startup(backend, format!("spawn {program}: {err}"))
    }
}

fn remove_artifacts(paths: &[PathBuf]) {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

/// Rogue-enabled hostapd build (KARMA, WPS push-button) run under the controller.
pub struct RogueHostapd {
    inner: Supervised,
}

impl RogueHostapd {
    pub fn start(
        host: &dyn HostOps,
        settings: &ControllerSettings,
        config: &HostapdConfig,
        options: RuntimeOptions,
    ) -> Result<Self> {
        let inner = Supervised::launch(
            host,
            settings,
            Backend::RogueHostapd,
            &settings.roguehostapd_bin,
            config,
            options,
            ROGUE_HINT,
        )?;
        Ok(Self { inner })
    }

    pub fn stop(self, host: &dyn HostOps, grace: Duration) -> Result<()> {
        self.inner.stop(host, grace)
    }
}

/// Plain hostapd from the system, launched against the runtime config file.
pub struct SystemHostapd {
    inner: Supervised,
}

impl SystemHostapd {
    pub fn launch(
        host: &dyn HostOps,
        settings: &ControllerSettings,
        config: &HostapdConfig,
    ) -> Result<Self> {
        let options = RuntimeOptions {
            mute: true,
            ..Default::default()
        };
        let inner = Supervised::launch(
            host,
            settings,
            Backend::SystemHostapd,
            &settings.hostapd_bin,
            config,
            options,
            "",
        )?;
        Ok(Self { inner })
    }

    pub fn stop(self, host: &dyn HostOps, grace: Duration) -> Result<()> {
        self.inner.stop(host, grace)
    }
}

/// The running AP daemon, owned by the controller between `start` and `stop`.
pub enum DaemonHandle {
    Embedded(RogueHostapd),
    RawProcess(SystemHostapd),
}

impl DaemonHandle {
    pub fn backend(&self) -> Backend {
        match self {
            DaemonHandle::Embedded(_) => Backend::RogueHostapd,
            DaemonHandle::RawProcess(_) => Backend::SystemHostapd,
        }
    }

    pub fn pid(&self) -> u32 {
        match self {
            DaemonHandle::Embedded(h) => h.inner.process.pid(),
            DaemonHandle::RawProcess(h) => h.inner.process.pid(),
        }
    }

    /// Graceful stop; on error the caller falls back to killing by name.
    pub fn stop(self, host: &dyn HostOps, grace: Duration) -> Result<()> {
        match self {
            DaemonHandle::Embedded(h) => h.stop(host, grace),
            DaemonHandle::RawProcess(h) => h.stop(host, grace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccessPointConfig;
    use crate::testing::MockHostOps;
    use tempfile::TempDir;

    fn hostapd_config() -> HostapdConfig {
        let mut config = AccessPointConfig::new();
        config.set_essid("Free_WiFi");
        config.add_deny_macs(["00:11:22:33:44:55"]);
        HostapdConfig::compose(&config, "wlan0")
    }

    #[test]
    fn rogue_backend_runs_in_own_group_and_muted() {
        let temp_dir = TempDir::new().unwrap();
        let settings = ControllerSettings::rooted_at(temp_dir.path());
        let host = MockHostOps::new();

        let rogue = RogueHostapd::start(
            &host,
            &settings,
            &hostapd_config().with_rogue_flags(),
            RuntimeOptions::quiet(),
        )
        .unwrap();

        let spawned = host.spawned();
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].program, "roguehostapd");
        assert_eq!(
            spawned[0].args,
            vec![settings.hostapd_conf_path.display().to_string()]
        );
        assert!(spawned[0].quiet);
        assert!(spawned[0].own_process_group);
        assert!(settings.hostapd_conf_path.exists());
        assert!(settings.deny_macs_path.exists());

        rogue.stop(&host, Duration::ZERO).unwrap();
        assert!(!settings.hostapd_conf_path.exists());
        assert!(!settings.deny_macs_path.exists());
        assert_eq!(host.live_processes(), 0);
    }

    #[test]
    fn missing_rogue_build_hints_at_system_hostapd() {
        let temp_dir = TempDir::new().unwrap();
        let settings = ControllerSettings::rooted_at(temp_dir.path());
        let host = MockHostOps::new().without_tool("roguehostapd");

        let err = RogueHostapd::start(
            &host,
            &settings,
            &hostapd_config(),
            RuntimeOptions::quiet(),
        )
        .err()
        .unwrap();

        assert!(err.is_missing_dependency());
        assert!(err.to_string().contains("--force-hostapd"));
        assert!(host.spawned().is_empty());
        assert!(!settings.hostapd_conf_path.exists());
    }

    #[test]
    fn early_exit_is_a_startup_failure() {
        let temp_dir = TempDir::new().unwrap();
        let settings = ControllerSettings::rooted_at(temp_dir.path());
        let host = MockHostOps::new().crashing("hostapd");

        let err = SystemHostapd::launch(&host, &settings, &hostapd_config())
            .err()
            .unwrap();

        assert!(matches!(
            err,
            ApError::BackendStartup {
                backend: Backend::SystemHostapd,
                ..
            }
        ));
        assert!(!settings.hostapd_conf_path.exists());
    }

    #[test]
    fn stubborn_daemon_gets_sigkill() {
        let temp_dir = TempDir::new().unwrap();
        let settings = ControllerSettings::rooted_at(temp_dir.path());
        let host = MockHostOps::new().ignoring_sigterm("hostapd");

        let handle = DaemonHandle::RawProcess(
            SystemHostapd::launch(&host, &settings, &hostapd_config()).unwrap(),
        );
        assert_eq!(handle.backend(), Backend::SystemHostapd);
        handle.stop(&host, Duration::from_millis(5)).unwrap();

        let events = host.events();
        let term = events.iter().position(|e| e == "term hostapd").unwrap();
        let kill = events.iter().position(|e| e == "kill hostapd").unwrap();
        assert!(term < kill);
        assert_eq!(host.live_processes(), 0);
    }
}
