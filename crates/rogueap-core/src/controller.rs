//! Rogue access point controller.
//!
//! Owns the caller's [`AccessPointConfig`], launches the AP daemon and dnsmasq,
//! addresses the AP interface and tears everything down again.
//!
//! ## Lifecycle
//! 1. Set fields (`set_interface`, `set_essid`, `add_deny_macs`, ...)
//! 2. `start()` brings up hostapd, then dnsmasq and the interface address
//! 3. `stop()` kills both daemons and removes every generated file
//!
//! `stop()` is the unconditional teardown path: it never fails and is safe to
//! call before, after or instead of `start()`.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::backend::{DaemonHandle, RogueHostapd, SystemHostapd};
use crate::config::AccessPointConfig;
use crate::dnsmasq::{DnsMode, DnsmasqConfig};
use crate::error::{ApError, Backend, Result};
use crate::host::{process_name, DaemonProcess, HostOps, RealHostOps, SpawnSpec};
use crate::hostapd::{HostapdConfig, RuntimeOptions};
use crate::iface::{InterfaceCheck, InterfaceTool};
use crate::settings::ControllerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApState {
    Unconfigured,
    Configured,
    Running,
    Stopped,
}

/// What `start` brought up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub backend: Backend,
    pub pid: u32,
    pub interface: InterfaceCheck,
}

impl StartOutcome {
    /// Turn a missing gateway address into an error for callers that must abort.
    pub fn require_interface_ready(self) -> Result<Self> {
        self.interface.clone().into_result()?;
        Ok(self)
    }
}

/// Teardown steps that failed. Informational only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub failures: Vec<CleanupFailure>,
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupFailure {
    pub step: String,
    pub error: String,
}

impl CleanupReport {
    fn record(&mut self, step: impl Into<String>, error: impl fmt::Display) {
        let step = step.into();
        let error = error.to_string();
        tracing::warn!("Cleanup step '{}' failed: {}", step, error);
        self.failures.push(CleanupFailure { step, error });
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct AccessPoint {
    config: AccessPointConfig,
    settings: ControllerSettings,
    host: Arc<dyn HostOps>,
    daemon_handle: Option<DaemonHandle>,
    dhcp_process: Option<Box<dyn DaemonProcess>>,
    state: ApState,
}

impl AccessPoint {
    /// Controller for the real system, configured from the environment.
    pub fn new() -> Self {
        Self::with_host(ControllerSettings::from_env(), Arc::new(RealHostOps))
    }

    pub fn with_host(settings: ControllerSettings, host: Arc<dyn HostOps>) -> Self {
        Self {
            config: AccessPointConfig::default(),
            settings,
            host,
            daemon_handle: None,
            dhcp_process: None,
            state: ApState::Unconfigured,
        }
    }

    pub fn config(&self) -> &AccessPointConfig {
        &self.config
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn state(&self) -> ApState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.daemon_handle.is_some()
    }

    fn touch(&mut self) {
        if self.state == ApState::Unconfigured {
            self.state = ApState::Configured;
        }
    }

    pub fn set_interface(&mut self, interface: impl Into<String>) {
        self.config.set_interface(interface);
        self.touch();
    }

    pub fn set_internet_interface(&mut self, interface: impl Into<String>) {
        self.config.set_internet_interface(interface);
        self.touch();
    }

    pub fn set_channel(&mut self, channel: u8) {
        self.config.set_channel(channel);
        self.touch();
    }

    pub fn set_essid(&mut self, essid: impl Into<String>) {
        self.config.set_essid(essid);
        self.touch();
    }

    pub fn set_psk(&mut self, psk: impl Into<String>) {
        self.config.set_psk(psk);
        self.touch();
    }

    pub fn enable_system_hostapd(&mut self) {
        self.config.enable_system_hostapd();
        self.touch();
    }

    pub fn add_deny_macs<I, S>(&mut self, macs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.add_deny_macs(macs);
        self.touch();
    }

    fn interface(&self) -> Result<String> {
        self.config.interface.clone().ok_or(ApError::InterfaceNotSet)
    }

    /// The hostapd record `start` would hand to the selected backend.
    pub fn compose_hostapd(&self) -> Result<HostapdConfig> {
        let interface = self.interface()?;
        let composed = HostapdConfig::compose(&self.config, &interface);
        composed.validate()?;
        if self.config.force_system_daemon {
            Ok(composed)
        } else {
            Ok(composed.with_rogue_flags())
        }
    }

    /// The dnsmasq config `start_dhcp_dns` would write.
    pub fn compose_dnsmasq(&self) -> Result<DnsmasqConfig> {
        let dns = if self.config.shares_internet() {
            DnsMode::Relay {
                upstream: self.settings.public_dns.clone(),
            }
        } else {
            DnsMode::Captive {
                gateway: self.settings.gateway,
            }
        };
        Ok(DnsmasqConfig {
            interface: self.interface()?,
            dhcp_range: self.settings.dhcp_range.clone(),
            dns,
        })
    }

    /// Write the dnsmasq config, launch dnsmasq and address the AP interface.
    ///
    /// A missing dnsmasq is fatal. A gateway address that does not show up on the
    /// interface is reported through [`InterfaceCheck`] and left to the caller.
    pub fn start_dhcp_dns(&mut self) -> Result<InterfaceCheck> {
        let interface = self.interface()?;
        let settings = &self.settings;
        let dnsmasq = self.compose_dnsmasq()?;

        dnsmasq.write_to(&settings.dhcp_conf_path)?;
        tracing::debug!(
            target: "rogueap::dhcp",
            "Wrote {} ({:?})",
            settings.dhcp_conf_path.display(),
            dnsmasq.dns
        );

        if self.host.locate(&settings.dnsmasq_bin).is_none() {
            return Err(ApError::missing(&settings.dnsmasq_bin));
        }
        let conf = settings.dhcp_conf_path.display().to_string();
        let spec = SpawnSpec::daemon(&settings.dnsmasq_bin, ["-C", conf.as_str()]);
        let process = self.host.spawn(&spec).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ApError::missing(&settings.dnsmasq_bin)
            } else {
                ApError::startup(Backend::Dnsmasq, format!("spawn: {e}"))
            }
        })?;
        tracing::info!(target: "rogueap::dhcp", "dnsmasq launched (pid {})", process.pid());
        if let Some(mut previous) = self.dhcp_process.replace(process) {
            let _ = previous.try_wait();
        }

        let settings = &self.settings;
        let tool = InterfaceTool::new(self.host.as_ref(), &settings.ip_bin);
        tool.set_mtu(&interface, settings.mtu)?;
        tool.bring_up_with_address(&interface, settings.gateway, settings.prefix_len())?;

        self.host.sleep(settings.interface_settle);

        let check = tool.check_address(&interface, settings.gateway)?;
        match &check {
            InterfaceCheck::Ready => tracing::info!(
                target: "rogueap::dhcp",
                "{} is up with {}/{}",
                interface,
                settings.gateway,
                settings.prefix_len()
            ),
            InterfaceCheck::AddressMissing { expected, .. } => tracing::warn!(
                target: "rogueap::dhcp",
                "{} does not carry {} after configuration",
                interface,
                expected
            ),
        }
        Ok(check)
    }

    /// Start the AP daemon, then DHCP/DNS.
    ///
    /// Any failure leaves nothing running: a DHCP/DNS failure after the AP daemon
    /// came up triggers a full `stop()` before the error is returned.
    pub fn start(&mut self) -> Result<StartOutcome> {
        if self.daemon_handle.is_some() {
            return Err(ApError::AlreadyRunning);
        }
        let interface = self.interface()?;
        let hostapd = self.compose_hostapd()?;

        tracing::info!(
            target: "rogueap::ap",
            "Starting AP: interface={}, ssid={}, channel={:?}, security={}, denied={}",
            interface,
            hostapd.ssid,
            hostapd.channel,
            if hostapd.is_open() { "open" } else { "wpa2-psk" },
            hostapd.deny_macs.len()
        );

        let handle = if self.config.force_system_daemon {
            DaemonHandle::RawProcess(SystemHostapd::launch(
                self.host.as_ref(),
                &self.settings,
                &hostapd,
            )?)
        } else {
            DaemonHandle::Embedded(RogueHostapd::start(
                self.host.as_ref(),
                &self.settings,
                &hostapd,
                RuntimeOptions::quiet(),
            )?)
        };
        let backend = handle.backend();
        let pid = handle.pid();
        self.daemon_handle = Some(handle);
        self.state = ApState::Running;

        match self.start_dhcp_dns() {
            Ok(interface) => Ok(StartOutcome {
                backend,
                pid,
                interface,
            }),
            Err(err) => {
                tracing::error!("DHCP/DNS startup failed, tearing down AP: {}", err);
                self.stop();
                Err(err)
            }
        }
    }

    /// Tear everything down. Each step runs even if an earlier one failed.
    pub fn stop(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();
        let settings = self.settings.clone();
        let host = Arc::clone(&self.host);

        let dnsmasq = process_name(&settings.dnsmasq_bin);
        match host.kill_by_name(dnsmasq) {
            Ok(n) => tracing::debug!(target: "rogueap::dhcp", "Killed {} {} process(es)", n, dnsmasq),
            Err(e) => report.record(format!("kill {dnsmasq}"), e),
        }
        if let Some(mut process) = self.dhcp_process.take() {
            // reap our own child; dnsmasq forks into the background anyway
            let _ = process.try_wait();
        }

        let stopped = match self.daemon_handle.take() {
            Some(handle) => {
                let backend = handle.backend();
                match handle.stop(host.as_ref(), settings.teardown_wait) {
                    Ok(()) => true,
                    Err(e) => {
                        report.record(format!("stop {backend}"), e);
                        false
                    }
                }
            }
            None => false,
        };

        if !stopped {
            for bin in [&settings.hostapd_bin, &settings.roguehostapd_bin] {
                let name = process_name(bin);
                if let Err(e) = host.kill_by_name(name) {
                    report.record(format!("kill {name}"), e);
                }
            }
            remove_if_present(&settings.hostapd_conf_path, &mut report);
            remove_if_present(&settings.deny_macs_path, &mut report);
        }

        remove_if_present(&settings.lease_path, &mut report);
        remove_if_present(&settings.dhcp_conf_path, &mut report);

        host.sleep(settings.teardown_wait);

        if self.state != ApState::Unconfigured {
            self.state = ApState::Stopped;
        }
        if report.is_clean() {
            tracing::info!("Access point cleanup complete");
        }
        report
    }

    /// Alias for [`stop`](Self::stop).
    pub fn cleanup(&mut self) -> CleanupReport {
        self.stop()
    }
}

impl Default for AccessPoint {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_if_present(path: &Path, report: &mut CleanupReport) {
    match fs::remove_file(path) {
        Ok(()) => report.removed.push(path.display().to_string()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => report.record(format!("remove {}", path.display()), e),
    }
}
