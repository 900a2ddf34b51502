//! Controller settings: binaries, artifact paths, addressing and delays.
//!
//! Defaults come from [`crate::constants`]; `ROGUEAP_*` environment variables
//! override them.

use std::env;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use ipnet::Ipv4Net;

use crate::constants::*;

/// Binaries, artifact paths, addressing and settle delays used by the controller.
///
/// Defaults are the fixed contract values; `from_env` allows overriding them for
/// packaging and tests.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub dnsmasq_bin: String,
    pub hostapd_bin: String,
    pub roguehostapd_bin: String,
    pub ip_bin: String,
    pub dhcp_conf_path: PathBuf,
    pub lease_path: PathBuf,
    pub hostapd_conf_path: PathBuf,
    pub deny_macs_path: PathBuf,
    pub gateway: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub dhcp_range: String,
    pub public_dns: String,
    pub mtu: u32,
    pub interface_settle: Duration,
    pub daemon_startup_wait: Duration,
    pub teardown_wait: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            dnsmasq_bin: DNSMASQ_BIN.to_string(),
            hostapd_bin: HOSTAPD_BIN.to_string(),
            roguehostapd_bin: ROGUEHOSTAPD_BIN.to_string(),
            ip_bin: IP_BIN.to_string(),
            dhcp_conf_path: PathBuf::from(DHCP_CONF_PATH),
            lease_path: PathBuf::from(DHCP_LEASE_PATH),
            hostapd_conf_path: PathBuf::from(HOSTAPD_RUNTIME_CONF_PATH),
            deny_macs_path: PathBuf::from(HOSTAPD_DENY_MACS_PATH),
            gateway: NETWORK_GW_IP,
            netmask: NETWORK_MASK,
            dhcp_range: DHCP_LEASE.to_string(),
            public_dns: PUBLIC_DNS.to_string(),
            mtu: AP_MTU,
            interface_settle: INTERFACE_SETTLE,
            daemon_startup_wait: DAEMON_STARTUP_WAIT,
            teardown_wait: TEARDOWN_WAIT,
        }
    }
}

impl ControllerSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let network = resolve_network(
            env::var("ROGUEAP_GATEWAY").ok(),
            env::var("ROGUEAP_NETMASK").ok(),
            env::var("ROGUEAP_DHCP_RANGE").ok(),
        );
        Self {
            dnsmasq_bin: env::var("ROGUEAP_DNSMASQ_BIN").unwrap_or(defaults.dnsmasq_bin),
            hostapd_bin: env::var("ROGUEAP_HOSTAPD_BIN").unwrap_or(defaults.hostapd_bin),
            roguehostapd_bin: env::var("ROGUEAP_ROGUEHOSTAPD_BIN")
                .unwrap_or(defaults.roguehostapd_bin),
            ip_bin: env::var("ROGUEAP_IP_BIN").unwrap_or(defaults.ip_bin),
            dhcp_conf_path: env_path("ROGUEAP_DHCP_CONF").unwrap_or(defaults.dhcp_conf_path),
            lease_path: env_path("ROGUEAP_LEASE_FILE").unwrap_or(defaults.lease_path),
            hostapd_conf_path: env_path("ROGUEAP_HOSTAPD_CONF")
                .unwrap_or(defaults.hostapd_conf_path),
            deny_macs_path: env_path("ROGUEAP_DENY_FILE").unwrap_or(defaults.deny_macs_path),
            gateway: network.gateway,
            netmask: network.netmask,
            dhcp_range: network.dhcp_range,
            public_dns: env::var("ROGUEAP_PUBLIC_DNS").unwrap_or(defaults.public_dns),
            mtu: defaults.mtu,
            interface_settle: env_millis("ROGUEAP_SETTLE_MS").unwrap_or(defaults.interface_settle),
            daemon_startup_wait: env_millis("ROGUEAP_DAEMON_WAIT_MS")
                .unwrap_or(defaults.daemon_startup_wait),
            teardown_wait: env_millis("ROGUEAP_TEARDOWN_MS").unwrap_or(defaults.teardown_wait),
        }
    }

    /// Gateway prefix length derived from the netmask.
    pub fn prefix_len(&self) -> u8 {
        ipnet::ipv4_mask_to_prefix(self.netmask).unwrap_or(24)
    }

    /// Settings with every artifact placed under `dir` and no settle delays.
    pub fn rooted_at(dir: &std::path::Path) -> Self {
        Self {
            dhcp_conf_path: dir.join("dhcpd.conf"),
            lease_path: dir.join("dnsmasq.leases"),
            hostapd_conf_path: dir.join("hostapd.conf"),
            deny_macs_path: dir.join("hostapd.deny"),
            interface_settle: Duration::ZERO,
            daemon_startup_wait: Duration::ZERO,
            teardown_wait: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Network {
    gateway: Ipv4Addr,
    netmask: Ipv4Addr,
    dhcp_range: String,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            gateway: NETWORK_GW_IP,
            netmask: NETWORK_MASK,
            dhcp_range: DHCP_LEASE.to_string(),
        }
    }
}

/// Gateway, netmask and DHCP range are overridden together: the lease range
/// must sit inside the gateway's subnet, otherwise all three keep their defaults.
fn resolve_network(
    gateway: Option<String>,
    netmask: Option<String>,
    dhcp_range: Option<String>,
) -> Network {
    let defaults = Network::default();
    if gateway.is_none() && netmask.is_none() && dhcp_range.is_none() {
        return defaults;
    }

    let candidate = Network {
        gateway: gateway
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.gateway),
        netmask: netmask
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.netmask),
        dhcp_range: dhcp_range
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| defaults.dhcp_range.clone()),
    };
    match range_in_subnet(&candidate) {
        Ok(()) => candidate,
        Err(reason) => {
            tracing::warn!(
                "Ignoring network overrides ({}); using {}/{} with range {}",
                reason,
                defaults.gateway,
                defaults.netmask,
                defaults.dhcp_range
            );
            defaults
        }
    }
}

fn range_in_subnet(network: &Network) -> Result<(), String> {
    let prefix = ipnet::ipv4_mask_to_prefix(network.netmask)
        .map_err(|_| format!("{} is not a netmask", network.netmask))?;
    let subnet = Ipv4Net::new(network.gateway, prefix)
        .map_err(|e| e.to_string())?
        .trunc();

    let mut bounds = network.dhcp_range.split(',').take(2);
    for _ in 0..2 {
        let addr: Ipv4Addr = bounds
            .next()
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| format!("malformed DHCP range '{}'", network.dhcp_range))?;
        if !subnet.contains(&addr) {
            return Err(format!("{addr} is outside {subnet}"));
        }
    }
    Ok(())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_paths() {
        let settings = ControllerSettings::default();
        assert_eq!(settings.dhcp_conf_path, PathBuf::from("/tmp/dhcpd.conf"));
        assert_eq!(
            settings.lease_path,
            PathBuf::from("/var/lib/misc/dnsmasq.leases")
        );
        assert_eq!(settings.gateway.to_string(), "10.0.0.1");
        assert_eq!(settings.netmask.to_string(), "255.255.255.0");
        assert_eq!(settings.prefix_len(), 24);
        assert_eq!(settings.mtu, 1400);
    }

    #[test]
    fn no_overrides_keep_default_network() {
        assert_eq!(resolve_network(None, None, None), Network::default());
    }

    #[test]
    fn consistent_overrides_are_taken_together() {
        let network = resolve_network(
            Some("192.168.50.1".to_string()),
            Some("255.255.255.0".to_string()),
            Some("192.168.50.10,192.168.50.90,1h".to_string()),
        );
        assert_eq!(network.gateway, Ipv4Addr::new(192, 168, 50, 1));
        assert_eq!(network.dhcp_range, "192.168.50.10,192.168.50.90,1h");
    }

    #[test]
    fn moved_gateway_without_matching_range_is_ignored() {
        // default range 10.0.0.x does not fit 192.168.50.0/24
        let network = resolve_network(Some("192.168.50.1".to_string()), None, None);
        assert_eq!(network, Network::default());
    }

    #[test]
    fn range_outside_narrowed_mask_is_ignored() {
        let network = resolve_network(None, Some("255.255.255.192".to_string()), None);
        assert_eq!(network, Network::default());

        let network = resolve_network(None, Some("255.255.255.128".to_string()), None);
        assert_eq!(network.netmask, Ipv4Addr::new(255, 255, 255, 128));
    }

    #[test]
    fn malformed_range_or_mask_falls_back() {
        let network = resolve_network(None, None, Some("10.0.0.2-10.0.0.9".to_string()));
        assert_eq!(network, Network::default());

        let network = resolve_network(None, Some("255.0.255.0".to_string()), None);
        assert_eq!(network, Network::default());
    }

    #[test]
    fn rooted_settings_keep_binaries_and_drop_delays() {
        let dir = std::path::Path::new("/var/empty/rogueap");
        let settings = ControllerSettings::rooted_at(dir);
        assert_eq!(settings.dhcp_conf_path, dir.join("dhcpd.conf"));
        assert_eq!(settings.dnsmasq_bin, "dnsmasq");
        assert_eq!(settings.teardown_wait, Duration::ZERO);
    }
}
