//! dnsmasq configuration for the AP network.
//!
//! Two DNS modes exist. Captive mode answers every name with the gateway so
//! clients land on the local web server. Relay mode forwards queries to a public
//! resolver when internet sharing is active.

use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use crate::error::{ApError, Result};

/// How dnsmasq answers DNS queries from clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsMode {
    /// Resolve every domain to the gateway address
    Captive { gateway: Ipv4Addr },
    /// Forward to an upstream resolver
    Relay { upstream: String },
}

#[derive(Debug, Clone)]
pub struct DnsmasqConfig {
    pub interface: String,
    pub dhcp_range: String,
    pub dns: DnsMode,
}

impl DnsmasqConfig {
    pub fn render(&self) -> String {
        let mut conf = format!(
            "no-resolv\ninterface={}\ndhcp-range={}\n",
            self.interface, self.dhcp_range
        );
        match &self.dns {
            DnsMode::Relay { upstream } => conf.push_str(&format!("server={upstream}\n")),
            DnsMode::Captive { gateway } => conf.push_str(&format!("address=/#/{gateway}\n")),
        }
        conf
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(|source| ApError::ArtifactWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dns: DnsMode) -> DnsmasqConfig {
        DnsmasqConfig {
            interface: "wlan0".to_string(),
            dhcp_range: "10.0.0.2,10.0.0.100,12h".to_string(),
            dns,
        }
    }

    #[test]
    fn captive_mode_routes_all_names_to_gateway() {
        let rendered = config(DnsMode::Captive {
            gateway: Ipv4Addr::new(10, 0, 0, 1),
        })
        .render();

        assert_eq!(
            rendered,
            "no-resolv\ninterface=wlan0\ndhcp-range=10.0.0.2,10.0.0.100,12h\naddress=/#/10.0.0.1\n"
        );
        assert!(!rendered.contains("server="));
    }

    #[test]
    fn relay_mode_forwards_to_public_dns() {
        let rendered = config(DnsMode::Relay {
            upstream: "8.8.8.8".to_string(),
        })
        .render();

        assert!(rendered.contains("server=8.8.8.8\n"));
        assert!(!rendered.contains("address=/#/"));
    }

    #[test]
    fn write_to_reports_path_on_failure() {
        let path = Path::new("/nonexistent-rogueap-dir/dhcpd.conf");
        let err = config(DnsMode::Relay {
            upstream: "8.8.8.8".to_string(),
        })
        .write_to(path)
        .unwrap_err();

        match err {
            ApError::ArtifactWrite { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
