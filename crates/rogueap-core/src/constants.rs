//! Fixed network and filesystem contract values.

use std::net::Ipv4Addr;
use std::time::Duration;

/// Gateway address assigned to the AP interface.
pub const NETWORK_GW_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const NETWORK_MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);
/// dnsmasq lease range: first, last, lease time.
pub const DHCP_LEASE: &str = "10.0.0.2,10.0.0.100,12h";
/// Upstream resolver relayed to clients in internet-sharing mode.
pub const PUBLIC_DNS: &str = "8.8.8.8";
pub const AP_MTU: u32 = 1400;

pub const DHCP_CONF_PATH: &str = "/tmp/dhcpd.conf";
pub const DHCP_LEASE_PATH: &str = "/var/lib/misc/dnsmasq.leases";
pub const HOSTAPD_RUNTIME_CONF_PATH: &str = "/tmp/hostapd.conf";
pub const HOSTAPD_DENY_MACS_PATH: &str = "/tmp/hostapd.deny";

pub const DNSMASQ_BIN: &str = "dnsmasq";
pub const HOSTAPD_BIN: &str = "hostapd";
pub const ROGUEHOSTAPD_BIN: &str = "roguehostapd";
pub const IP_BIN: &str = "ip";

/// Lets the kernel apply the new address before it is checked
/// (avoids "SIOCADDRT: Network is unreachable").
pub const INTERFACE_SETTLE: Duration = Duration::from_secs(1);
/// A daemon that is still alive after this long is considered up.
pub const DAEMON_STARTUP_WAIT: Duration = Duration::from_secs(2);
/// Time for SIGTERM handlers of the daemons to finish during teardown.
pub const TEARDOWN_WAIT: Duration = Duration::from_secs(2);
