//! Tracing targets that get their own log file.

/// AP daemon lifecycle (hostapd / roguehostapd).
pub const T_AP: &str = "rogueap::ap";
/// DHCP/DNS daemon and interface addressing.
pub const T_DHCP: &str = "rogueap::dhcp";
