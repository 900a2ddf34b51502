#![deny(unsafe_op_in_unsafe_fn)]
//! # rogueap-core
//!
//! Lifecycle controller for a rogue WiFi access point. The AP itself is an
//! external hostapd (the rogue-enabled build by default, or the system binary)
//! and DHCP/DNS is served by dnsmasq; this crate writes their configs, launches
//! and supervises them, addresses the AP interface and cleans up afterwards.
//!
//! ## Example
//!
//! ```no_run
//! use rogueap_core::AccessPoint;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut ap = AccessPoint::new();
//! ap.set_interface("wlan0");
//! ap.set_essid("Free_WiFi");
//! ap.add_deny_macs(["00:11:22:33:44:55"]);
//!
//! let outcome = ap.start()?;
//! if !outcome.interface.is_ready() {
//!     eprintln!("gateway address missing on wlan0");
//! }
//!
//! // ... serve clients ...
//!
//! ap.stop();
//! # Ok(())
//! # }
//! ```

#[cfg(not(target_os = "linux"))]
compile_error!("rogueap-core drives Linux networking tools and only builds for Linux targets.");

pub mod backend;
pub mod cli;
pub mod config;
pub mod constants;
pub mod controller;
pub mod dnsmasq;
pub mod error;
pub mod host;
pub mod hostapd;
pub mod iface;
pub mod process;
pub mod settings;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::DaemonHandle;
pub use cli::{Cli, Commands, OutputFormat};
pub use config::AccessPointConfig;
pub use controller::{AccessPoint, ApState, CleanupReport, StartOutcome};
pub use dnsmasq::{DnsMode, DnsmasqConfig};
pub use error::{ApError, Backend, Result};
pub use host::{HostOps, RealHostOps};
pub use hostapd::{HostapdConfig, RuntimeOptions};
pub use iface::InterfaceCheck;
pub use settings::ControllerSettings;
