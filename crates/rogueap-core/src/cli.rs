use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::controller::AccessPoint;

#[derive(Parser, Debug)]
#[command(
    name = "rogueap",
    author,
    version,
    about = "Run a rogue access point backed by hostapd and dnsmasq"
)]
pub struct Cli {
    /// Directory for logs and logging config (defaults to /var/lib/rogueap)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Output format for command responses
    #[arg(
        long = "output",
        value_enum,
        default_value_t = OutputFormat::Text,
        global = true
    )]
    pub output_format: OutputFormat,

    /// Log filter (overrides the persisted logging config)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the AP and DHCP/DNS, run until SIGINT/SIGTERM, then clean up
    Run(ApArgs),
    /// Print the hostapd and dnsmasq configs without touching the system
    Render(ApArgs),
    /// Kill leftover daemons and remove generated files
    Cleanup,
    /// Report which external tools are installed
    Check,
}

#[derive(Args, Debug, Clone)]
pub struct ApArgs {
    /// Wireless interface hosting the AP
    #[arg(short, long)]
    pub interface: String,

    /// SSID to broadcast
    #[arg(short, long)]
    pub essid: String,

    #[arg(short, long)]
    pub channel: Option<u8>,

    /// WPA2 passphrase; omit for an open network
    #[arg(long)]
    pub psk: Option<String>,

    /// Upstream interface; enables internet sharing and relayed DNS
    #[arg(long)]
    pub internet_interface: Option<String>,

    /// Use the hostapd installed on the system instead of roguehostapd
    #[arg(long)]
    pub force_hostapd: bool,

    /// MAC address to refuse (repeatable)
    #[arg(long = "deny-mac", value_name = "MAC")]
    pub deny_macs: Vec<String>,

    /// Abort if the gateway address does not show up on the interface
    #[arg(long)]
    pub strict_interface: bool,
}

impl ApArgs {
    /// Apply the flags to a controller through its setters.
    pub fn configure(&self, ap: &mut AccessPoint) {
        ap.set_interface(&self.interface);
        ap.set_essid(&self.essid);
        if let Some(channel) = self.channel {
            ap.set_channel(channel);
        }
        if let Some(ref psk) = self.psk {
            ap.set_psk(psk);
        }
        if let Some(ref upstream) = self.internet_interface {
            ap.set_internet_interface(upstream);
        }
        if self.force_hostapd {
            ap.enable_system_hostapd();
        }
        ap.add_deny_macs(self.deny_macs.iter().cloned());
    }
}
