//! hostapd configuration composed from the controller state.
//!
//! The same record feeds both backends. The rogue build understands the extra
//! `karma_enable` key; plain hostapd never sees it because the rogue flags are
//! only added on the embedded path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::AccessPointConfig;
use crate::error::{ApError, Result};

/// Channel used when the caller did not pick one.
pub const DEFAULT_CHANNEL: u8 = 6;

/// AP daemon configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostapdConfig {
    pub ssid: String,
    pub interface: String,
    pub channel: Option<u8>,
    pub deny_macs: Vec<String>,
    /// WPA2-personal passphrase, copied verbatim from the PSK
    pub wpa2password: Option<String>,
    /// Answer probe requests for any SSID (KARMA)
    pub karma_enable: bool,
    /// Advertise WPS push-button configuration
    pub wpspbc: bool,
}

/// Process-level options for the embedded backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Discard daemon stdout/stderr
    pub mute: bool,
    /// Keep terminal signals away from the daemon's event loop; only `stop` ends it
    pub eloop_term_disable: bool,
}

impl RuntimeOptions {
    /// Options used when running the rogue build under the controller.
    pub fn quiet() -> Self {
        Self {
            mute: true,
            eloop_term_disable: true,
        }
    }
}

impl HostapdConfig {
    /// Compose the base record (no rogue flags) for `interface`.
    pub fn compose(config: &AccessPointConfig, interface: &str) -> Self {
        Self {
            ssid: config.essid.clone(),
            interface: interface.to_string(),
            channel: config.channel,
            deny_macs: config.deny_mac_addresses().to_vec(),
            wpa2password: config.psk.clone(),
            karma_enable: false,
            wpspbc: false,
        }
    }

    /// Enable KARMA and WPS push-button advertisement.
    pub fn with_rogue_flags(mut self) -> Self {
        self.karma_enable = true;
        self.wpspbc = true;
        self
    }

    /// hostapd.conf and the deny list are one directive per line, so no value
    /// may carry a line break or other control character.
    pub fn validate(&self) -> Result<()> {
        check_line_value("essid", &self.ssid)?;
        check_line_value("interface", &self.interface)?;
        if let Some(ref passphrase) = self.wpa2password {
            check_line_value("psk", passphrase)?;
        }
        for mac in &self.deny_macs {
            check_line_value("deny MAC", mac)?;
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.wpa2password.is_none()
    }

    fn hw_mode(&self) -> &'static str {
        match self.channel {
            Some(ch) if ch > 14 => "a",
            _ => "g",
        }
    }

    /// Render hostapd.conf. `deny_file` is referenced only when MACs are denied.
    pub fn render(&self, deny_file: &Path) -> String {
        let mut conf = format!(
            "interface={}\ndriver=nl80211\nssid={}\nhw_mode={}\nchannel={}\n",
            self.interface,
            self.ssid,
            self.hw_mode(),
            self.channel.unwrap_or(DEFAULT_CHANNEL)
        );

        if !self.deny_macs.is_empty() {
            conf.push_str(&format!(
                "macaddr_acl=0\ndeny_mac_file={}\n",
                deny_file.display()
            ));
        }

        if let Some(ref passphrase) = self.wpa2password {
            conf.push_str(&format!(
                "wpa=2\nwpa_passphrase={passphrase}\nwpa_key_mgmt=WPA-PSK\nrsn_pairwise=CCMP\n"
            ));
        }

        if self.karma_enable {
            conf.push_str("karma_enable=1\n");
        }

        if self.wpspbc {
            conf.push_str("wps_state=2\neap_server=1\nconfig_methods=push_button\n");
        }

        conf
    }

    pub fn render_deny_list(&self) -> String {
        let mut out = String::new();
        for mac in &self.deny_macs {
            out.push_str(mac);
            out.push('\n');
        }
        out
    }

    /// Write hostapd.conf and, when needed, the deny list. Returns the files written.
    pub fn write_files(&self, conf_path: &Path, deny_path: &Path) -> Result<Vec<PathBuf>> {
        self.validate()?;
        let mut written = Vec::new();
        if !self.deny_macs.is_empty() {
            write_artifact(deny_path, &self.render_deny_list())?;
            written.push(deny_path.to_path_buf());
        }
        write_artifact(conf_path, &self.render(deny_path))?;
        written.push(conf_path.to_path_buf());
        Ok(written)
    }
}

fn check_line_value(field: &'static str, value: &str) -> Result<()> {
    match value.chars().find(|c| c.is_control()) {
        Some(c) => Err(ApError::InvalidConfig {
            field,
            reason: format!("contains control character {:?}", c),
        }),
        None => Ok(()),
    }
}

fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|source| ApError::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    })
}
