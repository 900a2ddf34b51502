/// Caller-supplied settings for one access point run.
///
/// Fields are assigned through the setters before `AccessPoint::start`; none of
/// them are validated here. The deny list only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPointConfig {
    /// Wireless adapter hosting the AP
    pub interface: Option<String>,
    /// Upstream interface; when set, DNS is relayed instead of spoofed
    pub internet_interface: Option<String>,
    pub channel: Option<u8>,
    pub essid: String,
    /// WPA2 passphrase; `None` means an open network
    pub psk: Option<String>,
    /// Use the system hostapd instead of the rogue-enabled build
    pub force_system_daemon: bool,
    deny_mac_addresses: Vec<String>,
}

impl AccessPointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_interface(&mut self, interface: impl Into<String>) {
        self.interface = Some(interface.into());
    }

    pub fn set_internet_interface(&mut self, interface: impl Into<String>) {
        self.internet_interface = Some(interface.into());
    }

    pub fn set_channel(&mut self, channel: u8) {
        self.channel = Some(channel);
    }

    pub fn set_essid(&mut self, essid: impl Into<String>) {
        self.essid = essid.into();
    }

    pub fn set_psk(&mut self, psk: impl Into<String>) {
        self.psk = Some(psk.into());
    }

    /// Use hostapd installed on the system instead of roguehostapd.
    pub fn enable_system_hostapd(&mut self) {
        self.force_system_daemon = true;
    }

    /// Append MACs to the deny list, keeping order and duplicates.
    pub fn add_deny_macs<I, S>(&mut self, macs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny_mac_addresses
            .extend(macs.into_iter().map(Into::into));
    }

    pub fn deny_mac_addresses(&self) -> &[String] {
        &self.deny_mac_addresses
    }

    /// Internet sharing is active whenever an upstream interface is set.
    pub fn shares_internet(&self) -> bool {
        self.internet_interface.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_macs_accumulate_in_order() {
        let mut config = AccessPointConfig::new();
        config.add_deny_macs(["00:11:22:33:44:55"]);
        config.add_deny_macs(vec![
            "66:77:88:99:aa:bb".to_string(),
            "cc:dd:ee:ff:00:11".to_string(),
        ]);

        assert_eq!(
            config.deny_mac_addresses(),
            &[
                "00:11:22:33:44:55",
                "66:77:88:99:aa:bb",
                "cc:dd:ee:ff:00:11"
            ]
        );
    }

    #[test]
    fn deny_macs_keep_duplicates() {
        let mut config = AccessPointConfig::new();
        config.add_deny_macs(["00:11:22:33:44:55"]);
        config.add_deny_macs(["00:11:22:33:44:55"]);
        assert_eq!(config.deny_mac_addresses().len(), 2);
    }

    #[test]
    fn setters_assign_fields() {
        let mut config = AccessPointConfig::new();
        config.set_interface("wlan0");
        config.set_essid("Free_WiFi");
        config.set_channel(6);
        assert!(!config.shares_internet());
        assert!(!config.force_system_daemon);

        config.set_internet_interface("eth0");
        config.enable_system_hostapd();
        config.set_psk("s3cr3t123");

        assert_eq!(config.interface.as_deref(), Some("wlan0"));
        assert_eq!(config.essid, "Free_WiFi");
        assert_eq!(config.channel, Some(6));
        assert_eq!(config.psk.as_deref(), Some("s3cr3t123"));
        assert!(config.shares_internet());
        assert!(config.force_system_daemon);
    }
}
