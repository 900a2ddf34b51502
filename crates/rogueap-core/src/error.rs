//! Error types for rogueap-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, ApError>;

/// Which AP daemon backend an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Rogue-enabled hostapd build with karma and WPS support
    RogueHostapd,
    /// Plain hostapd installed on the system
    SystemHostapd,
    /// dnsmasq DHCP/DNS daemon
    Dnsmasq,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Backend::RogueHostapd => "roguehostapd",
            Backend::SystemHostapd => "hostapd",
            Backend::Dnsmasq => "dnsmasq",
        };
        f.write_str(name)
    }
}

/// Main error type for access point lifecycle operations
#[derive(Error, Debug)]
pub enum ApError {
    /// Required external binary is not installed
    #[error("{tool} is not installed{hint}")]
    MissingDependency {
        tool: String,
        hint: &'static str,
    },

    /// Backend rejected its config or exited right after launch
    #[error("{backend} failed to launch: {reason}")]
    BackendStartup { backend: Backend, reason: String },

    /// Interface tool ran but the interface does not carry the gateway address
    #[error("Interface '{interface}' does not carry expected address {expected}")]
    InterfaceStateMismatch { interface: String, expected: String },

    /// `start` called while the AP is already running
    #[error("Access point is already running; stop it first")]
    AlreadyRunning,

    /// `start` called before an interface was configured
    #[error("No wireless interface configured for the access point")]
    InterfaceNotSet,

    /// Writing a generated config file failed
    #[error("Failed to write {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configured value cannot be written into a daemon config
    #[error("Invalid {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApError {
    /// Create a missing-dependency error without a hint
    pub fn missing(tool: impl Into<String>) -> Self {
        Self::MissingDependency {
            tool: tool.into(),
            hint: "",
        }
    }

    /// Create a backend startup error
    pub fn startup(backend: Backend, reason: impl Into<String>) -> Self {
        Self::BackendStartup {
            backend,
            reason: reason.into(),
        }
    }

    /// Startup errors abort the run; everything else is the caller's call.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InterfaceStateMismatch { .. })
    }

    /// Check if this is a missing dependency
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, Self::MissingDependency { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dependency_names_the_tool() {
        let err = ApError::MissingDependency {
            tool: "roguehostapd".to_string(),
            hint: "; pass --force-hostapd to use the system hostapd",
        };
        assert_eq!(
            err.to_string(),
            "roguehostapd is not installed; pass --force-hostapd to use the system hostapd"
        );
        assert!(err.is_missing_dependency());
        assert!(err.is_fatal());
    }

    #[test]
    fn interface_mismatch_is_not_fatal() {
        let err = ApError::InterfaceStateMismatch {
            interface: "wlan0".to_string(),
            expected: "10.0.0.1".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(!err.is_missing_dependency());
    }

    #[test]
    fn invalid_config_is_fatal() {
        let err = ApError::InvalidConfig {
            field: "essid",
            reason: "contains a control character".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid essid: contains a control character");
        assert!(err.is_fatal());
    }

    #[test]
    fn startup_error_mentions_backend() {
        let err = ApError::startup(Backend::SystemHostapd, "exited with status 1");
        assert_eq!(err.to_string(), "hostapd failed to launch: exited with status 1");
    }
}
