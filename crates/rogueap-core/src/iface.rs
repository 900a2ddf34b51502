//! AP interface addressing through the `ip` tool.

use std::io;
use std::net::Ipv4Addr;

use crate::error::{ApError, Result};
use crate::host::{CommandOutput, HostOps};

/// Result of the post-configuration address check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceCheck {
    /// The interface carries the gateway address
    Ready,
    /// The tool ran but the address is not assigned
    AddressMissing { interface: String, expected: Ipv4Addr },
}

impl InterfaceCheck {
    pub fn is_ready(&self) -> bool {
        matches!(self, InterfaceCheck::Ready)
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            InterfaceCheck::Ready => Ok(()),
            InterfaceCheck::AddressMissing {
                interface,
                expected,
            } => Err(ApError::InterfaceStateMismatch {
                interface,
                expected: expected.to_string(),
            }),
        }
    }
}

pub struct InterfaceTool<'a> {
    host: &'a dyn HostOps,
    ip_bin: &'a str,
}

impl<'a> InterfaceTool<'a> {
    pub fn new(host: &'a dyn HostOps, ip_bin: &'a str) -> Self {
        Self { host, ip_bin }
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        self.host.run(self.ip_bin, args).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ApError::missing(self.ip_bin)
            } else {
                ApError::Io(e)
            }
        })
    }

    /// Run a configuration step; a non-zero exit is logged and left to the
    /// final address check.
    fn run_step(&self, args: &[&str]) -> Result<()> {
        let output = self.run(args)?;
        if !output.success {
            tracing::warn!(
                target: "rogueap::dhcp",
                "{} {} failed: {}",
                self.ip_bin,
                args.join(" "),
                output.stderr.trim()
            );
        }
        Ok(())
    }

    pub fn set_mtu(&self, interface: &str, mtu: u32) -> Result<()> {
        let mtu = mtu.to_string();
        self.run_step(&["link", "set", "dev", interface, "mtu", &mtu])
    }

    /// Assign `address/prefix_len` and bring the link up.
    pub fn bring_up_with_address(
        &self,
        interface: &str,
        address: Ipv4Addr,
        prefix_len: u8,
    ) -> Result<()> {
        let cidr = format!("{address}/{prefix_len}");
        self.run_step(&["addr", "add", &cidr, "dev", interface])?;
        self.run_step(&["link", "set", "dev", interface, "up"])
    }

    pub fn carries_address(&self, interface: &str, address: Ipv4Addr) -> Result<bool> {
        let output = self.run(&["-4", "addr", "show", "dev", interface])?;
        let needle = format!("inet {address}/");
        Ok(output.success && output.stdout.contains(&needle))
    }

    pub fn check_address(&self, interface: &str, address: Ipv4Addr) -> Result<InterfaceCheck> {
        if self.carries_address(interface, address)? {
            Ok(InterfaceCheck::Ready)
        } else {
            Ok(InterfaceCheck::AddressMissing {
                interface: interface.to_string(),
                expected: address,
            })
        }
    }
}
