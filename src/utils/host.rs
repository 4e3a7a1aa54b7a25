//! Local host identity used in alert messages

use std::net::IpAddr;

use sysinfo::{Networks, System};
use tracing::{debug, warn};

const UNKNOWN_HOSTNAME: &str = "unknown";

/// Hostname and externally meaningful addresses of this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub hostname: String,
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
}

impl HostInfo {
    /// Query the OS for hostname and interface addresses
    ///
    /// Never fails: an unreadable hostname becomes `"unknown"` and an
    /// unreadable interface list becomes empty.
    pub fn detect() -> Self {
        let hostname = System::host_name().unwrap_or_else(|| {
            warn!("Could not determine hostname");
            UNKNOWN_HOSTNAME.to_string()
        });

        let networks = Networks::new_with_refreshed_list();
        let addrs = networks
            .iter()
            .flat_map(|(_, data)| data.ip_networks().iter().map(|net| net.addr));

        let info = Self::from_addrs(hostname, addrs);
        debug!(
            hostname = %info.hostname,
            ipv4 = ?info.ipv4,
            ipv6 = ?info.ipv6,
            "Detected host info"
        );
        info
    }

    /// Build from raw addresses, dropping loopback and IPv6 link-local ones
    pub fn from_addrs(hostname: impl Into<String>, addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        let mut ipv4 = Vec::new();
        let mut ipv6 = Vec::new();

        for addr in addrs {
            match addr {
                IpAddr::V4(v4) if !v4.is_loopback() => ipv4.push(v4.to_string()),
                IpAddr::V6(v6) if !v6.is_loopback() && !is_link_local_v6(&v6) => {
                    ipv6.push(v6.to_string())
                }
                _ => {}
            }
        }

        ipv4.sort();
        ipv4.dedup();
        ipv6.sort();
        ipv6.dedup();

        Self {
            hostname: hostname.into(),
            ipv4,
            ipv6,
        }
    }

    /// All addresses joined for display, IPv4 first
    pub fn addresses_display(&self) -> String {
        let all: Vec<&str> = self
            .ipv4
            .iter()
            .chain(self.ipv6.iter())
            .map(String::as_str)
            .collect();
        if all.is_empty() {
            "-".to_string()
        } else {
            all.join(", ")
        }
    }
}

// fe80::/10
fn is_link_local_v6(addr: &std::net::Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}
