//! Link state derived from the host's network interfaces.
//!
//! The operating system owns association and DHCP; this link only observes
//! whether an interface is running and has a routable address.

use super::Link;
use crate::error::LinkError;
use log::{debug, info, warn};
use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;
use nix::sys::socket::{AddressFamily, SockaddrLike};
use std::net::IpAddr;

/// One address observed on an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InterfaceAddr {
    pub name: String,
    pub running: bool,
    pub loopback: bool,
    pub ip: Option<IpAddr>,
}

/// Link backed by `getifaddrs`.
#[derive(Debug, Clone)]
pub struct InterfaceLink {
    /// Interface to watch (e.g. "wlan0"); any non-loopback when `None`
    interface_name: Option<String>,
    last_up: Option<bool>,
}

impl InterfaceLink {
    pub fn new(interface_name: Option<String>) -> Self {
        Self {
            interface_name,
            last_up: None,
        }
    }

    fn snapshot() -> Result<Vec<InterfaceAddr>, LinkError> {
        let addrs = getifaddrs()?;
        let mut out = Vec::new();

        for ifaddr in addrs {
            let ip = ifaddr.address.as_ref().and_then(|addr| match addr.family() {
                Some(AddressFamily::Inet) => addr.as_sockaddr_in().map(|s| IpAddr::V4(s.ip())),
                Some(AddressFamily::Inet6) => {
                    addr.as_sockaddr_in6().map(|s| IpAddr::V6(s.ip()))
                }
                _ => None,
            });

            out.push(InterfaceAddr {
                name: ifaddr.interface_name.clone(),
                running: ifaddr.flags.contains(InterfaceFlags::IFF_RUNNING),
                loopback: ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK),
                ip,
            });
        }

        Ok(out)
    }

    fn check(&self) -> Result<(), LinkError> {
        evaluate(self.interface_name.as_deref(), &Self::snapshot()?)
    }
}

/// Decide link state from an interface snapshot.
pub(crate) fn evaluate(wanted: Option<&str>, addrs: &[InterfaceAddr]) -> Result<(), LinkError> {
    let mut found = false;

    for addr in addrs {
        match wanted {
            Some(name) if addr.name != name => continue,
            None if addr.loopback => continue,
            _ => {}
        }
        found = true;

        if addr.running && addr.ip.is_some_and(is_routable) {
            return Ok(());
        }
    }

    match wanted {
        Some(name) if !found => Err(LinkError::InterfaceNotFound(name.to_string())),
        _ => Err(LinkError::Down),
    }
}

fn is_routable(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => !v4.is_loopback() && !v4.is_link_local() && !v4.is_unspecified(),
        IpAddr::V6(v6) => {
            // Skip link-local addresses (fe80::/10)
            let octets = v6.octets();
            !v6.is_loopback() && !(octets[0] == 0xfe && (octets[1] & 0xc0) == 0x80)
        }
    }
}

impl Link for InterfaceLink {
    fn is_up(&mut self) -> bool {
        let up = match self.check() {
            Ok(()) => true,
            Err(e) => {
                debug!("[Link] {}", e);
                false
            }
        };
        if self.last_up != Some(up) {
            if up {
                info!("[Link] Network link is up");
            } else {
                warn!("[Link] Network link is down");
            }
            self.last_up = Some(up);
        }
        up
    }

    async fn connect(&mut self) -> Result<(), LinkError> {
        info!("[Link] Waiting for network link...");
        let result = self.check();
        self.last_up = Some(result.is_ok());
        if result.is_ok() {
            info!("[Link] Connected to network");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn iface(name: &str, running: bool, ip: Option<IpAddr>) -> InterfaceAddr {
        InterfaceAddr {
            name: name.to_string(),
            running,
            loopback: name == "lo",
            ip,
        }
    }

    fn v4(a: u8, b: u8, c: u8, d: u8) -> Option<IpAddr> {
        Some(IpAddr::V4(Ipv4Addr::new(a, b, c, d)))
    }

    #[test]
    fn test_any_interface_up() {
        let addrs = vec![
            iface("lo", true, v4(127, 0, 0, 1)),
            iface("wlan0", true, v4(192, 168, 1, 20)),
        ];
        assert!(evaluate(None, &addrs).is_ok());
    }

    #[test]
    fn test_loopback_only_is_down() {
        let addrs = vec![iface("lo", true, v4(127, 0, 0, 1))];
        assert!(matches!(evaluate(None, &addrs), Err(LinkError::Down)));
    }

    #[test]
    fn test_not_running_is_down() {
        let addrs = vec![iface("wlan0", false, v4(192, 168, 1, 20))];
        assert!(matches!(evaluate(None, &addrs), Err(LinkError::Down)));
    }

    #[test]
    fn test_link_local_only_is_down() {
        let fe80 = Some(IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)));
        let addrs = vec![
            iface("eth0", true, fe80),
            iface("eth0", true, v4(169, 254, 3, 4)),
            iface("eth0", true, None),
        ];
        assert!(matches!(evaluate(None, &addrs), Err(LinkError::Down)));
    }

    #[test]
    fn test_named_interface() {
        let addrs = vec![
            iface("eth0", true, v4(10, 0, 0, 5)),
            iface("wlan0", false, v4(192, 168, 1, 20)),
        ];
        assert!(evaluate(Some("eth0"), &addrs).is_ok());
        assert!(matches!(
            evaluate(Some("wlan0"), &addrs),
            Err(LinkError::Down)
        ));
        assert!(matches!(
            evaluate(Some("wlan1"), &addrs),
            Err(LinkError::InterfaceNotFound(name)) if name == "wlan1"
        ));
    }
}
