//! Local interface discovery.
//!
//! Used to decide whether a target sits on a directly attached subnet (link-layer
//! probing is possible) and to expand the `lan` target keyword.

use std::net::{IpAddr, Ipv4Addr};

use pnet::datalink::{self, MacAddr, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use thiserror::Error;
use tracing::debug;

#[cfg(target_os = "macos")]
use macos_impl::{is_physical, is_wireless};
#[cfg(target_os = "linux")]
use linux_impl::{is_physical, is_wireless};

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn is_physical(_interface: &NetworkInterface) -> bool {
    true
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn is_wireless(_interface: &NetworkInterface) -> bool {
    false
}

/// Why an interface cannot be used for link-layer probing.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Error)]
pub enum Unsuitable {
    #[error("interface is down")]
    Down,
    #[error("loopback or virtual device")]
    Virtual,
    #[error("no hardware address")]
    NoMac,
    #[error("no broadcast support")]
    NoBroadcast,
    #[error("point-to-point link")]
    PointToPoint,
    #[error("no private IPv4 address")]
    NoPrivateIpv4,
}

/// A broadcast-capable interface together with the private IPv4 network it sits on.
#[derive(Debug, Clone)]
pub struct LanInterface {
    pub interface: NetworkInterface,
    pub ipv4_net: Ipv4Network,
    pub mac: MacAddr,
}

impl LanInterface {
    pub fn source_addr(&self) -> Ipv4Addr {
        self.ipv4_net.ip()
    }

    /// True when `addr` is on this subnet and is not our own address.
    pub fn is_neighbour(&self, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) => self.ipv4_net.contains(v4) && v4 != self.source_addr(),
            IpAddr::V6(_) => false,
        }
    }
}

/// Finds the primary LAN interface, preferring wired links over wireless ones.
pub fn get_lan_interface() -> anyhow::Result<LanInterface> {
    let candidates: Vec<LanInterface> = datalink::interfaces()
        .into_iter()
        .filter_map(|interface| match lan_candidate(&interface, is_physical) {
            Ok(candidate) => Some(candidate),
            Err(reason) => {
                debug!("Skipping interface {}: {reason}", interface.name);
                None
            }
        })
        .collect();

    pick_preferred(candidates, |lan| is_wired(&lan.interface))
        .ok_or_else(|| anyhow::anyhow!("No interfaces available for LAN discovery"))
}

/// Finds the primary LAN network.
pub fn get_lan_network() -> anyhow::Result<Ipv4Network> {
    Ok(get_lan_interface()?.ipv4_net)
}

fn lan_candidate(
    interface: &NetworkInterface,
    is_physical: impl Fn(&NetworkInterface) -> bool,
) -> Result<LanInterface, Unsuitable> {
    if !interface.is_up() {
        return Err(Unsuitable::Down);
    }
    if interface.is_loopback() || !is_physical(interface) {
        return Err(Unsuitable::Virtual);
    }
    let mac = interface.mac.ok_or(Unsuitable::NoMac)?;
    if !interface.is_broadcast() {
        return Err(Unsuitable::NoBroadcast);
    }
    if interface.is_point_to_point() {
        return Err(Unsuitable::PointToPoint);
    }

    let ipv4_net = interface
        .ips
        .iter()
        .find_map(|net| match net {
            IpNetwork::V4(v4) if v4.ip().is_private() => Some(*v4),
            _ => None,
        })
        .ok_or(Unsuitable::NoPrivateIpv4)?;

    Ok(LanInterface {
        interface: interface.clone(),
        ipv4_net,
        mac,
    })
}

fn pick_preferred<T>(candidates: Vec<T>, preferred: impl Fn(&T) -> bool) -> Option<T> {
    let position = candidates.iter().position(preferred).unwrap_or(0);
    candidates.into_iter().nth(position)
}

fn is_wired(interface: &NetworkInterface) -> bool {
    is_physical(interface) && !is_wireless(interface)
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::NetworkInterface;
    use std::path::Path;

    fn sysfs_entry(interface: &NetworkInterface, entry: &str) -> bool {
        Path::new("/sys/class/net")
            .join(&interface.name)
            .join(entry)
            .exists()
    }

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        sysfs_entry(interface, "device")
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        sysfs_entry(interface, "wireless")
    }
}

/// Parsed `networksetup -listallhardwareports`: `(device, is_wifi)` pairs.
#[cfg(any(target_os = "macos", test))]
fn parse_hardware_ports(listing: &str) -> Vec<(String, bool)> {
    let mut ports = Vec::new();
    let mut wifi = false;
    for line in listing.lines().map(str::trim) {
        if let Some(kind) = line.strip_prefix("Hardware Port:") {
            wifi = matches!(kind.trim(), "Wi-Fi" | "AirPort");
        } else if let Some(device) = line.strip_prefix("Device:") {
            ports.push((device.trim().to_string(), wifi));
        }
    }
    ports
}

#[cfg(target_os = "macos")]
mod macos_impl {
    use super::{NetworkInterface, parse_hardware_ports};
    use std::process::Command;
    use std::sync::OnceLock;

    // `networksetup` is slow, ask once per process.
    fn hardware_ports() -> &'static [(String, bool)] {
        static PORTS: OnceLock<Vec<(String, bool)>> = OnceLock::new();
        PORTS.get_or_init(|| {
            Command::new("networksetup")
                .arg("-listallhardwareports")
                .output()
                .map(|out| parse_hardware_ports(&String::from_utf8_lossy(&out.stdout)))
                .unwrap_or_default()
        })
    }

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        hardware_ports().iter().any(|(device, _)| *device == interface.name)
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        hardware_ports()
            .iter()
            .any(|(device, wifi)| *wifi && *device == interface.name)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
