//! # IPv4 Range Model
//!
//! Continuous, inclusive ranges of IPv4 addresses and the CIDR arithmetic
//! used to derive them.

use std::net::{IpAddr, Ipv4Addr};

/// Represents a continuous range of IPv4 addresses, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    /// Number of addresses covered. Zero when `start > end`.
    pub fn len(&self) -> u64 {
        let start = u32::from(self.start_addr) as u64;
        let end = u32::from(self.end_addr) as u64;
        if start > end { 0 } else { end - start + 1 }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Ipv4Addr> + Clone {
        let start: u32 = u32::from(self.start_addr);
        let end: u32 = u32::from(self.end_addr);
        (start..=end).map(Ipv4Addr::from)
    }

    pub fn to_iter(&self) -> impl Iterator<Item = IpAddr> {
        self.iter().map(IpAddr::V4)
    }
}

/// Creates a range from an IP and a CIDR prefix (e.g., 192.168.1.0/24).
///
/// Returns the range covering the entire network block, network and
/// broadcast address included.
pub fn cidr_range(ip: Ipv4Addr, prefix: u8) -> anyhow::Result<Ipv4Range> {
    if prefix > 32 {
        anyhow::bail!("Invalid prefix: {prefix} > 32");
    }
    let ip_u32 = u32::from(ip);
    let mask = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    };
    let network = ip_u32 & mask;
    let broadcast = network | !mask;
    Ok(Ipv4Range::new(
        Ipv4Addr::from(network),
        Ipv4Addr::from(broadcast),
    ))
}

/// The scannable hosts of a CIDR block.
///
/// Blocks holding more than two addresses lose their network and broadcast
/// address; `/31` and `/32` keep every address.
pub fn cidr_hosts(ip: Ipv4Addr, prefix: u8) -> anyhow::Result<Ipv4Range> {
    let block = cidr_range(ip, prefix)?;
    if block.len() <= 2 {
        return Ok(block);
    }
    let start = u32::from(block.start_addr) + 1;
    let end = u32::from(block.end_addr) - 1;
    Ok(Ipv4Range::new(Ipv4Addr::from(start), Ipv4Addr::from(end)))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
