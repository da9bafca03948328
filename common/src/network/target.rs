//! # Target Expander
//!
//! Turns user supplied range specifications into the ordered, duplicate-free
//! list of addresses a scan will probe.
//!
//! Accepted forms, optionally comma separated within one string:
//! * A single IPv4/IPv6 address (`192.168.1.5`, `::1`).
//! * An inclusive IPv4 range (`10.0.0.1-10.0.0.9`, or abbreviated `10.0.0.1-9`).
//! * An IPv4 CIDR block (`192.168.1.0/24`).
//! * The `lan` keyword, the private network of the best local interface.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use pnet::ipnetwork::Ipv4Network;
use tracing::debug;

use crate::error::TargetError;
use crate::network::interface;
use crate::network::range::{self, Ipv4Range};

/// A single validated address produced by expansion.
pub type ScanTarget = IpAddr;

/// Upper bound on the addresses a single spec may expand to.
pub const MAX_ADDRESSES_PER_SPEC: u64 = 65_536;

/// One parsed range specification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressRangeSpec {
    /// The private IPv4 network of the local LAN interface.
    Lan,
    Host { target_addr: IpAddr },
    /// Inclusive range. CIDR blocks are stored with network/broadcast already stripped.
    Range { ipv4_range: Ipv4Range },
}

impl FromStr for AddressRangeSpec {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TargetError::invalid(s, "empty target"));
        }

        if s.eq_ignore_ascii_case("lan") {
            return Ok(AddressRangeSpec::Lan);
        }

        if let Some(spec) = parse_host(s) {
            return Ok(spec);
        }

        if let Some(spec) = parse_ip_range(s)? {
            return Ok(spec);
        }

        if let Some(spec) = parse_cidr_range(s)? {
            return Ok(spec);
        }

        Err(TargetError::invalid(
            s,
            "expected an address, a range (a.b.c.d-e.f.g.h) or a CIDR block (a.b.c.d/n)",
        ))
    }
}

/// Result of expanding a batch of specs. Errors never abort the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    pub targets: Vec<ScanTarget>,
    pub errors: Vec<TargetError>,
}

impl Expansion {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Expands specs in input order, keeping the first occurrence of every address.
pub fn expand<S: AsRef<str>>(specs: &[S]) -> Expansion {
    expand_with(specs, interface::get_lan_network)
}

/// Same as [`expand`] with the `lan` keyword resolved by `lan_network`.
pub fn expand_with<S, F>(specs: &[S], lan_network: F) -> Expansion
where
    S: AsRef<str>,
    F: Fn() -> anyhow::Result<Ipv4Network>,
{
    let mut expansion = Expansion::default();
    let mut seen: HashSet<IpAddr> = HashSet::new();

    for raw in specs {
        for part in split_commas(raw.as_ref()) {
            let addresses = part
                .parse::<AddressRangeSpec>()
                .and_then(|spec| resolve(spec, part, &lan_network));

            match addresses {
                Ok(addresses) => expansion
                    .targets
                    .extend(addresses.into_iter().filter(|addr| seen.insert(*addr))),
                Err(err) => {
                    debug!("Skipping target: {err}");
                    expansion.errors.push(err);
                }
            }
        }
    }

    debug!(
        "Expanded {} spec(s) into {} target(s), {} rejected",
        specs.len(),
        expansion.targets.len(),
        expansion.errors.len()
    );
    expansion
}

/// Splits `"a, b,,c"` into its non-empty parts. A blank string yields itself
/// so it is reported instead of silently ignored.
fn split_commas(s: &str) -> Vec<&str> {
    let parts: Vec<&str> = s
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() { vec![s] } else { parts }
}

fn resolve<F>(spec: AddressRangeSpec, raw: &str, lan_network: &F) -> Result<Vec<IpAddr>, TargetError>
where
    F: Fn() -> anyhow::Result<Ipv4Network>,
{
    match spec {
        AddressRangeSpec::Host { target_addr } => Ok(vec![target_addr]),
        AddressRangeSpec::Range { ipv4_range } => Ok(ipv4_range.to_iter().collect()),
        AddressRangeSpec::Lan => {
            let net = lan_network().map_err(|e| TargetError::NoLocalNetwork {
                spec: raw.to_string(),
                reason: e.to_string(),
            })?;
            let hosts = range::cidr_hosts(net.network(), net.prefix())
                .map_err(|e| TargetError::invalid(raw, e.to_string()))?;
            check_size(raw, &hosts)?;
            debug!("LAN target {net} spans {} to {}", hosts.start_addr, hosts.end_addr);
            Ok(hosts.to_iter().collect())
        }
    }
}

fn check_size(spec: &str, ipv4_range: &Ipv4Range) -> Result<(), TargetError> {
    let count = ipv4_range.len();
    if count > MAX_ADDRESSES_PER_SPEC {
        return Err(TargetError::TooLarge {
            spec: spec.to_string(),
            count,
            limit: MAX_ADDRESSES_PER_SPEC,
        });
    }
    Ok(())
}

fn parse_host(s: &str) -> Option<AddressRangeSpec> {
    s.parse::<IpAddr>()
        .ok()
        .map(|target_addr| AddressRangeSpec::Host { target_addr })
}

/// Parses `1.1.1.1-2.2.2.2` or the abbreviated `1.1.1.1-50`.
fn parse_ip_range(s: &str) -> Result<Option<AddressRangeSpec>, TargetError> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let start_addr = start_str
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|e| TargetError::invalid(s, format!("bad start address '{start_str}': {e}")))?;

    let end_addr = parse_range_end_addr(end_str.trim(), &start_addr)
        .map_err(|reason| TargetError::invalid(s, reason))?;

    if start_addr > end_addr {
        return Err(TargetError::Reversed {
            spec: s.to_string(),
            start: start_addr,
            end: end_addr,
        });
    }

    let ipv4_range = Ipv4Range::new(start_addr, end_addr);
    check_size(s, &ipv4_range)?;
    Ok(Some(AddressRangeSpec::Range { ipv4_range }))
}

/// Fills the trailing octets of `start_addr` with a partial end address, so
/// `50` after `192.168.1.1` means `192.168.1.50` and `2.66` means `192.168.2.66`.
fn parse_range_end_addr(end_str: &str, start_addr: &Ipv4Addr) -> Result<Ipv4Addr, String> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }
    if end_str.is_empty() {
        return Err("range end is empty".to_string());
    }

    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(str::parse::<u8>)
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| format!("bad end address '{end_str}': {e}"))?;

    if partial_octets.len() > 4 {
        return Err(format!("end address '{end_str}' has too many octets"));
    }

    let mut end_octets = start_addr.octets();
    end_octets[4 - partial_octets.len()..].copy_from_slice(&partial_octets);
    Ok(Ipv4Addr::from(end_octets))
}

fn parse_cidr_range(s: &str) -> Result<Option<AddressRangeSpec>, TargetError> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let ipv4_addr = ip_str
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|e| TargetError::invalid(s, format!("bad network address '{ip_str}': {e}")))?;

    let prefix = prefix_str
        .trim()
        .parse::<u8>()
        .map_err(|e| TargetError::invalid(s, format!("bad prefix '{prefix_str}': {e}")))?;

    let ipv4_range =
        range::cidr_hosts(ipv4_addr, prefix).map_err(|e| TargetError::invalid(s, e.to_string()))?;
    check_size(s, &ipv4_range)?;

    Ok(Some(AddressRangeSpec::Range { ipv4_range }))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
