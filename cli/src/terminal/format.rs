use std::net::{IpAddr, Ipv6Addr};

use colored::*;
use netsweep_common::network::host::HostRecord;

use crate::terminal::colors;

pub fn ipv6_to_type_str(ipv6_addr: &Ipv6Addr) -> &'static str {
    if is_global_unicast(ipv6_addr) {
        return "GUA";
    }
    if ipv6_addr.is_unique_local() {
        return "ULA";
    }
    if ipv6_addr.is_unicast_link_local() {
        return "LLA";
    }
    "IPv6"
}

// 2000::/3
fn is_global_unicast(ipv6_addr: &Ipv6Addr) -> bool {
    let first_byte = ipv6_addr.octets()[0];
    (0x20..=0x3F).contains(&first_byte)
}

pub fn ip_to_key_value_pair(ip: &IpAddr) -> (String, ColoredString) {
    match ip {
        IpAddr::V4(ipv4_addr) => (
            String::from("IPv4"),
            ipv4_addr.to_string().color(colors::IPV4_ADDR),
        ),
        IpAddr::V6(ipv6_addr) => (
            String::from(ipv6_to_type_str(ipv6_addr)),
            ipv6_addr.to_string().color(colors::IPV6_ADDR),
        ),
    }
}

pub fn format_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Tree rows printed under a host's name.
pub fn host_to_details(host: &HostRecord, with_ports: bool) -> Vec<(String, ColoredString)> {
    let mut details = vec![ip_to_key_value_pair(&host.address)];

    if let Some(hostname) = &host.hostname {
        details.push(("Hostname".to_string(), hostname.color(colors::SECONDARY)));
    }
    if let Some(rtt) = host.response_time_ms() {
        details.push(("Latency".to_string(), format!("{rtt:.1} ms").color(colors::LATENCY)));
    }
    if with_ports {
        let ports = host.open_ports();
        let value = if ports.is_empty() {
            "none".color(colors::SEPARATOR)
        } else {
            format_ports(&ports).color(colors::PORT_OPEN)
        };
        details.push(("Ports".to_string(), value));
    }

    details
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
