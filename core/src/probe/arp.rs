use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use is_root::is_root;
use netsweep_common::network::interface::{self, LanInterface};
use netsweep_protocols::{arp, ethernet};

use super::ProbeOutcome;
use super::liveness::{Capability, LivenessStrategy, LivenessTier};
use crate::error::ProbeError;
use crate::network::channel;

/// ARP who-has against neighbours on the LAN interface. Needs root.
pub struct ArpTier {
    lan: LanInterface,
}

impl ArpTier {
    pub fn detect() -> Result<Self, Capability> {
        if !is_root() {
            return Err(Capability::Unavailable(
                "link-layer probing requires root".to_string(),
            ));
        }
        let lan = interface::get_lan_interface()
            .map_err(|e| Capability::Unavailable(e.to_string()))?;
        Ok(Self { lan })
    }
}

#[async_trait]
impl LivenessTier for ArpTier {
    fn strategy(&self) -> LivenessStrategy {
        LivenessStrategy::Arp
    }

    async fn attempt(&self, addr: IpAddr, timeout: Duration) -> ProbeOutcome {
        let IpAddr::V4(target) = addr else {
            return ProbeOutcome::Unavailable("ARP is IPv4 only".to_string());
        };
        if !self.lan.is_neighbour(addr) {
            return ProbeOutcome::Unavailable(format!("{addr} is not on {}", self.lan.ipv4_net));
        }

        let lan = self.lan.clone();
        let roundtrip = tokio::task::spawn_blocking(move || arp_roundtrip(&lan, target, timeout)).await;

        match roundtrip {
            Ok(Ok(Some(rtt))) => ProbeOutcome::Responded(rtt),
            Ok(Ok(None)) => ProbeOutcome::NoResponse,
            Ok(Err(err)) => ProbeOutcome::Failed(err),
            Err(join_err) => ProbeOutcome::Failed(ProbeError::Task(join_err.to_string())),
        }
    }
}

/// Sends one request and waits for the matching reply until `timeout` runs out.
fn arp_roundtrip(
    lan: &LanInterface,
    target: Ipv4Addr,
    timeout: Duration,
) -> Result<Option<Duration>, ProbeError> {
    let (mut tx, mut rx) = channel::open_default(&lan.interface).map_err(ProbeError::Channel)?;
    let request = arp::create_request(lan.mac, lan.source_addr(), target)
        .map_err(|e| ProbeError::Channel(e.into()))?;

    let sent = Instant::now();
    match tx.send_to(&request, None) {
        Some(Ok(())) => {}
        Some(Err(err)) => return Err(ProbeError::Io(err)),
        None => return Err(ProbeError::Task("datalink sender refused the frame".to_string())),
    }

    let deadline = sent + timeout;
    while Instant::now() < deadline {
        // Read errors are mostly the channel's own read timeout.
        let Ok(frame) = rx.next() else {
            continue;
        };
        let Ok(packet) = ethernet::get_packet_from_u8(frame) else {
            continue;
        };
        if let Some(reply) = arp::parse_reply(&packet)
            && reply.sender_addr == target
        {
            return Ok(Some(sent.elapsed()));
        }
    }
    Ok(None)
}
