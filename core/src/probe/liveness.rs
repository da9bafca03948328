//! Tiered host liveness.
//!
//! Capabilities are detected once when the prober is built. Each host then
//! walks the resulting chain from the most precise tier down, moving on only
//! when a tier is unavailable for that host or fails at runtime. A clean
//! "no response" ends the walk: the host is dead.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use netsweep_common::network::host::Liveness;
use tracing::{debug, trace};

use super::arp::ArpTier;
use super::icmp::IcmpTier;
use super::tcp::TcpTier;
use super::{HostProber, ProbeOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LivenessStrategy {
    /// Link-layer address resolution on the local subnet.
    Arp,
    /// ICMP echo.
    Icmp,
    /// TCP connect to a well-known port.
    TcpConnect,
}

impl fmt::Display for LivenessStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LivenessStrategy::Arp => "arp",
            LivenessStrategy::Icmp => "icmp",
            LivenessStrategy::TcpConnect => "tcp-connect",
        };
        f.write_str(name)
    }
}

/// Whether a strategy can run in this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Available,
    /// Not applicable here, e.g. missing privileges or no LAN interface.
    Unavailable(String),
    /// Detection itself failed.
    Error(String),
}

impl Capability {
    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available)
    }
}

/// One strategy in the fallback chain.
#[async_trait]
pub trait LivenessTier: Send + Sync {
    fn strategy(&self) -> LivenessStrategy;

    async fn attempt(&self, addr: IpAddr, timeout: Duration) -> ProbeOutcome;
}

/// What detection found, in chain order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityReport {
    pub entries: Vec<(LivenessStrategy, Capability)>,
}

impl CapabilityReport {
    pub fn available(&self) -> impl Iterator<Item = LivenessStrategy> + '_ {
        self.entries
            .iter()
            .filter(|(_, capability)| capability.is_available())
            .map(|(strategy, _)| *strategy)
    }
}

/// The production [`HostProber`].
pub struct NetworkHostProber {
    tiers: Vec<Box<dyn LivenessTier>>,
    report: CapabilityReport,
}

impl NetworkHostProber {
    /// Resolves the chain from the privileges and interfaces of this process.
    ///
    /// TCP connect needs nothing special and always closes the chain.
    pub async fn detect() -> Self {
        let mut tiers: Vec<Box<dyn LivenessTier>> = Vec::new();
        let mut report = CapabilityReport::default();

        match ArpTier::detect() {
            Ok(tier) => {
                report.entries.push((LivenessStrategy::Arp, Capability::Available));
                tiers.push(Box::new(tier));
            }
            Err(capability) => report.entries.push((LivenessStrategy::Arp, capability)),
        }

        match IcmpTier::detect() {
            Ok(tier) => {
                report.entries.push((LivenessStrategy::Icmp, Capability::Available));
                tiers.push(Box::new(tier));
            }
            Err(capability) => report.entries.push((LivenessStrategy::Icmp, capability)),
        }

        report
            .entries
            .push((LivenessStrategy::TcpConnect, Capability::Available));
        tiers.push(Box::new(TcpTier::default()));

        for (strategy, capability) in &report.entries {
            debug!("Liveness tier {strategy}: {capability:?}");
        }
        Self { tiers, report }
    }

    /// A prober over an explicit chain.
    pub fn with_tiers(tiers: Vec<Box<dyn LivenessTier>>) -> Self {
        let report = CapabilityReport {
            entries: tiers
                .iter()
                .map(|tier| (tier.strategy(), Capability::Available))
                .collect(),
        };
        Self { tiers, report }
    }

    pub fn report(&self) -> &CapabilityReport {
        &self.report
    }

    /// Chain summary such as `arp -> icmp -> tcp-connect`.
    pub fn describe(&self) -> String {
        self.tiers
            .iter()
            .map(|tier| tier.strategy().to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

#[async_trait]
impl HostProber for NetworkHostProber {
    async fn probe(&self, addr: IpAddr, timeout: Duration) -> Liveness {
        for tier in &self.tiers {
            match tier.attempt(addr, timeout).await {
                ProbeOutcome::Responded(rtt) => {
                    trace!("{addr} answered {} in {rtt:?}", tier.strategy());
                    return Liveness::Alive { rtt };
                }
                ProbeOutcome::NoResponse => return Liveness::Dead,
                ProbeOutcome::Unavailable(reason) => {
                    trace!("{} skipped for {addr}: {reason}", tier.strategy());
                }
                ProbeOutcome::Failed(err) => {
                    debug!("{} failed for {addr}, falling back: {err}", tier.strategy());
                }
            }
        }
        Liveness::Dead
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
