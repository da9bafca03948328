use std::io;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};

use super::ProbeOutcome;
use super::liveness::{Capability, LivenessStrategy, LivenessTier};
use crate::error::ProbeError;

const PAYLOAD: [u8; 56] = [0; 56];

/// ICMP echo through `surge-ping`. One client per address family.
pub struct IcmpTier {
    v4: Client,
    v6: Option<Client>,
}

impl IcmpTier {
    /// Opening the v4 socket decides availability; v6 is optional.
    ///
    /// Must run inside a Tokio runtime.
    pub fn detect() -> Result<Self, Capability> {
        let v4 = Client::new(&Config::default()).map_err(socket_capability)?;
        let v6 = Client::new(&Config::builder().kind(ICMP::V6).build()).ok();
        Ok(Self { v4, v6 })
    }
}

fn socket_capability(err: io::Error) -> Capability {
    match err.kind() {
        io::ErrorKind::PermissionDenied => {
            Capability::Unavailable("ICMP sockets are not permitted for this user".to_string())
        }
        _ => Capability::Error(err.to_string()),
    }
}

#[async_trait]
impl LivenessTier for IcmpTier {
    fn strategy(&self) -> LivenessStrategy {
        LivenessStrategy::Icmp
    }

    async fn attempt(&self, addr: IpAddr, timeout: Duration) -> ProbeOutcome {
        let client = match addr {
            IpAddr::V4(_) => &self.v4,
            IpAddr::V6(_) => match &self.v6 {
                Some(client) => client,
                None => return ProbeOutcome::Unavailable("no ICMPv6 socket".to_string()),
            },
        };

        let mut pinger = client.pinger(addr, PingIdentifier(rand::random())).await;
        pinger.timeout(timeout);

        match pinger.ping(PingSequence(0), &PAYLOAD).await {
            Ok((_packet, rtt)) => ProbeOutcome::Responded(rtt),
            Err(SurgeError::Timeout { .. }) => ProbeOutcome::NoResponse,
            Err(SurgeError::IOError(err)) => ProbeOutcome::Failed(ProbeError::Io(err)),
            Err(err) => ProbeOutcome::Failed(ProbeError::Task(err.to_string())),
        }
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
