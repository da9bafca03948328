use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::ProbeOutcome;
use super::liveness::{LivenessStrategy, LivenessTier};
use crate::error::ProbeError;

/// Ports tried, in order, when approximating liveness over TCP.
pub const LIVENESS_PORTS: [u16; 2] = [80, 443];

/// How a single connect attempt ended.
#[derive(Debug)]
pub enum Handshake {
    Accepted,
    /// RST: nothing listens, but the host itself is up.
    Refused,
    TimedOut,
    Error(io::Error),
}

pub async fn handshake(addr: IpAddr, port: u16, limit: Duration) -> Handshake {
    let socket_addr = SocketAddr::new(addr, port);
    match timeout(limit, TcpStream::connect(socket_addr)).await {
        Ok(Ok(_stream)) => Handshake::Accepted,
        Ok(Err(err)) if err.kind() == io::ErrorKind::ConnectionRefused => Handshake::Refused,
        Ok(Err(err)) => Handshake::Error(err),
        Err(_elapsed) => Handshake::TimedOut,
    }
}

/// Works without privileges, so it always terminates the fallback chain.
pub struct TcpTier {
    ports: Vec<u16>,
}

impl Default for TcpTier {
    fn default() -> Self {
        Self {
            ports: LIVENESS_PORTS.to_vec(),
        }
    }
}

#[async_trait]
impl LivenessTier for TcpTier {
    fn strategy(&self) -> LivenessStrategy {
        LivenessStrategy::TcpConnect
    }

    /// Each port gets an equal share of the timeout.
    async fn attempt(&self, addr: IpAddr, limit: Duration) -> ProbeOutcome {
        let share = limit / self.ports.len().max(1) as u32;
        let mut last_error: Option<io::Error> = None;
        let mut silent = false;

        for &port in &self.ports {
            let started = Instant::now();
            match handshake(addr, port, share).await {
                Handshake::Accepted | Handshake::Refused => {
                    return ProbeOutcome::Responded(started.elapsed());
                }
                Handshake::TimedOut => silent = true,
                Handshake::Error(err) => last_error = Some(err),
            }
        }

        match last_error {
            Some(err) if !silent => ProbeOutcome::Failed(ProbeError::Io(err)),
            _ => ProbeOutcome::NoResponse,
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn handshake_accepts_on_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let result = handshake(LOCALHOST, port, Duration::from_secs(1)).await;
        assert!(matches!(result, Handshake::Accepted));
    }

    #[tokio::test]
    async fn handshake_reports_refusal_on_closed_port() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = handshake(LOCALHOST, port, Duration::from_secs(1)).await;
        assert!(matches!(result, Handshake::Refused));
    }

    #[tokio::test]
    async fn refused_connection_means_alive() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let tier = TcpTier { ports: vec![port] };
        let outcome = tier.attempt(LOCALHOST, Duration::from_secs(1)).await;
        assert!(matches!(outcome, ProbeOutcome::Responded(_)));
    }

    #[tokio::test]
    #[ignore]
    async fn unroutable_address_is_silent() {
        let tier = TcpTier::default();
        let outcome = tier
            .attempt(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1)), Duration::from_millis(200))
            .await;
        assert!(matches!(outcome, ProbeOutcome::NoResponse));
    }
}
