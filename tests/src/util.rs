#![cfg(test)]
use std::sync::Arc;
use std::time::Duration;

use netsweep_common::event::ScanEvent;
use netsweep_core::ScanCoordinator;
use netsweep_core::probe::tcp::TcpTier;
use netsweep_core::probe::{NetworkHostProber, Probers, TcpPortProber};
use netsweep_core::scanner::NoopResolver;
use tokio::sync::mpsc::UnboundedReceiver;

/// Real sockets, TCP liveness only, no DNS.
pub fn loopback_coordinator() -> ScanCoordinator {
    let host = NetworkHostProber::with_tiers(vec![Box::new(TcpTier::default())]);
    ScanCoordinator::new()
        .with_probers(Probers::new(Arc::new(host), Arc::new(TcpPortProber)))
        .with_resolver(Arc::new(NoopResolver))
}

/// Collects events up to and including the completion event.
pub async fn until_complete(rx: &mut UnboundedReceiver<ScanEvent>) -> Vec<ScanEvent> {
    let mut events = Vec::new();
    tokio::time::timeout(Duration::from_secs(20), async {
        while let Some(event) = rx.recv().await {
            let done = event == ScanEvent::Complete;
            events.push(event);
            if done {
                break;
            }
        }
    })
    .await
    .expect("scan did not complete in time");
    events
}

pub fn count_complete(events: &[ScanEvent]) -> usize {
    events.iter().filter(|e| **e == ScanEvent::Complete).count()
}

/// Nothing may arrive once the completion event has been seen.
pub async fn assert_silent(rx: &mut UnboundedReceiver<ScanEvent>) {
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err(), "event emitted after completion");
}
