#![cfg(test)]
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use netsweep_common::config::{ScanConfiguration, ScanMode};
use netsweep_common::event::ScanEvent;
use netsweep_common::progress::ScanProgress;
use netsweep_core::ScanCoordinator;
use netsweep_core::probe::{Probers, SimulatedHostProber, SimulatedPortProber};
use netsweep_core::scanner::NoopResolver;

use crate::util::{assert_silent, count_complete, until_complete};

fn simulated(alive: f64, open: f64) -> ScanCoordinator {
    ScanCoordinator::new()
        .with_probers(Probers::new(
            Arc::new(SimulatedHostProber::with_ratio(alive)),
            Arc::new(SimulatedPortProber::with_ratio(open)),
        ))
        .with_resolver(Arc::new(NoopResolver))
}

fn config() -> ScanConfiguration {
    ScanConfiguration::new(ScanMode::Light)
        .with_timeout(Duration::from_millis(200))
        .with_max_threads(4)
        .with_resolve_hostnames(false)
}

fn progress_of(events: &[ScanEvent]) -> Vec<ScanProgress> {
    events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::Progress(p) => Some(p.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn no_valid_targets_reports_and_stays_idle() {
    let coordinator = simulated(1.0, 0.0);
    let mut rx = coordinator.subscribe_channel();
    let specs: [&str; 0] = [];

    assert!(!coordinator.start(&specs, config()));
    assert!(!coordinator.is_running());
    assert_eq!(
        rx.try_recv().ok(),
        Some(ScanEvent::Error("no valid targets to scan".to_string()))
    );
    assert!(coordinator.progress().is_none());
}

#[tokio::test]
async fn malformed_specs_are_skipped() {
    let coordinator = simulated(1.0, 0.0);
    let mut rx = coordinator.subscribe_channel();

    assert!(coordinator.start(&["10.0.0.300", "10.0.0.1"], config()));
    let events = until_complete(&mut rx).await;

    let errors = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::Error(msg) if msg.contains("10.0.0.300")))
        .count();
    assert_eq!(errors, 1);

    let results = coordinator.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].address, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
}

#[tokio::test]
async fn stop_while_idle_is_a_no_op() {
    let coordinator = simulated(1.0, 0.0);
    let mut rx = coordinator.subscribe_channel();

    coordinator.stop().await;

    assert!(!coordinator.is_running());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn only_one_scan_at_a_time() {
    let coordinator = simulated(1.0, 0.5);
    let mut rx = coordinator.subscribe_channel();

    assert!(coordinator.start(&["10.2.0.0/24"], config()));
    assert!(!coordinator.start(&["10.3.0.1"], config()));

    coordinator.stop().await;
    let events = until_complete(&mut rx).await;
    assert_eq!(count_complete(&events), 1);
    assert!(coordinator.results().iter().all(|h| match h.address {
        IpAddr::V4(v4) => v4.octets()[..3] == [10, 2, 0],
        IpAddr::V6(_) => false,
    }));
}

#[tokio::test]
async fn stop_ends_a_large_sweep_promptly() {
    let coordinator = simulated(0.3, 0.05);
    let mut rx = coordinator.subscribe_channel();

    assert!(coordinator.start(&["10.4.0.0/24"], config()));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stopping = Instant::now();
    coordinator.stop().await;
    assert!(stopping.elapsed() < Duration::from_secs(1));
    assert!(!coordinator.is_running());

    let events = until_complete(&mut rx).await;
    assert_eq!(count_complete(&events), 1);
    assert!(matches!(events.last(), Some(ScanEvent::Complete)));

    let last = progress_of(&events).pop().unwrap();
    assert!(!last.is_running);
    assert!(last.hosts_scanned < last.hosts_total);
    assert_silent(&mut rx).await;
}

#[tokio::test]
async fn progress_is_monotonic_and_ends_complete() {
    let coordinator = simulated(1.0, 0.5);
    let mut rx = coordinator.subscribe_channel();
    let config = config().with_ports(vec![22, 80, 443]);

    assert!(coordinator.start(&["10.1.0.0/29"], config));
    let events = until_complete(&mut rx).await;

    let snapshots = progress_of(&events);
    for pair in snapshots.windows(2) {
        assert!(pair[0].hosts_scanned <= pair[1].hosts_scanned);
        assert!(pair[0].ports_scanned <= pair[1].ports_scanned);
        assert!(pair[0].hosts_found <= pair[1].hosts_found);
        assert!(pair[0].open_ports_found <= pair[1].open_ports_found);
    }

    let last = snapshots.last().unwrap();
    assert!(!last.is_running);
    assert_eq!((last.hosts_total, last.hosts_scanned, last.hosts_found), (6, 6, 6));
    assert_eq!((last.ports_total, last.ports_scanned), (18, 18));

    let open: usize = coordinator.results().iter().map(|h| h.open_ports().len()).sum();
    assert_eq!(last.open_ports_found, open);
}

#[tokio::test]
async fn restart_replaces_previous_results() {
    let coordinator = simulated(1.0, 0.0);
    let mut rx = coordinator.subscribe_channel();

    assert!(coordinator.start(&["10.5.0.1-4"], config()));
    until_complete(&mut rx).await;
    assert_eq!(coordinator.alive_hosts().len(), 4);

    assert!(coordinator.start(&["10.6.0.9"], config()));
    until_complete(&mut rx).await;

    let results = coordinator.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].address, IpAddr::V4(Ipv4Addr::new(10, 6, 0, 9)));
}
