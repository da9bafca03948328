#![cfg(test)]
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use netsweep_common::config::{ScanConfiguration, ScanMode};
use netsweep_common::event::ScanEvent;
use netsweep_core::ScanCoordinator;
use tokio::net::TcpListener;

use crate::util::{assert_silent, count_complete, loopback_coordinator, until_complete};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

fn discovery_only() -> ScanConfiguration {
    ScanConfiguration::new(ScanMode::Light)
        .with_ports(Vec::new())
        .with_timeout(Duration::from_secs(1))
        .with_resolve_hostnames(false)
}

#[tokio::test]
async fn discovery_single_loopback() {
    let coordinator = loopback_coordinator();
    let mut rx = coordinator.subscribe_channel();

    assert!(coordinator.start(&["127.0.0.1"], discovery_only()));
    let events = until_complete(&mut rx).await;

    assert_eq!(count_complete(&events), 1);
    assert!(events.iter().any(|e| matches!(e, ScanEvent::HostFound(h) if h.address == LOCALHOST)));

    let hosts = coordinator.alive_hosts();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].address, LOCALHOST);
    assert!(hosts[0].response_time().is_some());
    assert!(hosts[0].open_ports().is_empty());
    assert_silent(&mut rx).await;
}

#[tokio::test]
async fn light_scan_of_loopback_with_web_ports() {
    let coordinator = loopback_coordinator();
    let mut rx = coordinator.subscribe_channel();
    let config = ScanConfiguration::new(ScanMode::Light)
        .with_ports(vec![80, 443])
        .with_timeout(Duration::from_secs(1))
        .with_resolve_hostnames(false);

    assert!(coordinator.start(&["127.0.0.1"], config));
    let events = until_complete(&mut rx).await;

    assert_eq!(count_complete(&events), 1);
    assert!(!events.iter().any(|e| matches!(e, ScanEvent::Error(_))));

    let hosts = coordinator.alive_hosts();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].address, LOCALHOST);
    assert!(hosts[0].open_ports().is_empty());

    let progress = coordinator.progress().unwrap();
    assert_eq!((progress.ports_total, progress.ports_scanned), (2, 2));
    assert!(!progress.is_running);
    assert_silent(&mut rx).await;
}

#[tokio::test]
async fn discovery_range_loopback() {
    let coordinator = loopback_coordinator();
    let mut rx = coordinator.subscribe_channel();

    assert!(coordinator.start(&["127.0.0.1-3"], discovery_only()));
    until_complete(&mut rx).await;

    let addresses: Vec<IpAddr> = coordinator.results().iter().map(|h| h.address).collect();
    assert_eq!(
        addresses,
        vec![
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)),
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 3)),
        ]
    );
    let progress = coordinator.progress().unwrap();
    assert_eq!((progress.hosts_total, progress.hosts_scanned), (3, 3));
    assert!(!progress.is_running);
}

#[tokio::test]
async fn listening_port_is_reported_open() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap().port();
    let closed = {
        let spare = TcpListener::bind("127.0.0.1:0").await.unwrap();
        spare.local_addr().unwrap().port()
    };

    let coordinator = loopback_coordinator();
    let mut rx = coordinator.subscribe_channel();
    let config = discovery_only().with_ports(vec![closed, open]);

    assert!(coordinator.start(&["127.0.0.1"], config));
    let events = until_complete(&mut rx).await;

    let with_port = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::HostFound(h) if h.open_ports() == vec![open]))
        .count();
    assert_eq!(with_port, 1);

    let hosts = coordinator.hosts_with_open_ports();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].open_ports(), vec![open]);

    let progress = coordinator.progress().unwrap();
    assert_eq!((progress.ports_total, progress.ports_scanned), (2, 2));
    assert_eq!(progress.open_ports_found, 1);
    drop(listener);
}

/// Uses whatever strategies the host offers, including raw sockets.
#[tokio::test]
#[ignore = "depends on local privileges and network setup"]
async fn detected_strategies_find_the_gateway_network() {
    let coordinator = ScanCoordinator::new();
    let mut rx = coordinator.subscribe_channel();
    let config = ScanConfiguration::new(ScanMode::Light).with_timeout(Duration::from_millis(500));

    assert!(coordinator.start(&["lan"], config));
    let events = until_complete(&mut rx).await;

    assert_eq!(count_complete(&events), 1);
    assert!(!coordinator.alive_hosts().is_empty());
}
