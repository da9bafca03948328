//! Drives one scan from the terminal: progress bar while it runs, Ctrl-C
//! handling, and the host tree once it is over.

use std::time::{Duration, Instant};

use anyhow::bail;
use colored::*;
use netsweep_common::config::ScanConfiguration;
use netsweep_common::event::ScanEvent;
use netsweep_common::network::host::HostRecord;
use netsweep_core::ScanCoordinator;
use tracing::{debug, error, warn};

use crate::nprint;
use crate::terminal::progress::ScanProgressBar;
use crate::terminal::{colors, format, print};

pub struct Outcome {
    pub hosts: Vec<HostRecord>,
    pub elapsed: Duration,
    pub interrupted: bool,
}

pub async fn execute(
    targets: &[String],
    config: ScanConfiguration,
    label: &str,
) -> anyhow::Result<Outcome> {
    let coordinator = ScanCoordinator::new();
    let mut events = coordinator.subscribe_channel();
    let start_time = Instant::now();

    if !coordinator.start(targets, config) {
        while let Ok(event) = events.try_recv() {
            if let ScanEvent::Error(msg) = event {
                error!("{msg}");
            }
        }
        bail!("nothing to scan");
    }

    let bar = ScanProgressBar::new(label)?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut watching_signal = true;
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ScanEvent::Progress(progress)) => bar.update(&progress),
                Some(ScanEvent::HostFound(host)) => {
                    debug!("{} is up, open ports: [{}]", host.display_name(), format::format_ports(&host.open_ports()));
                }
                Some(ScanEvent::Error(msg)) => warn!("{msg}"),
                Some(ScanEvent::Complete) | None => break,
            },
            signal = &mut ctrl_c, if watching_signal => {
                watching_signal = false;
                match signal {
                    Ok(()) => {
                        interrupted = true;
                        warn!("Interrupted, stopping the scan");
                        coordinator.stop().await;
                    }
                    Err(err) => debug!("Ctrl-C handler unavailable: {err}"),
                }
            }
        }
    }
    bar.finish();

    Ok(Outcome {
        hosts: coordinator.alive_hosts(),
        elapsed: start_time.elapsed(),
        interrupted,
    })
}

pub fn report(outcome: &Outcome, title: &str, with_ports: bool, q_level: u8) {
    if outcome.hosts.is_empty() {
        print::header("zero hosts detected", q_level);
        print::no_results();
        return;
    }

    if q_level > 0 {
        nprint!();
    }

    print::header(title, q_level);
    if q_level < 2 {
        print_hosts(&outcome.hosts, with_ports);
    }
    print_summary(outcome, with_ports, q_level);
}

fn print_hosts(hosts: &[HostRecord], with_ports: bool) {
    for (idx, host) in hosts.iter().enumerate() {
        print::tree_head(idx, &host.display_name());
        print::as_tree_one_level(format::host_to_details(host, with_ports));
        if idx + 1 != hosts.len() {
            nprint!();
        }
    }
}

fn print_summary(outcome: &Outcome, with_ports: bool, q_level: u8) {
    let active_hosts: ColoredString = format!("{} active hosts", outcome.hosts.len()).bold().green();
    let total_time: ColoredString = format!("{:.2}s", outcome.elapsed.as_secs_f64()).bold().yellow();
    let verb = if outcome.interrupted { "Interrupted" } else { "Complete" };

    let mut output = format!("{verb}: {active_hosts}");
    if with_ports {
        let open: usize = outcome.hosts.iter().map(|host| host.open_ports().len()).sum();
        output.push_str(&format!(", {}", format!("{open} open ports").bold().green()));
    }
    output.push_str(&format!(" in {total_time}"));
    let output = output.color(colors::TEXT_DEFAULT).to_string();

    match q_level {
        0 => {
            print::fat_separator();
            print::centerln(&output);
        }
        _ => {
            nprint!();
            print::print_status(&output);
        }
    }
}
