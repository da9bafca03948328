use colored::*;
use netsweep_common::network::interface;
use netsweep_core::probe::{Capability, NetworkHostProber};

use crate::nprint;
use crate::terminal::{colors, print};

pub async fn info(q_level: u8) -> anyhow::Result<()> {
    print::header("privileges", q_level);
    let privileges = if is_root::is_root() {
        "elevated".color(colors::PRIMARY)
    } else {
        "unprivileged".color(colors::ACCENT)
    };
    print::aligned_line("Process", privileges);

    nprint!();
    print::header("local network", q_level);
    match interface::get_lan_interface() {
        Ok(lan) => {
            print::aligned_line("Interface", lan.interface.name.clone());
            print::aligned_line("Network", lan.ipv4_net.to_string().color(colors::IPV4_ADDR));
            print::aligned_line("Address", lan.source_addr().to_string().color(colors::IPV4_ADDR));
            print::aligned_line("MAC", lan.mac.to_string());
        }
        Err(err) => print::aligned_line("Interface", format!("{err:#}").color(colors::ACCENT)),
    }

    nprint!();
    print::header("liveness strategies", q_level);
    let prober = NetworkHostProber::detect().await;
    for (strategy, capability) in &prober.report().entries {
        let value = match capability {
            Capability::Available => "available".color(colors::PRIMARY),
            Capability::Unavailable(reason) => format!("unavailable ({reason})").color(colors::ACCENT),
            Capability::Error(reason) => format!("error ({reason})").red(),
        };
        print::aligned_line(&strategy.to_string(), value);
    }
    print::aligned_line("Chain", prober.describe());

    Ok(())
}
