use std::time::Duration;

use anyhow::{Context, bail};
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use tracing::debug;

pub type EthChannel = (Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>);

/// Opens an ethernet channel on `intf` through `channel_opener`.
///
/// The opener is injectable so the error paths can be tested without privileges.
pub fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> anyhow::Result<EthChannel>
where
    F: FnOnce(&NetworkInterface, Config) -> std::io::Result<Channel>,
{
    let ch: Channel =
        channel_opener(intf, *cfg).with_context(|| format!("opening on {}", intf.name))?;
    match ch {
        Channel::Ethernet(tx, rx) => {
            debug!("Ethernet channel open on {}", intf.name);
            Ok((tx, rx))
        }
        _ => bail!("non-ethernet channel for {}", intf.name),
    }
}

/// Short read timeout so receive loops can observe their own deadline.
pub fn link_config() -> Config {
    Config {
        read_timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    }
}

pub fn open_default(intf: &NetworkInterface) -> anyhow::Result<EthChannel> {
    open_eth_channel(intf, &link_config(), datalink::channel)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
