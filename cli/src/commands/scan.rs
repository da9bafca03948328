use netsweep_common::network::ports::PortSet;

use super::ScanArgs;
use super::run;

pub async fn scan(args: ScanArgs, ports: Option<PortSet>, q_level: u8) -> anyhow::Result<()> {
    let mut config = args.to_config()?;
    if let Some(ports) = ports {
        config = config.with_ports(ports.into());
    }
    let with_ports = !config.resolved_ports().is_empty();

    let outcome = run::execute(&args.targets, config, "scanning").await?;
    run::report(&outcome, "Port Scan", with_ports, q_level);
    Ok(())
}
