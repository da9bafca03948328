use super::ScanArgs;
use super::run;

/// Host discovery only. An empty port list switches the port phase off.
pub async fn discover(args: ScanArgs, q_level: u8) -> anyhow::Result<()> {
    let config = args.to_config()?.with_ports(Vec::new());

    let outcome = run::execute(&args.targets, config, "discovering").await?;
    run::report(&outcome, "Network Discovery", false, q_level);
    Ok(())
}
