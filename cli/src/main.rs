mod commands;
mod terminal;

use commands::{CommandLine, Commands, discover, info, scan};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();
    let q_level = commands.quiet;

    logging::init_logging(q_level);

    match commands.command {
        Commands::Info => {
            print::header("about this host", q_level);
            info::info(q_level).await
        }
        Commands::Discover { args } => {
            print::header("getting ready for discovery", q_level);
            discover::discover(args, q_level).await
        }
        Commands::Scan { args, ports } => {
            print::header("starting scanner", q_level);
            scan::scan(args, ports, q_level).await
        }
    }
}
