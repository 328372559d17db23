mod commands;
mod terminal;

use commands::{CommandLine, Commands, inventory, run, validator_ranges};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    match commands.command {
        Commands::Run {
            config,
            once,
            log_level,
        } => {
            let cfg = commands::load_config(config.as_deref())?;
            let level = log_level.unwrap_or_else(|| cfg.logging.level.clone());
            logging::init_logging(&level)?;
            print::header("starting cartographer");
            run::run(cfg, once).await
        }
        Commands::ValidatorRanges { config } => {
            let cfg = commands::load_config(Some(config.as_path()))?;
            logging::init_logging(&cfg.logging.level)?;
            print::header("generating validator ranges");
            validator_ranges::validator_ranges(cfg).await
        }
        Commands::Inventory { config } => {
            let cfg = commands::load_config(Some(config.as_path()))?;
            logging::init_logging(&cfg.logging.level)?;
            print::header("generating client inventory");
            inventory::inventory(cfg).await
        }
    }
}
