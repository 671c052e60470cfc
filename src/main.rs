mod cli;
mod commands;
mod config;
mod error;
mod inventory;
mod output;
mod sources;

use clap::Parser;
use cli::{Cli, Commands};
use commands::{handle_inventory_command, handle_parse_command};
use config::InventoryConfig;
use output::print_error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = InventoryConfig::load(cli.config.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(|config| match &cli.command {
            Commands::Inventory(args) => handle_inventory_command(config, args),
            Commands::Parse(cmd) => handle_parse_command(&config, cmd),
        });

    if let Err(e) = result {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
