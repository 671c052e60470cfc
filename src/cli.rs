use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::OutputFormat;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "linux-inventory")]
#[command(about = "Normalize captured Linux host facts into one inventory record")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the full inventory record from a source directory
    Inventory(InventoryArgs),

    /// Run a single parser over the captured sources
    #[command(subcommand)]
    Parse(ParseCommands),
}

#[derive(Args)]
pub struct InventoryArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Output file name
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Echo the record to stdout
    #[arg(long)]
    pub screen: bool,

    /// Do not write the output file
    #[arg(long)]
    pub no_file: bool,

    /// Split the output file into shards of at most this many bytes
    #[arg(long)]
    pub max_shard_bytes: Option<usize>,

    /// Screen format (json or yaml)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Args, Clone)]
pub struct SourceArgs {
    /// Directory holding the captured command output
    #[arg(short, long)]
    pub sources: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ParseCommands {
    /// Classify the lshw hardware tree
    Hardware {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format (json or yaml)
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Merge ip link/addr/route output
    Network {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format (json or yaml)
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Normalize listening sockets and containers
    Ports {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format (json or yaml)
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Merge lshw storage with RAID tool output
    Storage {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format (json or yaml)
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Extract installed package versions
    Packages {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format (json or yaml)
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Parse the volume listing
    Volumes {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format (json or yaml)
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Read hostname, OS release, kernel and users
    Os {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format (json or yaml)
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_inventory_flags() {
        let cli = Cli::try_parse_from([
            "linux-inventory",
            "-vv",
            "inventory",
            "--sources",
            "/srv/captures/db-01",
            "--screen",
            "--no-file",
            "--format",
            "yaml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Inventory(args) => {
                assert_eq!(args.sources.sources, Some(PathBuf::from("/srv/captures/db-01")));
                assert!(args.screen);
                assert!(args.no_file);
                assert_eq!(args.format, Some(OutputFormat::Yaml));
            }
            _ => panic!("expected inventory command"),
        }
    }
}
