use std::path::PathBuf;

use anyhow::{bail, Context};

use crate::cli::{InventoryArgs, SourceArgs};
use crate::config::InventoryConfig;
use crate::inventory::collect_full_inventory;
use crate::output::{output_data, print_success, print_warning, write_output};
use crate::sources::SourceDir;

pub fn handle_inventory_command(
    mut config: InventoryConfig,
    args: &InventoryArgs,
) -> anyhow::Result<()> {
    apply_overrides(&mut config, args);
    config.validate().context("Invalid inventory settings")?;

    if !config.output.to_screen && !config.output.to_file {
        print_warning("Neither screen echo nor file output is enabled");
    }

    let source_dir = source_dir(&config, &args.sources);
    if !source_dir.is_dir() {
        bail!("Source directory {} does not exist", source_dir.display());
    }

    // Collect everything before emitting anything
    let record = collect_full_inventory(&SourceDir::new(&source_dir), &config)
        .with_context(|| format!("Failed to build inventory from {}", source_dir.display()))?;

    if config.output.to_screen {
        output_data(&record, config.output.screen_format)?;
    }
    if config.output.to_file {
        let target = PathBuf::from(&config.output.target);
        let written = write_output(&record, &target, config.output.max_shard_bytes)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        for path in written {
            print_success(&format!("Inventory written to {}", path.display()));
        }
    }
    Ok(())
}

/// Command line flags take precedence over the config file.
fn apply_overrides(config: &mut InventoryConfig, args: &InventoryArgs) {
    if let Some(output) = &args.output {
        config.output.target = output.to_string_lossy().into_owned();
    }
    if args.screen {
        config.output.to_screen = true;
    }
    if args.no_file {
        config.output.to_file = false;
    }
    if args.max_shard_bytes.is_some() {
        config.output.max_shard_bytes = args.max_shard_bytes;
    }
    if let Some(format) = args.format {
        config.output.screen_format = format;
    }
}

/// `--sources`, else the configured directory, else the working directory.
pub fn source_dir(config: &InventoryConfig, args: &SourceArgs) -> PathBuf {
    match &args.sources {
        Some(dir) => dir.clone(),
        None if config.source_dir.as_os_str().is_empty() => PathBuf::from("."),
        None => config.source_dir.clone(),
    }
}
