use anyhow::Context;
use serde_json::{Map, Value};

use crate::cli::{ParseCommands, SourceArgs};
use crate::commands::inventory::source_dir;
use crate::config::InventoryConfig;
use crate::inventory::collect_hardware::ClassifyTarget;
use crate::inventory::collect_network::InterfaceMapBuilder;
use crate::inventory::types::InventoryRecord;
use crate::inventory::{
    collect_hardware_info, collect_listen_ports, collect_network_info, collect_os_info,
    collect_packages, collect_storage_info, collect_volumes,
};
use crate::output::output_data;
use crate::sources::{self, SourceDir, SourceReader};

const HARDWARE_FIELDS: &[&str] = &[
    "is_vm",
    "system_vendor",
    "system_platform",
    "system_platform_version",
    "system_serial",
    "cpu_model",
    "cpu_count",
    "cpu_count_of_all_cores",
    "mb_vendor",
    "mb_model",
    "mb_version",
    "mb_serial",
    "mb_bios_vendor",
    "mb_bios_version",
    "mb_bios_date",
    "memory_size_in_gb",
    "memory_modules_count",
    "memory_modules",
    "vga",
    "storages",
    "disks",
    "psu_count",
    "psu",
    "network_interfaces",
];
const NETWORK_FIELDS: &[&str] = &[
    "network_all_ip_addresses",
    "network_routes_all",
    "network_interfaces",
];
const PORT_FIELDS: &[&str] = &["network_listen_ports_list", "network_listen_ports", "containers"];
const STORAGE_FIELDS: &[&str] = &["storages", "disks"];
const OS_FIELDS: &[&str] = &[
    "date_of_inventory",
    "os_hostname",
    "os_version",
    "os_core",
    "os_users",
    "os_ssl_version",
    "os_ssh_version",
    "os_ssh_port",
];

pub fn handle_parse_command(config: &InventoryConfig, cmd: &ParseCommands) -> anyhow::Result<()> {
    match cmd {
        ParseCommands::Hardware { sources, format } => {
            let source = open(config, sources);
            let mut record = InventoryRecord::default();
            classify_hardware(&source, config, &mut record)?;
            output_data(&select(&record, HARDWARE_FIELDS)?, *format)?;
        }
        ParseCommands::Network { sources, format } => {
            let source = open(config, sources);
            let mut interfaces = InterfaceMapBuilder::new();
            collect_network_info(&source, &mut interfaces).context("Network passes failed")?;

            let network = interfaces.finish();
            let record = InventoryRecord {
                network_interfaces: network.interfaces,
                network_all_ip_addresses: network.all_ip_addresses,
                network_routes_all: network.routes_all,
                ..Default::default()
            };
            output_data(&select(&record, NETWORK_FIELDS)?, *format)?;
        }
        ParseCommands::Ports { sources, format } => {
            let source = open(config, sources);
            let mut record = InventoryRecord::default();
            collect_listen_ports(&source, &mut record).context("Listening port parsing failed")?;
            output_data(&select(&record, PORT_FIELDS)?, *format)?;
        }
        ParseCommands::Storage { sources, format } => {
            let source = open(config, sources);
            let mut record = InventoryRecord::default();
            classify_hardware(&source, config, &mut record)?;
            collect_storage_info(&source, &config.storage, &mut record)
                .context("Storage merge failed")?;
            output_data(&select(&record, STORAGE_FIELDS)?, *format)?;
        }
        ParseCommands::Packages { sources, format } => {
            let source = open(config, sources);
            let packages = collect_packages(&source).context("Package listing failed")?;
            output_data(&packages, *format)?;
        }
        ParseCommands::Volumes { sources, format } => {
            let source = open(config, sources);
            let mut record = InventoryRecord::default();
            collect_volumes(&source, &mut record).context("Volume listing failed")?;
            output_data(&record.volumes, *format)?;
        }
        ParseCommands::Os { sources, format } => {
            let source = open(config, sources);
            let mut record = InventoryRecord::default();
            collect_os_info(&source, &mut record).context("OS identity failed")?;
            output_data(&select(&record, OS_FIELDS)?, *format)?;
        }
    }
    Ok(())
}

fn open(config: &InventoryConfig, args: &SourceArgs) -> SourceDir {
    SourceDir::new(source_dir(config, args))
}

/// Hardware tree with NIC names from the link pass when one was captured.
fn classify_hardware(
    source: &SourceDir,
    config: &InventoryConfig,
    record: &mut InventoryRecord,
) -> anyhow::Result<()> {
    let mut interfaces = InterfaceMapBuilder::new();
    if source.exists(sources::IP_LINK_JSON) || source.exists(sources::IP_LINK_TEXT) {
        collect_network_info(source, &mut interfaces).context("Network passes failed")?;
    }
    collect_hardware_info(
        source,
        &config.classifier,
        &mut ClassifyTarget {
            record: &mut *record,
            interfaces: &mut interfaces,
        },
    )
    .context("Hardware classification failed")?;

    record.network_interfaces = interfaces.finish().interfaces;
    Ok(())
}

/// Subset of the record's top-level fields, in record order.
fn select(record: &InventoryRecord, fields: &[&str]) -> anyhow::Result<Map<String, Value>> {
    let Value::Object(all) = serde_json::to_value(record)? else {
        anyhow::bail!("inventory record did not serialize to an object");
    };
    Ok(all.into_iter().filter(|(key, _)| fields.contains(&key.as_str())).collect())
}
