use crate::config::InventoryConfig;
use crate::error::Result;
use crate::inventory;
use crate::inventory::collect_hardware::ClassifyTarget;
use crate::inventory::collect_network::InterfaceMapBuilder;
use crate::inventory::types::InventoryRecord;
use crate::sources::SourceReader;

/// Build one host record from captured sources.
///
/// Any error aborts the whole run, no partial record is returned.
pub fn collect_full_inventory<S: SourceReader>(
    source: &S,
    config: &InventoryConfig,
) -> Result<InventoryRecord> {
    let mut record = InventoryRecord::default();
    let mut interfaces = InterfaceMapBuilder::new();

    inventory::collect_os_info(source, &mut record)?;
    record.os_packages = inventory::collect_packages(source)?;

    inventory::collect_network_info(source, &mut interfaces)?;
    inventory::collect_hardware_info(
        source,
        &config.classifier,
        &mut ClassifyTarget {
            record: &mut record,
            interfaces: &mut interfaces,
        },
    )?;

    // RAID facts refine what the hardware tree reported
    inventory::collect_storage_info(source, &config.storage, &mut record)?;
    inventory::collect_listen_ports(source, &mut record)?;
    inventory::collect_volumes(source, &mut record)?;

    let network = interfaces.finish();
    record.network_interfaces = network.interfaces;
    record.network_all_ip_addresses = network.all_ip_addresses;
    record.network_routes_all = network.routes_all;

    Ok(record)
}
