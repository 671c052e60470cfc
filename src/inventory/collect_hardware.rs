use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::config::ClassifierConfig;
use crate::error::{InventoryError, Result};
use crate::inventory::collect_network::InterfaceMapBuilder;
use crate::inventory::types::{
    DiskInfo, GpuInfo, InventoryRecord, LogicalName, PowerSupplyInfo, Quantity, RamModule,
    StorageController, GB,
};
use crate::sources::{self, SourceReader};

const HZ_PER_MHZ: u64 = 1_000_000;

/// Entry point: classify the captured `lshw -json` tree into the record.
pub fn collect_hardware_info<S: SourceReader>(
    source: &S,
    config: &ClassifierConfig,
    target: &mut ClassifyTarget<'_>,
) -> Result<()> {
    let tree: HardwareTree = source.json(sources::LSHW)?;
    let mut classifier = HardwareClassifier::new(config);
    classifier.classify(&tree, target)?;

    tracing::info!(
        "Hardware tree classified: {} cpus, {} memory modules, {} disks, {} controllers",
        target.record.cpu_count,
        target.record.memory_modules_count,
        target.record.disks.len(),
        target.record.storages.len()
    );
    Ok(())
}

/// One node of the lshw tree; only the fields the classifier reads.
#[derive(Debug, Default, Deserialize)]
pub struct HardwareNode {
    pub id: Option<String>,
    pub class: Option<String>,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub product: Option<String>,
    pub version: Option<String>,
    pub serial: Option<String>,
    pub slot: Option<String>,
    pub date: Option<String>,
    pub units: Option<String>,
    pub logicalname: Option<LogicalName>,
    pub size: Option<Quantity>,
    pub clock: Option<Quantity>,
    pub capacity: Option<Quantity>,
    #[serde(default)]
    pub configuration: HashMap<String, Value>,
    #[serde(default)]
    pub children: Vec<HardwareNode>,
}

/// lshw emits either a list of top-level nodes or a single root node.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum HardwareTree {
    Siblings(Vec<HardwareNode>),
    Single(HardwareNode),
}

impl HardwareNode {
    fn config_text(&self, key: &str) -> Option<String> {
        match self.configuration.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn context(&self) -> String {
        format!(
            "hardware node '{}'",
            self.id.as_deref().or(self.description.as_deref()).unwrap_or("?")
        )
    }
}

/// lshw writes the literal string "None" for unknown values.
fn text(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| *v != "None").map(str::to_string)
}

fn required<T: Clone>(value: &Option<T>, field: &str, node: &HardwareNode) -> Result<T> {
    value
        .clone()
        .ok_or_else(|| InventoryError::missing_field(field, node.context()))
}

fn size_in_gb(size: &Quantity, node: &HardwareNode) -> Result<f64> {
    size.as_f64()
        .map(|bytes| bytes / GB as f64)
        .ok_or_else(|| {
            InventoryError::malformed(format!("size of {}", node.context()), size.to_string())
        })
}

/// Lowercased matching keys of a node that can be classified.
struct NodeKey {
    description: String,
    class: String,
    id: String,
}

impl NodeKey {
    /// Nodes without a description are skipped; the others must carry class and id.
    fn of(node: &HardwareNode) -> Result<Option<Self>> {
        let Some(description) = node.description.as_deref() else {
            return Ok(None);
        };
        let class = required(&node.class, "class", node)?;
        let id = required(&node.id, "id", node)?;
        Ok(Some(Self {
            description: description.to_lowercase(),
            class: class.to_lowercase(),
            id: id.to_lowercase(),
        }))
    }
}

/// Everything the classifier writes into.
pub struct ClassifyTarget<'a> {
    pub record: &'a mut InventoryRecord,
    pub interfaces: &'a mut InterfaceMapBuilder,
}

type Matcher = fn(&NodeKey, &HardwareNode) -> bool;
type Handler = fn(&mut HardwareClassifier, &HardwareNode, &mut ClassifyTarget<'_>) -> Result<()>;

struct Rule {
    name: &'static str,
    matches: Matcher,
    apply: Handler,
}

// Rules are not exclusive: a node runs every handler whose matcher accepts it.
const RULES: &[Rule] = &[
    Rule {
        name: "computer",
        matches: |key, _| key.description == "computer",
        apply: HardwareClassifier::apply_computer,
    },
    Rule {
        name: "motherboard",
        matches: |key, _| key.description == "motherboard",
        apply: HardwareClassifier::apply_motherboard,
    },
    Rule {
        name: "bios",
        matches: |key, _| key.description == "bios",
        apply: HardwareClassifier::apply_bios,
    },
    Rule {
        name: "cpu",
        matches: |key, node| key.description == "cpu" && node.product.is_some(),
        apply: HardwareClassifier::apply_cpu,
    },
    Rule {
        name: "gpu",
        matches: |key, _| {
            key.description == "vga compatible controller"
                || (key.id == "display" && key.class == "display")
        },
        apply: HardwareClassifier::apply_gpu,
    },
    Rule {
        name: "psu",
        matches: |key, _| key.class == "power" && key.id.contains("power"),
        apply: HardwareClassifier::apply_psu,
    },
    Rule {
        name: "storage controller",
        matches: |key, _| key.class == "storage" && key.id != "nvme",
        apply: HardwareClassifier::apply_storage_controller,
    },
    Rule {
        name: "nvme disk",
        matches: |key, _| key.class == "storage" && key.id == "nvme",
        apply: HardwareClassifier::apply_nvme_disk,
    },
    Rule {
        name: "disk",
        matches: |key, _| key.class == "disk" && !key.description.contains("nvme"),
        apply: HardwareClassifier::apply_disk,
    },
    Rule {
        name: "system memory",
        matches: |key, _| key.description == "system memory",
        apply: HardwareClassifier::apply_system_memory,
    },
    Rule {
        name: "memory module",
        matches: |key, node| {
            key.class == "memory"
                && !key.description.contains("cache")
                && !key.description.contains("bios")
                && !key.description.contains("system memory")
                && node.size.is_some()
        },
        apply: HardwareClassifier::apply_memory_module,
    },
    Rule {
        name: "network",
        matches: |key, _| key.class == "network",
        apply: HardwareClassifier::apply_network,
    },
];

/// Walks one hardware tree; holds the per-run state of the walk.
pub struct HardwareClassifier {
    virtualization_vendors: Vec<String>,
    /// Suffix for interfaces lshw reports without a logical name
    nonstd_id: u32,
}

impl HardwareClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            virtualization_vendors: config
                .virtualization_vendors
                .iter()
                .map(|v| v.to_lowercase())
                .collect(),
            nonstd_id: 0,
        }
    }

    pub fn classify(&mut self, tree: &HardwareTree, target: &mut ClassifyTarget<'_>) -> Result<()> {
        match tree {
            HardwareTree::Siblings(nodes) => {
                for node in nodes {
                    self.walk(node, target)?;
                }
                Ok(())
            }
            HardwareTree::Single(node) => self.walk(node, target),
        }
    }

    /// Depth-first, pre-order.
    fn walk(&mut self, node: &HardwareNode, target: &mut ClassifyTarget<'_>) -> Result<()> {
        self.classify_node(node, target)?;
        for child in &node.children {
            self.walk(child, target)?;
        }
        Ok(())
    }

    fn classify_node(
        &mut self,
        node: &HardwareNode,
        target: &mut ClassifyTarget<'_>,
    ) -> Result<()> {
        let Some(key) = NodeKey::of(node)? else {
            return Ok(());
        };
        for rule in RULES {
            if (rule.matches)(&key, node) {
                tracing::trace!("{} matched rule '{}'", node.context(), rule.name);
                (rule.apply)(self, node, target)?;
            }
        }
        Ok(())
    }

    fn is_virtual(&self, value: Option<&str>) -> bool {
        value.map_or(false, |v| {
            let v = v.to_lowercase();
            self.virtualization_vendors.iter().any(|vendor| v.contains(vendor.as_str()))
        })
    }

    fn apply_computer(
        &mut self,
        node: &HardwareNode,
        target: &mut ClassifyTarget<'_>,
    ) -> Result<()> {
        let record = &mut *target.record;
        record.system_vendor = text(&node.vendor);
        record.system_platform = text(&node.product);
        record.system_platform_version = text(&node.version);
        record.system_serial = text(&node.serial);

        if self.is_virtual(record.system_platform.as_deref())
            || self.is_virtual(record.system_vendor.as_deref())
        {
            record.is_vm = true;
        }
        Ok(())
    }

    fn apply_motherboard(
        &mut self,
        node: &HardwareNode,
        target: &mut ClassifyTarget<'_>,
    ) -> Result<()> {
        let record = &mut *target.record;
        record.mb_vendor = text(&node.vendor);
        record.mb_model = text(&node.product);
        record.mb_version = text(&node.version);
        record.mb_serial = text(&node.serial);
        Ok(())
    }

    fn apply_bios(&mut self, node: &HardwareNode, target: &mut ClassifyTarget<'_>) -> Result<()> {
        let record = &mut *target.record;
        record.mb_bios_vendor = text(&node.vendor);
        record.mb_bios_version = text(&node.version);
        record.mb_bios_date = text(&node.date);
        Ok(())
    }

    fn apply_cpu(&mut self, node: &HardwareNode, target: &mut ClassifyTarget<'_>) -> Result<()> {
        let cores = match node.config_text("cores") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| {
                    InventoryError::malformed(format!("cores of {}", node.context()), raw)
                })?,
            // No core count: the socket counts as one core
            None => 1,
        };
        let record = &mut *target.record;
        record.cpu_model = text(&node.product);
        record.cpu_count += 1;
        record.cpu_count_of_all_cores += cores;
        Ok(())
    }

    fn apply_gpu(&mut self, node: &HardwareNode, target: &mut ClassifyTarget<'_>) -> Result<()> {
        target.record.vga.push(GpuInfo {
            vga_vendor: text(&node.vendor),
            vga_model: text(&node.product),
        });
        Ok(())
    }

    fn apply_psu(&mut self, node: &HardwareNode, target: &mut ClassifyTarget<'_>) -> Result<()> {
        target.record.psu.push(PowerSupplyInfo {
            vendor: text(&node.vendor),
            model: text(&node.product),
            serial: text(&node.serial),
            units: text(&node.units),
            capacity: node.capacity.clone(),
        });
        target.record.psu_count += 1;
        Ok(())
    }

    fn apply_storage_controller(
        &mut self,
        node: &HardwareNode,
        target: &mut ClassifyTarget<'_>,
    ) -> Result<()> {
        target.record.storages.push(StorageController {
            vendor: text(&node.vendor),
            model: text(&node.product),
            model_override: None,
            description: text(&node.description),
            serial: text(&node.serial),
        });
        Ok(())
    }

    /// NVMe controllers carry the disk identity; the size sits on a namespace child.
    fn apply_nvme_disk(
        &mut self,
        node: &HardwareNode,
        target: &mut ClassifyTarget<'_>,
    ) -> Result<()> {
        let size_in_gb = node
            .children
            .iter()
            .find_map(|child| child.size.as_ref())
            .map(|size| size.floor_div(GB));

        target.record.disks.push(DiskInfo {
            model: text(&node.product),
            size_in_gb,
            serial: text(&node.serial),
            fw_version: text(&node.version),
            logicalname: node.logicalname.clone(),
            ..Default::default()
        });
        Ok(())
    }

    fn apply_disk(&mut self, node: &HardwareNode, target: &mut ClassifyTarget<'_>) -> Result<()> {
        target.record.disks.push(DiskInfo {
            model: text(&node.product),
            size_in_gb: node.size.as_ref().map(|size| size.floor_div(GB)),
            serial: text(&node.serial),
            fw_version: text(&node.version),
            logicalname: node.logicalname.clone(),
            ..Default::default()
        });
        Ok(())
    }

    fn apply_system_memory(
        &mut self,
        node: &HardwareNode,
        target: &mut ClassifyTarget<'_>,
    ) -> Result<()> {
        let size = required(&node.size, "size", node)?;
        target.record.memory_size_in_gb = size_in_gb(&size, node)?;
        Ok(())
    }

    fn apply_memory_module(
        &mut self,
        node: &HardwareNode,
        target: &mut ClassifyTarget<'_>,
    ) -> Result<()> {
        let size = required(&node.size, "size", node)?;
        let module = RamModule {
            slot: required(&node.slot, "slot", node)?,
            vendor: text(&node.vendor),
            model: text(&node.product),
            mem_type: required(&node.description, "description", node)?,
            frequency_in_mhz: node.clock.as_ref().map(|clock| clock.floor_div(HZ_PER_MHZ)),
            serial: text(&node.serial),
            size_in_gb: size_in_gb(&size, node)?,
        };
        target.record.memory_modules_count += 1;
        target.record.memory_modules.push(module);
        Ok(())
    }

    fn apply_network(
        &mut self,
        node: &HardwareNode,
        target: &mut ClassifyTarget<'_>,
    ) -> Result<()> {
        let vendor = text(&node.vendor);
        let product = text(&node.product);

        match &node.logicalname {
            // Named NICs only enrich interfaces the link pass already knows
            Some(logicalname) => {
                let merged = logicalname.names().into_iter().any(|name| {
                    target
                        .interfaces
                        .merge_hardware(name, vendor.clone(), product.clone())
                });
                if !merged {
                    tracing::debug!("{} names no known interface", node.context());
                }
            }
            None => {
                let driver = node
                    .config_text("driver")
                    .ok_or_else(|| {
                        InventoryError::missing_field("configuration.driver", node.context())
                    })?;
                let id = format!("{}{}", driver, self.nonstd_id);
                target.interfaces.insert_synthetic(id, vendor, product);
                self.nonstd_id += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::collect_network::LinkFacts;

    const LSHW_TREE: &str = r#"
    {
      "id": "db-01", "class": "system", "claimed": true, "description": "Computer",
      "product": "PowerEdge R640", "vendor": "Dell Inc.", "version": "None", "serial": "7XK9Q13",
      "children": [
        {
          "id": "core", "class": "bus", "description": "Motherboard",
          "product": "0H28RR", "vendor": "Dell Inc.", "version": "A07", "serial": ".7XK9Q13.CN7016",
          "children": [
            {"id": "firmware", "class": "memory", "description": "BIOS", "vendor": "Dell Inc.",
             "version": "2.17.1", "date": "11/15/2022", "size": 65536},
            {"id": "cpu:0", "class": "processor", "description": "CPU",
             "product": "Intel(R) Xeon(R) Gold 6230 CPU @ 2.10GHz",
             "configuration": {"cores": "20", "enabledcores": "20", "threads": "40"}},
            {"id": "cpu:1", "class": "processor", "description": "CPU",
             "product": "Intel(R) Xeon(R) Gold 6230 CPU @ 2.10GHz",
             "configuration": {"cores": "20"}},
            {"id": "cpu:2", "class": "processor", "description": "CPU"},
            {"id": "cache:0", "class": "memory", "description": "L1 cache", "size": 1310720},
            {"id": "memory", "class": "memory", "description": "System Memory", "size": 68719476736,
             "children": [
               {"id": "bank:0", "class": "memory",
                "description": "DIMM DDR4 Synchronous Registered (Buffered) 2933 MHz (0.3 ns)",
                "product": "M393A4K40CB2-CVF", "vendor": "Samsung", "slot": "A1",
                "serial": "12345678",
                "size": 34359738368, "clock": 2933000000},
               {"id": "bank:1", "class": "memory",
                "description": "DIMM DDR4 Synchronous Registered (Buffered) 2933 MHz (0.3 ns)",
                "product": "M393A2K43DB3-CWE", "vendor": "Samsung", "slot": "A2",
                "size": 1610612736},
               {"id": "bank:2", "class": "memory", "description": "[empty]", "slot": "A3"}
             ]},
            {"id": "pci:0", "class": "bridge", "description": "Host bridge",
             "children": [
               {"id": "display", "class": "display", "description": "VGA compatible controller",
                "product": "Integrated Matrox G200eW3 Graphics Controller",
                "vendor": "Matrox Electronics Systems Ltd."},
               {"id": "raid", "class": "storage", "description": "RAID bus controller",
                "product": "MegaRAID SAS-3 3108 [Invader]", "vendor": "Broadcom / LSI",
                "children": [
                  {"id": "disk:0", "class": "disk", "description": "SCSI Disk",
                   "product": "PERC H730P", "logicalname": "/dev/sda", "size": 479559942144,
                   "serial": "00a1b2c3", "version": "4.30"}
                ]},
               {"id": "nvme", "class": "storage", "description": "NVMe device",
                "product": "Dell Express Flash PM1725b 1.6TB SFF",
                "vendor": "Samsung Electronics Co Ltd",
                "serial": "S4B0NA0M900123", "version": "1.1.0", "logicalname": "/dev/nvme0",
                "children": [
                  {"id": "namespace:0", "class": "disk", "description": "NVMe disk",
                   "logicalname": "/dev/nvme0n1",
                   "size": 1600321314816}
                ]},
               {"id": "network:0", "class": "network", "description": "Ethernet interface",
                "product": "Ethernet Controller X710 for 10GbE SFP+", "vendor": "Intel Corporation",
                "logicalname": "eno1", "configuration": {"driver": "i40e"}},
               {"id": "network:1", "class": "network", "description": "Ethernet controller",
                "product": "NetXtreme BCM5720", "vendor": "Broadcom Inc. and subsidiaries",
                "configuration": {"driver": "tg3"}},
               {"id": "network:2", "class": "network", "description": "Ethernet controller",
                "product": "NetXtreme BCM5720", "vendor": "Broadcom Inc. and subsidiaries",
                "configuration": {"driver": "tg3"}}
             ]},
            {"id": "power:0", "class": "power", "description": "PWR SPLY,750W,RDNT,DELTA",
             "product": "PWR SPLY,750W,RDNT,DELTA", "vendor": "DELL", "serial": "CN179721",
             "units": "mWh", "capacity": 750}
          ]
        }
      ]
    }"#;

    fn classify_json(
        json: &str,
        record: &mut InventoryRecord,
        interfaces: &mut InterfaceMapBuilder,
    ) -> Result<()> {
        let tree: HardwareTree = serde_json::from_str(json).unwrap();
        let mut classifier = HardwareClassifier::new(&ClassifierConfig::default());
        let mut target = ClassifyTarget { record, interfaces };
        classifier.classify(&tree, &mut target)
    }

    fn classify_fixture() -> (InventoryRecord, InterfaceMapBuilder) {
        let mut record = InventoryRecord::default();
        let mut interfaces = InterfaceMapBuilder::new();
        interfaces.upsert_link(LinkFacts {
            name: "eno1".into(),
            mac: Some("3c:ec:ef:01:02:03".into()),
            ..Default::default()
        });
        classify_json(LSHW_TREE, &mut record, &mut interfaces).unwrap();
        (record, interfaces)
    }

    #[test]
    fn test_system_board_and_bios() {
        let (record, _) = classify_fixture();
        assert_eq!(record.system_vendor.as_deref(), Some("Dell Inc."));
        assert_eq!(record.system_platform.as_deref(), Some("PowerEdge R640"));
        assert_eq!(record.system_platform_version, None);
        assert!(!record.is_vm);
        assert_eq!(record.mb_model.as_deref(), Some("0H28RR"));
        assert_eq!(record.mb_bios_version.as_deref(), Some("2.17.1"));
        assert_eq!(record.mb_bios_date.as_deref(), Some("11/15/2022"));
    }

    #[test]
    fn test_cpu_sockets_and_cores() {
        let (record, _) = classify_fixture();
        // cpu:2 has no product and is not counted
        assert_eq!(record.cpu_count, 2);
        assert_eq!(record.cpu_count_of_all_cores, 40);
        assert_eq!(
            record.cpu_model.as_deref(),
            Some("Intel(R) Xeon(R) Gold 6230 CPU @ 2.10GHz")
        );
    }

    #[test]
    fn test_cpu_without_core_count_counts_one() {
        let mut record = InventoryRecord::default();
        let mut interfaces = InterfaceMapBuilder::new();
        classify_json(
            r#"[{"id": "cpu", "class": "processor", "description": "CPU",
                 "product": "QEMU Virtual CPU"}]"#,
            &mut record,
            &mut interfaces,
        )
        .unwrap();
        assert_eq!(record.cpu_count, 1);
        assert_eq!(record.cpu_count_of_all_cores, 1);
    }

    #[test]
    fn test_memory_uses_true_division() {
        let (record, _) = classify_fixture();
        assert_eq!(record.memory_size_in_gb, 64.0);
        assert_eq!(record.memory_modules_count, 2);

        let first = &record.memory_modules[0];
        assert_eq!(first.slot, "A1");
        assert_eq!(first.size_in_gb, 32.0);
        assert_eq!(first.frequency_in_mhz, Some(Quantity::Integer(2933)));
        assert_eq!(
            first.mem_type,
            "DIMM DDR4 Synchronous Registered (Buffered) 2933 MHz (0.3 ns)"
        );

        let second = &record.memory_modules[1];
        assert_eq!(second.size_in_gb, 1610612736.0 / GB as f64);
        assert_eq!(second.size_in_gb, 1.5);
        assert_eq!(second.frequency_in_mhz, None);
    }

    #[test]
    fn test_disks_use_floor_division() {
        let (record, _) = classify_fixture();
        assert_eq!(record.disks.len(), 2);

        let sda = &record.disks[0];
        assert_eq!(sda.model.as_deref(), Some("PERC H730P"));
        assert_eq!(sda.size_in_gb, Some(Quantity::Integer(479559942144 / GB)));
        assert_eq!(sda.size_in_gb, Some(Quantity::Integer(446)));
        assert_eq!(sda.logicalname, Some(LogicalName::One("/dev/sda".into())));

        // nvme namespace child is excluded as a disk; its size lands on the controller entry
        let nvme = &record.disks[1];
        assert_eq!(nvme.serial.as_deref(), Some("S4B0NA0M900123"));
        assert_eq!(nvme.size_in_gb, Some(Quantity::Integer(1490)));
        assert_eq!(nvme.fw_version.as_deref(), Some("1.1.0"));
    }

    #[test]
    fn test_controllers_gpu_and_psu() {
        let (record, _) = classify_fixture();
        assert_eq!(record.storages.len(), 1);
        assert_eq!(
            record.storages[0].model.as_deref(),
            Some("MegaRAID SAS-3 3108 [Invader]")
        );
        assert_eq!(record.vga.len(), 1);
        assert_eq!(record.vga[0].vga_vendor.as_deref(), Some("Matrox Electronics Systems Ltd."));
        assert_eq!(record.psu_count, 1);
        assert_eq!(record.psu[0].capacity, Some(Quantity::Integer(750)));
        assert_eq!(record.psu[0].units.as_deref(), Some("mWh"));
    }

    #[test]
    fn test_network_merge_and_synthetic_ids() {
        let (_, interfaces) = classify_fixture();
        let facts = interfaces.finish();
        let keys: Vec<&str> = facts.interfaces.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["eno1", "tg30", "tg31"]);

        let eno1 = &facts.interfaces["eno1"];
        assert_eq!(eno1.mac.as_deref(), Some("3c:ec:ef:01:02:03"));
        assert_eq!(eno1.vendor.as_deref(), Some("Intel Corporation"));
        assert_eq!(facts.interfaces["tg31"].product.as_deref(), Some("NetXtreme BCM5720"));
    }

    #[test]
    fn test_synthetic_counter_is_per_run() {
        let (_, first) = classify_fixture();
        let (_, second) = classify_fixture();
        let first: Vec<String> = first.finish().interfaces.into_keys().collect();
        let second: Vec<String> = second.finish().interfaces.into_keys().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_node_runs_every_matching_rule() {
        let mut record = InventoryRecord::default();
        let mut interfaces = InterfaceMapBuilder::new();
        // Matches both the computer rule and the psu rule
        classify_json(
            r#"[{"id": "power", "class": "power", "description": "Computer", "vendor": "KVM"}]"#,
            &mut record,
            &mut interfaces,
        )
        .unwrap();
        assert_eq!(record.psu_count, 1);
        assert_eq!(record.psu[0].vendor.as_deref(), Some("KVM"));
        assert_eq!(record.system_vendor.as_deref(), Some("KVM"));
        assert!(record.is_vm);
    }

    #[test]
    fn test_display_class_and_id_without_vga_description() {
        let mut record = InventoryRecord::default();
        let mut interfaces = InterfaceMapBuilder::new();
        classify_json(
            r#"[{"id": "display", "class": "display", "description": "3D controller",
                 "product": "GA100 [A100 PCIe 40GB]", "vendor": "NVIDIA Corporation"},
                {"id": "display:1", "class": "display", "description": "3D controller"}]"#,
            &mut record,
            &mut interfaces,
        )
        .unwrap();
        assert_eq!(record.vga.len(), 1);
        assert_eq!(record.vga[0].vga_model.as_deref(), Some("GA100 [A100 PCIe 40GB]"));
    }

    #[test]
    fn test_vm_detected_from_vendor() {
        let mut record = InventoryRecord::default();
        let mut interfaces = InterfaceMapBuilder::new();
        classify_json(
            r#"{"id": "vm-01", "class": "system", "description": "Computer",
                "product": "Standard PC (i440FX + PIIX, 1996)", "vendor": "QEMU"}"#,
            &mut record,
            &mut interfaces,
        )
        .unwrap();
        assert!(record.is_vm);
    }

    #[test]
    fn test_missing_slot_is_fatal() {
        let mut record = InventoryRecord::default();
        let mut interfaces = InterfaceMapBuilder::new();
        let err = classify_json(
            r#"[{"id": "bank:0", "class": "memory", "description": "DIMM DDR4",
                 "size": 8589934592}]"#,
            &mut record,
            &mut interfaces,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::MissingRequiredField { ref field, .. } if field == "slot"
        ));
    }

    #[test]
    fn test_text_memory_size_is_fatal() {
        let mut record = InventoryRecord::default();
        let mut interfaces = InterfaceMapBuilder::new();
        let err = classify_json(
            r#"[{"id": "memory", "class": "memory", "description": "System Memory",
                 "size": "64GiB"}]"#,
            &mut record,
            &mut interfaces,
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::MalformedSizeOrUnit { .. }));
    }

    #[test]
    fn test_network_without_driver_is_fatal() {
        let mut record = InventoryRecord::default();
        let mut interfaces = InterfaceMapBuilder::new();
        let err = classify_json(
            r#"[{"id": "network", "class": "network", "description": "Ethernet controller"}]"#,
            &mut record,
            &mut interfaces,
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::MissingRequiredField { .. }));
    }

    #[test]
    fn test_nodes_without_description_still_recurse() {
        let mut record = InventoryRecord::default();
        let mut interfaces = InterfaceMapBuilder::new();
        classify_json(
            r#"[{"id": "bus", "children": [
                  {"id": "disk", "class": "disk", "description": "ATA Disk", "size": 2147483648}
               ]}]"#,
            &mut record,
            &mut interfaces,
        )
        .unwrap();
        assert_eq!(record.disks.len(), 1);
        assert_eq!(record.disks[0].size_in_gb, Some(Quantity::Integer(2)));
    }
}
