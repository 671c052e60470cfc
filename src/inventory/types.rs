use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 1 GB in bytes
pub const GB: u64 = 1 << 30;

/// Numeric field as captured: integer, float or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Integer(u64),
    Float(f64),
    Text(String),
}

impl Quantity {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Quantity::Integer(n) => Some(*n as f64),
            Quantity::Float(f) => Some(*f),
            Quantity::Text(_) => None,
        }
    }

    /// Integer values are floor-divided, anything else passes through unchanged.
    pub fn floor_div(&self, divisor: u64) -> Quantity {
        match self {
            Quantity::Integer(n) => Quantity::Integer(n / divisor),
            other => other.clone(),
        }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quantity::Integer(n) => write!(f, "{}", n),
            Quantity::Float(v) => write!(f, "{}", v),
            Quantity::Text(s) => write!(f, "{}", s),
        }
    }
}

/// lshw reports `logicalname` either as one string or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogicalName {
    One(String),
    Many(Vec<String>),
}

impl LogicalName {
    pub fn names(&self) -> Vec<&str> {
        match self {
            LogicalName::One(name) => vec![name.as_str()],
            LogicalName::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct InventoryRecord {
    pub is_vm: bool,
    pub date_of_inventory: Option<String>,

    pub os_hostname: Option<String>,
    pub os_version: Option<String>,
    pub os_core: Option<String>,
    pub os_users: Vec<String>,
    pub os_ssl_version: Option<String>,
    pub os_ssh_version: Option<String>,
    pub os_ssh_port: Option<u16>,
    pub os_packages: IndexMap<String, String>,

    pub system_vendor: Option<String>,
    pub system_platform: Option<String>,
    pub system_platform_version: Option<String>,
    pub system_serial: Option<String>,

    pub cpu_model: Option<String>,
    pub cpu_count: u32,
    pub cpu_count_of_all_cores: u32,

    pub mb_vendor: Option<String>,
    pub mb_model: Option<String>,
    pub mb_version: Option<String>,
    pub mb_serial: Option<String>,

    pub mb_bios_vendor: Option<String>,
    pub mb_bios_version: Option<String>,
    pub mb_bios_date: Option<String>,

    pub memory_size_in_gb: f64,
    pub memory_modules_count: u32,
    pub memory_modules: Vec<RamModule>,

    pub vga: Vec<GpuInfo>,
    pub storages: Vec<StorageController>,
    pub disks: Vec<DiskInfo>,
    pub volumes: Vec<Volume>,

    pub psu_count: u32,
    pub psu: Vec<PowerSupplyInfo>,

    pub network_all_ip_addresses: Vec<String>,
    pub network_routes_all: Vec<String>,
    pub network_interfaces: IndexMap<String, NetInterface>,
    pub network_listen_ports_list: Vec<String>,
    pub network_listen_ports: IndexMap<String, ListeningPort>,
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RamModule {
    pub slot: String,
    pub vendor: Option<String>,
    pub model: Option<String>,
    #[serde(rename = "type")]
    pub mem_type: String,
    pub frequency_in_mhz: Option<Quantity>,
    pub serial: Option<String>,
    pub size_in_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuInfo {
    pub vga_vendor: Option<String>,
    pub vga_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerSupplyInfo {
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub units: Option<String>,
    pub capacity: Option<Quantity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageController {
    pub vendor: Option<String>,
    pub model: Option<String>,
    /// Model reported by the RAID vendor tool, when it knows better
    pub model_override: Option<String>,
    pub description: Option<String>,
    pub serial: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskInfo {
    pub model: Option<String>,
    pub size_in_gb: Option<Quantity>,
    pub size_raw: Option<String>,
    pub serial: Option<String>,
    pub wwn: Option<String>,
    pub fw_version: Option<String>,
    pub logicalname: Option<LogicalName>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Volume {
    #[serde(flatten)]
    pub attributes: IndexMap<String, String>,
    pub size_in_gb: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetInterface {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altnames: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes_to: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListeningPort {
    pub listen_proto: String,
    pub listen_port: String,
    pub listen_ip: String,
    pub listen_pid_program: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerRef {
    pub id: String,
    pub image: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Container {
    pub id: String,
    pub image: Option<String>,
    pub name: Option<String>,
    pub ports: Vec<ContainerPort>,
    pub listen_ports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerPort {
    pub host_port: u16,
    pub container_port: Option<u16>,
    pub proto: String,
    pub ipv6: bool,
}
