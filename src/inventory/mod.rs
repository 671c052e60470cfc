// Inventory normalization modules
pub mod types;
pub mod collect_os;
pub mod collect_packages;
pub mod collect_network;
pub mod collect_hardware;
pub mod collect_storage;
pub mod collect_ports;
pub mod collector;

// Re-export main collection functions
pub use collect_os::collect_os_info;
pub use collect_packages::collect_packages;
pub use collect_network::collect_network_info;
pub use collect_hardware::collect_hardware_info;
pub use collect_storage::{collect_storage_info, collect_volumes};
pub use collect_ports::collect_listen_ports;
pub use collector::collect_full_inventory;
