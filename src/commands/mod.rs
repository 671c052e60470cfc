pub mod inventory;
pub mod parse;

pub use inventory::handle_inventory_command;
pub use parse::handle_parse_command;
