pub mod inventory_item;
pub mod inventory_movement;
pub mod inventory_transfer;
pub mod inventory_transfer_line;
pub mod location;
