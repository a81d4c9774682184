//! CLI command implementations

pub mod dump;
mod list;

pub use list::{list_bankswitch, list_ports};
