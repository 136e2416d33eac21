//! Memoh Core: configuration layer, observability and the account record types
//! shared by the tool server crates.

pub mod bots;
pub mod config;
pub mod observability;
