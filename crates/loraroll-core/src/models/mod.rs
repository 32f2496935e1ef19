//! Data models for loraroll

pub mod config;
pub mod entry;

pub use config::RollConfig;
pub use entry::{LoraEntry, SidecarMetadata};
