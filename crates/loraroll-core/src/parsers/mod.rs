//! Parsers for on-disk LoRA metadata

pub mod sidecar;

pub use sidecar::SidecarParser;
