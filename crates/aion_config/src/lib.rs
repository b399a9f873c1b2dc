//! Parsing and validation of `fabric.toml` generator configuration files.
//!
//! The file names the fabric, carries the switch-block deduplication options,
//! declares the circuit-model library (multiplexers, LUTs, pass gates,
//! buffers, standard cells) and lists the multiplexer sizes to generate. This
//! crate only checks the file in isolation; cross-references between circuit
//! models are resolved by the multiplexer generator.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
