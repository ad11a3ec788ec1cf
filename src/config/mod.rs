// src/config/mod.rs

//! Configuration loading and validation for watchhook.
//!
//! - `model.rs`: the TOML-backed data model, raw and validated.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: `RawConfigFile -> ConfigFile` checks and duration parsing.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, MetadataSection, RawConfigFile, WatchConfig};
pub use validate::parse_duration;
