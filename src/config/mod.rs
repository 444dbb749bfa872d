// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] holds the serde structs mirroring `devwatch.toml`.
//! - [`loader`] reads and deserialises the file.
//! - [`validate`] turns the raw structs into a checked [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{BuildRule, ConfigFile, RawConfigFile};
