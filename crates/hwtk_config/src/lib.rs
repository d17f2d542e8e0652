//! Parsing and validation of `hwtk.toml` toolkit configuration files.
//!
//! The configuration is small: naming conventions used while flattening units
//! into netlists, and limits for the discrete-event simulator. Every section
//! and every key is optional; missing values fall back to the defaults that
//! [`ToolkitConfig::default`] returns.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
