//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ToolkitConfig;
use std::path::Path;

/// File name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "hwtk.toml";

/// Loads and validates `hwtk.toml` from a project directory.
///
/// A directory without the file yields the default configuration.
pub fn load_config(project_dir: &Path) -> Result<ToolkitConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(ToolkitConfig::default());
    }
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ToolkitConfig, ConfigError> {
    let config: ToolkitConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ToolkitConfig) -> Result<(), ConfigError> {
    let elab = &config.elaborate;
    if elab.name_separator.is_empty() {
        return Err(ConfigError::invalid(
            "elaborate.name_separator",
            "must not be empty",
        ));
    }
    for (key, value) in [
        ("elaborate.bridge_prefix", &elab.bridge_prefix),
        ("elaborate.anonymous_prefix", &elab.anonymous_prefix),
        ("elaborate.architecture_name", &elab.architecture_name),
    ] {
        if !is_identifier(value) {
            return Err(ConfigError::invalid(
                key,
                format!("'{value}' is not a valid identifier"),
            ));
        }
    }
    if config.sim.max_deltas == 0 {
        return Err(ConfigError::invalid("sim.max_deltas", "must be at least 1"));
    }
    if config.sim.clock_period.as_ps() < 2 {
        return Err(ConfigError::invalid(
            "sim.clock_period",
            "must be at least 2ps so both clock phases have a duration",
        ));
    }
    Ok(())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
