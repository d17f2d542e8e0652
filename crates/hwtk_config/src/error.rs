//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `hwtk.toml` file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A configuration value failed validation.
    #[error("invalid value for `{key}`: {reason}")]
    ValidationError {
        /// Dotted key of the offending value.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
