//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Tunnel server image started in each container group.
pub const DEFAULT_IMAGE: &str = "jpangms/inlets:2.4.1";

/// Longest accepted poll interval, in seconds.
pub const MAX_POLL_INTERVAL_SECS: u64 = 3_600;
/// Longest accepted completion wait, in seconds.
pub const MAX_WAIT_TIMEOUT_SECS: u64 = 86_400;

/// Provisioner settings derived from environment variables, configuration
/// files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "INLETS",
    discovery(
        app_name = "inlets-provision",
        env_var = "INLETS_CONFIG_PATH",
        config_file_name = "inlets-provision.toml",
        dotfile_name = ".inlets-provision.toml",
        project_file_name = "inlets-provision.toml"
    )
)]
pub struct ProvisionerConfig {
    /// Cloud backend to provision on. Only `azure` is supported.
    #[ortho_config(default = "azure".to_owned())]
    pub provider: String,
    /// Path to the Azure SDK auth file. Falls back to `AZURE_AUTH_LOCATION`
    /// when unset.
    pub access_key_file: Option<String>,
    /// Container image running the tunnel server.
    #[ortho_config(default = DEFAULT_IMAGE.to_owned())]
    pub image: String,
    /// Seconds between completion polls when the backend gives no hint.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Upper bound in seconds on waiting for a create or delete to finish.
    #[ortho_config(default = 600)]
    pub wait_timeout_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn guidance(&self) -> String {
        format!(
            "set {} or add {} to inlets-provision.toml",
            self.env_var, self.toml_key
        )
    }
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            provider: String::from("azure"),
            access_key_file: None,
            image: DEFAULT_IMAGE.to_owned(),
            poll_interval_secs: 5,
            wait_timeout_secs: 600,
        }
    }
}

impl ProvisionerConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: {}",
                metadata.description,
                metadata.guidance()
            )));
        }
        Ok(())
    }

    fn require_within(value: u64, max: u64, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value == 0 || value > max {
            return Err(ConfigError::Invalid(format!(
                "{} must be between 1 and {max} seconds: {}",
                metadata.description,
                metadata.guidance()
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("inlets-provision")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Delay between completion polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Upper bound on a single completion wait.
    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    /// Performs semantic validation. Error messages include guidance on how
    /// to provide values via environment variables or configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::Invalid`] when a duration is zero or above its
    /// bound, or the auth file path is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.provider,
            &FieldMetadata::new("cloud provider", "INLETS_PROVIDER", "provider"),
        )?;
        Self::require_field(
            &self.image,
            &FieldMetadata::new("tunnel server image", "INLETS_IMAGE", "image"),
        )?;
        if self
            .access_key_file
            .as_deref()
            .is_some_and(|path| path.trim().is_empty())
        {
            let metadata =
                FieldMetadata::new("access key file", "INLETS_ACCESS_KEY_FILE", "access_key_file");
            return Err(ConfigError::Invalid(format!(
                "{} is blank: {} or unset it to use AZURE_AUTH_LOCATION",
                metadata.description,
                metadata.guidance()
            )));
        }
        Self::require_within(
            self.poll_interval_secs,
            MAX_POLL_INTERVAL_SECS,
            &FieldMetadata::new(
                "poll interval",
                "INLETS_POLL_INTERVAL_SECS",
                "poll_interval_secs",
            ),
        )?;
        Self::require_within(
            self.wait_timeout_secs,
            MAX_WAIT_TIMEOUT_SECS,
            &FieldMetadata::new(
                "wait timeout",
                "INLETS_WAIT_TIMEOUT_SECS",
                "wait_timeout_secs",
            ),
        )?;
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// A field is present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
