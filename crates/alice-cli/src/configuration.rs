use crate::error::{to_env_var, ConfigError};
use alice::capabilities::transport::DEFAULT_DISCOVERY_TIMEOUT;
use alice::capabilities::ProviderCommand;
use alice::providers::registry::DEFAULT_MODEL;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct CapabilityProviderSettings {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CapabilityProviderSettings {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CapabilityProviderSettings {
    /// The process to query for the live catalog, if one is configured
    pub fn provider_command(&self) -> Option<ProviderCommand> {
        let program = self.command.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
        Some(
            ProviderCommand::new(program)
                .with_args(self.args.iter().cloned())
                .with_timeout(Duration::from_secs(self.timeout_secs)),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default)]
    pub capability_provider: CapabilityProviderSettings,
}

impl Settings {
    /// Defaults, then the optional config file, then `ALICE_*` environment variables
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("default_model", default_model())?
            .set_default("capability_provider.timeout_secs", default_timeout_secs())?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("ALICE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("capability_provider.args"),
            )
            .build()?;

        let settings: Self = config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            ConfigError::Other(err)
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.capability_provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                env_var: to_env_var("capability_provider.timeout_secs"),
                reason: "discovery timeout must be at least one second".to_string(),
            });
        }
        Ok(())
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_DISCOVERY_TIMEOUT.as_secs()
}
