use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {env_var}: {reason}")]
    Invalid { env_var: String, reason: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a settings path such as `capability_provider.timeout_secs` to the
/// environment variable that overrides it
pub fn to_env_var(field_path: &str) -> String {
    format!("ALICE_{}", field_path.replace('.', "__").to_uppercase())
}
