use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AcquisitionSettings, AnalyticsSettings, Config, LoggingSettings, ProviderKind,
    ProviderSettings,
};

/// Loads the application configuration from `config.toml` (optional) and the
/// environment.
///
/// Environment variables use the `FOLIO` prefix and `__` as the section
/// separator, e.g. `FOLIO__ACQUISITION__MAX_RETRIES=5`.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new("config.toml"))
}

/// Same as [`load_config`] but reads the given file instead of `config.toml`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("FOLIO")
                .prefix_separator("__")
                .separator("__"),
        );
    finish(builder)
}

fn finish(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<Config, ConfigError> {
    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.build()?.try_deserialize::<Config>()?;
    validate(&config)?;
    tracing::debug!(providers = config.providers.len(), "Configuration loaded.");
    Ok(config)
}

/// Rejects settings that would make acquisition impossible.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let acquisition = &config.acquisition;
    if acquisition.max_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "acquisition.max_concurrency must be at least 1".to_string(),
        ));
    }
    if acquisition.base_delay > acquisition.max_delay {
        return Err(ConfigError::ValidationError(
            "acquisition.base_delay must not exceed acquisition.max_delay".to_string(),
        ));
    }
    if acquisition.request_timeout.is_zero() {
        return Err(ConfigError::ValidationError(
            "acquisition.request_timeout must be greater than zero".to_string(),
        ));
    }
    if config.analytics.decimal_places > core_types::MAX_DECIMAL_PLACES {
        return Err(ConfigError::ValidationError(format!(
            "analytics.decimal_places must not exceed {}",
            core_types::MAX_DECIMAL_PLACES
        )));
    }
    if !config.providers.iter().any(|p| p.enabled) {
        return Err(ConfigError::ValidationError(
            "at least one provider must be enabled".to_string(),
        ));
    }
    Ok(())
}
