//! Configuration validation.

use std::collections::HashSet;

use rivet_core::AuthMode;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, RivetConfig, SupervisorConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &RivetConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_bots_config(&config.bots)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    for target in logging.filters.keys() {
        if target.is_empty() || target.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: {target:?}"
            )));
        }
    }
    Ok(())
}

fn validate_bots_config(bots: &[SupervisorConfig]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for bot in bots {
        validate_supervisor_config(bot)?;
        if !seen.insert(bot.identity.as_str()) {
            return Err(ConfigError::DuplicateIdentity(bot.identity.clone()));
        }
    }
    Ok(())
}

/// Validates a single supervisor entry.
pub fn validate_supervisor_config(bot: &SupervisorConfig) -> ConfigResult<()> {
    if bot.identity.is_empty() {
        return Err(ConfigError::missing_field("bots.identity"));
    }
    if bot.identity.contains(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "Identity cannot contain whitespace: {:?}",
            bot.identity
        )));
    }
    if bot.secret.is_empty() && bot.auth != AuthMode::Offline {
        return Err(ConfigError::missing_field(format!(
            "bots.secret (for {})",
            bot.identity
        )));
    }
    if bot.endpoint.is_empty() {
        return Err(ConfigError::missing_field("bots.endpoint"));
    }
    if bot.reconnect_delay_ms == 0 {
        return Err(ConfigError::validation(
            "Reconnect delay must be greater than 0",
        ));
    }
    Ok(())
}
