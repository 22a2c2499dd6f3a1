// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::{FluxionConfig, ReaderBackend};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of stopping at the first one.
pub fn validate_config(config: &FluxionConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.log.level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "log.level `{}` is not one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }

    match config.storage.backend {
        ReaderBackend::Sqlite if config.storage.database_path.trim().is_empty() => {
            fail("storage.database_path must not be empty".to_string());
        }
        ReaderBackend::Docstore if config.storage.docstore_path.trim().is_empty() => {
            fail("storage.docstore_path must not be empty".to_string());
        }
        _ => {}
    }

    if config.rules.database_path.trim().is_empty() {
        fail("rules.database_path must not be empty".to_string());
    }

    if config.readers.max_concurrent_searches == 0 {
        fail("readers.max_concurrent_searches must be at least 1".to_string());
    }

    let sandbox = &config.sandbox;
    if sandbox.hook_interval == 0 {
        fail("sandbox.hook_interval must be greater than 0".to_string());
    }
    if sandbox.max_instructions < u64::from(sandbox.hook_interval) {
        fail(format!(
            "sandbox.max_instructions ({}) must be at least sandbox.hook_interval ({})",
            sandbox.max_instructions, sandbox.hook_interval
        ));
    }

    let positive = [
        ("sandbox.max_log_lines", sandbox.max_log_lines as u64),
        ("sandbox.max_log_line_length", sandbox.max_log_line_length as u64),
        ("sandbox.smtp_notify_limit", u64::from(sandbox.smtp_notify_limit)),
        ("sandbox.create_alarm_limit", u64::from(sandbox.create_alarm_limit)),
        ("sandbox.log_limit", u64::from(sandbox.log_limit)),
    ];
    for (key, value) in positive {
        if value == 0 {
            fail(format!("{key} must be greater than 0"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&FluxionConfig::default()).is_ok());
    }

    #[test]
    fn empty_docstore_path_only_matters_for_docstore() {
        let mut config = FluxionConfig::default();
        config.storage.docstore_path = String::new();
        assert!(validate_config(&config).is_ok());

        config.storage.backend = ReaderBackend::Docstore;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("docstore_path"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = FluxionConfig::default();
        config.sandbox.hook_interval = 0;
        config.sandbox.log_limit = 0;
        config.readers.max_concurrent_searches = 0;
        config.log.level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn instruction_budget_below_hook_interval_rejected() {
        let mut config = FluxionConfig::default();
        config.sandbox.hook_interval = 1000;
        config.sandbox.max_instructions = 10;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("max_instructions"));
    }
}
