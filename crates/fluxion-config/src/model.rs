// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Fluxion platform.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Fluxion configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FluxionConfig {
    #[serde(default)]
    pub log: LogConfig,

    /// Message storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Reader service settings.
    #[serde(default)]
    pub readers: ReadersConfig,

    /// Lua sandbox resource limits.
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Rules engine persistence settings.
    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which repository implementation serves message reads and writes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReaderBackend {
    #[default]
    Sqlite,
    Docstore,
    Memory,
}

/// Message storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: ReaderBackend,

    /// Path to the SQLite messages database.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Path to the redb document store file.
    #[serde(default = "default_docstore_path")]
    pub docstore_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: ReaderBackend::default(),
            database_path: default_database_path(),
            docstore_path: default_docstore_path(),
        }
    }
}

fn data_file(name: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("fluxion").join(name))
        .unwrap_or_else(|| std::path::PathBuf::from(name))
        .to_string_lossy()
        .into_owned()
}

fn default_database_path() -> String {
    data_file("messages.db")
}

fn default_docstore_path() -> String {
    data_file("messages.redb")
}

/// Reader service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReadersConfig {
    /// Upper bound on sub-queries of one search executed at the same time.
    #[serde(default = "default_max_concurrent_searches")]
    pub max_concurrent_searches: usize,
}

impl Default for ReadersConfig {
    fn default() -> Self {
        Self {
            max_concurrent_searches: default_max_concurrent_searches(),
        }
    }
}

fn default_max_concurrent_searches() -> usize {
    8
}

/// Lua sandbox configuration.
///
/// The instruction hook fires every `hook_interval` VM instructions; a run
/// is aborted once more than `max_instructions` have been counted.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SandboxConfig {
    #[serde(default = "default_hook_interval")]
    pub hook_interval: u32,

    #[serde(default = "default_max_instructions")]
    pub max_instructions: u64,

    /// Interpreter heap ceiling in bytes.
    #[serde(default = "default_memory_limit")]
    pub memory_limit_bytes: usize,

    #[serde(default = "default_max_log_lines")]
    pub max_log_lines: usize,

    /// Longer log entries are truncated to this many characters.
    #[serde(default = "default_max_log_line_length")]
    pub max_log_line_length: usize,

    #[serde(default = "default_notify_limit")]
    pub smtp_notify_limit: u32,

    #[serde(default = "default_alarm_limit")]
    pub create_alarm_limit: u32,

    #[serde(default = "default_log_limit")]
    pub log_limit: u32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            hook_interval: default_hook_interval(),
            max_instructions: default_max_instructions(),
            memory_limit_bytes: default_memory_limit(),
            max_log_lines: default_max_log_lines(),
            max_log_line_length: default_max_log_line_length(),
            smtp_notify_limit: default_notify_limit(),
            create_alarm_limit: default_alarm_limit(),
            log_limit: default_log_limit(),
        }
    }
}

fn default_hook_interval() -> u32 {
    10_000
}

fn default_max_instructions() -> u64 {
    1_000_000
}

fn default_memory_limit() -> usize {
    32 * 1024 * 1024
}

fn default_max_log_lines() -> usize {
    100
}

fn default_max_log_line_length() -> usize {
    512
}

fn default_notify_limit() -> u32 {
    5
}

fn default_alarm_limit() -> u32 {
    5
}

fn default_log_limit() -> u32 {
    200
}

/// Rules engine persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Path to the SQLite database holding scripts, runs and rules.
    #[serde(default = "default_rules_database_path")]
    pub database_path: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            database_path: default_rules_database_path(),
        }
    }
}

fn default_rules_database_path() -> String {
    data_file("rules.db")
}
