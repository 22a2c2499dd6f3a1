// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./fluxion.toml` > `~/.config/fluxion/fluxion.toml` > `/etc/fluxion/fluxion.toml`
//! with environment variable overrides via `FLUXION_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::FluxionConfig;

/// Config sections addressable from the environment.
const ENV_SECTIONS: &[&str] = &["log", "storage", "readers", "sandbox", "rules"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/fluxion/fluxion.toml` (system-wide)
/// 3. `~/.config/fluxion/fluxion.toml` (user XDG config)
/// 4. `./fluxion.toml` (local directory)
/// 5. `FLUXION_*` environment variables
pub fn load_config() -> Result<FluxionConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<FluxionConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FluxionConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FluxionConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FluxionConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FluxionConfig::default()))
        .merge(Toml::file("/etc/fluxion/fluxion.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("fluxion/fluxion.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("fluxion.toml"))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env key to its dotted config path.
///
/// Only the first underscore after a known section name splits, so
/// `sandbox_max_log_lines` becomes `sandbox.max_log_lines`.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("FLUXION_").map(|key| map_env_key(key.as_str()).into())
}
