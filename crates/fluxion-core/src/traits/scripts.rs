// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence contracts for scripts, script runs and rules.

use async_trait::async_trait;

use crate::error::FluxionError;
use crate::rules::{LuaScript, Rule, ScriptRun};

#[async_trait]
pub trait ScriptRepository: Send + Sync {
    async fn save_script(&self, script: &LuaScript) -> Result<(), FluxionError>;

    /// Returns `NotFound` when no script has this ID.
    async fn retrieve_script(&self, id: &str) -> Result<LuaScript, FluxionError>;

    async fn list_scripts_by_group(&self, group_id: &str)
    -> Result<Vec<LuaScript>, FluxionError>;

    async fn remove_script(&self, id: &str) -> Result<(), FluxionError>;
}

#[async_trait]
pub trait ScriptRunRepository: Send + Sync {
    async fn save_run(&self, run: &ScriptRun) -> Result<(), FluxionError>;

    /// Returns `NotFound` when no run has this ID.
    async fn retrieve_run(&self, id: &str) -> Result<ScriptRun, FluxionError>;

    /// Runs of one script, newest first. `limit == 0` returns all of them.
    async fn list_runs_by_script(
        &self,
        script_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ScriptRun>, FluxionError>;
}

#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn save_rule(&self, rule: &Rule) -> Result<(), FluxionError>;

    async fn retrieve_rule(&self, id: &str) -> Result<Rule, FluxionError>;

    async fn list_rules_by_group(&self, group_id: &str) -> Result<Vec<Rule>, FluxionError>;

    async fn remove_rule(&self, id: &str) -> Result<(), FluxionError>;
}
