// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for scripts, script runs and rules.
//!
//! [`RulesStore`] keeps everything in one SQLite database whose schema is
//! managed by refinery migrations. Rule conditions and actions, and run
//! logs, are stored as JSON text columns. [`MemoryRunStore`] keeps runs in
//! process for ad-hoc executions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::OptionalExtension;
use rusqlite::types::Type;
use tokio::sync::Mutex;
use tokio_rusqlite::Connection;
use tracing::{debug, warn};

use fluxion_core::{
    FluxionError, LuaScript, Rule, RuleRepository, RunStatus, ScriptRepository, ScriptRun,
    ScriptRunRepository, StorageEntity, StorageOp,
};

use crate::migrations::run_migrations;

fn map_tr_err(
    entity: StorageEntity,
    op: StorageOp,
) -> impl FnOnce(tokio_rusqlite::Error<rusqlite::Error>) -> FluxionError {
    move |e| {
        warn!(%entity, %op, error = %e, "rules store call failed");
        FluxionError::storage_of(entity, op, e)
    }
}

/// Fixed-width timestamps so text order matches time order.
fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parse_timestamp(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> Result<T, rusqlite::Error> {
    serde_json::from_str(raw).map_err(|e| conversion_err(idx, e))
}

fn row_to_script(row: &rusqlite::Row<'_>) -> Result<LuaScript, rusqlite::Error> {
    Ok(LuaScript {
        id: row.get(0)?,
        group_id: row.get(1)?,
        script: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
    })
}

fn row_to_run(row: &rusqlite::Row<'_>) -> Result<ScriptRun, rusqlite::Error> {
    let logs: String = row.get(3)?;
    let started_at: String = row.get(4)?;
    let finished_at: String = row.get(5)?;
    let status: String = row.get(6)?;
    Ok(ScriptRun {
        id: row.get(0)?,
        script_id: row.get(1)?,
        thing_id: row.get(2)?,
        logs: parse_json(3, &logs)?,
        started_at: parse_timestamp(4, &started_at)?,
        finished_at: parse_timestamp(5, &finished_at)?,
        status: status.parse::<RunStatus>().map_err(|e| conversion_err(6, e))?,
        error: row.get(7)?,
    })
}

fn row_to_rule(row: &rusqlite::Row<'_>) -> Result<Rule, rusqlite::Error> {
    let conditions: String = row.get(4)?;
    let operator: String = row.get(5)?;
    let actions: String = row.get(6)?;
    Ok(Rule {
        id: row.get(0)?,
        group_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        conditions: parse_json(4, &conditions)?,
        operator: operator.parse().map_err(|e| conversion_err(5, e))?,
        actions: parse_json(6, &actions)?,
    })
}

const SCRIPT_COLUMNS: &str = "id, group_id, script, name, description";
const RUN_COLUMNS: &str =
    "id, script_id, thing_id, logs, started_at, finished_at, status, error";
const RULE_COLUMNS: &str = "id, group_id, name, description, conditions, operator, actions";

/// SQLite-backed store for scripts, runs and rules.
///
/// Holds an `Arc<Connection>` and routes every statement through
/// tokio-rusqlite's background thread.
#[derive(Clone)]
pub struct RulesStore {
    conn: Arc<Connection>,
}

impl RulesStore {
    /// Open (or create) the rules database at `path` and apply migrations.
    pub async fn open(path: &str) -> Result<Self, FluxionError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| FluxionError::storage_of(StorageEntity::Rules, StorageOp::Save, e))?;
            }
        }
        let conn = Connection::open(path)
            .await
            .map_err(|e| FluxionError::storage_of(StorageEntity::Rules, StorageOp::Read, e))?;
        let store = Self::migrated(conn).await?;
        debug!(path, "rules store opened");
        Ok(store)
    }

    pub async fn open_in_memory() -> Result<Self, FluxionError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| FluxionError::storage_of(StorageEntity::Rules, StorageOp::Read, e))?;
        Self::migrated(conn).await
    }

    async fn migrated(conn: Connection) -> Result<Self, FluxionError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err(StorageEntity::Rules, StorageOp::Read))?;
        conn.call(|conn| -> Result<(), refinery::Error> { run_migrations(conn) })
            .await
            .map_err(|e| FluxionError::storage_of(StorageEntity::Rules, StorageOp::Save, e.to_string()))?;
        Ok(Self {
            conn: Arc::new(conn),
        })
    }
}

#[async_trait]
impl ScriptRepository for RulesStore {
    async fn save_script(&self, script: &LuaScript) -> Result<(), FluxionError> {
        let script = script.clone();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO lua_scripts (id, group_id, script, name, description) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        script.id,
                        script.group_id,
                        script.script,
                        script.name,
                        script.description,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err(StorageEntity::Scripts, StorageOp::Save))
    }

    async fn retrieve_script(&self, id: &str) -> Result<LuaScript, FluxionError> {
        let key = id.to_string();
        let found = self
            .conn
            .call(move |conn| -> Result<Option<LuaScript>, rusqlite::Error> {
                conn.query_row(
                    &format!("SELECT {SCRIPT_COLUMNS} FROM lua_scripts WHERE id = ?1"),
                    rusqlite::params![key],
                    row_to_script,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err(StorageEntity::Scripts, StorageOp::Read))?;
        found.ok_or_else(|| FluxionError::NotFound(format!("script {id}")))
    }

    async fn list_scripts_by_group(&self, group_id: &str) -> Result<Vec<LuaScript>, FluxionError> {
        let group_id = group_id.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<LuaScript>, rusqlite::Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SCRIPT_COLUMNS} FROM lua_scripts WHERE group_id = ?1 ORDER BY name, id"
                ))?;
                let scripts = stmt
                    .query_map(rusqlite::params![group_id], row_to_script)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(scripts)
            })
            .await
            .map_err(map_tr_err(StorageEntity::Scripts, StorageOp::Read))
    }

    async fn remove_script(&self, id: &str) -> Result<(), FluxionError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM lua_scripts WHERE id = ?1", rusqlite::params![id])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err(StorageEntity::Scripts, StorageOp::Delete))
    }
}

#[async_trait]
impl ScriptRunRepository for RulesStore {
    async fn save_run(&self, run: &ScriptRun) -> Result<(), FluxionError> {
        let logs = serde_json::to_string(&run.logs)
            .map_err(|e| FluxionError::storage_of(StorageEntity::ScriptRuns, StorageOp::Save, e))?;
        let run = run.clone();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    &format!("INSERT INTO lua_script_runs ({RUN_COLUMNS}) \
                              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                    rusqlite::params![
                        run.id,
                        run.script_id,
                        run.thing_id,
                        logs,
                        timestamp(&run.started_at),
                        timestamp(&run.finished_at),
                        run.status.to_string(),
                        run.error,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err(StorageEntity::ScriptRuns, StorageOp::Save))
    }

    async fn retrieve_run(&self, id: &str) -> Result<ScriptRun, FluxionError> {
        let key = id.to_string();
        let found = self
            .conn
            .call(move |conn| -> Result<Option<ScriptRun>, rusqlite::Error> {
                conn.query_row(
                    &format!("SELECT {RUN_COLUMNS} FROM lua_script_runs WHERE id = ?1"),
                    rusqlite::params![key],
                    row_to_run,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err(StorageEntity::ScriptRuns, StorageOp::Read))?;
        found.ok_or_else(|| FluxionError::NotFound(format!("script run {id}")))
    }

    async fn list_runs_by_script(
        &self,
        script_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ScriptRun>, FluxionError> {
        let script_id = script_id.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<ScriptRun>, rusqlite::Error> {
                let mut sql = format!(
                    "SELECT {RUN_COLUMNS} FROM lua_script_runs WHERE script_id = :script_id \
                     ORDER BY started_at DESC, rowid DESC"
                );
                if limit > 0 {
                    sql.push_str(" LIMIT :limit OFFSET :offset");
                }
                let mut stmt = conn.prepare(&sql)?;
                let rows = if limit > 0 {
                    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
                    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
                    stmt.query_map(
                        rusqlite::named_params! {
                            ":script_id": script_id,
                            ":limit": limit,
                            ":offset": offset,
                        },
                        row_to_run,
                    )?
                    .collect::<Result<Vec<_>, _>>()?
                } else {
                    stmt.query_map(rusqlite::named_params! { ":script_id": script_id }, row_to_run)?
                        .collect::<Result<Vec<_>, _>>()?
                };
                Ok(rows)
            })
            .await
            .map_err(map_tr_err(StorageEntity::ScriptRuns, StorageOp::Read))
    }
}

#[async_trait]
impl RuleRepository for RulesStore {
    async fn save_rule(&self, rule: &Rule) -> Result<(), FluxionError> {
        let conditions = serde_json::to_string(&rule.conditions)
            .map_err(|e| FluxionError::storage_of(StorageEntity::Rules, StorageOp::Save, e))?;
        let actions = serde_json::to_string(&rule.actions)
            .map_err(|e| FluxionError::storage_of(StorageEntity::Rules, StorageOp::Save, e))?;
        let rule = rule.clone();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    &format!("INSERT OR REPLACE INTO rules ({RULE_COLUMNS}) \
                              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                    rusqlite::params![
                        rule.id,
                        rule.group_id,
                        rule.name,
                        rule.description,
                        conditions,
                        rule.operator.to_string(),
                        actions,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err(StorageEntity::Rules, StorageOp::Save))
    }

    async fn retrieve_rule(&self, id: &str) -> Result<Rule, FluxionError> {
        let key = id.to_string();
        let found = self
            .conn
            .call(move |conn| -> Result<Option<Rule>, rusqlite::Error> {
                conn.query_row(
                    &format!("SELECT {RULE_COLUMNS} FROM rules WHERE id = ?1"),
                    rusqlite::params![key],
                    row_to_rule,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err(StorageEntity::Rules, StorageOp::Read))?;
        found.ok_or_else(|| FluxionError::NotFound(format!("rule {id}")))
    }

    async fn list_rules_by_group(&self, group_id: &str) -> Result<Vec<Rule>, FluxionError> {
        let group_id = group_id.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<Rule>, rusqlite::Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RULE_COLUMNS} FROM rules WHERE group_id = ?1 ORDER BY name, id"
                ))?;
                let rules = stmt
                    .query_map(rusqlite::params![group_id], row_to_rule)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rules)
            })
            .await
            .map_err(map_tr_err(StorageEntity::Rules, StorageOp::Read))
    }

    async fn remove_rule(&self, id: &str) -> Result<(), FluxionError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM rules WHERE id = ?1", rusqlite::params![id])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err(StorageEntity::Rules, StorageOp::Delete))
    }
}

/// In-process run store for ad-hoc executions.
#[derive(Debug, Clone, Default)]
pub struct MemoryRunStore {
    runs: Arc<Mutex<Vec<ScriptRun>>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every saved run, in save order.
    pub async fn all(&self) -> Vec<ScriptRun> {
        self.runs.lock().await.clone()
    }
}

#[async_trait]
impl ScriptRunRepository for MemoryRunStore {
    async fn save_run(&self, run: &ScriptRun) -> Result<(), FluxionError> {
        self.runs.lock().await.push(run.clone());
        Ok(())
    }

    async fn retrieve_run(&self, id: &str) -> Result<ScriptRun, FluxionError> {
        self.runs
            .lock()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| FluxionError::NotFound(format!("script run {id}")))
    }

    async fn list_runs_by_script(
        &self,
        script_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ScriptRun>, FluxionError> {
        let runs = self.runs.lock().await;
        // Newest first; later saves win ties.
        let mut matching: Vec<&ScriptRun> =
            runs.iter().filter(|r| r.script_id == script_id).collect();
        matching.reverse();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        let iter = matching.into_iter().cloned();
        if limit == 0 {
            return Ok(iter.collect());
        }
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(iter.skip(skip).take(take).collect())
    }
}
