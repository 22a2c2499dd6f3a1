// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lua sandbox for tenant-authored scripts.
//!
//! Every (script, payload) pair gets a fresh interpreter: a [`LuaEnv`] is
//! built, bound to one message and consumed by [`LuaEnv::execute`], so an
//! environment can never run twice.
//!
//! Isolation:
//! - only the base, math, string and table libraries are loaded, and
//!   `print`, `dofile`, `loadfile`, `load` and `rawset` are removed;
//! - an instruction hook fires every `hook_interval` instructions and
//!   aborts the run once more than `max_instructions` have executed. The
//!   breach is sticky: `pcall` and `xpcall` re-raise it, so a script
//!   cannot catch its way past the ceiling;
//! - the interpreter heap is capped at `memory_limit_bytes`;
//! - `message` is a read-only view (`subtopic`, `publisher`, `protocol`,
//!   `created`, `payload`). The payload table itself stays writable and is
//!   what host functions republish.
//!
//! Preemption only happens at hook granularity. A script blocked inside a
//! host call (a slow publish) cannot be interrupted.
//!
//! The interpreter runs on the blocking pool; host functions reach the
//! async publisher through the runtime handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use mlua::{
    Function, HookTriggers, Lua, LuaOptions, LuaSerdeExt, MultiValue, StdLib, Table,
    Value as LuaValue, VmState,
};
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tracing::debug;

use fluxion_config::SandboxConfig;
use fluxion_core::{
    BusMessage, FluxionError, IdProvider, LuaScript, Publisher, RunStatus, ScriptRun,
};

use crate::host::{self, HostContext, LogBuffer, MESSAGE_KEY};

pub const INSTRUCTION_LIMIT_EXCEEDED: &str = "instruction limit exceeded";

const REMOVED_GLOBALS: [&str; 5] = ["print", "dofile", "loadfile", "load", "rawset"];

const PROTECTED_CALLS: [&str; 2] = ["pcall", "xpcall"];

/// Result of executing one environment.
#[derive(Debug, Clone)]
pub struct Execution {
    pub logs: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Interpreter error text when the run failed.
    pub error: Option<String>,
}

impl Execution {
    fn setup_failed(started_at: DateTime<Utc>, error: String) -> Self {
        Self {
            logs: Vec::new(),
            started_at,
            finished_at: Utc::now(),
            error: Some(error),
        }
    }

    pub fn status(&self) -> RunStatus {
        if self.error.is_some() {
            RunStatus::Fail
        } else {
            RunStatus::Success
        }
    }
}

/// A single-use interpreter bound to one message.
pub struct LuaEnv {
    lua: Lua,
    chunk_name: String,
}

impl LuaEnv {
    pub fn new(
        config: &SandboxConfig,
        ctx: HostContext,
        payload: &Map<String, Value>,
    ) -> mlua::Result<Self> {
        let lua = Lua::new_with(
            StdLib::MATH | StdLib::STRING | StdLib::TABLE,
            LuaOptions::new(),
        )?;
        lua.set_memory_limit(config.memory_limit_bytes)?;

        let globals = lua.globals();
        for name in REMOVED_GLOBALS {
            globals.set(name, LuaValue::Nil)?;
        }
        bind_message(&lua, &ctx.message, payload)?;

        let chunk_name = format!("script {}", ctx.script_id);
        host::install(&lua, config, ctx)?;
        install_preemption(&lua, config.hook_interval, config.max_instructions)?;

        Ok(Self { lua, chunk_name })
    }

    /// Runs the script body once, to completion or the first uncaught error.
    pub fn execute(self, source: &str) -> Execution {
        let started_at = Utc::now();
        let result = self.lua.load(source).set_name(self.chunk_name.as_str()).exec();
        let finished_at = Utc::now();
        let logs = self
            .lua
            .remove_app_data::<LogBuffer>()
            .map(LogBuffer::into_lines)
            .unwrap_or_default();
        Execution {
            logs,
            started_at,
            finished_at,
            error: result.err().map(|e| e.to_string()),
        }
    }
}

fn install_preemption(lua: &Lua, interval: u32, ceiling: u64) -> mlua::Result<()> {
    let interval = interval.max(1);
    let executed = Arc::new(AtomicU64::new(0));
    let exhausted = Arc::new(AtomicBool::new(false));

    let tripped = exhausted.clone();
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(interval),
        move |_lua, _debug| {
            let step = u64::from(interval);
            let total = executed.fetch_add(step, Ordering::Relaxed).saturating_add(step);
            if total > ceiling {
                tripped.store(true, Ordering::Relaxed);
                Err(mlua::Error::runtime(INSTRUCTION_LIMIT_EXCEEDED))
            } else {
                Ok(VmState::Continue)
            }
        },
    );

    // Once the budget is spent, a protected call re-raises on return.
    let globals = lua.globals();
    for name in PROTECTED_CALLS {
        let inner: Function = globals.get(name)?;
        let exhausted = exhausted.clone();
        let guarded = lua.create_function(move |_, args: MultiValue| -> mlua::Result<MultiValue> {
            let results: MultiValue = inner.call(args)?;
            if exhausted.load(Ordering::Relaxed) {
                return Err(mlua::Error::runtime(INSTRUCTION_LIMIT_EXCEEDED));
            }
            Ok(results)
        })?;
        globals.set(name, guarded)?;
    }
    Ok(())
}

/// Publishes `message` as a read-only proxy over a backing table that the
/// host functions read the live payload from.
fn bind_message(lua: &Lua, message: &BusMessage, payload: &Map<String, Value>) -> mlua::Result<()> {
    let data = lua.create_table()?;
    data.set("subtopic", message.subtopic.as_str())?;
    data.set("publisher", message.publisher.as_str())?;
    data.set("protocol", message.protocol.as_str())?;
    data.set("created", message.created)?;
    data.set("payload", lua.to_value(payload)?)?;

    let meta = lua.create_table()?;
    meta.set("__index", data.clone())?;
    meta.set(
        "__newindex",
        lua.create_function(|_, _: MultiValue| -> mlua::Result<()> {
            Err(mlua::Error::runtime("message is read-only"))
        })?,
    )?;
    meta.set(
        "__pairs",
        lua.create_function(|lua, _: Table| {
            let data: Table = lua.named_registry_value(MESSAGE_KEY)?;
            let next: Function = lua.globals().get("next")?;
            Ok((next, data, LuaValue::Nil))
        })?,
    )?;
    meta.set("__metatable", false)?;

    let view = lua.create_table()?;
    view.set_metatable(Some(meta));
    lua.globals().set("message", view)?;
    lua.set_named_registry_value(MESSAGE_KEY, data)?;
    Ok(())
}

/// Builds and runs sandbox environments, producing [`ScriptRun`] records.
#[derive(Clone)]
pub struct Sandbox {
    config: SandboxConfig,
    publisher: Arc<dyn Publisher>,
    ids: Arc<dyn IdProvider>,
}

impl Sandbox {
    pub fn new(
        config: SandboxConfig,
        publisher: Arc<dyn Publisher>,
        ids: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            config,
            publisher,
            ids,
        }
    }

    /// Runs `script` against one payload object of `message`.
    ///
    /// Script failures are reported in the returned run, not as an error.
    /// `Err` means no run could be produced at all.
    pub async fn run(
        &self,
        script: &LuaScript,
        message: &BusMessage,
        payload: Map<String, Value>,
    ) -> Result<ScriptRun, FluxionError> {
        let run_id = self.ids.new_id()?;
        let ctx = HostContext {
            script_id: script.id.clone(),
            message: message.clone(),
            publisher: self.publisher.clone(),
            handle: Handle::current(),
        };
        let config = self.config.clone();
        let source = script.script.clone();

        debug!(script_id = %script.id, run_id = %run_id, "script run started");
        let execution = tokio::task::spawn_blocking(move || {
            let started_at = Utc::now();
            match LuaEnv::new(&config, ctx, &payload) {
                Ok(env) => env.execute(&source),
                Err(e) => Execution::setup_failed(started_at, e.to_string()),
            }
        })
        .await
        .map_err(|e| FluxionError::Script {
            message: format!("sandbox task failed: {e}"),
        })?;

        let status = execution.status();
        debug!(
            script_id = %script.id,
            run_id = %run_id,
            %status,
            logs = execution.logs.len(),
            "script run finished"
        );
        Ok(ScriptRun {
            id: run_id,
            script_id: script.id.clone(),
            thing_id: message.publisher.clone(),
            logs: execution.logs,
            started_at: execution.started_at,
            finished_at: execution.finished_at,
            status,
            error: execution.error,
        })
    }
}
