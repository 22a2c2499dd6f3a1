// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host functions exposed to scripts under the `fluxion` table.
//!
//! | function                      | effect                                      |
//! |-------------------------------|---------------------------------------------|
//! | `fluxion.smtp_notify(id)`     | republish the message on `smtp.<id>`        |
//! | `fluxion.create_alarm()`      | republish on `alarms.scripts.<script id>`   |
//! | `fluxion.log(line)`           | append to the run's bounded log             |
//!
//! Every function returns `(ok, err)`. Each has its own invocation budget;
//! once spent, calls return `(false, "invocation limit exceeded")` without
//! doing anything. Republished messages carry the script's current
//! `message.payload`, JSON-encoded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use mlua::{Lua, LuaSerdeExt, Table, Value as LuaValue};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::debug;

use fluxion_config::SandboxConfig;
use fluxion_core::{BusMessage, Publisher};

pub const HOST_TABLE: &str = "fluxion";
pub const INVOCATION_LIMIT_EXCEEDED: &str = "invocation limit exceeded";
pub const LOG_LIMIT_EXCEEDED: &str = "log limit exceeded";

const EXPECTED_STRING: &str = "expected a string";

/// Registry slot holding the writable backing table of `message`.
pub(crate) const MESSAGE_KEY: &str = "fluxion.message";

type HostReturn = (bool, Option<String>);

fn failure(msg: impl Into<String>) -> HostReturn {
    (false, Some(msg.into()))
}

/// Per-function call budget.
struct InvocationCap {
    limit: u32,
    used: AtomicU32,
}

impl InvocationCap {
    fn new(limit: u32) -> Arc<Self> {
        Arc::new(Self {
            limit,
            used: AtomicU32::new(0),
        })
    }

    fn try_take(&self) -> bool {
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .is_ok()
    }
}

/// Log lines of one run, kept in the interpreter's app data.
pub(crate) struct LogBuffer {
    lines: Vec<String>,
    max_lines: usize,
    max_line_length: usize,
}

impl LogBuffer {
    pub(crate) fn new(max_lines: usize, max_line_length: usize) -> Self {
        Self {
            lines: Vec::new(),
            max_lines,
            max_line_length,
        }
    }

    /// Appends a line truncated to the length limit; false once the buffer is full.
    fn push(&mut self, line: &str) -> bool {
        if self.lines.len() >= self.max_lines {
            return false;
        }
        let line = match line.char_indices().nth(self.max_line_length) {
            Some((cut, _)) => &line[..cut],
            None => line,
        };
        self.lines.push(line.to_string());
        true
    }

    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// What the host functions need to republish on behalf of a script.
pub struct HostContext {
    pub script_id: String,
    /// The inbound message; its payload is replaced on republish.
    pub message: BusMessage,
    pub publisher: Arc<dyn Publisher>,
    /// Runtime used to drive async publishes from the blocking sandbox thread.
    pub handle: Handle,
}

/// Installs the log buffer and the `fluxion` host table into `lua`.
pub(crate) fn install(lua: &Lua, config: &SandboxConfig, ctx: HostContext) -> mlua::Result<()> {
    lua.set_app_data(LogBuffer::new(
        config.max_log_lines,
        config.max_log_line_length,
    ));
    let ctx = Arc::new(ctx);
    let api = lua.create_table()?;

    let cap = InvocationCap::new(config.smtp_notify_limit);
    let notify_ctx = ctx.clone();
    api.set(
        "smtp_notify",
        lua.create_function(move |lua, notifier_id: LuaValue| -> mlua::Result<HostReturn> {
            if !cap.try_take() {
                return Ok(failure(INVOCATION_LIMIT_EXCEEDED));
            }
            let Some(notifier_id) = string_arg(lua, notifier_id) else {
                return Ok(failure(EXPECTED_STRING));
            };
            if notifier_id.is_empty() {
                return Ok(failure("notifier id is required"));
            }
            Ok(republish(lua, &notify_ctx, &format!("smtp.{notifier_id}")))
        })?,
    )?;

    let cap = InvocationCap::new(config.create_alarm_limit);
    let alarm_ctx = ctx;
    api.set(
        "create_alarm",
        lua.create_function(move |lua, ()| -> mlua::Result<HostReturn> {
            if !cap.try_take() {
                return Ok(failure(INVOCATION_LIMIT_EXCEEDED));
            }
            let subject = format!("alarms.scripts.{}", alarm_ctx.script_id);
            Ok(republish(lua, &alarm_ctx, &subject))
        })?,
    )?;

    let cap = InvocationCap::new(config.log_limit);
    api.set(
        "log",
        lua.create_function(move |lua, line: LuaValue| -> mlua::Result<HostReturn> {
            if !cap.try_take() {
                return Ok(failure(INVOCATION_LIMIT_EXCEEDED));
            }
            let Some(line) = string_arg(lua, line) else {
                return Ok(failure(EXPECTED_STRING));
            };
            let Some(mut buffer) = lua.app_data_mut::<LogBuffer>() else {
                return Ok(failure("log buffer unavailable"));
            };
            if buffer.push(&line) {
                Ok((true, None))
            } else {
                Ok(failure(LOG_LIMIT_EXCEEDED))
            }
        })?,
    )?;

    lua.globals().set(HOST_TABLE, api)?;
    Ok(())
}

/// Strings and numbers, with Lua's own number formatting; anything else is rejected.
fn string_arg(lua: &Lua, value: LuaValue) -> Option<String> {
    let coerced = lua.coerce_string(value).ok().flatten()?;
    Some(String::from(coerced.to_string_lossy()))
}

fn current_payload(lua: &Lua) -> mlua::Result<Vec<u8>> {
    let data: Table = lua.named_registry_value(MESSAGE_KEY)?;
    let payload: LuaValue = data.get("payload")?;
    let json: Value = lua.from_value(payload)?;
    serde_json::to_vec(&json).map_err(mlua::Error::external)
}

fn republish(lua: &Lua, ctx: &HostContext, subject: &str) -> HostReturn {
    let payload = match current_payload(lua) {
        Ok(payload) => payload,
        Err(e) => return failure(format!("payload cannot be encoded: {e}")),
    };
    let message = BusMessage {
        payload,
        ..ctx.message.clone()
    };
    match ctx.handle.block_on(ctx.publisher.publish(subject, &message)) {
        Ok(()) => (true, None),
        Err(e) => {
            debug!(script_id = %ctx.script_id, subject, error = %e, "script publish failed");
            failure(e.to_string())
        }
    }
}
