// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fluxion run-script`: try a Lua script against a payload without
//! touching any store. Runs are kept in memory and publishes go to a
//! private in-process bus, both returned to the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use serde_json::Value;
use tracing::debug;

use fluxion_bus::{Envelope, EventBus};
use fluxion_config::SandboxConfig;
use fluxion_core::{BusMessage, FluxionError, LuaScript, ScriptRun, UuidProvider};
use fluxion_rules::{Dispatcher, MemoryRunStore, Sandbox};

#[derive(Args, Debug, Clone)]
pub struct RunScriptArgs {
    /// Lua source file.
    pub file: PathBuf,
    /// Message payload as JSON (an object or an array of objects).
    #[arg(long)]
    pub payload: String,
    #[arg(long, default_value = "cli")]
    pub publisher: String,
    #[arg(long, default_value = "")]
    pub subtopic: String,
}

/// What an ad-hoc run produced.
#[derive(Debug)]
pub struct ScriptOutcome {
    pub runs: Vec<ScriptRun>,
    pub published: Vec<Envelope>,
}

pub async fn run_script(
    sandbox_config: &SandboxConfig,
    args: &RunScriptArgs,
) -> Result<ScriptOutcome, FluxionError> {
    let source = std::fs::read_to_string(&args.file).map_err(|e| {
        FluxionError::NotFound(format!("script file {}: {e}", args.file.display()))
    })?;
    let payload: Value = serde_json::from_str(&args.payload)
        .map_err(|e| FluxionError::Validation(format!("payload is not JSON: {e}")))?;

    let script = adhoc_script(&args.file, source);
    let message = BusMessage {
        subtopic: args.subtopic.clone(),
        publisher: args.publisher.clone(),
        protocol: "cli".to_string(),
        payload: args.payload.clone().into_bytes(),
        created: chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
    };

    let bus = EventBus::new();
    let mut outbox = bus.subscribe();
    let runs = MemoryRunStore::new();
    let sandbox = Sandbox::new(
        sandbox_config.clone(),
        Arc::new(bus.clone()),
        Arc::new(UuidProvider),
    );
    let dispatcher = Dispatcher::new(sandbox, Arc::new(runs.clone()));
    debug!(script_id = %script.id, "running ad-hoc script");
    dispatcher
        .process_message(&message, &payload, std::slice::from_ref(&script))
        .await;

    let mut published = Vec::new();
    while let Some(envelope) = outbox.try_recv() {
        published.push(envelope);
    }
    Ok(ScriptOutcome {
        runs: runs.all().await,
        published,
    })
}

fn adhoc_script(path: &Path, source: String) -> LuaScript {
    let id = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "adhoc".to_string());
    LuaScript {
        name: path.display().to_string(),
        id,
        group_id: "adhoc".to_string(),
        script: source,
        description: String::new(),
    }
}
