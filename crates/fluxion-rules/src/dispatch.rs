// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload fan-out: one inbound message, many isolated script runs.
//!
//! A JSON object is one sub-payload. An array yields one sub-payload per
//! object element; other elements are logged and skipped. Any other shape
//! yields nothing. Every (script, sub-payload) pair runs in its own
//! sandbox and its run is persisted on its own; a failed pair never stops
//! the rest.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use fluxion_core::{BusMessage, LuaScript, ScriptRunRepository};

use crate::sandbox::Sandbox;

/// Split a decoded payload into the objects scripts and rules run against.
pub fn sub_payloads(payload: &Value) -> Vec<Map<String, Value>> {
    match payload {
        Value::Object(map) => vec![map.clone()],
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match item {
                Value::Object(map) => Some(map.clone()),
                other => {
                    warn!(index, kind = value_kind(other), "skipping malformed payload element");
                    None
                }
            })
            .collect(),
        other => {
            debug!(kind = value_kind(other), "payload has no objects to process");
            Vec::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Runs scripts against inbound messages and records every run.
pub struct Dispatcher {
    sandbox: Sandbox,
    runs: Arc<dyn ScriptRunRepository>,
}

impl Dispatcher {
    pub fn new(sandbox: Sandbox, runs: Arc<dyn ScriptRunRepository>) -> Self {
        Self { sandbox, runs }
    }

    /// Runs every script against every sub-payload of `payload`.
    ///
    /// Outcomes are observable only through persisted runs and published
    /// messages. A run that cannot be saved is logged and dropped.
    pub async fn process_message(&self, message: &BusMessage, payload: &Value, scripts: &[LuaScript]) {
        let subs = sub_payloads(payload);
        if subs.is_empty() || scripts.is_empty() {
            return;
        }
        debug!(
            publisher = %message.publisher,
            scripts = scripts.len(),
            payloads = subs.len(),
            "dispatching message"
        );
        for script in scripts {
            for sub in &subs {
                let run = match self.sandbox.run(script, message, sub.clone()).await {
                    Ok(run) => run,
                    Err(e) => {
                        warn!(script_id = %script.id, error = %e, "script run could not start");
                        continue;
                    }
                };
                if let Err(e) = self.runs.save_run(&run).await {
                    warn!(
                        script_id = %script.id,
                        run_id = %run.id,
                        error = %e,
                        "failed to persist script run"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_config::SandboxConfig;
    use fluxion_core::{RunStatus, UuidProvider};
    use fluxion_test_utils::fixtures::lua_script;
    use fluxion_test_utils::{FailingRunRepository, RecordingPublisher};
    use serde_json::json;
    use tracing_test::traced_test;

    use crate::store::MemoryRunStore;

    fn message() -> BusMessage {
        BusMessage {
            subtopic: "sensors".into(),
            publisher: "thing-1".into(),
            protocol: "http".into(),
            payload: Vec::new(),
            created: 1,
        }
    }

    fn sandbox() -> Sandbox {
        Sandbox::new(
            SandboxConfig::default(),
            Arc::new(RecordingPublisher::new()),
            Arc::new(UuidProvider),
        )
    }

    #[test]
    fn object_is_one_sub_payload() {
        let subs = sub_payloads(&json!({"a": 1}));
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0]["a"], json!(1));
    }

    #[test]
    fn array_keeps_only_objects() {
        let subs = sub_payloads(&json!([{"a": 1}, 5, "x", {"b": 2}, null]));
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[1]["b"], json!(2));
    }

    #[test]
    fn scalars_yield_nothing() {
        for payload in [json!(1), json!("text"), json!(null), json!(true), json!([])] {
            assert!(sub_payloads(&payload).is_empty(), "{payload}");
        }
    }

    #[tokio::test]
    async fn every_script_runs_for_every_sub_payload() {
        let runs = MemoryRunStore::new();
        let dispatcher = Dispatcher::new(sandbox(), Arc::new(runs.clone()));
        let scripts = [
            lua_script("ok", "fluxion.log(message.payload.n)"),
            lua_script("bad", "error('boom')"),
        ];
        let payload = json!([{"n": 1}, {"n": 2}, 7, {"n": 3}]);

        dispatcher.process_message(&message(), &payload, &scripts).await;

        let all = runs.all().await;
        assert_eq!(all.len(), 6);
        let ok: Vec<_> = all.iter().filter(|r| r.script_id == "ok").collect();
        assert!(ok.iter().all(|r| r.status == RunStatus::Success));
        let logged: Vec<&str> = ok.iter().map(|r| r.logs[0].as_str()).collect();
        assert_eq!(logged, vec!["1", "2", "3"]);
        let bad: Vec<_> = all.iter().filter(|r| r.script_id == "bad").collect();
        assert_eq!(bad.len(), 3);
        assert!(bad.iter().all(|r| r.status == RunStatus::Fail));
        assert!(bad[0].error.as_deref().unwrap_or_default().contains("boom"));
    }

    #[tokio::test]
    async fn scalar_payload_runs_nothing() {
        let runs = MemoryRunStore::new();
        let dispatcher = Dispatcher::new(sandbox(), Arc::new(runs.clone()));
        dispatcher
            .process_message(&message(), &json!(42), &[lua_script("s", "x = 1")])
            .await;
        assert!(runs.all().await.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn persistence_failure_is_logged_not_fatal() {
        let runs = FailingRunRepository::new();
        let dispatcher = Dispatcher::new(sandbox(), Arc::new(runs.clone()));
        let payload = json!([{"n": 1}, {"n": 2}]);

        dispatcher
            .process_message(&message(), &payload, &[lua_script("s", "fluxion.log('hi')")])
            .await;

        assert_eq!(runs.attempts(), 2);
        assert!(logs_contain("failed to persist script run"));
    }

    #[tokio::test]
    #[traced_test]
    async fn malformed_elements_are_warned_about() {
        let runs = MemoryRunStore::new();
        let dispatcher = Dispatcher::new(sandbox(), Arc::new(runs.clone()));
        dispatcher
            .process_message(&message(), &json!([{"n": 1}, "junk"]), &[lua_script("s", "")])
            .await;
        assert_eq!(runs.all().await.len(), 1);
        assert!(logs_contain("skipping malformed payload element"));
    }
}
