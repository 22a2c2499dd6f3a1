// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripts and rules loaded from the SQLite store, driven by one inbound
//! message, observed through the bus and the persisted runs.

use std::sync::Arc;

use serde_json::{Value, json};

use fluxion_bus::EventBus;
use fluxion_config::SandboxConfig;
use fluxion_core::{
    Action, ActionType, BusMessage, Comparator, Condition, Rule, RuleOperator, RuleRepository,
    RunStatus, ScriptRepository, ScriptRunRepository, UuidProvider,
};
use fluxion_rules::{Dispatcher, RuleEngine, RulesStore, Sandbox};
use fluxion_test_utils::fixtures::lua_script;

fn inbound() -> BusMessage {
    BusMessage {
        subtopic: "boiler".into(),
        publisher: "thing-42".into(),
        protocol: "mqtt".into(),
        payload: Vec::new(),
        created: 1_704_067_200,
    }
}

#[tokio::test]
async fn scripts_from_store_alarm_on_the_bus() {
    let dir = tempfile::tempdir().unwrap();
    let store = RulesStore::open(dir.path().join("rules.db").to_str().unwrap())
        .await
        .unwrap();
    store
        .save_script(&lua_script(
            "watchdog",
            r#"
            if message.payload.pressure > 10 then
                message.payload.level = "critical"
                assert(fluxion.create_alarm())
            end
            fluxion.log("pressure " .. message.payload.pressure)
            "#,
        ))
        .await
        .unwrap();
    store
        .save_script(&lua_script("spin", "while true do end"))
        .await
        .unwrap();

    let bus = EventBus::new();
    let mut alarms = bus.subscribe_subject("alarms");
    let sandbox = Sandbox::new(
        SandboxConfig::default(),
        Arc::new(bus.clone()),
        Arc::new(UuidProvider),
    );
    let dispatcher = Dispatcher::new(sandbox, Arc::new(store.clone()));

    let scripts = store.list_scripts_by_group("group-1").await.unwrap();
    assert_eq!(scripts.len(), 2);
    let payload = json!([{"pressure": 12}, {"pressure": 3}]);
    dispatcher.process_message(&inbound(), &payload, &scripts).await;

    let alarm = alarms.try_recv().expect("one alarm published");
    assert_eq!(alarm.subject, "alarms.scripts.watchdog");
    assert_eq!(alarm.message.publisher, "thing-42");
    let body: Value = serde_json::from_slice(&alarm.message.payload).unwrap();
    assert_eq!(body, json!({"pressure": 12, "level": "critical"}));
    assert!(alarms.try_recv().is_none());

    let watchdog = store.list_runs_by_script("watchdog", 0, 0).await.unwrap();
    assert_eq!(watchdog.len(), 2);
    assert!(watchdog.iter().all(|r| r.status == RunStatus::Success));
    let mut logs: Vec<String> = watchdog.iter().flat_map(|r| r.logs.clone()).collect();
    logs.sort();
    assert_eq!(logs, vec!["pressure 12", "pressure 3"]);

    let spin = store.list_runs_by_script("spin", 0, 0).await.unwrap();
    assert_eq!(spin.len(), 2);
    assert!(spin.iter().all(|r| r.status == RunStatus::Fail));
    let stored = store.retrieve_run(&spin[0].id).await.unwrap();
    assert_eq!(stored, spin[0]);
}

#[tokio::test]
async fn rules_from_store_notify_on_the_bus() {
    let store = RulesStore::open_in_memory().await.unwrap();
    store
        .save_rule(&Rule {
            id: "r-hot".into(),
            group_id: "g".into(),
            name: "hot".into(),
            description: String::new(),
            conditions: vec![
                Condition {
                    field: "temp".into(),
                    comparator: Comparator::Ge,
                    threshold: 50.0,
                },
                Condition {
                    field: "door.open".into(),
                    comparator: Comparator::Eq,
                    threshold: 1.0,
                },
            ],
            operator: RuleOperator::Or,
            actions: vec![Action {
                id: "ops-mail".into(),
                action_type: ActionType::Smtp,
            }],
        })
        .await
        .unwrap();

    let bus = EventBus::new();
    let mut smtp = bus.subscribe_subject("smtp");
    let engine = RuleEngine::new(Arc::new(bus.clone()));
    let rules = store.list_rules_by_group("g").await.unwrap();

    let payload = json!([{"temp": 20, "door": {"open": 1}}, {"temp": 10}]);
    assert_eq!(engine.process(&inbound(), &payload, &rules).await, 1);

    let mail = smtp.try_recv().expect("notification published");
    assert_eq!(mail.subject, "smtp.ops-mail");
    assert!(smtp.try_recv().is_none());
}
