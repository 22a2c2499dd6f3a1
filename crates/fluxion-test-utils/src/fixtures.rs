// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record builders shared by backend and service tests.

use serde_json::{Map, Value};

use fluxion_core::{JsonMessage, LuaScript, Message, SenmlMessage};

/// A numeric SenML record.
pub fn senml_value(publisher: &str, name: &str, time: f64, value: f64) -> SenmlMessage {
    SenmlMessage {
        subtopic: "sensors".to_string(),
        publisher: publisher.to_string(),
        protocol: "mqtt".to_string(),
        name: name.to_string(),
        unit: "C".to_string(),
        time,
        update_time: time,
        value: Some(value),
        ..Default::default()
    }
}

/// SenML records for `values`, one second apart starting at `start`.
pub fn senml_series(publisher: &str, name: &str, start: f64, values: &[f64]) -> Vec<Message> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| Message::Senml(senml_value(publisher, name, start + i as f64, *v)))
        .collect()
}

/// A JSON record; `payload` must be a JSON object.
pub fn json_record(publisher: &str, created: i64, payload: Value) -> JsonMessage {
    JsonMessage {
        created,
        subtopic: "events".to_string(),
        publisher: publisher.to_string(),
        protocol: "http".to_string(),
        payload: match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        },
    }
}

pub fn lua_script(id: &str, source: &str) -> LuaScript {
    LuaScript {
        id: id.to_string(),
        group_id: "group-1".to_string(),
        script: source.to_string(),
        name: format!("script {id}"),
        description: String::new(),
    }
}
