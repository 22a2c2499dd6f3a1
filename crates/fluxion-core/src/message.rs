// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stored message records and result pages.
//!
//! A [`Message`] is either a decoded SenML telemetry record or an arbitrary
//! JSON document. Both shapes flow through the same repository and service
//! code paths; every consumer matches on the variant explicitly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single SenML measurement as persisted by the writers.
///
/// At most one of `value`, `bool_value`, `string_value` and `data_value`
/// is set on a well-formed record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SenmlMessage {
    #[serde(default)]
    pub subtopic: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
    /// Measurement time in unix seconds (fractional).
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub update_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
}

/// An arbitrary JSON document published by a thing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonMessage {
    /// Creation time in unix seconds.
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub subtopic: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl JsonMessage {
    /// Canonical text form of the payload used for free-text filtering.
    ///
    /// `serde_json::Map` keeps keys sorted, so the same payload always
    /// renders to the same text regardless of which backend stored it.
    pub fn payload_text(&self) -> String {
        Value::Object(self.payload.clone()).to_string()
    }
}

/// Look up a dot-separated path in a payload and return it when numeric.
pub fn numeric_at(payload: &Map<String, Value>, path: &str) -> Option<f64> {
    let mut segments = path.split('.');
    let mut current = payload.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_number() {
        current.as_f64()
    } else {
        None
    }
}

/// A stored message of either encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum Message {
    Senml(SenmlMessage),
    Json(JsonMessage),
}

impl Message {
    /// Returns the SenML record, or `None` for JSON messages.
    pub fn as_senml(&self) -> Option<&SenmlMessage> {
        match self {
            Message::Senml(m) => Some(m),
            Message::Json(_) => None,
        }
    }

    /// Returns the JSON record, or `None` for SenML messages.
    pub fn as_json(&self) -> Option<&JsonMessage> {
        match self {
            Message::Json(m) => Some(m),
            Message::Senml(_) => None,
        }
    }

    pub fn publisher(&self) -> &str {
        match self {
            Message::Senml(m) => &m.publisher,
            Message::Json(m) => &m.publisher,
        }
    }
}

impl From<SenmlMessage> for Message {
    fn from(m: SenmlMessage) -> Self {
        Message::Senml(m)
    }
}

impl From<JsonMessage> for Message {
    fn from(m: JsonMessage) -> Self {
        Message::Json(m)
    }
}

/// One page of query results.
///
/// `total` counts every match of the filter irrespective of pagination;
/// `messages` holds at most `limit` entries (all of them when `limit == 0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesPage<M> {
    pub total: u64,
    pub messages: Vec<Message>,
    pub metadata: M,
}

impl<M> MessagesPage<M> {
    pub fn empty(metadata: M) -> Self {
        Self {
            total: 0,
            messages: Vec::new(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_serializes_with_format_tag() {
        let msg = Message::Senml(SenmlMessage {
            publisher: "thing-1".into(),
            name: "temp".into(),
            time: 10.0,
            value: Some(21.5),
            ..Default::default()
        });
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["format"], "senml");
        assert_eq!(v["value"], 21.5);
        assert!(v.get("bool_value").is_none());

        let parsed: Message = serde_json::from_value(v).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn payload_text_is_key_sorted() {
        let payload = json!({"b": 1, "a": {"z": true, "c": "x"}});
        let msg = JsonMessage {
            payload: payload.as_object().unwrap().clone(),
            ..Default::default()
        };
        assert_eq!(msg.payload_text(), r#"{"a":{"c":"x","z":true},"b":1}"#);
    }

    #[test]
    fn numeric_at_follows_nested_paths() {
        let payload = json!({"a": {"b": 3}, "s": "x", "f": 1.5});
        let payload = payload.as_object().unwrap();
        assert_eq!(numeric_at(payload, "a.b"), Some(3.0));
        assert_eq!(numeric_at(payload, "f"), Some(1.5));
        assert_eq!(numeric_at(payload, "s"), None);
        assert_eq!(numeric_at(payload, "a.c"), None);
        assert_eq!(numeric_at(payload, "s.x"), None);
    }

    #[test]
    fn accessors_match_variant() {
        let senml: Message = SenmlMessage::default().into();
        let json: Message = JsonMessage::default().into();
        assert!(senml.as_senml().is_some());
        assert!(senml.as_json().is_none());
        assert!(json.as_json().is_some());
        assert!(json.as_senml().is_none());
    }
}
