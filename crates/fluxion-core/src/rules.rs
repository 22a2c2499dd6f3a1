// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule, Lua script and script-run records used by the rules engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::message::numeric_at;
use crate::query::Comparator;

/// How a rule combines its conditions.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleOperator {
    #[default]
    And,
    Or,
}

/// A single threshold check against a payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dot-separated payload path.
    pub field: String,
    pub comparator: Comparator,
    pub threshold: f64,
}

/// What a matching rule triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Smtp,
    Alarm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Target of the action, e.g. the notifier ID for `smtp`.
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
}

/// A threshold rule evaluated against inbound payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub group_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub operator: RuleOperator,
    pub actions: Vec<Action>,
}

impl Condition {
    /// True when the payload holds a number at `field` that satisfies the threshold.
    pub fn holds(&self, payload: &Map<String, Value>) -> bool {
        numeric_at(payload, &self.field)
            .is_some_and(|v| self.comparator.compare(v, self.threshold))
    }
}

impl Rule {
    /// Evaluates the rule against one payload object. A rule without
    /// conditions never matches.
    pub fn matches(&self, payload: &Map<String, Value>) -> bool {
        if self.conditions.is_empty() {
            return false;
        }
        match self.operator {
            RuleOperator::And => self.conditions.iter().all(|c| c.holds(payload)),
            RuleOperator::Or => self.conditions.iter().any(|c| c.holds(payload)),
        }
    }
}

/// A tenant-authored Lua script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaScript {
    pub id: String,
    pub group_id: String,
    pub script: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Outcome of a single script execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Fail,
}

/// Record of one (script, sub-payload) execution. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRun {
    pub id: String,
    pub script_id: String,
    /// Publisher of the message the script ran against.
    pub thing_id: String,
    pub logs: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub error: Option<String>,
}
