// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend-neutral filter conditions.
//!
//! A validated page metadata value is flattened into an ordered list of
//! [`Condition`]s. Every backend translates that same list into its native
//! form (SQL `WHERE` fragments, filter documents, in-memory predicates), so
//! the field-to-operator mapping lives in exactly one place.
//!
//! Empty strings and zero time bounds produce no condition.

use fluxion_core::{Comparator, JsonPageMetadata, SenmlPageMetadata};

/// A filterable field of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Subtopic,
    Publisher,
    Protocol,
    Name,
    /// SenML canonical time.
    Time,
    /// JSON canonical time.
    Created,
    Value,
    BoolValue,
    StringValue,
    DataValue,
    /// The JSON payload, matched as canonical text.
    Payload,
}

impl Field {
    /// Column name in the relational schema and key in stored documents.
    pub fn key(self) -> &'static str {
        match self {
            Field::Subtopic => "subtopic",
            Field::Publisher => "publisher",
            Field::Protocol => "protocol",
            Field::Name => "name",
            Field::Time => "time",
            Field::Created => "created",
            Field::Value => "value",
            Field::BoolValue => "bool_value",
            Field::StringValue => "string_value",
            Field::DataValue => "data_value",
            Field::Payload => "payload",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    /// Substring match on text.
    Contains,
}

impl From<Comparator> for Op {
    fn from(c: Comparator) -> Self {
        match c {
            Comparator::Eq => Op::Eq,
            Comparator::Lt => Op::Lt,
            Comparator::Le => Op::Le,
            Comparator::Gt => Op::Gt,
            Comparator::Ge => Op::Ge,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Text(String),
    Number(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: Field,
    pub op: Op,
    pub operand: Operand,
}

impl Condition {
    fn text(field: Field, value: &str) -> Self {
        Self {
            field,
            op: Op::Eq,
            operand: Operand::Text(value.to_string()),
        }
    }

    fn number(field: Field, op: Op, value: f64) -> Self {
        Self {
            field,
            op,
            operand: Operand::Number(value),
        }
    }

    /// Evaluate a numeric comparison; used by in-memory evaluators.
    pub fn compare_number(&self, actual: f64) -> bool {
        let Operand::Number(expected) = self.operand else {
            return false;
        };
        match self.op {
            Op::Eq => actual == expected,
            Op::Lt => actual < expected,
            Op::Le => actual <= expected,
            Op::Gt => actual > expected,
            Op::Ge => actual >= expected,
            Op::Contains => false,
        }
    }
}

fn push_text(out: &mut Vec<Condition>, field: Field, value: &str) {
    if !value.is_empty() {
        out.push(Condition::text(field, value));
    }
}

/// Half-open `[from, to)`; a zero bound is unbounded on that side.
fn push_time_range(out: &mut Vec<Condition>, field: Field, from: f64, to: f64) {
    if from > 0.0 {
        out.push(Condition::number(field, Op::Ge, from));
    }
    if to > 0.0 {
        out.push(Condition::number(field, Op::Lt, to));
    }
}

/// Conditions for a SenML query, in fixed order: identity fields, time
/// range, then the typed value filters (numeric, bool, string, data).
pub fn senml_conditions(pm: &SenmlPageMetadata) -> Vec<Condition> {
    let mut out = Vec::new();
    push_text(&mut out, Field::Subtopic, &pm.subtopic);
    push_text(&mut out, Field::Publisher, &pm.publisher);
    push_text(&mut out, Field::Protocol, &pm.protocol);
    push_text(&mut out, Field::Name, &pm.name);
    push_time_range(&mut out, Field::Time, pm.from, pm.to);

    if let Some(value) = pm.value {
        let op = Op::from(pm.comparator.unwrap_or_default());
        out.push(Condition::number(Field::Value, op, value));
    } else if let Some(b) = pm.bool_value {
        out.push(Condition {
            field: Field::BoolValue,
            op: Op::Eq,
            operand: Operand::Bool(b),
        });
    } else if let Some(s) = &pm.string_value {
        out.push(Condition::text(Field::StringValue, s));
    } else if let Some(d) = &pm.data_value {
        out.push(Condition::text(Field::DataValue, d));
    }
    out
}

/// Conditions for a JSON query: identity fields, time range on `created`,
/// then the free-text payload filter.
pub fn json_conditions(pm: &JsonPageMetadata) -> Vec<Condition> {
    let mut out = Vec::new();
    push_text(&mut out, Field::Subtopic, &pm.subtopic);
    push_text(&mut out, Field::Publisher, &pm.publisher);
    push_text(&mut out, Field::Protocol, &pm.protocol);
    push_time_range(&mut out, Field::Created, pm.from as f64, pm.to as f64);
    if !pm.filter.is_empty() {
        out.push(Condition {
            field: Field::Payload,
            op: Op::Contains,
            operand: Operand::Text(pm.filter.clone()),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_yields_no_conditions() {
        assert!(senml_conditions(&SenmlPageMetadata::default()).is_empty());
        assert!(json_conditions(&JsonPageMetadata::default()).is_empty());
    }

    #[test]
    fn pagination_alone_is_not_a_condition() {
        let pm = SenmlPageMetadata {
            offset: 5,
            limit: 10,
            ..Default::default()
        };
        assert!(senml_conditions(&pm).is_empty());
    }

    #[test]
    fn senml_conditions_follow_fixed_order() {
        let pm = SenmlPageMetadata {
            publisher: "p1".into(),
            subtopic: "room".into(),
            name: "temp".into(),
            from: 10.0,
            to: 20.0,
            value: Some(5.0),
            comparator: Some(Comparator::Ge),
            ..Default::default()
        };
        let fields: Vec<_> = senml_conditions(&pm).iter().map(|c| c.field).collect();
        assert_eq!(
            fields,
            vec![
                Field::Subtopic,
                Field::Publisher,
                Field::Name,
                Field::Time,
                Field::Time,
                Field::Value
            ]
        );
        let conds = senml_conditions(&pm);
        assert_eq!(conds[3].op, Op::Ge);
        assert_eq!(conds[4].op, Op::Lt);
        assert_eq!(conds[5].op, Op::Ge);
    }

    #[test]
    fn absent_comparator_means_equality() {
        let pm = SenmlPageMetadata {
            value: Some(5.0),
            ..Default::default()
        };
        let conds = senml_conditions(&pm);
        assert_eq!(conds[0].op, Op::Eq);
        assert!(conds[0].compare_number(5.0));
        assert!(!conds[0].compare_number(6.0));
    }

    #[test]
    fn json_filter_becomes_contains() {
        let pm = JsonPageMetadata {
            filter: "\"temp\"".into(),
            to: 100,
            ..Default::default()
        };
        let conds = json_conditions(&pm);
        assert_eq!(conds.len(), 2);
        assert_eq!(conds[0].field, Field::Created);
        assert_eq!(conds[1].op, Op::Contains);
    }
}
