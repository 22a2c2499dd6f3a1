// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Fluxion IoT platform.
//!
//! This crate provides the message model, query model, error taxonomy and
//! the trait definitions shared by the readers and the rules engine. Storage
//! backends and collaborators implement traits defined here.

pub mod error;
pub mod message;
pub mod query;
pub mod rules;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorCategory, FluxionError, StorageEntity, StorageOp};
pub use message::{JsonMessage, Message, MessagesPage, SenmlMessage, numeric_at};
pub use query::{
    AggInterval, AggType, Aggregation, Comparator, JsonPageMetadata, SenmlPageMetadata, SortDir,
};
pub use rules::{Action, ActionType, Condition, LuaScript, Rule, RuleOperator, RunStatus, ScriptRun};
pub use types::{BusMessage, HealthStatus};

pub use traits::{
    AccessAction, AccessControl, IdProvider, JsonRepository, Publisher, RuleRepository,
    ScriptRepository, ScriptRunRepository, SenmlRepository, UuidProvider,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn enums_round_trip_through_display() {
        for interval in [
            AggInterval::Minute,
            AggInterval::Hour,
            AggInterval::Day,
            AggInterval::Week,
            AggInterval::Month,
            AggInterval::Year,
        ] {
            let parsed = AggInterval::from_str(&interval.to_string()).expect("should parse back");
            assert_eq!(interval, parsed);
        }
        for agg in [AggType::Min, AggType::Max, AggType::Avg, AggType::Count] {
            assert_eq!(AggType::from_str(&agg.to_string()).unwrap(), agg);
        }
        assert_eq!(RuleOperator::from_str("OR").unwrap(), RuleOperator::Or);
        assert_eq!(SortDir::from_str("asc").unwrap(), SortDir::Asc);
    }

    #[test]
    fn rule_deserializes_from_stored_blobs() {
        let conditions: Vec<Condition> = serde_json::from_str(
            r#"[{"field":"temp","comparator":"gt","threshold":30.0}]"#,
        )
        .unwrap();
        let actions: Vec<Action> =
            serde_json::from_str(r#"[{"id":"n-1","type":"smtp"}]"#).unwrap();
        assert_eq!(conditions[0].comparator, Comparator::Gt);
        assert_eq!(actions[0].action_type, ActionType::Smtp);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_senml<T: SenmlRepository>() {}
        fn _assert_json<T: JsonRepository>() {}
        fn _assert_access<T: AccessControl>() {}
        fn _assert_publisher<T: Publisher>() {}
        fn _assert_scripts<T: ScriptRepository>() {}
        fn _assert_runs<T: ScriptRunRepository>() {}
        fn _assert_rules<T: RuleRepository>() {}
        fn _assert_ids<T: IdProvider>() {}
    }
}
