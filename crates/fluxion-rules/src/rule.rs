// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Threshold rules: declarative conditions with notification and alarm actions.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use fluxion_core::{ActionType, BusMessage, Publisher, Rule};

use crate::dispatch::sub_payloads;

pub struct RuleEngine {
    publisher: Arc<dyn Publisher>,
}

impl RuleEngine {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }

    /// Evaluates `rules` against every sub-payload of `payload` and publishes
    /// the actions of each match. Returns the number of successful publishes.
    ///
    /// `smtp` actions go to `smtp.<action id>`, `alarm` actions to
    /// `alarms.rules.<rule id>`; the published payload is the matching
    /// sub-payload.
    pub async fn process(&self, message: &BusMessage, payload: &Value, rules: &[Rule]) -> usize {
        let mut published = 0;
        for sub in sub_payloads(payload) {
            for rule in rules.iter().filter(|r| r.matches(&sub)) {
                debug!(rule_id = %rule.id, publisher = %message.publisher, "rule matched");
                let body = match serde_json::to_vec(&sub) {
                    Ok(body) => body,
                    Err(e) => {
                        warn!(rule_id = %rule.id, error = %e, "failed to encode rule payload");
                        continue;
                    }
                };
                let outbound = BusMessage {
                    payload: body,
                    ..message.clone()
                };
                for action in &rule.actions {
                    let subject = match action.action_type {
                        ActionType::Smtp => format!("smtp.{}", action.id),
                        ActionType::Alarm => format!("alarms.rules.{}", rule.id),
                    };
                    match self.publisher.publish(&subject, &outbound).await {
                        Ok(()) => published += 1,
                        Err(e) => {
                            warn!(rule_id = %rule.id, subject, error = %e, "rule action failed")
                        }
                    }
                }
            }
        }
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_core::{Action, Comparator, Condition, RuleOperator};
    use fluxion_test_utils::RecordingPublisher;
    use serde_json::json;

    fn overheat() -> Rule {
        Rule {
            id: "rule-1".into(),
            group_id: "g1".into(),
            name: "overheat".into(),
            description: String::new(),
            conditions: vec![Condition {
                field: "temp".into(),
                comparator: Comparator::Gt,
                threshold: 30.0,
            }],
            operator: RuleOperator::And,
            actions: vec![
                Action {
                    id: "notifier-1".into(),
                    action_type: ActionType::Smtp,
                },
                Action {
                    id: String::new(),
                    action_type: ActionType::Alarm,
                },
            ],
        }
    }

    fn message() -> BusMessage {
        BusMessage {
            subtopic: "room".into(),
            publisher: "thing-9".into(),
            protocol: "mqtt".into(),
            payload: b"[]".to_vec(),
            created: 5,
        }
    }

    #[tokio::test]
    async fn matching_sub_payloads_trigger_every_action() {
        let publisher = RecordingPublisher::new();
        let engine = RuleEngine::new(Arc::new(publisher.clone()));
        let payload = json!([{"temp": 35}, {"temp": 20}, {"temp": 31.5}]);

        let count = engine.process(&message(), &payload, &[overheat()]).await;

        assert_eq!(count, 4);
        assert_eq!(
            publisher.subjects().await,
            vec![
                "smtp.notifier-1",
                "alarms.rules.rule-1",
                "smtp.notifier-1",
                "alarms.rules.rule-1"
            ]
        );
        let published = publisher.published().await;
        let (_, first) = &published[0];
        assert_eq!(first.publisher, "thing-9");
        let body: Value = serde_json::from_slice(&first.payload).unwrap();
        assert_eq!(body, json!({"temp": 35}));
    }

    #[tokio::test]
    async fn publish_failures_are_not_counted() {
        let publisher = RecordingPublisher::failing();
        let engine = RuleEngine::new(Arc::new(publisher));
        let count = engine
            .process(&message(), &json!({"temp": 99}), &[overheat()])
            .await;
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn non_object_payload_publishes_nothing() {
        let publisher = RecordingPublisher::new();
        let engine = RuleEngine::new(Arc::new(publisher.clone()));
        assert_eq!(engine.process(&message(), &json!(99), &[overheat()]).await, 0);
        assert!(publisher.published().await.is_empty());
    }
}
