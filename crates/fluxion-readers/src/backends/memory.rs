// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory repositories.
//!
//! Both encodings share one record list behind a single mutex; every read
//! and write is serialized through it. Intended for tests and ad-hoc runs.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use fluxion_core::{
    FluxionError, HealthStatus, JsonMessage, JsonPageMetadata, JsonRepository, Message,
    MessagesPage, SenmlMessage, SenmlPageMetadata, SenmlRepository,
};

use crate::aggregate::{aggregate_json, aggregate_senml, paginate, sort_by_time};
use crate::filter::{Condition, Field, Op, Operand, json_conditions, senml_conditions};

#[derive(Debug, Default)]
struct Records {
    messages: Vec<Message>,
}

/// Shared in-memory message store handing out per-encoding repositories.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Records>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn senml(&self) -> MemorySenmlRepository {
        MemorySenmlRepository {
            store: self.clone(),
        }
    }

    pub fn json(&self) -> MemoryJsonRepository {
        MemoryJsonRepository {
            store: self.clone(),
        }
    }

    /// Number of records of both encodings.
    pub fn len(&self) -> usize {
        self.lock().map(|r| r.messages.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Records>, FluxionError> {
        self.inner
            .lock()
            .map_err(|_| FluxionError::Internal("memory store lock poisoned".into()))
    }
}

fn text_matches(cond: &Condition, actual: &str) -> bool {
    match (&cond.operand, cond.op) {
        (Operand::Text(expected), Op::Eq) => actual == expected,
        (Operand::Text(expected), Op::Contains) => actual.contains(expected.as_str()),
        _ => false,
    }
}

fn senml_matches(msg: &SenmlMessage, conditions: &[Condition]) -> bool {
    conditions.iter().all(|cond| match cond.field {
        Field::Subtopic => text_matches(cond, &msg.subtopic),
        Field::Publisher => text_matches(cond, &msg.publisher),
        Field::Protocol => text_matches(cond, &msg.protocol),
        Field::Name => text_matches(cond, &msg.name),
        Field::Time => cond.compare_number(msg.time),
        Field::Value => msg.value.is_some_and(|v| cond.compare_number(v)),
        Field::BoolValue => matches!(
            (&cond.operand, msg.bool_value),
            (Operand::Bool(expected), Some(actual)) if *expected == actual
        ),
        Field::StringValue => msg
            .string_value
            .as_deref()
            .is_some_and(|s| text_matches(cond, s)),
        Field::DataValue => msg
            .data_value
            .as_deref()
            .is_some_and(|s| text_matches(cond, s)),
        Field::Created | Field::Payload => false,
    })
}

fn json_matches(msg: &JsonMessage, conditions: &[Condition]) -> bool {
    conditions.iter().all(|cond| match cond.field {
        Field::Subtopic => text_matches(cond, &msg.subtopic),
        Field::Publisher => text_matches(cond, &msg.publisher),
        Field::Protocol => text_matches(cond, &msg.protocol),
        Field::Created => cond.compare_number(msg.created as f64),
        Field::Payload => text_matches(cond, &msg.payload_text()),
        _ => false,
    })
}

pub struct MemorySenmlRepository {
    store: MemoryStore,
}

#[async_trait]
impl SenmlRepository for MemorySenmlRepository {
    async fn retrieve(
        &self,
        query: &SenmlPageMetadata,
    ) -> Result<MessagesPage<SenmlPageMetadata>, FluxionError> {
        let aggregation = query.validate()?;
        let conditions = senml_conditions(query);

        let mut matches: Vec<SenmlMessage> = {
            let records = self.store.lock()?;
            records
                .messages
                .iter()
                .filter_map(Message::as_senml)
                .filter(|m| senml_matches(m, &conditions))
                .cloned()
                .collect()
        };

        if let Some(agg) = aggregation {
            return Ok(aggregate_senml(&matches, query, &agg));
        }

        sort_by_time(&mut matches, query.dir, |m| m.time);
        let total = matches.len() as u64;
        let messages = paginate(matches, query.offset, query.limit)
            .into_iter()
            .map(Message::Senml)
            .collect();
        Ok(MessagesPage {
            total,
            messages,
            metadata: query.clone(),
        })
    }

    async fn restore(&self, messages: Vec<Message>) -> Result<(), FluxionError> {
        if messages.iter().any(|m| m.as_senml().is_none()) {
            return Err(FluxionError::InvalidMessage);
        }
        self.store.lock()?.messages.extend(messages);
        Ok(())
    }

    async fn remove(&self, query: &SenmlPageMetadata) -> Result<(), FluxionError> {
        query.validate()?;
        let conditions = senml_conditions(query);
        if conditions.is_empty() {
            return Err(FluxionError::NoDeleteCriteria);
        }
        self.store.lock()?.messages.retain(|m| match m {
            Message::Senml(s) => !senml_matches(s, &conditions),
            Message::Json(_) => true,
        });
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, FluxionError> {
        let _records = self.store.lock()?;
        Ok(HealthStatus::Healthy)
    }
}

pub struct MemoryJsonRepository {
    store: MemoryStore,
}

#[async_trait]
impl JsonRepository for MemoryJsonRepository {
    async fn retrieve(
        &self,
        query: &JsonPageMetadata,
    ) -> Result<MessagesPage<JsonPageMetadata>, FluxionError> {
        let aggregation = query.validate()?;
        let conditions = json_conditions(query);

        let mut matches: Vec<JsonMessage> = {
            let records = self.store.lock()?;
            records
                .messages
                .iter()
                .filter_map(Message::as_json)
                .filter(|m| json_matches(m, &conditions))
                .cloned()
                .collect()
        };

        if let Some(agg) = aggregation {
            return Ok(aggregate_json(&matches, query, &agg));
        }

        sort_by_time(&mut matches, query.dir, |m| m.created as f64);
        let total = matches.len() as u64;
        let messages = paginate(matches, query.offset, query.limit)
            .into_iter()
            .map(Message::Json)
            .collect();
        Ok(MessagesPage {
            total,
            messages,
            metadata: query.clone(),
        })
    }

    async fn restore(&self, messages: Vec<Message>) -> Result<(), FluxionError> {
        if messages.iter().any(|m| m.as_json().is_none()) {
            return Err(FluxionError::InvalidMessage);
        }
        self.store.lock()?.messages.extend(messages);
        Ok(())
    }

    async fn remove(&self, query: &JsonPageMetadata) -> Result<(), FluxionError> {
        query.validate()?;
        let conditions = json_conditions(query);
        if conditions.is_empty() {
            return Err(FluxionError::NoDeleteCriteria);
        }
        self.store.lock()?.messages.retain(|m| match m {
            Message::Json(j) => !json_matches(j, &conditions),
            Message::Senml(_) => true,
        });
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, FluxionError> {
        let _records = self.store.lock()?;
        Ok(HealthStatus::Healthy)
    }
}
