// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document-store repositories on top of redb.
//!
//! Each record is stored as one JSON document keyed by an insertion
//! sequence number. Queries are translated into a filter document in the
//! familiar operator style:
//!
//! ```text
//! {"publisher": "p1", "time": {"$gte": 10.0, "$lt": 20.0}, "value": {"$gt": 5.0}}
//! ```
//!
//! and evaluated against every stored document inside a read transaction.
//! A collection that was never written reads as empty.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition, TableError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use fluxion_core::{
    FluxionError, HealthStatus, JsonMessage, JsonPageMetadata, JsonRepository, Message,
    MessagesPage, SenmlMessage, SenmlPageMetadata, SenmlRepository, StorageOp,
};

use crate::aggregate::{aggregate_json, aggregate_senml, paginate, sort_by_time};
use crate::filter::{Condition, Op, Operand, json_conditions, senml_conditions};

const SENML_COLLECTION: TableDefinition<u64, &str> = TableDefinition::new("senml_messages");
const JSON_COLLECTION: TableDefinition<u64, &str> = TableDefinition::new("json_messages");

/// Failures inside a document-store transaction.
#[derive(Debug, Error)]
enum DocError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("malformed document: {0}")]
    Document(#[from] serde_json::Error),
}

impl From<redb::TransactionError> for DocError {
    fn from(e: redb::TransactionError) -> Self {
        DocError::Redb(e.into())
    }
}

impl From<redb::TableError> for DocError {
    fn from(e: redb::TableError) -> Self {
        DocError::Redb(e.into())
    }
}

impl From<redb::StorageError> for DocError {
    fn from(e: redb::StorageError) -> Self {
        DocError::Redb(e.into())
    }
}

impl From<redb::CommitError> for DocError {
    fn from(e: redb::CommitError) -> Self {
        DocError::Redb(e.into())
    }
}

/// Build the filter document for a condition list.
///
/// Equality is a plain value; every other operator lives in a nested
/// `$op` object so two bounds on one field merge into one entry.
pub fn filter_document(conditions: &[Condition]) -> Map<String, Value> {
    let mut filter = Map::new();
    for cond in conditions {
        let operand = match &cond.operand {
            Operand::Text(s) => Value::String(s.clone()),
            Operand::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Operand::Bool(b) => Value::Bool(*b),
        };
        let key = cond.field.key().to_string();
        let op = match cond.op {
            Op::Eq => {
                if !filter.contains_key(&key) {
                    filter.insert(key, operand);
                    continue;
                }
                "$eq"
            }
            Op::Lt => "$lt",
            Op::Le => "$lte",
            Op::Gt => "$gt",
            Op::Ge => "$gte",
            Op::Contains => "$contains",
        };
        let entry = filter
            .entry(key)
            .or_insert_with(|| Value::Object(Map::new()));
        if !is_operator_object(entry) {
            let plain = entry.take();
            let mut wrapped = Map::new();
            wrapped.insert("$eq".into(), plain);
            *entry = Value::Object(wrapped);
        }
        if let Value::Object(ops) = entry {
            ops.insert(op.to_string(), operand);
        }
    }
    filter
}

fn is_operator_object(v: &Value) -> bool {
    match v {
        Value::Object(m) => m.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) if actual.is_number() && expected.is_number() => a == b,
        _ => actual == expected,
    }
}

fn apply_operator(op: &str, actual: Option<&Value>, operand: &Value) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    let numeric = || match (actual, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().zip(b.as_f64()),
        _ => None,
    };
    match op {
        "$eq" => values_equal(actual, operand),
        "$lt" => numeric().is_some_and(|(a, b)| a < b),
        "$lte" => numeric().is_some_and(|(a, b)| a <= b),
        "$gt" => numeric().is_some_and(|(a, b)| a > b),
        "$gte" => numeric().is_some_and(|(a, b)| a >= b),
        "$contains" => {
            let Some(needle) = operand.as_str() else {
                return false;
            };
            match actual {
                Value::String(s) => s.contains(needle),
                other => other.to_string().contains(needle),
            }
        }
        _ => false,
    }
}

/// Evaluate a filter document against a stored document.
pub fn matches_document(doc: &Map<String, Value>, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(key, expected)| {
        let actual = doc.get(key);
        match expected {
            Value::Object(ops) if is_operator_object(expected) => ops
                .iter()
                .all(|(op, operand)| apply_operator(op, actual, operand)),
            plain => apply_operator("$eq", actual, plain),
        }
    })
}

/// redb-backed store handing out the SenML and JSON repositories.
#[derive(Clone)]
pub struct DocStore {
    db: Arc<Database>,
}

impl DocStore {
    /// Open or create the document store file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FluxionError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| FluxionError::storage(StorageOp::Read, e))?;
            }
        }
        let db = Database::create(path).map_err(|e| FluxionError::storage(StorageOp::Read, e))?;
        debug!(path = %path.display(), "document store opened");
        Ok(Self { db: Arc::new(db) })
    }

    pub fn senml(&self) -> DocSenmlRepository {
        DocSenmlRepository {
            collection: Collection {
                db: self.db.clone(),
                table: SENML_COLLECTION,
            },
        }
    }

    pub fn json(&self) -> DocJsonRepository {
        DocJsonRepository {
            collection: Collection {
                db: self.db.clone(),
                table: JSON_COLLECTION,
            },
        }
    }
}

/// One collection of JSON documents.
#[derive(Clone)]
struct Collection {
    db: Arc<Database>,
    table: TableDefinition<'static, u64, &'static str>,
}

impl Collection {
    async fn blocking<T, F>(&self, op: StorageOp, f: F) -> Result<T, FluxionError>
    where
        T: Send + 'static,
        F: FnOnce(&Database, TableDefinition<'static, u64, &'static str>) -> Result<T, DocError>
            + Send
            + 'static,
    {
        let db = self.db.clone();
        let table = self.table;
        tokio::task::spawn_blocking(move || f(&db, table))
            .await
            .map_err(|e| FluxionError::Internal(format!("document store task failed: {e}")))?
            .map_err(|e| {
                warn!(%op, error = %e, "document store call failed");
                FluxionError::storage(op, e)
            })
    }

    /// Documents matching `filter`, in insertion order.
    async fn find<T>(&self, filter: Map<String, Value>) -> Result<Vec<T>, FluxionError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.blocking(StorageOp::Read, move |db, table| {
            let txn = db.begin_read()?;
            let collection = match txn.open_table(table) {
                Ok(t) => t,
                Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };
            let mut out = Vec::new();
            for entry in collection.iter()? {
                let (_, raw) = entry?;
                let doc: Map<String, Value> = serde_json::from_str(raw.value())?;
                if matches_document(&doc, &filter) {
                    out.push(serde_json::from_value(Value::Object(doc))?);
                }
            }
            Ok(out)
        })
        .await
    }

    async fn insert_many<T>(&self, records: Vec<T>) -> Result<(), FluxionError>
    where
        T: Serialize + Send + 'static,
    {
        self.blocking(StorageOp::Save, move |db, table| {
            let docs = records
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            let txn = db.begin_write()?;
            {
                let mut collection = txn.open_table(table)?;
                let mut next = collection.last()?.map(|(k, _)| k.value() + 1).unwrap_or(0);
                for doc in &docs {
                    collection.insert(next, doc.as_str())?;
                    next += 1;
                }
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_many(&self, filter: Map<String, Value>) -> Result<u64, FluxionError> {
        self.blocking(StorageOp::Delete, move |db, table| {
            let txn = db.begin_write()?;
            let removed = {
                let mut collection = txn.open_table(table)?;
                let mut doomed = Vec::new();
                for entry in collection.iter()? {
                    let (key, raw) = entry?;
                    let doc: Map<String, Value> = serde_json::from_str(raw.value())?;
                    if matches_document(&doc, &filter) {
                        doomed.push(key.value());
                    }
                }
                for key in &doomed {
                    collection.remove(*key)?;
                }
                doomed.len() as u64
            };
            txn.commit()?;
            Ok(removed)
        })
        .await
    }

    async fn ping(&self) -> Result<HealthStatus, FluxionError> {
        self.blocking(StorageOp::Read, |db, table| {
            let txn = db.begin_read()?;
            match txn.open_table(table) {
                Ok(t) => {
                    t.len()?;
                    Ok(())
                }
                Err(TableError::TableDoesNotExist(_)) => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
        .await?;
        Ok(HealthStatus::Healthy)
    }
}

pub struct DocSenmlRepository {
    collection: Collection,
}

#[async_trait]
impl SenmlRepository for DocSenmlRepository {
    async fn retrieve(
        &self,
        query: &SenmlPageMetadata,
    ) -> Result<MessagesPage<SenmlPageMetadata>, FluxionError> {
        let aggregation = query.validate()?;
        let filter = filter_document(&senml_conditions(query));
        let mut matches: Vec<SenmlMessage> = self.collection.find(filter).await?;

        if let Some(agg) = aggregation {
            return Ok(aggregate_senml(&matches, query, &agg));
        }
        sort_by_time(&mut matches, query.dir, |m| m.time);
        let total = matches.len() as u64;
        Ok(MessagesPage {
            total,
            messages: paginate(matches, query.offset, query.limit)
                .into_iter()
                .map(Message::Senml)
                .collect(),
            metadata: query.clone(),
        })
    }

    async fn restore(&self, messages: Vec<Message>) -> Result<(), FluxionError> {
        let records = messages
            .into_iter()
            .map(|m| match m {
                Message::Senml(s) => Ok(s),
                Message::Json(_) => Err(FluxionError::InvalidMessage),
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.collection.insert_many(records).await
    }

    async fn remove(&self, query: &SenmlPageMetadata) -> Result<(), FluxionError> {
        query.validate()?;
        let conditions = senml_conditions(query);
        if conditions.is_empty() {
            return Err(FluxionError::NoDeleteCriteria);
        }
        let removed = self
            .collection
            .delete_many(filter_document(&conditions))
            .await?;
        debug!(removed, "removed senml documents");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, FluxionError> {
        self.collection.ping().await
    }
}

pub struct DocJsonRepository {
    collection: Collection,
}

#[async_trait]
impl JsonRepository for DocJsonRepository {
    async fn retrieve(
        &self,
        query: &JsonPageMetadata,
    ) -> Result<MessagesPage<JsonPageMetadata>, FluxionError> {
        let aggregation = query.validate()?;
        let filter = filter_document(&json_conditions(query));
        let mut matches: Vec<JsonMessage> = self.collection.find(filter).await?;

        if let Some(agg) = aggregation {
            return Ok(aggregate_json(&matches, query, &agg));
        }
        sort_by_time(&mut matches, query.dir, |m| m.created as f64);
        let total = matches.len() as u64;
        Ok(MessagesPage {
            total,
            messages: paginate(matches, query.offset, query.limit)
                .into_iter()
                .map(Message::Json)
                .collect(),
            metadata: query.clone(),
        })
    }

    async fn restore(&self, messages: Vec<Message>) -> Result<(), FluxionError> {
        let records = messages
            .into_iter()
            .map(|m| match m {
                Message::Json(j) => Ok(j),
                Message::Senml(_) => Err(FluxionError::InvalidMessage),
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.collection.insert_many(records).await
    }

    async fn remove(&self, query: &JsonPageMetadata) -> Result<(), FluxionError> {
        query.validate()?;
        let conditions = json_conditions(query);
        if conditions.is_empty() {
            return Err(FluxionError::NoDeleteCriteria);
        }
        let removed = self
            .collection
            .delete_many(filter_document(&conditions))
            .await?;
        debug!(removed, "removed json documents");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, FluxionError> {
        self.collection.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_core::Comparator;
    use serde_json::json;

    #[test]
    fn filter_document_merges_time_bounds() {
        let pm = SenmlPageMetadata {
            publisher: "p1".into(),
            from: 10.0,
            to: 20.0,
            value: Some(5.0),
            comparator: Some(Comparator::Gt),
            ..Default::default()
        };
        let filter = filter_document(&senml_conditions(&pm));
        assert_eq!(
            Value::Object(filter),
            json!({
                "publisher": "p1",
                "time": {"$gte": 10.0, "$lt": 20.0},
                "value": {"$gt": 5.0}
            })
        );
    }

    #[test]
    fn missing_field_never_matches_operator() {
        let filter = filter_document(&senml_conditions(&SenmlPageMetadata {
            value: Some(1.0),
            comparator: Some(Comparator::Ge),
            ..Default::default()
        }));
        let doc = json!({"publisher": "p1", "time": 5.0});
        assert!(!matches_document(doc.as_object().unwrap(), &filter));
    }

    #[test]
    fn payload_contains_uses_canonical_text() {
        let filter = filter_document(&json_conditions(&JsonPageMetadata {
            filter: "\"b\":2".into(),
            ..Default::default()
        }));
        let doc = json!({"payload": {"b": 2, "a": 1}});
        assert!(matches_document(doc.as_object().unwrap(), &filter));
    }

    #[test]
    fn integer_and_float_compare_equal() {
        let filter = json!({"created": 5.0});
        let doc = json!({"created": 5});
        assert!(matches_document(
            doc.as_object().unwrap(),
            filter.as_object().unwrap()
        ));
    }

    #[tokio::test]
    async fn fresh_store_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocStore::open(dir.path().join("messages.redb")).unwrap();
        let page = store
            .senml()
            .retrieve(&SenmlPageMetadata::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(
            store.json().health_check().await.unwrap(),
            HealthStatus::Healthy
        );
    }
}
