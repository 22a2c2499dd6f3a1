// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite repositories.
//!
//! Filter conditions become a `WHERE` clause with named parameters and
//! aggregation runs in SQL (`GROUP BY` over a bucket expression). Message
//! tables are created on the first Restore; reads and deletes against a
//! missing table behave like an empty table.
//!
//! All statements run on tokio-rusqlite's single background thread.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::ToSql;
use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};
use tokio_rusqlite::Connection;
use tracing::{debug, warn};

use fluxion_core::{
    AggInterval, Aggregation, FluxionError, HealthStatus, JsonMessage, JsonPageMetadata,
    JsonRepository, Message, MessagesPage, SenmlMessage, SenmlPageMetadata, SenmlRepository,
    SortDir, StorageOp,
};

use crate::aggregate::{json_bucket_record, senml_bucket_record};
use crate::filter::{Condition, Op, Operand, json_conditions, senml_conditions};

const SENML_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS senml_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subtopic TEXT NOT NULL,
    publisher TEXT NOT NULL,
    protocol TEXT NOT NULL,
    name TEXT NOT NULL,
    unit TEXT NOT NULL,
    time REAL NOT NULL,
    update_time REAL NOT NULL,
    value REAL,
    bool_value INTEGER,
    string_value TEXT,
    data_value TEXT,
    sum REAL
);
CREATE INDEX IF NOT EXISTS idx_senml_messages_publisher_time ON senml_messages (publisher, time);
";

const JSON_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS json_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created INTEGER NOT NULL,
    subtopic TEXT NOT NULL,
    publisher TEXT NOT NULL,
    protocol TEXT NOT NULL,
    payload TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_json_messages_publisher_created ON json_messages (publisher, created);
";

const SENML_COLUMNS: &str = "subtopic, publisher, protocol, name, unit, time, update_time, \
                             value, bool_value, string_value, data_value, sum";

const JSON_COLUMNS: &str = "created, subtopic, publisher, protocol, payload";

fn map_tr_err(op: StorageOp) -> impl FnOnce(tokio_rusqlite::Error<rusqlite::Error>) -> FluxionError {
    move |e| {
        warn!(%op, error = %e, "sqlite message repository call failed");
        FluxionError::storage(op, e)
    }
}

fn is_missing_table(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.starts_with("no such table")
    )
}

/// Named-parameter list bound to a statement.
#[derive(Debug, Default, Clone)]
struct Params(Vec<(String, SqlValue)>);

impl Params {
    fn push(&mut self, name: String, value: SqlValue) {
        self.0.push((name, value));
    }

    fn with_page(&self, offset: u64, limit: u64) -> Self {
        let mut out = self.clone();
        // SQLite reads a negative OFFSET as 0; clamp instead of wrapping.
        out.push(":limit".into(), SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        out.push(":offset".into(), SqlValue::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));
        out
    }

    fn bind(&self) -> Vec<(&str, &dyn ToSql)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect()
    }
}

/// Translate conditions into ` WHERE ...` (empty when there are none).
fn where_clause(conditions: &[Condition]) -> (String, Params) {
    let mut params = Params::default();
    let mut fragments = Vec::with_capacity(conditions.len());

    for (i, cond) in conditions.iter().enumerate() {
        let column = cond.field.key();
        let name = format!(":{column}_{i}");
        let fragment = match cond.op {
            Op::Eq => format!("{column} = {name}"),
            Op::Lt => format!("{column} < {name}"),
            Op::Le => format!("{column} <= {name}"),
            Op::Gt => format!("{column} > {name}"),
            Op::Ge => format!("{column} >= {name}"),
            Op::Contains => format!("instr({column}, {name}) > 0"),
        };
        let value = match &cond.operand {
            Operand::Text(s) => SqlValue::Text(s.clone()),
            Operand::Number(n) => SqlValue::Real(*n),
            Operand::Bool(b) => SqlValue::Integer(i64::from(*b)),
        };
        fragments.push(fragment);
        params.push(name, value);
    }

    if fragments.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", fragments.join(" AND ")), params)
    }
}

fn limit_clause(limit: u64) -> &'static str {
    if limit == 0 { "" } else { " LIMIT :limit OFFSET :offset" }
}

/// Integer bucket key for a unix-seconds column, matching
/// [`AggInterval::bucket_key`].
fn bucket_expr(column: &str, agg: &Aggregation) -> String {
    let count = i64::from(agg.value.max(1));
    match agg.interval.fixed_width() {
        Some((width, offset)) => {
            let x = format!("(({column} + {offset}) / {}.0)", width * count);
            // floor() without relying on the optional math extension
            format!("(CAST({x} AS INTEGER) - ({x} < CAST({x} AS INTEGER)))")
        }
        None => {
            let year = format!("CAST(strftime('%Y', {column}, 'unixepoch') AS INTEGER)");
            match agg.interval {
                AggInterval::Month => format!(
                    "(({year} * 12 + CAST(strftime('%m', {column}, 'unixepoch') AS INTEGER) - 1) / {count})"
                ),
                _ => format!("({year} / {count})"),
            }
        }
    }
}

/// `$."a"."b"` for the dot path `a.b`; paths are validated to contain no quotes.
fn json_path(field: &str) -> String {
    let segments: Vec<String> = field.split('.').map(|s| format!("\"{s}\"")).collect();
    format!("$.{}", segments.join("."))
}

fn row_to_senml(row: &rusqlite::Row<'_>) -> Result<SenmlMessage, rusqlite::Error> {
    Ok(SenmlMessage {
        subtopic: row.get(0)?,
        publisher: row.get(1)?,
        protocol: row.get(2)?,
        name: row.get(3)?,
        unit: row.get(4)?,
        time: row.get(5)?,
        update_time: row.get(6)?,
        value: row.get(7)?,
        bool_value: row.get(8)?,
        string_value: row.get(9)?,
        data_value: row.get(10)?,
        sum: row.get(11)?,
    })
}

fn row_to_json(row: &rusqlite::Row<'_>) -> Result<JsonMessage, rusqlite::Error> {
    let payload_text: String = row.get(4)?;
    let payload: Map<String, Value> = serde_json::from_str(&payload_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(JsonMessage {
        created: row.get(0)?,
        subtopic: row.get(1)?,
        publisher: row.get(2)?,
        protocol: row.get(3)?,
        payload,
    })
}

/// Count rows, treating a missing table as `None`.
fn count_rows(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &Params,
) -> Result<Option<u64>, rusqlite::Error> {
    match conn.query_row(sql, params.bind().as_slice(), |row| row.get::<_, i64>(0)) {
        Ok(n) => Ok(Some(n.max(0) as u64)),
        Err(e) if is_missing_table(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

/// SQLite connection shared by the SenML and JSON repositories.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Connection>,
}

impl SqliteStore {
    /// Open (or create) the messages database at `path` in WAL mode.
    pub async fn open(path: &str) -> Result<Self, FluxionError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| FluxionError::storage(StorageOp::Read, e))?;
            }
        }
        let conn = Connection::open(path)
            .await
            .map_err(|e| FluxionError::storage(StorageOp::Read, e))?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err(StorageOp::Read))?;
        debug!(path, "sqlite message store opened");
        Ok(Self::new(Arc::new(conn)))
    }

    pub async fn open_in_memory() -> Result<Self, FluxionError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| FluxionError::storage(StorageOp::Read, e))?;
        Ok(Self::new(Arc::new(conn)))
    }

    pub fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    pub fn senml(&self) -> SqliteSenmlRepository {
        SqliteSenmlRepository {
            conn: self.conn.clone(),
        }
    }

    pub fn json(&self) -> SqliteJsonRepository {
        SqliteJsonRepository {
            conn: self.conn.clone(),
        }
    }
}

async fn ping(conn: &Connection) -> Result<HealthStatus, FluxionError> {
    conn.call(|conn| -> Result<(), rusqlite::Error> {
        conn.execute_batch("SELECT 1;")?;
        Ok(())
    })
    .await
    .map_err(map_tr_err(StorageOp::Read))?;
    Ok(HealthStatus::Healthy)
}

async fn delete_where(
    conn: &Connection,
    table: &'static str,
    conditions: Vec<Condition>,
) -> Result<(), FluxionError> {
    if conditions.is_empty() {
        return Err(FluxionError::NoDeleteCriteria);
    }
    let (clause, params) = where_clause(&conditions);
    let sql = format!("DELETE FROM {table}{clause}");
    conn.call(move |conn| -> Result<(), rusqlite::Error> {
        match conn.execute(&sql, params.bind().as_slice()) {
            Ok(deleted) => {
                debug!(table, deleted, "removed messages");
                Ok(())
            }
            Err(e) if is_missing_table(&e) => Ok(()),
            Err(e) => Err(e),
        }
    })
    .await
    .map_err(map_tr_err(StorageOp::Delete))
}

pub struct SqliteSenmlRepository {
    conn: Arc<Connection>,
}

impl SqliteSenmlRepository {
    async fn aggregate(
        &self,
        query: &SenmlPageMetadata,
        agg: Aggregation,
        clause: String,
        params: Params,
    ) -> Result<MessagesPage<SenmlPageMetadata>, FluxionError> {
        let bucket = bucket_expr("time", &agg);
        let count_sql = format!(
            "SELECT COUNT(*) FROM (SELECT {bucket} AS bucket FROM senml_messages{clause} GROUP BY bucket)"
        );
        let page_sql = format!(
            "SELECT {bucket} AS bucket, {}(value) FROM senml_messages{clause} \
             GROUP BY bucket ORDER BY bucket {}{}",
            agg.agg_type.sql_fn(),
            query.dir.sql(),
            limit_clause(query.limit)
        );
        let page_params = if query.limit == 0 {
            params.clone()
        } else {
            params.with_page(query.offset, query.limit)
        };

        let rows = self
            .conn
            .call(
                move |conn| -> Result<Option<(u64, Vec<(i64, Option<f64>)>)>, rusqlite::Error> {
                    let Some(total) = count_rows(conn, &count_sql, &params)? else {
                        return Ok(None);
                    };
                    let mut stmt = conn.prepare(&page_sql)?;
                    let buckets = stmt
                        .query_map(page_params.bind().as_slice(), |row| {
                            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<f64>>(1)?))
                        })?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Some((total, buckets)))
                },
            )
            .await
            .map_err(map_tr_err(StorageOp::Read))?;

        let Some((total, buckets)) = rows else {
            return Ok(MessagesPage::empty(query.clone()));
        };
        let messages = buckets
            .into_iter()
            .map(|(key, value)| Message::Senml(senml_bucket_record(query, &agg, key, value)))
            .collect();
        Ok(MessagesPage {
            total,
            messages,
            metadata: query.clone(),
        })
    }
}

#[async_trait]
impl SenmlRepository for SqliteSenmlRepository {
    async fn retrieve(
        &self,
        query: &SenmlPageMetadata,
    ) -> Result<MessagesPage<SenmlPageMetadata>, FluxionError> {
        let aggregation = query.validate()?;
        let (clause, params) = where_clause(&senml_conditions(query));
        if let Some(agg) = aggregation {
            return self.aggregate(query, agg, clause, params).await;
        }

        let count_sql = format!("SELECT COUNT(*) FROM senml_messages{clause}");
        let page_sql = format!(
            "SELECT {SENML_COLUMNS} FROM senml_messages{clause} ORDER BY time {}, id ASC{}",
            query.dir.sql(),
            limit_clause(query.limit)
        );
        let page_params = if query.limit == 0 {
            params.clone()
        } else {
            params.with_page(query.offset, query.limit)
        };

        let rows = self
            .conn
            .call(
                move |conn| -> Result<Option<(u64, Vec<SenmlMessage>)>, rusqlite::Error> {
                    let Some(total) = count_rows(conn, &count_sql, &params)? else {
                        return Ok(None);
                    };
                    let mut stmt = conn.prepare(&page_sql)?;
                    let messages = stmt
                        .query_map(page_params.bind().as_slice(), row_to_senml)?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Some((total, messages)))
                },
            )
            .await
            .map_err(map_tr_err(StorageOp::Read))?;

        Ok(match rows {
            Some((total, messages)) => MessagesPage {
                total,
                messages: messages.into_iter().map(Message::Senml).collect(),
                metadata: query.clone(),
            },
            None => MessagesPage::empty(query.clone()),
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

        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(SENML_SCHEMA)?;
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO senml_messages (subtopic, publisher, protocol, name, unit, \
                         time, update_time, value, bool_value, string_value, data_value, sum) \
                         VALUES (:subtopic, :publisher, :protocol, :name, :unit, :time, \
                         :update_time, :value, :bool_value, :string_value, :data_value, :sum)",
                    )?;
                    for m in &records {
                        stmt.execute(rusqlite::named_params! {
                            ":subtopic": m.subtopic,
                            ":publisher": m.publisher,
                            ":protocol": m.protocol,
                            ":name": m.name,
                            ":unit": m.unit,
                            ":time": m.time,
                            ":update_time": m.update_time,
                            ":value": m.value,
                            ":bool_value": m.bool_value,
                            ":string_value": m.string_value,
                            ":data_value": m.data_value,
                            ":sum": m.sum,
                        })?;
                    }
                }
                tx.commit()
            })
            .await
            .map_err(map_tr_err(StorageOp::Save))
    }

    async fn remove(&self, query: &SenmlPageMetadata) -> Result<(), FluxionError> {
        query.validate()?;
        delete_where(&self.conn, "senml_messages", senml_conditions(query)).await
    }

    async fn health_check(&self) -> Result<HealthStatus, FluxionError> {
        ping(&self.conn).await
    }
}

pub struct SqliteJsonRepository {
    conn: Arc<Connection>,
}

impl SqliteJsonRepository {
    async fn aggregate(
        &self,
        query: &JsonPageMetadata,
        agg: Aggregation,
        clause: String,
        params: Params,
    ) -> Result<MessagesPage<JsonPageMetadata>, FluxionError> {
        let bucket = bucket_expr("created", &agg);
        let mut page_params = params.clone();
        let mut columns = Vec::with_capacity(query.agg_fields.len());
        for (i, field) in query.agg_fields.iter().enumerate() {
            let name = format!(":agg_path_{i}");
            columns.push(format!(
                "{}(CASE WHEN json_type(payload, {name}) IN ('integer', 'real') \
                 THEN json_extract(payload, {name}) END)",
                agg.agg_type.sql_fn()
            ));
            page_params.push(name, SqlValue::Text(json_path(field)));
        }
        if query.limit > 0 {
            page_params = page_params.with_page(query.offset, query.limit);
        }

        let count_sql = format!(
            "SELECT COUNT(*) FROM (SELECT {bucket} AS bucket FROM json_messages{clause} GROUP BY bucket)"
        );
        let page_sql = format!(
            "SELECT {bucket} AS bucket, {} FROM json_messages{clause} \
             GROUP BY bucket ORDER BY bucket {}{}",
            columns.join(", "),
            query.dir.sql(),
            limit_clause(query.limit)
        );
        let field_count = query.agg_fields.len();

        let rows = self
            .conn
            .call(
                move |conn| -> Result<Option<(u64, Vec<(i64, Vec<Option<f64>>)>)>, rusqlite::Error> {
                    let Some(total) = count_rows(conn, &count_sql, &params)? else {
                        return Ok(None);
                    };
                    let mut stmt = conn.prepare(&page_sql)?;
                    let buckets = stmt
                        .query_map(page_params.bind().as_slice(), |row| {
                            let key = row.get::<_, i64>(0)?;
                            let values = (0..field_count)
                                .map(|i| row.get::<_, Option<f64>>(i + 1))
                                .collect::<Result<Vec<_>, _>>()?;
                            Ok((key, values))
                        })?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Some((total, buckets)))
                },
            )
            .await
            .map_err(map_tr_err(StorageOp::Read))?;

        let Some((total, buckets)) = rows else {
            return Ok(MessagesPage::empty(query.clone()));
        };
        let messages = buckets
            .into_iter()
            .map(|(key, values)| Message::Json(json_bucket_record(query, &agg, key, values)))
            .collect();
        Ok(MessagesPage {
            total,
            messages,
            metadata: query.clone(),
        })
    }
}

#[async_trait]
impl JsonRepository for SqliteJsonRepository {
    async fn retrieve(
        &self,
        query: &JsonPageMetadata,
    ) -> Result<MessagesPage<JsonPageMetadata>, FluxionError> {
        let aggregation = query.validate()?;
        let (clause, params) = where_clause(&json_conditions(query));
        if let Some(agg) = aggregation {
            return self.aggregate(query, agg, clause, params).await;
        }

        let count_sql = format!("SELECT COUNT(*) FROM json_messages{clause}");
        let page_sql = format!(
            "SELECT {JSON_COLUMNS} FROM json_messages{clause} ORDER BY created {}, id ASC{}",
            query.dir.sql(),
            limit_clause(query.limit)
        );
        let page_params = if query.limit == 0 {
            params.clone()
        } else {
            params.with_page(query.offset, query.limit)
        };

        let rows = self
            .conn
            .call(
                move |conn| -> Result<Option<(u64, Vec<JsonMessage>)>, rusqlite::Error> {
                    let Some(total) = count_rows(conn, &count_sql, &params)? else {
                        return Ok(None);
                    };
                    let mut stmt = conn.prepare(&page_sql)?;
                    let messages = stmt
                        .query_map(page_params.bind().as_slice(), row_to_json)?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Some((total, messages)))
                },
            )
            .await
            .map_err(map_tr_err(StorageOp::Read))?;

        Ok(match rows {
            Some((total, messages)) => MessagesPage {
                total,
                messages: messages.into_iter().map(Message::Json).collect(),
                metadata: query.clone(),
            },
            None => MessagesPage::empty(query.clone()),
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

        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(JSON_SCHEMA)?;
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO json_messages (created, subtopic, publisher, protocol, payload) \
                         VALUES (:created, :subtopic, :publisher, :protocol, :payload)",
                    )?;
                    for m in &records {
                        stmt.execute(rusqlite::named_params! {
                            ":created": m.created,
                            ":subtopic": m.subtopic,
                            ":publisher": m.publisher,
                            ":protocol": m.protocol,
                            ":payload": m.payload_text(),
                        })?;
                    }
                }
                tx.commit()
            })
            .await
            .map_err(map_tr_err(StorageOp::Save))
    }

    async fn remove(&self, query: &JsonPageMetadata) -> Result<(), FluxionError> {
        query.validate()?;
        delete_where(&self.conn, "json_messages", json_conditions(query)).await
    }

    async fn health_check(&self) -> Result<HealthStatus, FluxionError> {
        ping(&self.conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_core::{AggType, Comparator};

    #[test]
    fn where_clause_uses_named_parameters() {
        let pm = SenmlPageMetadata {
            publisher: "p1".into(),
            from: 10.0,
            to: 20.0,
            value: Some(5.0),
            comparator: Some(Comparator::Le),
            ..Default::default()
        };
        let (clause, params) = where_clause(&senml_conditions(&pm));
        assert_eq!(
            clause,
            " WHERE publisher = :publisher_0 AND time >= :time_1 AND time < :time_2 AND value <= :value_3"
        );
        assert_eq!(params.0.len(), 4);
        assert_eq!(params.0[3].1, SqlValue::Real(5.0));
    }

    #[test]
    fn empty_conditions_produce_no_where() {
        let (clause, params) = where_clause(&[]);
        assert!(clause.is_empty());
        assert!(params.0.is_empty());
    }

    #[test]
    fn json_path_quotes_segments() {
        assert_eq!(json_path("env.hum"), "$.\"env\".\"hum\"");
    }

    #[test]
    fn bucket_expression_per_unit() {
        let agg = Aggregation {
            agg_type: AggType::Avg,
            interval: AggInterval::Hour,
            value: 2,
        };
        assert!(bucket_expr("time", &agg).contains("(time + 0) / 7200.0"));
        let agg = Aggregation {
            interval: AggInterval::Month,
            ..agg
        };
        assert!(bucket_expr("created", &agg).contains("strftime('%m', created"));
    }

    #[tokio::test]
    async fn missing_tables_read_as_empty() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let page = store
            .senml()
            .retrieve(&SenmlPageMetadata::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        let page = store
            .json()
            .retrieve(&JsonPageMetadata::default())
            .await
            .unwrap();
        assert!(page.messages.is_empty());

        let query = SenmlPageMetadata {
            publisher: "p1".into(),
            ..Default::default()
        };
        store.senml().remove(&query).await.unwrap();
    }

    #[tokio::test]
    async fn sql_aggregation_by_day() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let day = 86_400.0;
        let records: Vec<Message> = [(10.0, 1.0), (20.0, 3.0), (day + 5.0, 10.0)]
            .into_iter()
            .map(|(time, value)| {
                Message::Senml(SenmlMessage {
                    publisher: "p1".into(),
                    time,
                    value: Some(value),
                    ..Default::default()
                })
            })
            .collect();
        store.senml().restore(records).await.unwrap();

        let query = SenmlPageMetadata {
            agg_type: Some(AggType::Avg),
            agg_interval: Some(AggInterval::Day),
            dir: SortDir::Asc,
            ..Default::default()
        };
        let page = store.senml().retrieve(&query).await.unwrap();
        assert_eq!(page.total, 2);
        let buckets: Vec<_> = page
            .messages
            .iter()
            .map(|m| {
                let s = m.as_senml().unwrap();
                (s.time, s.value)
            })
            .collect();
        assert_eq!(buckets, vec![(0.0, Some(2.0)), (day, Some(10.0))]);
    }
}
