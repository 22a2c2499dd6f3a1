// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time-bucket aggregation, ordering and pagination shared by the backends
//! that evaluate queries in process.
//!
//! A bucket exists when at least one matching record falls into its window.
//! `min`, `max` and `avg` only consider numeric values and yield `None` when
//! a bucket has none; `count` counts numeric values. Buckets are ordered by
//! window start following the query direction, and `total` is the number of
//! buckets, so offset and limit apply to the bucket list.

use std::collections::BTreeMap;

use serde_json::Value;

use fluxion_core::message::numeric_at;
use fluxion_core::{
    AggType, Aggregation, JsonMessage, JsonPageMetadata, Message, MessagesPage, SenmlMessage,
    SenmlPageMetadata, SortDir,
};

/// Apply offset and limit. A zero limit returns everything and ignores the offset.
pub fn paginate<T>(items: Vec<T>, offset: u64, limit: u64) -> Vec<T> {
    if limit == 0 {
        return items;
    }
    let skip = usize::try_from(offset).unwrap_or(usize::MAX);
    let take = usize::try_from(limit).unwrap_or(usize::MAX);
    items.into_iter().skip(skip).take(take).collect()
}

/// Stable sort by canonical time; ties keep insertion order.
pub fn sort_by_time<T>(items: &mut [T], dir: SortDir, time: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| {
        let ord = time(a).total_cmp(&time(b));
        match dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    });
}

/// Reduce the numeric values of one bucket.
pub fn reduce(agg_type: AggType, values: &[f64]) -> Option<f64> {
    if agg_type == AggType::Count {
        return Some(values.len() as f64);
    }
    if values.is_empty() {
        return None;
    }
    let folded = match agg_type {
        AggType::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        AggType::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggType::Avg => values.iter().sum::<f64>() / values.len() as f64,
        AggType::Count => values.len() as f64,
    };
    Some(folded)
}

/// Synthetic record standing for one SenML bucket.
pub fn senml_bucket_record(
    query: &SenmlPageMetadata,
    agg: &Aggregation,
    key: i64,
    value: Option<f64>,
) -> SenmlMessage {
    SenmlMessage {
        subtopic: query.subtopic.clone(),
        publisher: query.publisher.clone(),
        protocol: query.protocol.clone(),
        name: query.name.clone(),
        time: agg.interval.bucket_start(key, agg.value) as f64,
        value,
        ..Default::default()
    }
}

/// Synthetic record standing for one JSON bucket; the payload maps each
/// aggregation field path to its aggregate (or null).
pub fn json_bucket_record(
    query: &JsonPageMetadata,
    agg: &Aggregation,
    key: i64,
    values: Vec<Option<f64>>,
) -> JsonMessage {
    let payload = query
        .agg_fields
        .iter()
        .zip(values)
        .map(|(field, v)| {
            let v = v
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null);
            (field.clone(), v)
        })
        .collect();
    JsonMessage {
        created: agg.interval.bucket_start(key, agg.value),
        subtopic: query.subtopic.clone(),
        publisher: query.publisher.clone(),
        protocol: query.protocol.clone(),
        payload,
    }
}

fn ordered_keys<V>(buckets: BTreeMap<i64, V>, dir: SortDir) -> Vec<(i64, V)> {
    let mut out: Vec<(i64, V)> = buckets.into_iter().collect();
    if dir == SortDir::Desc {
        out.reverse();
    }
    out
}

/// Aggregate already-filtered SenML records into a page of bucket records.
pub fn aggregate_senml(
    matches: &[SenmlMessage],
    query: &SenmlPageMetadata,
    agg: &Aggregation,
) -> MessagesPage<SenmlPageMetadata> {
    let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for msg in matches {
        let entry = buckets
            .entry(agg.interval.bucket_key(msg.time, agg.value))
            .or_default();
        if let Some(v) = msg.value {
            entry.push(v);
        }
    }

    let ordered = ordered_keys(buckets, query.dir);
    let total = ordered.len() as u64;
    let messages = paginate(ordered, query.offset, query.limit)
        .into_iter()
        .map(|(key, values)| {
            Message::Senml(senml_bucket_record(query, agg, key, reduce(agg.agg_type, &values)))
        })
        .collect();

    MessagesPage {
        total,
        messages,
        metadata: query.clone(),
    }
}

/// Aggregate already-filtered JSON records, one aggregate per field path.
pub fn aggregate_json(
    matches: &[JsonMessage],
    query: &JsonPageMetadata,
    agg: &Aggregation,
) -> MessagesPage<JsonPageMetadata> {
    let mut buckets: BTreeMap<i64, Vec<Vec<f64>>> = BTreeMap::new();
    for msg in matches {
        let entry = buckets
            .entry(agg.interval.bucket_key(msg.created as f64, agg.value))
            .or_insert_with(|| vec![Vec::new(); query.agg_fields.len()]);
        for (slot, field) in entry.iter_mut().zip(&query.agg_fields) {
            if let Some(v) = numeric_at(&msg.payload, field) {
                slot.push(v);
            }
        }
    }

    let ordered = ordered_keys(buckets, query.dir);
    let total = ordered.len() as u64;
    let messages = paginate(ordered, query.offset, query.limit)
        .into_iter()
        .map(|(key, per_field)| {
            let values = per_field
                .iter()
                .map(|vals| reduce(agg.agg_type, vals))
                .collect();
            Message::Json(json_bucket_record(query, agg, key, values))
        })
        .collect();

    MessagesPage {
        total,
        messages,
        metadata: query.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_core::AggInterval;
    use serde_json::json;

    fn senml(time: f64, value: Option<f64>) -> SenmlMessage {
        SenmlMessage {
            publisher: "p1".into(),
            time,
            value,
            ..Default::default()
        }
    }

    #[test]
    fn paginate_zero_limit_returns_all() {
        assert_eq!(paginate(vec![1, 2, 3], 2, 0), vec![1, 2, 3]);
        assert_eq!(paginate(vec![1, 2, 3], 1, 1), vec![2]);
        assert!(paginate(vec![1, 2, 3], 5, 2).is_empty());
    }

    #[test]
    fn sort_keeps_insertion_order_for_ties() {
        let mut items = vec![(1.0, 'a'), (2.0, 'b'), (1.0, 'c')];
        sort_by_time(&mut items, SortDir::Desc, |i| i.0);
        assert_eq!(items, vec![(2.0, 'b'), (1.0, 'a'), (1.0, 'c')]);
        sort_by_time(&mut items, SortDir::Asc, |i| i.0);
        assert_eq!(items, vec![(1.0, 'a'), (1.0, 'c'), (2.0, 'b')]);
    }

    #[test]
    fn reduce_ignores_missing_values() {
        assert_eq!(reduce(AggType::Min, &[]), None);
        assert_eq!(reduce(AggType::Count, &[]), Some(0.0));
        assert_eq!(reduce(AggType::Avg, &[1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(reduce(AggType::Max, &[1.0, 7.0, 6.0]), Some(7.0));
    }

    #[test]
    fn senml_minute_buckets_descending() {
        let agg = Aggregation {
            agg_type: AggType::Max,
            interval: AggInterval::Minute,
            value: 1,
        };
        let query = SenmlPageMetadata::default();
        let records = vec![
            senml(60.0, Some(1.0)),
            senml(90.0, Some(4.0)),
            senml(150.0, Some(2.0)),
            senml(170.0, None),
        ];
        let page = aggregate_senml(&records, &query, &agg);
        assert_eq!(page.total, 2);
        let firsts: Vec<_> = page
            .messages
            .iter()
            .map(|m| {
                let s = m.as_senml().unwrap();
                (s.time, s.value)
            })
            .collect();
        assert_eq!(firsts, vec![(120.0, Some(2.0)), (60.0, Some(4.0))]);
    }

    #[test]
    fn json_buckets_aggregate_each_field() {
        let agg = Aggregation {
            agg_type: AggType::Avg,
            interval: AggInterval::Hour,
            value: 1,
        };
        let query = JsonPageMetadata {
            agg_fields: vec!["temp".into(), "env.hum".into()],
            dir: SortDir::Asc,
            ..Default::default()
        };
        let mk = |created, payload: Value| JsonMessage {
            created,
            payload: payload.as_object().unwrap().clone(),
            ..Default::default()
        };
        let records = vec![
            mk(10, json!({"temp": 20, "env": {"hum": 40}})),
            mk(20, json!({"temp": 22})),
            mk(3_700, json!({"temp": "hot"})),
        ];
        let page = aggregate_json(&records, &query, &agg);
        assert_eq!(page.total, 2);
        let first = page.messages[0].as_json().unwrap();
        assert_eq!(first.created, 0);
        assert_eq!(first.payload["temp"], json!(21.0));
        assert_eq!(first.payload["env.hum"], json!(40.0));
        let second = page.messages[1].as_json().unwrap();
        assert_eq!(second.created, 3_600);
        assert_eq!(second.payload["temp"], Value::Null);
    }
}
