// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Page metadata describing a message search.
//!
//! Both encodings share pagination, exact-match filters, a half-open time
//! range `[from, to)`, optional aggregation and a sort direction. A bound of
//! `0` means "unbounded on that side" and `limit == 0` means "return every
//! match". Queries are validated before any storage call.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::FluxionError;

/// Comparison operator applied to the numeric SenML value filter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    #[default]
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    /// SQL operator for this comparator.
    pub fn sql_op(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }

    /// Evaluates `lhs <op> rhs`.
    pub fn compare(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparator::Eq => lhs == rhs,
            Comparator::Lt => lhs < rhs,
            Comparator::Le => lhs <= rhs,
            Comparator::Gt => lhs > rhs,
            Comparator::Ge => lhs >= rhs,
        }
    }
}

/// Aggregate function computed per time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AggType {
    Min,
    Max,
    Avg,
    Count,
}

impl AggType {
    pub fn sql_fn(self) -> &'static str {
        match self {
            AggType::Min => "MIN",
            AggType::Max => "MAX",
            AggType::Avg => "AVG",
            AggType::Count => "COUNT",
        }
    }
}

/// Unit of an aggregation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AggInterval {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

/// Weeks start on Monday; the epoch fell on a Thursday.
const WEEK_ALIGN_SECS: i64 = 3 * 86_400;

impl AggInterval {
    /// Largest bucket count accepted for this unit.
    pub fn max_value(self) -> u32 {
        match self {
            AggInterval::Minute => 60,
            AggInterval::Hour => 24,
            AggInterval::Day => 31,
            AggInterval::Week => 52,
            AggInterval::Month => 12,
            AggInterval::Year => 10,
        }
    }

    /// Fixed width and alignment offset in seconds, or `None` for calendar units.
    pub fn fixed_width(self) -> Option<(i64, i64)> {
        match self {
            AggInterval::Minute => Some((60, 0)),
            AggInterval::Hour => Some((3_600, 0)),
            AggInterval::Day => Some((86_400, 0)),
            AggInterval::Week => Some((604_800, WEEK_ALIGN_SECS)),
            AggInterval::Month | AggInterval::Year => None,
        }
    }

    /// Bucket key of time `t` (unix seconds) for buckets of `count` units.
    pub fn bucket_key(self, t: f64, count: u32) -> i64 {
        let count = i64::from(count.max(1));
        match self.fixed_width() {
            Some((width, offset)) => ((t + offset as f64) / (width * count) as f64).floor() as i64,
            None => {
                let secs = t.floor() as i64;
                let dt = DateTime::from_timestamp(secs, 0).unwrap_or_default();
                let year = i64::from(dt.year());
                match self {
                    AggInterval::Month => {
                        (year * 12 + i64::from(dt.month0())).div_euclid(count)
                    }
                    _ => year.div_euclid(count),
                }
            }
        }
    }

    /// Start of the bucket identified by `key`, in unix seconds.
    pub fn bucket_start(self, key: i64, count: u32) -> i64 {
        let count = i64::from(count.max(1));
        match self.fixed_width() {
            Some((width, offset)) => key * width * count - offset,
            None => {
                let (year, month0) = match self {
                    AggInterval::Month => {
                        let months = key * count;
                        (months.div_euclid(12), months.rem_euclid(12))
                    }
                    _ => (key * count, 0),
                };
                Utc.with_ymd_and_hms(year as i32, month0 as u32 + 1, 1, 0, 0, 0)
                    .single()
                    .map(|dt| dt.timestamp())
                    .unwrap_or(0)
            }
        }
    }
}

/// Sort direction on the canonical time field.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// Bucketing request shared by both encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregation {
    pub agg_type: AggType,
    pub interval: AggInterval,
    pub value: u32,
}

fn validate_aggregation(
    agg_type: Option<AggType>,
    interval: Option<AggInterval>,
    value: u32,
) -> Result<Option<Aggregation>, FluxionError> {
    match (agg_type, interval) {
        (None, None) => Ok(None),
        (Some(agg_type), Some(interval)) => {
            let value = if value == 0 { 1 } else { value };
            if value > interval.max_value() {
                return Err(FluxionError::Validation(format!(
                    "aggregation value {value} exceeds the {interval} limit of {}",
                    interval.max_value()
                )));
            }
            Ok(Some(Aggregation {
                agg_type,
                interval,
                value,
            }))
        }
        (Some(_), None) => Err(FluxionError::Validation(
            "aggregation type requires an aggregation interval".into(),
        )),
        (None, Some(_)) => Err(FluxionError::Validation(
            "aggregation interval requires an aggregation type".into(),
        )),
    }
}

/// Search parameters for SenML messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenmlPageMetadata {
    pub offset: u64,
    pub limit: u64,
    pub subtopic: String,
    pub publisher: String,
    pub protocol: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparator: Option<Comparator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_value: Option<String>,
    pub from: f64,
    pub to: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agg_type: Option<AggType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agg_interval: Option<AggInterval>,
    pub agg_value: u32,
    pub dir: SortDir,
}

impl SenmlPageMetadata {
    /// Checks the query and returns its aggregation request, if any.
    pub fn validate(&self) -> Result<Option<Aggregation>, FluxionError> {
        let typed_filters = [
            self.value.is_some(),
            self.bool_value.is_some(),
            self.string_value.is_some(),
            self.data_value.is_some(),
        ];
        if typed_filters.iter().filter(|set| **set).count() > 1 {
            return Err(FluxionError::Validation(
                "at most one of value, bool_value, string_value, data_value may be set".into(),
            ));
        }
        if self.value.is_some_and(f64::is_nan) {
            return Err(FluxionError::Validation("value filter must be a number".into()));
        }
        validate_time_range(self.from, self.to)?;
        validate_aggregation(self.agg_type, self.agg_interval, self.agg_value)
    }

    /// The same query with pagination removed.
    pub fn unbounded(&self) -> Self {
        Self {
            offset: 0,
            limit: 0,
            ..self.clone()
        }
    }
}

/// Search parameters for JSON messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonPageMetadata {
    pub offset: u64,
    pub limit: u64,
    pub subtopic: String,
    pub publisher: String,
    pub protocol: String,
    pub from: i64,
    pub to: i64,
    /// Substring matched against the canonical payload text.
    pub filter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agg_type: Option<AggType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agg_interval: Option<AggInterval>,
    pub agg_value: u32,
    /// Dot-separated payload paths aggregated per bucket.
    pub agg_fields: Vec<String>,
    pub dir: SortDir,
}

impl JsonPageMetadata {
    /// Checks the query and returns its aggregation request, if any.
    pub fn validate(&self) -> Result<Option<Aggregation>, FluxionError> {
        if self.from < 0 || self.to < 0 {
            return Err(FluxionError::Validation(
                "time bounds must not be negative".into(),
            ));
        }
        validate_time_range(self.from as f64, self.to as f64)?;
        let aggregation =
            validate_aggregation(self.agg_type, self.agg_interval, self.agg_value)?;
        if aggregation.is_some() {
            if self.agg_fields.is_empty() {
                return Err(FluxionError::Validation(
                    "aggregation requires at least one aggregation field".into(),
                ));
            }
            for field in &self.agg_fields {
                validate_field_path(field)?;
            }
        }
        Ok(aggregation)
    }

    /// The same query with pagination removed.
    pub fn unbounded(&self) -> Self {
        Self {
            offset: 0,
            limit: 0,
            ..self.clone()
        }
    }
}

fn validate_time_range(from: f64, to: f64) -> Result<(), FluxionError> {
    if from.is_nan() || to.is_nan() || from < 0.0 || to < 0.0 {
        return Err(FluxionError::Validation(
            "time bounds must be non-negative numbers".into(),
        ));
    }
    if from > 0.0 && to > 0.0 && from > to {
        return Err(FluxionError::Validation(format!(
            "time range start {from} is after its end {to}"
        )));
    }
    Ok(())
}

/// Validates a dot-separated payload path such as `sensors.temp`.
pub fn validate_field_path(path: &str) -> Result<(), FluxionError> {
    if path.is_empty() || path.split('.').any(|segment| segment.is_empty()) {
        return Err(FluxionError::Validation(format!(
            "invalid field path `{path}`"
        )));
    }
    if path.contains('"') {
        return Err(FluxionError::Validation(format!(
            "field path `{path}` must not contain quotes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn comparator_parses_lowercase_and_rejects_unknown() {
        assert_eq!(Comparator::from_str("ge").unwrap(), Comparator::Ge);
        assert_eq!(Comparator::from_str("lt").unwrap(), Comparator::Lt);
        assert!(Comparator::from_str("ne").is_err());
        assert_eq!(Comparator::default(), Comparator::Eq);
    }

    #[test]
    fn comparator_compare_matches_sql_op() {
        assert!(Comparator::Ge.compare(5.0, 5.0));
        assert!(!Comparator::Gt.compare(5.0, 5.0));
        assert!(Comparator::Le.compare(4.0, 5.0));
        assert_eq!(Comparator::Le.sql_op(), "<=");
    }

    #[test]
    fn multiple_typed_filters_are_rejected() {
        let pm = SenmlPageMetadata {
            value: Some(1.0),
            string_value: Some("on".into()),
            ..Default::default()
        };
        assert!(matches!(pm.validate(), Err(FluxionError::Validation(_))));
    }

    #[test]
    fn aggregation_value_ceiling_per_unit() {
        let mut pm = SenmlPageMetadata {
            agg_type: Some(AggType::Avg),
            agg_interval: Some(AggInterval::Hour),
            agg_value: 24,
            ..Default::default()
        };
        assert!(pm.validate().unwrap().is_some());
        pm.agg_value = 25;
        assert!(pm.validate().is_err());

        pm.agg_interval = Some(AggInterval::Year);
        pm.agg_value = 10;
        assert!(pm.validate().is_ok());
        pm.agg_value = 11;
        assert!(pm.validate().is_err());
    }

    #[test]
    fn aggregation_value_defaults_to_one() {
        let pm = SenmlPageMetadata {
            agg_type: Some(AggType::Count),
            agg_interval: Some(AggInterval::Minute),
            ..Default::default()
        };
        assert_eq!(pm.validate().unwrap().unwrap().value, 1);
    }

    #[test]
    fn half_specified_aggregation_is_rejected() {
        let pm = SenmlPageMetadata {
            agg_type: Some(AggType::Max),
            ..Default::default()
        };
        assert!(pm.validate().is_err());
        let pm = JsonPageMetadata {
            agg_interval: Some(AggInterval::Day),
            ..Default::default()
        };
        assert!(pm.validate().is_err());
    }

    #[test]
    fn json_aggregation_requires_fields() {
        let mut pm = JsonPageMetadata {
            agg_type: Some(AggType::Max),
            agg_interval: Some(AggInterval::Day),
            ..Default::default()
        };
        assert!(pm.validate().is_err());
        pm.agg_fields = vec!["sensors.temp".into()];
        assert!(pm.validate().is_ok());
        pm.agg_fields = vec!["sensors..temp".into()];
        assert!(pm.validate().is_err());
    }

    #[test]
    fn inverted_time_range_is_rejected() {
        let pm = SenmlPageMetadata {
            from: 20.0,
            to: 10.0,
            ..Default::default()
        };
        assert!(pm.validate().is_err());
    }

    #[test]
    fn fixed_width_buckets_floor_to_window_start() {
        // 2024-01-01T00:16:40Z
        let t = 1_704_067_200.0 + 1_000.0;
        let key = AggInterval::Minute.bucket_key(t, 15);
        let start = AggInterval::Minute.bucket_start(key, 15);
        assert_eq!(start % 900, 0);
        assert!(start as f64 <= t && t < (start + 900) as f64);
    }

    #[test]
    fn week_buckets_start_on_monday() {
        // 2024-01-03 is a Wednesday; its week starts Monday 2024-01-01.
        let wednesday = Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap().timestamp();
        let key = AggInterval::Week.bucket_key(wednesday as f64, 1);
        let monday = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().timestamp();
        assert_eq!(AggInterval::Week.bucket_start(key, 1), monday);
    }

    #[test]
    fn month_buckets_are_calendar_aligned() {
        let t = Utc.with_ymd_and_hms(2024, 5, 17, 8, 0, 0).unwrap().timestamp();
        let key = AggInterval::Month.bucket_key(t as f64, 3);
        let start = AggInterval::Month.bucket_start(key, 3);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap().timestamp());

        let key = AggInterval::Year.bucket_key(t as f64, 1);
        assert_eq!(
            AggInterval::Year.bucket_start(key, 1),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().timestamp()
        );
    }

    #[test]
    fn unbounded_clears_pagination_only() {
        let pm = JsonPageMetadata {
            offset: 4,
            limit: 2,
            publisher: "p".into(),
            ..Default::default()
        };
        let all = pm.unbounded();
        assert_eq!(all.offset, 0);
        assert_eq!(all.limit, 0);
        assert_eq!(all.publisher, "p");
    }
}
