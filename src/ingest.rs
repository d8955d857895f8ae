//! Provider payload normalization
//!
//! The provider answers in snake_case while bundles cached by the backend
//! were written in PascalCase or camelCase. This adapter accepts all three,
//! tolerates numbers sent as strings (and the reverse), and turns a payload
//! into the internal [`InsightBundle`] shape before the engine sees it.
//!
//! Individual records that cannot be read are skipped with a warning; only a
//! payload that is not a JSON object at all is rejected.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::models::{Comparison, ComparisonPoint, InsightBundle, Trend, TrendPoint};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBundle {
    #[serde(alias = "Trends")]
    trends: Option<Vec<Value>>,
    #[serde(alias = "Comparisons")]
    comparisons: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTrend {
    #[serde(alias = "Category")]
    category: Option<Value>,
    #[serde(alias = "Name")]
    name: Option<Value>,
    #[serde(alias = "QualitativeState", alias = "qualitativeState")]
    qualitative_state: Option<Value>,
    #[serde(alias = "IsHigherBetter", alias = "isHigherBetter")]
    is_higher_better: Option<Value>,
    #[serde(alias = "ValueRange", alias = "valueRange")]
    value_range: Option<Value>,
    #[serde(alias = "Unit")]
    unit: Option<Value>,
    #[serde(alias = "WindowStart", alias = "windowStart")]
    window_start: Option<Value>,
    #[serde(alias = "WindowEnd", alias = "windowEnd")]
    window_end: Option<Value>,
    #[serde(alias = "Points")]
    points: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTrendPoint {
    #[serde(alias = "StartTime", alias = "startTime")]
    start_time: Option<Value>,
    #[serde(alias = "EndTime", alias = "endTime")]
    end_time: Option<Value>,
    #[serde(alias = "Value")]
    value: Option<Value>,
    #[serde(
        alias = "PercentChangeFromPrevious",
        alias = "percentChangeFromPrevious"
    )]
    percent_change_from_previous: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawComparison {
    #[serde(alias = "Category")]
    category: Option<Value>,
    #[serde(alias = "Name")]
    name: Option<Value>,
    #[serde(alias = "Value")]
    value: Option<Value>,
    #[serde(alias = "Unit")]
    unit: Option<Value>,
    #[serde(alias = "IsHigherBetter", alias = "isHigherBetter")]
    is_higher_better: Option<Value>,
    #[serde(alias = "WindowStart", alias = "windowStart")]
    window_start: Option<Value>,
    #[serde(alias = "WindowEnd", alias = "windowEnd")]
    window_end: Option<Value>,
    #[serde(alias = "Percentile")]
    percentile: Option<Value>,
    #[serde(alias = "Difference")]
    difference: Option<Value>,
    #[serde(alias = "PercentageDifference", alias = "percentageDifference")]
    percentage_difference: Option<Value>,
    #[serde(alias = "QualitativeState", alias = "qualitativeState")]
    qualitative_state: Option<Value>,
    #[serde(alias = "Properties")]
    properties: Option<BTreeMap<String, Value>>,
    #[serde(alias = "Points")]
    points: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawComparisonPoint {
    #[serde(rename = "type", alias = "Type")]
    point_type: Option<Value>,
    #[serde(alias = "Value")]
    value: Option<Value>,
}

/// Parse a provider or cached payload from JSON text
pub fn parse_bundle(json: &str) -> Result<InsightBundle, IngestError> {
    let value: Value = serde_json::from_str(json).map_err(|e| IngestError::Malformed {
        reason: e.to_string(),
    })?;
    bundle_from_value(value)
}

/// Normalize an already-decoded payload
///
/// A payload wrapped as `{"insights": {...}}` is unwrapped first.
pub fn bundle_from_value(value: Value) -> Result<InsightBundle, IngestError> {
    let value = unwrap_envelope(value);

    if !value.is_object() {
        return Err(IngestError::NotAnObject {
            found: json_kind(&value).to_string(),
        });
    }

    let raw: RawBundle = serde_json::from_value(value).map_err(|e| IngestError::Malformed {
        reason: e.to_string(),
    })?;

    let trends: Vec<Trend> = raw
        .trends
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<RawTrend>(item) {
            Ok(trend) => Some(convert_trend(trend)),
            Err(e) => {
                warn!(index, error = %e, "Skipping unreadable trend record");
                None
            }
        })
        .collect();

    let comparisons: Vec<Comparison> = raw
        .comparisons
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<RawComparison>(item) {
            Ok(comparison) => Some(convert_comparison(comparison)),
            Err(e) => {
                warn!(index, error = %e, "Skipping unreadable comparison record");
                None
            }
        })
        .collect();

    debug!(
        trends = trends.len(),
        comparisons = comparisons.len(),
        "Insight bundle ingested"
    );

    Ok(InsightBundle {
        trends,
        comparisons,
    })
}

fn unwrap_envelope(value: Value) -> Value {
    if let Value::Object(map) = &value {
        for key in ["insights", "Insights"] {
            if let Some(inner @ Value::Object(_)) = map.get(key) {
                return inner.clone();
            }
        }
    }
    value
}

fn convert_trend(raw: RawTrend) -> Trend {
    let points = raw
        .points
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawTrendPoint>(item).ok())
        .map(|p| TrendPoint {
            start_time: p.start_time.as_ref().and_then(to_timestamp),
            end_time: p.end_time.as_ref().and_then(to_timestamp),
            value: p.value.as_ref().and_then(to_number).unwrap_or(0.0),
            percent_change_from_previous: p
                .percent_change_from_previous
                .as_ref()
                .and_then(to_number)
                .unwrap_or(0.0),
        })
        .collect();

    Trend {
        category: to_text(raw.category.as_ref()),
        name: to_text(raw.name.as_ref()),
        qualitative_state: to_text(raw.qualitative_state.as_ref()).into(),
        is_higher_better: raw.is_higher_better.as_ref().and_then(to_bool).unwrap_or(false),
        value_range: raw.value_range.as_ref().and_then(to_number).unwrap_or(0.0),
        unit: to_text(raw.unit.as_ref()),
        window_start: raw.window_start.as_ref().and_then(to_timestamp),
        window_end: raw.window_end.as_ref().and_then(to_timestamp),
        points,
    }
}

fn convert_comparison(raw: RawComparison) -> Comparison {
    let points = raw
        .points
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawComparisonPoint>(item).ok())
        .map(|p| ComparisonPoint {
            point_type: to_text(p.point_type.as_ref()),
            value: to_text(p.value.as_ref()),
        })
        .collect();

    Comparison {
        category: to_text(raw.category.as_ref()),
        name: to_text(raw.name.as_ref()),
        value: to_text(raw.value.as_ref()),
        unit: to_text(raw.unit.as_ref()),
        is_higher_better: raw.is_higher_better.as_ref().and_then(to_bool).unwrap_or(false),
        window_start: raw.window_start.as_ref().and_then(to_timestamp),
        window_end: raw.window_end.as_ref().and_then(to_timestamp),
        percentile: raw.percentile.as_ref().and_then(to_number),
        difference: to_text(raw.difference.as_ref()),
        percentage_difference: to_text(raw.percentage_difference.as_ref()),
        qualitative_state: to_text(raw.qualitative_state.as_ref()).into(),
        properties: raw.properties.unwrap_or_default(),
        points,
    }
}

fn to_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

/// Accepts RFC 3339, naive date-times and dates (read as UTC), and epoch
/// seconds or milliseconds.
fn to_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|naive| Utc.from_utc_datetime(&naive))
                })
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                        .map(|naive| Utc.from_utc_datetime(&naive))
                })
        }
        Value::Number(n) => {
            let raw = n.as_i64()?;
            if raw.abs() >= 1_000_000_000_000 {
                DateTime::<Utc>::from_timestamp_millis(raw)
            } else {
                DateTime::<Utc>::from_timestamp(raw, 0)
            }
        }
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
