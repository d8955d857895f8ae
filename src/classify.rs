//! Vendor string adapter
//!
//! The provider labels metrics and states with free text. This module is the
//! only place that inspects those strings; everything downstream works with
//! [`QualitativeState`] and [`MetricSlot`].

use crate::models::QualitativeState;

/// Which part of the sleep slot a comparison fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepField {
    Duration,
    Quality,
}

/// Which part of the activity slot a comparison fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityField {
    Steps,
    ActiveMinutes,
}

/// Destination slot in `HealthMetrics` for a named metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSlot {
    RestingHeartRate,
    HeartRateVariability,
    Sleep(SleepField),
    Activity(ActivityField),
    HeartRateRecovery,
}

/// Parse a vendor state label
///
/// Case, surrounding whitespace and the separator between words are ignored,
/// so "At Risk", "at-risk" and "AT_RISK" all parse the same.
pub fn parse_state(raw: &str) -> QualitativeState {
    let normalized: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect();

    match normalized.as_str() {
        "good" => QualitativeState::Good,
        "optimal" => QualitativeState::Optimal,
        "normal" => QualitativeState::Normal,
        "caution" => QualitativeState::Caution,
        "warning" => QualitativeState::Warning,
        "at_risk" | "atrisk" => QualitativeState::AtRisk,
        "poor" => QualitativeState::Poor,
        "critical" => QualitativeState::Critical,
        _ => QualitativeState::Unknown(raw.to_string()),
    }
}

/// Extract a number from a vendor-formatted value such as "52 bpm" or "-3.5%"
///
/// Every character other than digits, `.` and `-` is dropped before parsing.
/// Returns `None` when nothing parseable remains or the result is not finite.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Map a metric's name and category to a `HealthMetrics` slot
///
/// The name decides on its own when it can; the category only helps names
/// that are ambiguous alone (e.g. "Score" under "sleep").
pub fn classify_metric(name: &str, category: &str) -> Option<MetricSlot> {
    slot_for(&name.to_lowercase())
        .or_else(|| slot_for(&format!("{} {}", name, category).to_lowercase()))
}

fn slot_for(text: &str) -> Option<MetricSlot> {
    let has = |needle: &str| text.contains(needle);

    let heart_rate = has("heart rate") || has("heart_rate") || (has("heart") && has("rate"));

    if has("resting") && heart_rate {
        return Some(MetricSlot::RestingHeartRate);
    }
    if has("variability") || has("hrv") {
        return Some(MetricSlot::HeartRateVariability);
    }
    if has("recovery") && has("heart") {
        return Some(MetricSlot::HeartRateRecovery);
    }
    if has("sleep") {
        let field = if has("quality") || has("score") || has("efficiency") {
            SleepField::Quality
        } else {
            SleepField::Duration
        };
        return Some(MetricSlot::Sleep(field));
    }
    if has("steps") {
        return Some(MetricSlot::Activity(ActivityField::Steps));
    }
    if has("active") {
        return Some(MetricSlot::Activity(ActivityField::ActiveMinutes));
    }

    None
}

/// Topic of a comparison, used to pick alert recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricTopic {
    HeartRate,
    Sleep,
    Activity,
    Other,
}

pub fn metric_topic(name: &str) -> MetricTopic {
    let name = name.to_lowercase();
    if name.contains("heart") || name.contains("hrv") {
        MetricTopic::HeartRate
    } else if name.contains("sleep") {
        MetricTopic::Sleep
    } else if name.contains("steps") || name.contains("active") || name.contains("activity") {
        MetricTopic::Activity
    } else {
        MetricTopic::Other
    }
}

/// True when the name or category marks an overall score trend
pub fn is_score_trend(name: &str, category: &str) -> bool {
    name.to_lowercase().contains("score") || category.to_lowercase().contains("score")
}

/// True when a unit string denotes minutes
pub fn is_minutes_unit(unit: &str) -> bool {
    matches!(unit.trim().to_lowercase().as_str(), "min" | "mins" | "minute" | "minutes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state_variants() {
        assert_eq!(parse_state("GOOD"), QualitativeState::Good);
        assert_eq!(parse_state(" at-risk "), QualitativeState::AtRisk);
        assert_eq!(parse_state("At Risk"), QualitativeState::AtRisk);
        assert_eq!(parse_state("warning"), QualitativeState::Warning);
        assert_eq!(parse_state("critical"), QualitativeState::Critical);
        assert_eq!(
            parse_state("elevated"),
            QualitativeState::Unknown("elevated".to_string())
        );
        assert_eq!(parse_state(""), QualitativeState::Unknown(String::new()));
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("52 bpm"), Some(52.0));
        assert_eq!(parse_numeric("-3.5%"), Some(-3.5));
        assert_eq!(parse_numeric("7.5h"), Some(7.5));
        assert_eq!(parse_numeric("10,000 steps"), Some(10000.0));
        assert_eq!(parse_numeric("n/a"), None);
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("1.2.3"), None);
        assert_eq!(parse_numeric("--"), None);
    }

    #[test]
    fn test_classify_metric() {
        assert_eq!(
            classify_metric("Resting Heart Rate", "cardio"),
            Some(MetricSlot::RestingHeartRate)
        );
        assert_eq!(
            classify_metric("resting_heart_rate", ""),
            Some(MetricSlot::RestingHeartRate)
        );
        assert_eq!(
            classify_metric("Heart Rate Recovery", "cardio"),
            Some(MetricSlot::HeartRateRecovery)
        );
        assert_eq!(
            classify_metric("HRV (RMSSD)", "cardio"),
            Some(MetricSlot::HeartRateVariability)
        );
        assert_eq!(
            classify_metric("Sleep Duration", "sleep"),
            Some(MetricSlot::Sleep(SleepField::Duration))
        );
        assert_eq!(
            classify_metric("Sleep Quality", "sleep"),
            Some(MetricSlot::Sleep(SleepField::Quality))
        );
        assert_eq!(
            classify_metric("Daily Steps", "activity"),
            Some(MetricSlot::Activity(ActivityField::Steps))
        );
        assert_eq!(
            classify_metric("Active Minutes", "activity"),
            Some(MetricSlot::Activity(ActivityField::ActiveMinutes))
        );
        assert_eq!(
            classify_metric("Resting Heart Rate", "recovery"),
            Some(MetricSlot::RestingHeartRate)
        );
        assert_eq!(
            classify_metric("Heart Rate Variability", "recovery"),
            Some(MetricSlot::HeartRateVariability)
        );
        assert_eq!(
            classify_metric("Recovery", "heart"),
            Some(MetricSlot::HeartRateRecovery)
        );
        assert_eq!(
            classify_metric("Score", "sleep"),
            Some(MetricSlot::Sleep(SleepField::Quality))
        );
        assert_eq!(classify_metric("Body Temperature", "vitals"), None);
    }

    #[test]
    fn test_metric_topic() {
        assert_eq!(metric_topic("Resting Heart Rate"), MetricTopic::HeartRate);
        assert_eq!(metric_topic("Sleep Duration"), MetricTopic::Sleep);
        assert_eq!(metric_topic("Daily Steps"), MetricTopic::Activity);
        assert_eq!(metric_topic("Body Temperature"), MetricTopic::Other);
    }

    #[test]
    fn test_minutes_unit() {
        assert!(is_minutes_unit("min"));
        assert!(is_minutes_unit(" Minutes "));
        assert!(!is_minutes_unit("h"));
    }
}
